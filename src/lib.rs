//! `uindex` — resumable, parallel micro file indexes.
//!
//! The library crate behind three thin binaries (`uindex-create`,
//! `uindex-diff`, `uindex-dedupe`). Each module owns one component of the
//! pipeline: a [`walker`] that produces a resumable, lexicographically
//! ordered stream of filesystem items, a [`hasher`] that digests their
//! content (optionally partial), a [`hash_cache`] that lets hardlinks and
//! unchanged files skip re-hashing, a [`parallel_map`] that fans the hasher
//! out across worker threads while preserving input order, and an
//! [`indexer`] orchestrator that wires them together and emits the
//! `#scan-start`/rows/`#scan-end` index format described in [`entry`].
//!
//! [`reader`] and [`writer`] are the index file's two directions; [`excludes`]
//! compiles the `--exclude` patterns the walker prunes against; [`bytesize`]
//! parses the `--head`/`--tail`/`--minsize` byte-size flags.

pub mod bytesize;
pub mod cli;
pub mod digest;
pub mod entry;
pub mod error;
pub mod excludes;
pub mod hash_cache;
pub mod hasher;
pub mod indexer;
pub mod parallel_map;
pub mod reader;
pub mod walker;
pub mod writer;

pub use error::{Result, UIndexError};
