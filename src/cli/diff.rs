//! `uindex-diff` argument parsing and the sorted-stream merge.
//!
//! Two indexes are read into memory, sorted by path, and walked with two
//! pointers the way a merge-join compares sorted relations. Deliberately
//! small next to the walker/hasher pipeline: there is nothing to schedule
//! or cache once both sides are in memory and ordered.

use std::cmp::Ordering;

use clap::Parser;
use regex::Regex;

use crate::entry::Entry;
use crate::error::Result;
use crate::reader::PathTransforms;

#[derive(Debug, Parser)]
#[command(name = "uindex-diff", about = "Compare two indexes as sorted path streams")]
pub struct DiffArgs {
    /// First index file.
    pub a: std::path::PathBuf,

    /// Second index file.
    pub b: std::path::PathBuf,

    /// Prepend this prefix to every path read from `a`.
    #[arg(long = "prepend-a", value_name = "PREFIX")]
    pub prepend_a: Option<String>,

    /// Prepend this prefix to every path read from `b`.
    #[arg(long = "prepend-b", value_name = "PREFIX")]
    pub prepend_b: Option<String>,

    /// Keep only `a` entries whose path matches this regex.
    #[arg(long = "search-a", value_name = "PAT")]
    pub search_a: Option<String>,

    /// Keep only `b` entries whose path matches this regex.
    #[arg(long = "search-b", value_name = "PAT")]
    pub search_b: Option<String>,

    /// Invert `--search-a`.
    #[arg(long = "invert-search-a")]
    pub invert_search_a: bool,

    /// Invert `--search-b`.
    #[arg(long = "invert-search-b")]
    pub invert_search_b: bool,

    /// Substitute `FROM` with `TO` (regex) in every path read from `a`.
    #[arg(long = "replace-a", num_args = 2, value_names = ["FROM", "TO"])]
    pub replace_a: Option<Vec<String>>,

    /// Substitute `FROM` with `TO` (regex) in every path read from `b`.
    #[arg(long = "replace-b", num_args = 2, value_names = ["FROM", "TO"])]
    pub replace_b: Option<Vec<String>>,

    /// Treat a `+` symlink in `b` as covering everything under it: missing
    /// entries in `a` under that prefix no longer count as missing. `>= 2`
    /// additionally annotates which matches were covered by a symlink.
    #[arg(long = "ignore-links", default_value_t = 0)]
    pub ignore_links: u8,

    /// Increase verbosity (repeatable).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl DiffArgs {
    pub fn transforms_a(&self) -> Result<PathTransforms> {
        build_transforms(&self.prepend_a, &self.search_a, self.invert_search_a, &self.replace_a)
    }

    pub fn transforms_b(&self) -> Result<PathTransforms> {
        build_transforms(&self.prepend_b, &self.search_b, self.invert_search_b, &self.replace_b)
    }
}

fn build_transforms(
    prepend: &Option<String>,
    search: &Option<String>,
    invert_search: bool,
    replace: &Option<Vec<String>>,
) -> Result<PathTransforms> {
    let search_path = search.as_deref().map(Regex::new).transpose()?;
    let replace_path = match replace {
        Some(pair) => Some((Regex::new(&pair[0])?, pair[1].clone())),
        None => None,
    };
    Ok(PathTransforms {
        pop_path: None,
        prepend_path: prepend.clone(),
        replace_path,
        search_path,
        invert_search,
    })
}

/// One printable row of the diff output: `-` missing (only in `a`), `+` extra
/// (only in `b`), ` ` match. `@` marks a match reclassified by the
/// `--ignore-links` symlink-window rule.
pub struct DiffLine {
    pub marker: char,
    pub checksum: String,
    pub path: String,
}

pub struct DiffOutcome {
    pub lines: Vec<DiffLine>,
    pub matches: u64,
    pub missing: u64,
    pub extra: u64,
}

/// Deduplicate a path-sorted `Vec<Entry>` down to one entry per path,
/// keeping the first occurrence (the entry nearest the top of the file),
/// mirroring the original's stable-sort `pop`-while-duplicate behavior.
fn sort_and_dedup(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    let mut out: Vec<Entry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if out.last().map(|last: &Entry| last.path == entry.path).unwrap_or(false) {
            continue;
        }
        out.push(entry);
    }
    out
}

/// Merge two entry lists sorted (and deduplicated) by path. A path present
/// on both sides is a match; present only in `a` is missing; only in `b` is
/// extra.
pub fn diff_entries(a: Vec<Entry>, b: Vec<Entry>, ignore_links: u8) -> DiffOutcome {
    let a = sort_and_dedup(a);
    let b = sort_and_dedup(b);

    let mut lines = Vec::new();
    let mut matches = 0u64;
    let mut missing = 0u64;
    let mut extra = 0u64;
    let mut link_prefixes: Vec<String> = Vec::new();

    let mut i = 0usize;
    let mut j = 0usize;
    while i < a.len() && j < b.len() {
        match a[i].path.cmp(&b[j].path) {
            Ordering::Equal => {
                matches += 1;
                lines.push(DiffLine { marker: ' ', checksum: a[i].raw_checksum.clone(), path: a[i].path.clone() });
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                emit_missing(&a[i], ignore_links, &link_prefixes, &mut lines, &mut matches, &mut missing);
                i += 1;
            }
            Ordering::Greater => {
                if ignore_links >= 1 && b[j].type_code == crate::entry::TypeCode::Symlink {
                    link_prefixes.push(b[j].path.clone());
                }
                extra += 1;
                lines.push(DiffLine { marker: '+', checksum: b[j].raw_checksum.clone(), path: b[j].path.clone() });
                j += 1;
            }
        }
    }
    while i < a.len() {
        emit_missing(&a[i], ignore_links, &link_prefixes, &mut lines, &mut matches, &mut missing);
        i += 1;
    }
    while j < b.len() {
        if ignore_links >= 1 && b[j].type_code == crate::entry::TypeCode::Symlink {
            link_prefixes.push(b[j].path.clone());
        }
        extra += 1;
        lines.push(DiffLine { marker: '+', checksum: b[j].raw_checksum.clone(), path: b[j].path.clone() });
        j += 1;
    }

    DiffOutcome { lines, matches, missing, extra }
}

fn emit_missing(
    entry: &Entry,
    ignore_links: u8,
    link_prefixes: &[String],
    lines: &mut Vec<DiffLine>,
    matches: &mut u64,
    missing: &mut u64,
) {
    let covered = ignore_links >= 1 && link_prefixes.iter().any(|p| entry.path.starts_with(&format!("{p}/")));
    if covered {
        *matches += 1;
        if ignore_links >= 2 {
            lines.push(DiffLine { marker: '@', checksum: entry.raw_checksum.clone(), path: entry.path.clone() });
        }
    } else {
        *missing += 1;
        lines.push(DiffLine { marker: '-', checksum: entry.raw_checksum.clone(), path: entry.path.clone() });
    }
}
