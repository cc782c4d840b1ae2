//! Partial-content hasher.
//!
//! Computes a full, head-only, tail-only, or head+tail digest of a walked
//! item, dispatching on `WalkKind`.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::os::unix::fs::MetadataExt as _;
use std::path::Path;

use crate::bytesize::parse_bytes;
use crate::digest::new_hasher;
use crate::entry::AlgoKey;
use crate::error::{Result, UIndexError};
use crate::walker::{WalkItem, WalkKind};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Default)]
pub struct HashBudget {
    pub head: Option<String>,
    pub tail: Option<String>,
}

impl HashBudget {
    pub fn is_partial(&self) -> bool {
        self.head.is_some() || self.tail.is_some()
    }
}

/// Outcome of attempting to hash one item.
pub enum HashOutcome {
    Digest(String),
    /// `EPERM` (or equivalent) on read, e.g. a permission-denied special file.
    Unreadable,
}

/// The `algo_key` this configuration will produce, e.g. `"sha256,h=4k"`.
pub fn algo_key(algo: &str, budget: &HashBudget) -> AlgoKey {
    AlgoKey { algo: algo.to_string(), head: budget.head.clone(), tail: budget.tail.clone() }
}

/// Hash `item`'s content (or symlink target) per `algo` and `budget`.
pub fn hash_item(item: &WalkItem, algo: &str, budget: &HashBudget) -> Result<HashOutcome> {
    match item.kind {
        WalkKind::Symlink => {
            let target = std::fs::read_link(item.full_path())?;
            let mut hasher = new_hasher(algo)?;
            hasher.update(target.to_string_lossy().as_bytes());
            Ok(HashOutcome::Digest(hasher.finalize_hex()))
        }
        WalkKind::Regular => hash_regular_file(&item.full_path(), item.stat.size, algo, budget),
        WalkKind::Directory | WalkKind::Special => {
            unreachable!("hasher is only invoked for regular files and symlinks")
        }
    }
}

fn hash_regular_file(path: &Path, size: u64, algo: &str, budget: &HashBudget) -> Result<HashOutcome> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if is_eperm(&e) => return Ok(HashOutcome::Unreadable),
        Err(e) => return Err(UIndexError::Unreadable { path: path.to_path_buf(), source: e }),
    };

    let mut hasher = new_hasher(algo)?;

    let head_bytes = budget.head.as_deref().map(parse_bytes).transpose()?;
    let tail_bytes = budget.tail.as_deref().map(parse_bytes).transpose()?;

    let result = (|| -> io::Result<()> {
        match (head_bytes, tail_bytes) {
            (None, None) => stream_all(&mut file, hasher.as_mut()),
            (head, tail) => {
                let head_end = head.map(|h| h.min(size)).unwrap_or(0);
                if let Some(head) = head {
                    stream_n(&mut file, hasher.as_mut(), head.min(size))?;
                }
                if let Some(tail) = tail {
                    let tail_start = size.saturating_sub(tail);
                    if tail_start > head_end {
                        file.seek(SeekFrom::Start(tail_start))?;
                        stream_n(&mut file, hasher.as_mut(), size - tail_start)?;
                    }
                    // tail region already covered by head: nothing more to read.
                }
                Ok(())
            }
        }
    })();

    match result {
        Ok(()) => Ok(HashOutcome::Digest(hasher.finalize_hex())),
        Err(e) if is_eperm(&e) => Ok(HashOutcome::Unreadable),
        Err(e) => Err(UIndexError::Unreadable { path: path.to_path_buf(), source: e }),
    }
}

fn stream_all(file: &mut File, hasher: &mut dyn crate::digest::RunningHash) -> io::Result<()> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(())
}

fn stream_n(file: &mut File, hasher: &mut dyn crate::digest::RunningHash, mut remaining: u64) -> io::Result<()> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    while remaining > 0 {
        let want = (CHUNK_SIZE as u64).min(remaining) as usize;
        let n = file.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        remaining -= n as u64;
    }
    Ok(())
}

/// For a symlink, the recorded size is the link's own stat size (the target
/// path's byte length), which `lstat` already reports; this helper documents
/// that invariant for callers that re-derive size.
pub fn symlink_size(path: &Path) -> io::Result<u64> {
    Ok(std::fs::symlink_metadata(path)?.size())
}

fn is_eperm(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EPERM) || e.kind() == io::ErrorKind::PermissionDenied
}
