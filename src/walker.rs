//! Resumable walker.
//!
//! Yields batches of non-directory items per directory, descending into
//! directories in lexicographic order, and can restart mid-traversal from an
//! arbitrary relative path while visiting every item exactly once. A tagged
//! `WalkKind` carries each entry's `lstat`-derived type through the
//! traversal instead of a pile of boolean flags.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Result, UIndexError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkKind {
    Regular,
    Symlink,
    Directory,
    Special,
}

#[derive(Debug, Clone)]
pub struct StatInfo {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    pub mtime: f64,
    pub ctime: f64,
}

impl StatInfo {
    fn from_metadata(meta: &fs::Metadata) -> Self {
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
            mode: meta.mode(),
            size: meta.size(),
            uid: meta.uid(),
            gid: meta.gid(),
            mtime: meta.mtime() as f64 + meta.mtime_nsec() as f64 / 1e9,
            ctime: meta.ctime() as f64 + meta.ctime_nsec() as f64 / 1e9,
        }
    }
}

/// One filesystem entry encountered by the walker.
#[derive(Debug, Clone)]
pub struct WalkItem {
    pub parent: PathBuf,
    pub name: String,
    pub kind: WalkKind,
    pub stat: StatInfo,
}

impl WalkItem {
    pub fn full_path(&self) -> PathBuf {
        self.parent.join(&self.name)
    }

    pub fn is_reg(&self) -> bool {
        self.kind == WalkKind::Regular
    }

    pub fn is_lnk(&self) -> bool {
        self.kind == WalkKind::Symlink
    }

    pub fn is_dir(&self) -> bool {
        self.kind == WalkKind::Directory
    }
}

fn classify(mode: u32) -> WalkKind {
    match mode & libc::S_IFMT {
        libc::S_IFREG => WalkKind::Regular,
        libc::S_IFLNK => WalkKind::Symlink,
        libc::S_IFDIR => WalkKind::Directory,
        _ => WalkKind::Special,
    }
}

/// Predicate deciding whether a name should be pruned from traversal.
/// `rel_path` is the path relative to the walk root, using `/` separators.
pub trait ExcludePredicate: Send + Sync {
    fn is_excluded(&self, name: &str, rel_path: &str, is_dir: bool) -> bool;
}

impl<F> ExcludePredicate for F
where
    F: Fn(&str, &str, bool) -> bool + Send + Sync,
{
    fn is_excluded(&self, name: &str, rel_path: &str, is_dir: bool) -> bool {
        self(name, rel_path, is_dir)
    }
}

pub struct NoExclude;
impl ExcludePredicate for NoExclude {
    fn is_excluded(&self, _name: &str, _rel_path: &str, _is_dir: bool) -> bool {
        false
    }
}

/// Decompose a resume path (absolute or root-relative) into the stack of
/// path components the resume algorithm walks down.
pub fn resume_stack(root: &Path, start: Option<&Path>) -> Vec<String> {
    let Some(start) = start else { return Vec::new() };
    let relative = start.strip_prefix(root).unwrap_or(start);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// Run the resumable walk, invoking `on_item` for every non-directory item in
/// lexicographic, depth-first order starting at `start` (or from the
/// beginning if `start` is empty). `root` is used only to compute `rel_path`
/// for the exclude predicate.
pub fn walk(
    walk_root: &Path,
    root: &Path,
    start: &[String],
    excludes: &dyn ExcludePredicate,
    on_item: &mut dyn FnMut(WalkItem) -> Result<()>,
) -> Result<()> {
    walk_level(walk_root, root, start, excludes, on_item)
}

fn walk_level(
    dir: &Path,
    root: &Path,
    start: &[String],
    excludes: &dyn ExcludePredicate,
    on_item: &mut dyn FnMut(WalkItem) -> Result<()>,
) -> Result<()> {
    let this_start = start.first();
    let tail_start: &[String] = if start.len() > 1 { &start[1..] } else { &[] };
    // This level's batch is emitted only when no deeper resume component
    // remains; at that leaf level the resume point names the last row a
    // prior run actually wrote, so the leaf directory excludes everything up
    // to and including that name (`<=`), while every ancestor on the way
    // down only skips siblings strictly before the resume component (`>`),
    // since the resume path there just identifies which child to descend
    // into, not a file to exclude (see DESIGN.md's decision on
    // resume-point re-emission).
    let is_leaf = tail_start.is_empty();

    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(rd) => {
            let mut out = Vec::new();
            for entry in rd {
                match entry {
                    Ok(e) => out.push(e.file_name().to_string_lossy().into_owned()),
                    Err(e) => warn!(dir = %dir.display(), error = %e, "readdir entry failed, skipping"),
                }
            }
            out
        }
        Err(source) => {
            return Err(UIndexError::ReadDir { path: dir.to_path_buf(), source });
        }
    };
    names.sort();

    let mut dirs: Vec<WalkItem> = Vec::new();
    let mut non_dirs: Vec<WalkItem> = Vec::new();

    for name in names {
        let full = dir.join(&name);
        let meta = match fs::symlink_metadata(&full) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %full.display(), error = %e, "lstat failed, skipping");
                continue;
            }
        };
        let kind = classify(meta.mode());
        let is_dir = kind == WalkKind::Directory;

        if let Some(this_start) = this_start {
            let skip = if is_dir {
                this_start.as_str() > name.as_str()
            } else if is_leaf {
                name.as_str() <= this_start.as_str()
            } else {
                this_start.as_str() > name.as_str()
            };
            if skip {
                continue;
            }
        }

        let rel_path = full
            .strip_prefix(root)
            .unwrap_or(&full)
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");
        if excludes.is_excluded(&name, &rel_path, is_dir) {
            continue;
        }

        let item = WalkItem { parent: dir.to_path_buf(), name, kind, stat: StatInfo::from_metadata(&meta) };

        match kind {
            WalkKind::Directory => dirs.push(item),
            WalkKind::Regular | WalkKind::Symlink => non_dirs.push(item),
            WalkKind::Special => {}
        }
    }

    if is_leaf {
        for item in non_dirs {
            on_item(item)?;
        }
    }

    let mut next_start: &[String] = tail_start;
    for dir_item in &dirs {
        if let Some(this_start) = this_start {
            if dir_item.name.as_str() > this_start.as_str() {
                next_start = &[];
            }
        }
        walk_level(&dir_item.full_path(), root, next_start, excludes, on_item)?;
    }

    Ok(())
}
