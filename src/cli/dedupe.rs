//! `uindex-dedupe` argument parsing and the checksum/size matcher.
//!
//! Loads a reference index into a `(checksum, size) -> [Entry]` map, then —
//! when `--delete-matching` is given — walks a second index and deletes
//! local files whose reference-index counterpart matches under one of four
//! progressively looser matching modes. See DESIGN.md for the provenance of
//! the suffix-uniqueness algorithm and the "ambiguous match" diagnostic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::bytesize::parse_bytes;
use crate::entry::Entry;
use crate::error::Result;
use crate::reader::{iter_entries, PathTransforms};

#[derive(Debug, Parser)]
#[command(name = "uindex-dedupe", about = "Delete files already present (by content) in a reference index")]
pub struct DedupeArgs {
    /// Increase verbosity (repeatable).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Never prompt; always answer no (nothing is deleted).
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Never prompt; always answer yes.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Root to resolve matched paths under (default: current directory).
    #[arg(short = 'C', long)]
    pub root: Option<PathBuf>,

    /// Delete files in `root` that also exist (by content) in this index.
    #[arg(short = 'd', long = "delete-matching")]
    pub delete_matching: Option<PathBuf>,

    /// Segments to pop off the front of reference-index paths before matching.
    #[arg(short = 'p', long = "pop-path", value_name = "NUM")]
    pub pop_path: Option<usize>,

    /// Prefix to add in front of reference-index paths before matching.
    #[arg(short = 'P', long = "prepend-path")]
    pub prepend_path: Option<String>,

    /// Relax matching: only a unique path suffix need match.
    #[arg(short = 'U', long = "match-unique-relpath")]
    pub match_unique_relpath: bool,

    /// Relax matching: only the basename need match (not the full path).
    #[arg(short = 'N', long = "match-name")]
    pub match_name: bool,

    /// Relax matching further: content (checksum, size) alone is enough.
    #[arg(long = "match-checksum")]
    pub match_checksum: bool,

    /// Tighten matching: only consider files at least this large.
    #[arg(short = 'S', long, value_parser = parse_bytes)]
    pub minsize: Option<u64>,

    /// Reference index to load.
    pub index: PathBuf,
}

/// `(checksum, size) -> entries`, the reference index loaded for matching.
pub type ReferenceMap = HashMap<(String, u64), Vec<Entry>>;

/// Load the reference index, applying `pop_path`/`prepend_path`, and report
/// the internal-duplicate byte count and entry count (entries sharing a
/// `(checksum, size)` key with an earlier entry), unconditionally, before
/// any `--delete-matching` pass.
pub fn load_reference(
    lines: impl std::io::BufRead,
    pop_path: Option<usize>,
    prepend_path: Option<String>,
) -> (ReferenceMap, u64, u64) {
    let transforms = PathTransforms { pop_path, prepend_path, ..Default::default() };
    let mut map: ReferenceMap = ReferenceMap::new();
    let mut dupe_bytes = 0u64;
    let mut dupe_count = 0u64;

    iter_entries(lines, &transforms, |entry| {
        let key = (entry.checksum().to_string(), entry.size);
        if map.contains_key(&key) {
            dupe_bytes += entry.size;
            dupe_count += 1;
        }
        map.entry(key).or_default().push(entry);
    });

    (map, dupe_bytes, dupe_count)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    ExactPath,
    MatchName,
    MatchUniqueRelpath,
    MatchChecksum,
}

impl DedupeArgs {
    /// Select the single matching mode in effect. When more than one
    /// relaxing flag is given, the least strict one wins — each flag only
    /// ever loosens a prior, stricter requirement. See DESIGN.md for the
    /// precedence decision.
    pub fn match_mode(&self) -> MatchMode {
        if self.match_checksum {
            MatchMode::MatchChecksum
        } else if self.match_unique_relpath {
            MatchMode::MatchUniqueRelpath
        } else if self.match_name {
            MatchMode::MatchName
        } else {
            MatchMode::ExactPath
        }
    }
}

/// Every path suffix of `path`, split on `/`, from longest (the full path)
/// to shortest (the basename).
fn path_suffixes(path: &str) -> impl Iterator<Item = &str> {
    let mut starts = vec![0usize];
    for (i, c) in path.char_indices() {
        if c == '/' {
            starts.push(i + 1);
        }
    }
    starts.into_iter().map(move |s| &path[s..])
}

/// Build the suffix -> entries map used by `MatchUniqueRelpath`: a suffix is
/// usable for matching only if exactly one reference entry has it.
fn unique_relpath_index<'a>(entries: &'a [Entry]) -> HashMap<&'a str, Vec<&'a Entry>> {
    let mut by_suffix: HashMap<&str, Vec<&Entry>> = HashMap::new();
    for entry in entries {
        for suffix in path_suffixes(&entry.path) {
            by_suffix.entry(suffix).or_default().push(entry);
        }
    }
    by_suffix
}

/// The outcome of matching one external entry against the reference bucket
/// for its `(checksum, size)` key.
pub struct MatchResult<'a> {
    pub matched: Vec<&'a Entry>,
    pub candidates: usize,
}

/// Narrow `self_entries` (everything in the reference sharing the external
/// entry's checksum+size) down to the entries that also satisfy `mode`.
pub fn resolve_matches<'a>(
    external_path: &str,
    self_entries: &'a [Entry],
    mode: MatchMode,
    minsize: Option<u64>,
) -> MatchResult<'a> {
    let mut matched: Vec<&Entry> = match mode {
        MatchMode::MatchChecksum => self_entries.iter().collect(),
        MatchMode::MatchName => {
            let name = basename(external_path);
            self_entries.iter().filter(|e| basename(&e.path) == name).collect()
        }
        MatchMode::MatchUniqueRelpath => {
            let index = unique_relpath_index(self_entries);
            let mut seen = std::collections::HashSet::new();
            let mut out = Vec::new();
            for suffix in path_suffixes(external_path) {
                if let Some(candidates) = index.get(suffix) {
                    if candidates.len() == 1 {
                        let e = candidates[0];
                        let key = e.path.as_str();
                        if seen.insert(key) {
                            out.push(e);
                        }
                    }
                }
            }
            out
        }
        MatchMode::ExactPath => self_entries.iter().filter(|e| e.path == external_path).collect(),
    };

    if let Some(minsize) = minsize {
        matched.retain(|e| e.size >= minsize);
    }

    MatchResult { candidates: self_entries.len(), matched }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Resolve a matched reference entry's path under `root`.
pub fn resolve_local_path(root: &Path, matched: &Entry) -> PathBuf {
    root.join(&matched.path)
}

/// Whether a deletion decision should skip the interactive prompt.
///
/// `--dry-run` alone skips the prompt too, not just `--yes`: nothing is
/// unlinked under `--dry-run` regardless of how the prompt would have been
/// answered, so prompting first would only add friction (see DESIGN.md).
pub fn auto_confirm(yes: bool, dry_run: bool, _verbose: u8) -> bool {
    yes || dry_run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::TypeCode;

    fn entry(path: &str, checksum: &str, size: u64) -> Entry {
        Entry {
            path: path.to_string(),
            raw_checksum: format!("sha256:{checksum}"),
            perms: 0o644,
            type_code: TypeCode::Regular,
            size,
            uid: 0,
            gid: 0,
            mtime: 0.0,
            ctime: None,
            inode: None,
            meta: None,
            time_digits: 0,
        }
    }

    #[test]
    fn match_mode_prefers_least_strict_requested() {
        let mut args = base_args();
        args.match_name = true;
        args.match_checksum = true;
        assert_eq!(args.match_mode(), MatchMode::MatchChecksum);
    }

    #[test]
    fn match_mode_defaults_to_exact_path() {
        assert_eq!(base_args().match_mode(), MatchMode::ExactPath);
    }

    #[test]
    fn exact_path_match_requires_identical_path() {
        let refs = vec![entry("a/b.txt", "d", 10)];
        let out = resolve_matches("a/b.txt", &refs, MatchMode::ExactPath, None);
        assert_eq!(out.matched.len(), 1);
        let out = resolve_matches("other/b.txt", &refs, MatchMode::ExactPath, None);
        assert!(out.matched.is_empty());
    }

    #[test]
    fn match_name_ignores_directory() {
        let refs = vec![entry("proj/b.txt", "d", 10)];
        let out = resolve_matches("elsewhere/b.txt", &refs, MatchMode::MatchName, None);
        assert_eq!(out.matched.len(), 1);
    }

    #[test]
    fn unique_relpath_requires_suffix_uniqueness() {
        let refs = vec![entry("proj/a/x.txt", "d", 10), entry("proj/b/x.txt", "d", 10)];
        // "x.txt" is ambiguous (two candidates); "a/x.txt" is unique.
        let out = resolve_matches("other/a/x.txt", &refs, MatchMode::MatchUniqueRelpath, None);
        assert_eq!(out.matched.len(), 1);
        assert_eq!(out.matched[0].path, "proj/a/x.txt");
    }

    #[test]
    fn minsize_tightens_matches() {
        let refs = vec![entry("a.txt", "d", 10)];
        let out = resolve_matches("a.txt", &refs, MatchMode::ExactPath, Some(20));
        assert!(out.matched.is_empty());
        assert_eq!(out.candidates, 1);
    }

    #[test]
    fn internal_duplicates_are_counted() {
        let text = "sha256:aa\t644\t10\t0\t0\t1.0\ta.txt\nsha256:aa\t644\t10\t0\t0\t1.0\tb.txt\n";
        let (map, dupe_bytes, dupe_count) = load_reference(std::io::Cursor::new(text.as_bytes()), None, None);
        assert_eq!(dupe_count, 1);
        assert_eq!(dupe_bytes, 10);
        assert_eq!(map.get(&("aa".to_string(), 10)).unwrap().len(), 2);
    }

    #[test]
    fn auto_confirm_skips_prompt_for_yes_or_dry_run() {
        assert!(auto_confirm(true, false, 0));
        assert!(auto_confirm(false, true, 1));
        assert!(auto_confirm(false, true, 0));
        assert!(!auto_confirm(false, false, 0));
    }

    fn base_args() -> DedupeArgs {
        DedupeArgs {
            verbose: 0,
            dry_run: false,
            yes: false,
            root: None,
            delete_matching: None,
            pop_path: None,
            prepend_path: None,
            match_unique_relpath: false,
            match_name: false,
            match_checksum: false,
            minsize: None,
            index: PathBuf::from("idx"),
        }
    }
}
