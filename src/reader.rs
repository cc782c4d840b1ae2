//! Index file reader: streams `Entry` rows out of a `create` output file.
//!
//! Tracks the most recent `#scan-start` header to learn the run's `columns`
//! order; falls back to the legacy 7-column layout for rows written before
//! headers existed. Malformed rows are warned to stderr and skipped rather
//! than aborting the read.

use std::collections::HashMap;
use std::io::BufRead;

use regex::Regex;
use tracing::warn;

use crate::entry::{count_frac_digits, Entry, ScanStart, TypeCode, LEGACY_COLUMNS};

/// Path transforms applied to every entry yielded by [`iter_entries`], in the
/// fixed order: pop, prepend, replace, then the search filter.
#[derive(Debug, Clone, Default)]
pub struct PathTransforms {
    pub pop_path: Option<usize>,
    pub prepend_path: Option<String>,
    pub replace_path: Option<(Regex, String)>,
    pub search_path: Option<Regex>,
    pub invert_search: bool,
}

/// Read every valid row out of `lines`, applying `transforms`, yielding one
/// [`Entry`] per surviving row via `on_entry`.
pub fn iter_entries(
    lines: impl BufRead,
    transforms: &PathTransforms,
    mut on_entry: impl FnMut(Entry),
) {
    let mut columns: Option<Vec<String>> = None;

    for (line_no, line) in lines.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(line = line_no, error = %e, "failed to read index line, skipping");
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('#') {
            if let Some(json) = rest.trim_start().strip_prefix("scan-start") {
                match serde_json::from_str::<ScanStart>(json.trim_start()) {
                    Ok(start) => columns = Some(start.columns),
                    Err(e) => warn!(line = line_no, error = %e, "malformed #scan-start header"),
                }
            }
            continue;
        }

        let values: Vec<&str> = line.split('\t').collect();

        let data: HashMap<&str, &str> = match &columns {
            Some(cols) if cols.len() == values.len() => {
                cols.iter().map(String::as_str).zip(values.iter().copied()).collect()
            }
            // Legacy 7-column parsing only applies with no header context at
            // all. A row under an active header with the wrong arity (e.g.
            // one truncated mid-write by a crash) is dropped, not
            // reinterpreted positionally.
            None if values.len() == LEGACY_COLUMNS.len() => {
                LEGACY_COLUMNS.iter().copied().zip(values.iter().copied()).collect()
            }
            _ => {
                warn!(line = line_no, fields = values.len(), "index parse failure, skipping row");
                continue;
            }
        };

        let entry = match build_entry(&data) {
            Some(e) => e,
            None => {
                warn!(line = line_no, "index row missing required fields, skipping");
                continue;
            }
        };

        apply_and_yield(entry, transforms, &mut on_entry);
    }
}

fn build_entry(data: &HashMap<&str, &str>) -> Option<Entry> {
    let raw_checksum = (*data.get("checksum")?).to_string();
    let perms = u32::from_str_radix(data.get("perms")?, 8).ok()?;
    let size: u64 = data.get("size")?.parse().ok()?;
    let uid: u32 = data.get("uid")?.parse().ok()?;
    let gid: u32 = data.get("gid")?.parse().ok()?;
    let raw_mtime = *data.get("mtime")?;
    let mtime: f64 = raw_mtime.parse().ok()?;
    let raw_ctime = data.get("ctime").copied();
    let ctime = raw_ctime.and_then(|s| s.parse().ok());
    let inode = data.get("inode").and_then(|s| s.parse().ok());
    let type_code = data
        .get("type")
        .and_then(|s| s.chars().next())
        .and_then(TypeCode::from_char)
        .unwrap_or(TypeCode::Regular);
    let path = (*data.get("path")?).to_string();

    // `epsilon()` must count digits from the literal row text, not a
    // re-rendered `f64` (a whole-valued float prints with no `.` at all and
    // would otherwise collapse the tolerance to zero).
    let time_digits = count_frac_digits(raw_ctime.unwrap_or(raw_mtime));

    Some(Entry { path, raw_checksum, perms, type_code, size, uid, gid, mtime, ctime, inode, meta: None, time_digits })
}

fn apply_and_yield(mut entry: Entry, transforms: &PathTransforms, on_entry: &mut impl FnMut(Entry)) {
    if let Some(num) = transforms.pop_path {
        entry.pop_path(num);
    }
    if let Some(prefix) = &transforms.prepend_path {
        entry.prepend_path(prefix);
    }
    if let Some((pattern, replacement)) = &transforms.replace_path {
        entry.replace_path(pattern, replacement);
    }
    if let Some(pattern) = &transforms.search_path {
        let found = entry.search_path(pattern);
        let found = if transforms.invert_search { !found } else { found };
        if !found {
            return;
        }
    }
    on_entry(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(text: &str, transforms: &PathTransforms) -> Vec<Entry> {
        let mut out = Vec::new();
        iter_entries(Cursor::new(text.as_bytes()), transforms, |e| out.push(e));
        out
    }

    #[test]
    fn parses_headered_rows() {
        let text = "#scan-start {\"path_to_index\":\"/x\",\"root\":\"/x\",\"start\":null,\"started_at\":\"2026-01-01T00:00:00Z\",\"uuid\":\"u\",\"excludes\":[],\"checksum_algo\":\"sha256\",\"columns\":[\"checksum\",\"inode\",\"type\",\"perms\",\"size\",\"uid\",\"gid\",\"mtime\",\"ctime\",\"path\"],\"cli\":{}}\n\
sha256:abcd\t123\tF\t644\t10\t501\t20\t1700000000.12\t1700000000.12\ta/b.txt\n";
        let entries = collect(text, &PathTransforms::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "a/b.txt");
        assert_eq!(entries[0].checksum(), "abcd");
        assert_eq!(entries[0].size, 10);
        assert_eq!(entries[0].inode, Some(123));
    }

    #[test]
    fn falls_back_to_legacy_seven_column_rows() {
        let text = "sha256:abcd\t644\t10\t501\t20\t1700000000.12\ta/b.txt\n";
        let entries = collect(text, &PathTransforms::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "a/b.txt");
        assert!(entries[0].inode.is_none());
    }

    #[test]
    fn skips_malformed_rows_without_aborting() {
        let text = "garbage\trow\nsha256:abcd\t644\t10\t501\t20\t1700000000.12\ta/b.txt\n";
        let entries = collect(text, &PathTransforms::default());
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn applies_pop_then_prepend_then_replace_then_search() {
        let text = "sha256:abcd\t644\t10\t501\t20\t1700000000.12\tproj/src/main.rs\n";
        let transforms = PathTransforms {
            pop_path: Some(1),
            prepend_path: Some("renamed".to_string()),
            replace_path: Some((Regex::new(r"\.rs$").unwrap(), ".bak".to_string())),
            search_path: Some(Regex::new(r"bak$").unwrap()),
            invert_search: false,
        };
        let entries = collect(text, &transforms);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "renamed/src/main.bak");
    }

    #[test]
    fn search_filters_out_non_matches() {
        let text = "sha256:abcd\t644\t10\t501\t20\t1700000000.12\ta.txt\nsha256:abcd\t644\t10\t501\t20\t1700000000.12\tb.log\n";
        let transforms = PathTransforms {
            search_path: Some(Regex::new(r"\.txt$").unwrap()),
            ..Default::default()
        };
        let entries = collect(text, &transforms);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "a.txt");
    }
}
