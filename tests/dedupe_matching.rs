//! `uindex-dedupe` matching and deletion, exercised against real files.

mod support;

use std::fs::File;
use std::io::BufReader;

use tempfile::tempdir;
use uindex::cli::dedupe::{auto_confirm, load_reference, resolve_local_path, resolve_matches, MatchMode};
use uindex::reader::{iter_entries, PathTransforms};
use uindex::writer::IndexWriter;

fn write_index(path: &std::path::Path, rows: &[(&str, &str, u64)]) {
    let file = File::create(path).unwrap();
    let mut writer = IndexWriter::new(file);
    writer
        .write_scan_start(&uindex::entry::ScanStart {
            path_to_index: path.to_string_lossy().into_owned(),
            root: "/scan".into(),
            start: None,
            started_at: "2026-01-01T00:00:00Z".into(),
            uuid: "u".into(),
            excludes: vec![],
            checksum_algo: "sha256".into(),
            head: None,
            tail: None,
            columns: uindex::entry::DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect(),
            cli: serde_json::Map::new(),
        })
        .unwrap();
    for (checksum, path, size) in rows {
        writer.write_row(checksum, Some(1), 'F', 0o644, *size, 0, 0, "1.0", "1.0", path).unwrap();
    }
    writer
        .write_scan_end(&uindex::entry::ScanEnd {
            added_count: rows.len() as u64,
            added_bytes: rows.iter().map(|(_, _, s)| s).sum(),
            total_count: rows.len() as u64,
            total_bytes: rows.iter().map(|(_, _, s)| s).sum(),
            error_count: 0,
            ended_at: "2026-01-01T00:00:01Z".into(),
            uuid: "u".into(),
        })
        .unwrap();
}

#[test]
fn match_name_mode_finds_a_renamed_directory_copy_and_deletes_it() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    support::write_file(&root, "keep/data.bin", b"payload");

    let reference_path = root.join("reference.idx");
    write_index(&reference_path, &[("sha256:aaaa", "keep/data.bin", 7)]);

    let other_path = root.join("other.idx");
    write_index(&other_path, &[("sha256:aaaa", "elsewhere/nested/data.bin", 7)]);

    let reference_file = File::open(&reference_path).unwrap();
    let (reference, dupe_bytes, dupe_count) = load_reference(BufReader::new(reference_file), None, None);
    assert_eq!(dupe_bytes, 0);
    assert_eq!(dupe_count, 0);

    let other_file = File::open(&other_path).unwrap();
    let mut other_entries = Vec::new();
    iter_entries(BufReader::new(other_file), &PathTransforms::default(), |e| other_entries.push(e));
    assert_eq!(other_entries.len(), 1);

    let entry = &other_entries[0];
    let key = (entry.checksum().to_string(), entry.size);
    let candidates = reference.get(&key).unwrap();

    let result = resolve_matches(&entry.path, candidates, MatchMode::MatchName, None);
    assert_eq!(result.matched.len(), 1);
    let matched = result.matched[0];
    assert_eq!(matched.path, "keep/data.bin");

    let local = resolve_local_path(&root, matched);
    assert!(local.exists());

    assert!(auto_confirm(true, false, 0));
    std::fs::remove_file(&local).unwrap();
    assert!(!local.exists());
}

#[test]
fn dry_run_never_deletes_even_when_matched() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    support::write_file(&root, "a.bin", b"same");

    let reference_path = root.join("reference.idx");
    write_index(&reference_path, &[("sha256:bbbb", "a.bin", 4)]);

    let reference_file = File::open(&reference_path).unwrap();
    let (reference, _, _) = load_reference(BufReader::new(reference_file), None, None);
    let candidates = reference.get(&("bbbb".to_string(), 4)).unwrap();
    let result = resolve_matches("a.bin", candidates, MatchMode::ExactPath, None);
    assert_eq!(result.matched.len(), 1);

    // auto_confirm would say "yes, proceed" under --dry-run, but the caller
    // is still responsible for never calling remove_file when dry_run is set.
    assert!(auto_confirm(false, true, 0));
    let local = resolve_local_path(&root, result.matched[0]);
    assert!(local.exists());
}

#[test]
fn minsize_excludes_small_matches() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    support::write_file(&root, "small.bin", b"hi");

    let reference_path = root.join("reference.idx");
    write_index(&reference_path, &[("sha256:cccc", "small.bin", 2)]);

    let reference_file = File::open(&reference_path).unwrap();
    let (reference, _, _) = load_reference(BufReader::new(reference_file), None, None);
    let candidates = reference.get(&("cccc".to_string(), 2)).unwrap();

    let result = resolve_matches("small.bin", candidates, MatchMode::ExactPath, Some(1024));
    assert!(result.matched.is_empty());
    assert_eq!(result.candidates, 1);
}

#[test]
fn ambiguous_unique_relpath_match_is_reported_as_multiple_candidates() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();

    let reference_path = root.join("reference.idx");
    write_index(
        &reference_path,
        &[("sha256:dddd", "proj_a/x.txt", 3), ("sha256:dddd", "proj_b/x.txt", 3)],
    );

    let reference_file = File::open(&reference_path).unwrap();
    let (reference, dupe_bytes, dupe_count) = load_reference(BufReader::new(reference_file), None, None);
    assert_eq!(dupe_count, 1);
    assert_eq!(dupe_bytes, 3);

    let candidates = reference.get(&("dddd".to_string(), 3)).unwrap();
    let result = resolve_matches("other/x.txt", candidates, MatchMode::MatchUniqueRelpath, None);
    assert!(result.matched.is_empty());
    assert_eq!(result.candidates, 2);
}
