//! An unreadable file (permission-denied on open) must not abort the run:
//! it becomes a `#scan-error` record and every other file still gets its
//! row, with `error_count == 1` in the footer.
//!
//! Skipped under a root test runner, since root bypasses the permission
//! bits this test relies on to provoke the error.

mod support;

use std::fs::{File, Permissions};
use std::io::BufReader;
use std::os::unix::fs::PermissionsExt;

use tempfile::tempdir;
use uindex::indexer::{run_create, CreateConfig};
use uindex::reader::{iter_entries, PathTransforms};
use uindex::writer::IndexWriter;

fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[test]
fn unreadable_file_is_recorded_and_run_continues() {
    if running_as_root() {
        eprintln!("skipping: root bypasses the permission bits this test relies on");
        return;
    }

    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    support::write_file(&root, "a_before.txt", b"before");
    support::write_file(&root, "m_locked.txt", b"locked");
    support::write_file(&root, "z_after.txt", b"after");

    let locked = root.join("m_locked.txt");
    std::fs::set_permissions(&locked, Permissions::from_mode(0o000)).unwrap();

    let idx_path = tmp.path().join("idx");
    let config = CreateConfig {
        path_to_index: idx_path.clone(),
        scan_path: root.clone(),
        root,
        start: None,
        raw_excludes: vec![],
        include_dotfiles: false,
        head: None,
        tail: None,
        checksum_algo: "sha256".to_string(),
        threads: 2,
        sorted: true,
        verbose: 0,
    };

    let stats = {
        let file = File::create(&idx_path).unwrap();
        let mut writer = IndexWriter::new(file);
        run_create(&config, None, &mut writer).unwrap()
    };

    assert_eq!(stats.error_count, 1);
    assert_eq!(stats.total_count, 3);

    let mut paths = Vec::new();
    let file = File::open(&idx_path).unwrap();
    iter_entries(BufReader::new(file), &PathTransforms::default(), |e| paths.push(e.path));
    paths.sort();
    // The locked file never produced a data row; the other two, before and
    // after it in sorted walk order, both did.
    assert_eq!(paths, vec!["a_before.txt".to_string(), "z_after.txt".to_string()]);

    let text = std::fs::read_to_string(&idx_path).unwrap();
    assert!(text.contains("#scan-error"));
    assert!(text.contains("m_locked.txt"));
    assert!(text.contains("\"error_count\":1"));
}
