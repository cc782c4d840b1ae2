//! Two hardlinked paths hashed by distinct worker threads in the same run
//! must resolve to byte-identical checksums, since they share an inode and
//! the hash cache keys on `(dev, ino, algo)`.

mod support;

use std::fs::File;
use std::io::BufReader;

use tempfile::tempdir;
use uindex::entry::Entry;
use uindex::indexer::{run_create, CreateConfig};
use uindex::reader::{iter_entries, PathTransforms};
use uindex::writer::IndexWriter;

#[test]
fn hardlinked_paths_share_one_checksum() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    support::write_file(&root, "p", b"identical contents");
    std::fs::hard_link(root.join("p"), root.join("q")).unwrap();

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
        threads: 4,
        sorted: true,
        verbose: 0,
    };

    {
        let file = File::create(&idx_path).unwrap();
        let mut writer = IndexWriter::new(file);
        let stats = run_create(&config, None, &mut writer).unwrap();
        assert_eq!(stats.added_count, 2);
        assert_eq!(stats.error_count, 0);
    }

    let mut entries = Vec::new();
    let file = File::open(&idx_path).unwrap();
    iter_entries(BufReader::new(file), &PathTransforms::default(), |e| entries.push(e));
    assert_eq!(entries.len(), 2);

    let p: &Entry = entries.iter().find(|e| e.path == "p").unwrap();
    let q: &Entry = entries.iter().find(|e| e.path == "q").unwrap();
    assert_eq!(p.raw_checksum, q.raw_checksum);
    assert_eq!(p.inode, q.inode);
}
