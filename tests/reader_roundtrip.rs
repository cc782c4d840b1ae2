//! Writing a batch of rows and reading them back must reproduce every field
//! the writer was given: the index format is a lossless encoding of `Entry`.

use uindex::entry::{Entry, ScanEnd, ScanStart, TypeCode};
use uindex::reader::{iter_entries, PathTransforms};
use uindex::writer::IndexWriter;

fn header() -> ScanStart {
    ScanStart {
        path_to_index: "/out.idx".into(),
        root: "/scan".into(),
        start: None,
        started_at: "2026-01-01T00:00:00Z".into(),
        uuid: "u-1".into(),
        excludes: vec![".git".into()],
        checksum_algo: "sha256".into(),
        head: None,
        tail: None,
        columns: uindex::entry::DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect(),
        cli: serde_json::Map::new(),
    }
}

#[test]
fn roundtrip_preserves_every_row_field() {
    let mut buf = Vec::new();
    {
        let mut writer = IndexWriter::new(&mut buf);
        writer.write_scan_start(&header()).unwrap();
        writer
            .write_row("sha256:aaaa", Some(42), 'F', 0o644, 123, 501, 20, "1700000000.50", "1700000000.50", "a/b.txt")
            .unwrap();
        writer
            .write_row("sha256:bbbb", None, '@', 0o777, 5, 501, 20, "1700000001.00", "1700000001.00", "c/link")
            .unwrap();
        writer
            .write_scan_end(&ScanEnd {
                added_count: 2,
                added_bytes: 128,
                total_count: 2,
                total_bytes: 128,
                error_count: 0,
                ended_at: "2026-01-01T00:00:02Z".into(),
                uuid: "u-1".into(),
            })
            .unwrap();
    }

    let mut entries = Vec::new();
    iter_entries(std::io::Cursor::new(buf), &PathTransforms::default(), |e| entries.push(e));

    assert_eq!(entries.len(), 2);

    let a = &entries[0];
    assert_eq!(a.path, "a/b.txt");
    assert_eq!(a.raw_checksum, "sha256:aaaa");
    assert_eq!(a.checksum(), "aaaa");
    assert_eq!(a.inode, Some(42));
    assert_eq!(a.type_code, TypeCode::Regular);
    assert_eq!(a.perms, 0o644);
    assert_eq!(a.size, 123);
    assert_eq!(a.uid, 501);
    assert_eq!(a.gid, 20);
    assert!((a.mtime - 1700000000.50).abs() < 1e-6);

    let b = &entries[1];
    assert_eq!(b.path, "c/link");
    assert_eq!(b.inode, None);
    assert_eq!(b.type_code, TypeCode::Symlink);
    assert_eq!(b.size, 5);
}

#[test]
fn path_transforms_apply_on_read_not_write() {
    let mut buf = Vec::new();
    {
        let mut writer = IndexWriter::new(&mut buf);
        writer.write_scan_start(&header()).unwrap();
        writer.write_row("sha256:cccc", Some(1), 'F', 0o644, 1, 0, 0, "1.0", "1.0", "sub/file").unwrap();
        writer
            .write_scan_end(&ScanEnd {
                added_count: 1,
                added_bytes: 1,
                total_count: 1,
                total_bytes: 1,
                error_count: 0,
                ended_at: "2026-01-01T00:00:02Z".into(),
                uuid: "u-1".into(),
            })
            .unwrap();
    }

    let transforms = PathTransforms { prepend_path: Some("prefix".to_string()), ..Default::default() };
    let mut entries = Vec::new();
    iter_entries(std::io::Cursor::new(buf), &transforms, |e| entries.push(e));

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "prefix/sub/file");
}
