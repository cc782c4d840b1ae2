//! Scratch-tree helpers shared by the integration tests.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use filetime::{set_file_times, FileTime};

/// Write `content` at `root/rel`, creating parent directories as needed.
pub fn write_file(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
}

/// Force a file's mtime (and atime) to a fixed, deterministic instant, so
/// fuzzy size+mtime comparisons in `--update` tests don't depend on how fast
/// the test runs.
pub fn set_mtime(root: &Path, rel: &str, unix_secs: i64) {
    let path = root.join(rel);
    let ft = FileTime::from_unix_time(unix_secs, 0);
    set_file_times(&path, ft, ft).unwrap();
}

pub fn touch_now_plus(root: &Path, rel: &str, offset: Duration) {
    let target = SystemTime::now() + offset;
    let unix_secs = target.duration_since(std::time::UNIX_EPOCH).unwrap().as_secs() as i64;
    set_mtime(root, rel, unix_secs);
}

/// Read an index file back into plain lines, for tests that assert on raw
/// row text rather than parsed `Entry` values.
pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
}
