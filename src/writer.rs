//! Index file writer: `#scan-start` header, tab-separated rows, `#scan-error`
//! and `#scan-end` footer, flushed at least once per second.

use std::io::Write;
use std::time::{Duration, Instant};

use crate::entry::{ScanEnd, ScanError, ScanStart};
use crate::error::Result;

const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

pub struct IndexWriter<W: Write> {
    out: W,
    last_flush: Instant,
}

impl<W: Write> IndexWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, last_flush: Instant::now() }
    }

    pub fn write_scan_start(&mut self, header: &ScanStart) -> Result<()> {
        writeln!(self.out, "#scan-start {}", serde_json::to_string(header)?)?;
        self.maybe_flush(true)
    }

    /// Write one data row: `checksum, inode, type, perms(octal), size, uid,
    /// gid, mtime, ctime, path`, tab-separated. `mtime`/`ctime` arrive
    /// pre-formatted so the caller controls subsecond precision.
    #[allow(clippy::too_many_arguments)]
    pub fn write_row(
        &mut self,
        checksum: &str,
        inode: Option<u64>,
        type_char: char,
        perms: u32,
        size: u64,
        uid: u32,
        gid: u32,
        mtime: &str,
        ctime: &str,
        path: &str,
    ) -> Result<()> {
        writeln!(
            self.out,
            "{}\t{}\t{}\t{:o}\t{}\t{}\t{}\t{}\t{}\t{}",
            checksum,
            inode.map(|i| i.to_string()).unwrap_or_default(),
            type_char,
            perms,
            size,
            uid,
            gid,
            mtime,
            ctime,
            path,
        )?;
        self.maybe_flush(false)
    }

    pub fn write_scan_error(&mut self, error: &ScanError) -> Result<()> {
        writeln!(self.out, "#scan-error {}", serde_json::to_string(error)?)?;
        self.maybe_flush(false)
    }

    pub fn write_scan_end(&mut self, end: &ScanEnd) -> Result<()> {
        writeln!(self.out, "#scan-end {}", serde_json::to_string(end)?)?;
        self.out.flush()?;
        Ok(())
    }

    fn maybe_flush(&mut self, force: bool) -> Result<()> {
        if force || self.last_flush.elapsed() >= FLUSH_INTERVAL {
            self.out.flush()?;
            self.last_flush = Instant::now();
        }
        Ok(())
    }
}
