//! Index data model: `Entry`, the algo key, and the type-code taxonomy.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One character tag for the kind of filesystem object a row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    Regular,
    Symlink,
    Directory,
}

impl TypeCode {
    pub fn as_char(self) -> char {
        match self {
            TypeCode::Regular => 'F',
            TypeCode::Symlink => '@',
            TypeCode::Directory => '/',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'F' => Some(TypeCode::Regular),
            '@' => Some(TypeCode::Symlink),
            '/' => Some(TypeCode::Directory),
            _ => None,
        }
    }
}

/// One logical row of an index, alongside the `#scan-start` header JSON that
/// preceded it (provenance: which algorithm, which run).
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: String,
    pub raw_checksum: String,
    pub perms: u32,
    pub type_code: TypeCode,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    pub mtime: f64,
    pub ctime: Option<f64>,
    pub inode: Option<u64>,
    pub meta: Option<serde_json::Value>,
    /// Decimal digits captured after the `.` in the raw field this entry's
    /// `epsilon()` is derived from (`ctime` if present, else `mtime`), counted
    /// from the literal row text rather than re-rendering the parsed `f64` —
    /// see [`count_frac_digits`].
    pub time_digits: u32,
}

impl Entry {
    /// The hex digest without its `algo[,h=N][,t=N]:` prefix.
    pub fn checksum(&self) -> &str {
        self.raw_checksum
            .rsplit_once(':')
            .map(|(_, hex)| hex)
            .unwrap_or(&self.raw_checksum)
    }

    /// The fuzzy-equality tolerance for this entry's recorded mtime, derived
    /// from `time_digits` (the number of decimal digits the row was written
    /// with, counted from the raw text at parse time).
    pub fn epsilon(&self) -> f64 {
        if self.time_digits == 0 {
            0.0
        } else {
            2.0 * 10f64.powi(-(self.time_digits as i32))
        }
    }

    /// Drop `num` leading `/`-delimited segments from `path`.
    pub fn pop_path(&mut self, num: usize) {
        let mut parts: Vec<&str> = self.path.splitn(num + 1, '/').collect();
        if parts.len() > num {
            self.path = parts.split_off(num).join("/");
        } else if let Some(last) = parts.last() {
            self.path = (*last).to_string();
        }
    }

    /// Glue `prefix` in front of `path`, joined by exactly one `/`.
    pub fn prepend_path(&mut self, prefix: &str) {
        if prefix.is_empty() {
            return;
        }
        self.path = format!("{}/{}", prefix.trim_matches('/'), self.path);
    }

    pub fn replace_path(&mut self, pattern: &Regex, replacement: &str) {
        self.path = pattern.replace_all(&self.path, replacement).into_owned();
    }

    pub fn search_path(&self, pattern: &Regex) -> bool {
        pattern.is_match(&self.path)
    }
}

/// Count the digits after `.` in a raw numeric field's literal text, e.g.
/// `"1700000000.1200"` -> `4`. Returns `0` for an integer with no `.` at all,
/// which is exactly the "no tolerance recorded" case `epsilon()` treats as
/// bit-exact.
pub fn count_frac_digits(raw: &str) -> u32 {
    match raw.split_once('.') {
        Some((_, frac)) => frac.len() as u32,
        None => 0,
    }
}

/// Parse `"<algo>[,h=<head>][,t=<tail>]:<hex>"` into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgoKey {
    pub algo: String,
    pub head: Option<String>,
    pub tail: Option<String>,
}

impl AlgoKey {
    pub fn full(algo: impl Into<String>) -> Self {
        Self { algo: algo.into(), head: None, tail: None }
    }

    pub fn to_key_string(&self) -> String {
        let mut s = self.algo.clone();
        if let Some(h) = &self.head {
            s.push_str(",h=");
            s.push_str(h);
        }
        if let Some(t) = &self.tail {
            s.push_str(",t=");
            s.push_str(t);
        }
        s
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (key, _hex) = raw.rsplit_once(':')?;
        let mut parts = key.split(',');
        let algo = parts.next()?.to_string();
        let mut head = None;
        let mut tail = None;
        for part in parts {
            if let Some(h) = part.strip_prefix("h=") {
                head = Some(h.to_string());
            } else if let Some(t) = part.strip_prefix("t=") {
                tail = Some(t.to_string());
            }
        }
        Some(Self { algo, head, tail })
    }
}

/// Header JSON carried by a `#scan-start` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStart {
    pub path_to_index: String,
    pub root: String,
    pub start: Option<String>,
    pub started_at: String,
    pub uuid: String,
    pub excludes: Vec<String>,
    pub checksum_algo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail: Option<String>,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub cli: serde_json::Map<String, serde_json::Value>,
}

/// `#scan-error` record: a path that could not be hashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanError {
    pub path: String,
    pub error: String,
}

/// `#scan-end` record: aggregate counts closing a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEnd {
    pub added_count: u64,
    pub added_bytes: u64,
    pub total_count: u64,
    pub total_bytes: u64,
    pub error_count: u64,
    pub ended_at: String,
    pub uuid: String,
}

pub const DEFAULT_COLUMNS: [&str; 10] = [
    "checksum", "inode", "type", "perms", "size", "uid", "gid", "mtime", "ctime", "path",
];

/// Column order for the legacy, header-less 7-field row format.
pub const LEGACY_COLUMNS: [&str; 7] = ["checksum", "perms", "size", "uid", "gid", "mtime", "path"];
