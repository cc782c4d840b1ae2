//! Pluggable digest backends for the partial-content hasher.
//!
//! One `RunningHash` trait object per algorithm name keeps `hasher.rs` free of
//! per-algorithm branching beyond a single dispatch in `new_hasher`.

use crate::error::{Result, UIndexError};
use sha2::Digest as _;

pub trait RunningHash: Send {
    fn update(&mut self, bytes: &[u8]);
    fn finalize_hex(self: Box<Self>) -> String;
}

struct Blake3Hash(blake3::Hasher);
impl RunningHash for Blake3Hash {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
    fn finalize_hex(self: Box<Self>) -> String {
        self.0.finalize().to_hex().to_string()
    }
}

struct Sha256Hash(sha2::Sha256);
impl RunningHash for Sha256Hash {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
    fn finalize_hex(self: Box<Self>) -> String {
        hex::encode(self.0.finalize())
    }
}

struct Sha512Hash(sha2::Sha512);
impl RunningHash for Sha512Hash {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
    fn finalize_hex(self: Box<Self>) -> String {
        hex::encode(self.0.finalize())
    }
}

struct Sha1Hash(sha1::Sha1);
impl RunningHash for Sha1Hash {
    fn update(&mut self, bytes: &[u8]) {
        sha1::Digest::update(&mut self.0, bytes);
    }
    fn finalize_hex(self: Box<Self>) -> String {
        hex::encode(sha1::Digest::finalize(self.0))
    }
}

struct Md5Hash(md5::Md5);
impl RunningHash for Md5Hash {
    fn update(&mut self, bytes: &[u8]) {
        md5::Digest::update(&mut self.0, bytes);
    }
    fn finalize_hex(self: Box<Self>) -> String {
        hex::encode(md5::Digest::finalize(self.0))
    }
}

struct Crc32Hash(crc32fast::Hasher);
impl RunningHash for Crc32Hash {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
    fn finalize_hex(self: Box<Self>) -> String {
        format!("{:08x}", self.0.finalize())
    }
}

/// Construct a fresh hasher for the named algorithm (case-insensitive).
pub fn new_hasher(algo: &str) -> Result<Box<dyn RunningHash>> {
    match algo.to_ascii_lowercase().as_str() {
        "blake3" => Ok(Box::new(Blake3Hash(blake3::Hasher::new()))),
        "sha256" => Ok(Box::new(Sha256Hash(sha2::Sha256::new()))),
        "sha512" => Ok(Box::new(Sha512Hash(sha2::Sha512::new()))),
        "sha1" => Ok(Box::new(Sha1Hash(sha1::Sha1::new()))),
        "md5" => Ok(Box::new(Md5Hash(md5::Md5::new()))),
        "crc32" => Ok(Box::new(Crc32Hash(crc32fast::Hasher::new()))),
        other => Err(UIndexError::UnknownAlgo(other.to_string())),
    }
}

/// Digest length in hex characters, used by `Entry` invariant checks.
pub fn hex_digest_len(algo: &str) -> Option<usize> {
    match algo.to_ascii_lowercase().as_str() {
        "blake3" => Some(64),
        "sha256" => Some(64),
        "sha512" => Some(128),
        "sha1" => Some(40),
        "md5" => Some(32),
        "crc32" => Some(8),
        _ => None,
    }
}
