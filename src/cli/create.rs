//! `uindex-create` argument parsing and flag validation.

use std::path::PathBuf;

use clap::Parser;

use crate::error::{Result, UIndexError};

#[derive(Debug, Parser)]
#[command(name = "uindex-create", about = "Scan a directory tree into a checksummed index")]
pub struct CreateArgs {
    /// Disable the implicit `^\.` exclude for dotfiles.
    #[arg(short = 'D', long)]
    pub include_dotfiles: bool,

    /// Exclude regex; leading `/` means "match relative path", else "match basename".
    #[arg(short = 'e', long = "exclude", value_name = "PAT")]
    pub excludes: Vec<String>,

    /// Write the index here instead of stdout; required for auto-start/update.
    #[arg(short = 'o', long)]
    pub out: Option<PathBuf>,

    /// Explicit resume path.
    #[arg(short = 's', long)]
    pub start: Option<PathBuf>,

    /// Derive the resume path from the last line of `--out`.
    #[arg(short = 'S', long)]
    pub auto_start: bool,

    /// Load the existing index and skip unchanged entries by size+mtime.
    #[arg(short = 'u', long)]
    pub update: bool,

    /// Disable output ordering.
    #[arg(long)]
    pub unsorted: bool,

    /// Partial hash budget for the leading bytes of each file.
    #[arg(long, value_name = "N")]
    pub head: Option<String>,

    /// Partial hash budget for the trailing bytes of each file.
    #[arg(long, value_name = "N")]
    pub tail: Option<String>,

    /// Worker thread count.
    #[arg(short = 't', long, default_value_t = 1)]
    pub threads: usize,

    /// Digest algorithm: blake3, sha256, sha512, sha1, md5, crc32.
    #[arg(short = 'H', long = "checksum-algo", default_value = "sha256")]
    pub checksum_algo: String,

    /// Root for relative paths (default: the scan path).
    #[arg(short = 'C', long = "root")]
    pub root: Option<PathBuf>,

    /// Increase verbosity (repeatable).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Directory to scan.
    pub path: PathBuf,
}

impl CreateArgs {
    /// Validate the mutually-exclusive resume flags and the `--out`
    /// prerequisites, returning the matching exit code on failure.
    pub fn validate(&self) -> Result<()> {
        let set: Vec<&'static str> = [
            (self.start.is_some(), "--start"),
            (self.auto_start, "--auto-start"),
            (self.update, "--update"),
        ]
        .into_iter()
        .filter_map(|(present, name)| present.then_some(name))
        .collect();
        if set.len() > 1 {
            return Err(UIndexError::MutuallyExclusive { flag_a: set[0], flag_b: set[1] });
        }

        if (self.auto_start || self.update) && self.out.is_none() {
            return Err(UIndexError::MissingOut);
        }

        if let Some(out) = &self.out {
            if (self.auto_start || self.update) && !out.exists() {
                return Err(UIndexError::MissingReferencedOut(out.clone()));
            }
        }

        Ok(())
    }

    pub fn effective_root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| self.path.clone())
    }
}
