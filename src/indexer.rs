//! Orchestrator: wires the walker, hash cache, hasher, ordered parallel map,
//! and writer together into one `create` run.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entry::{AlgoKey, Entry, ScanEnd, ScanError, ScanStart, TypeCode};
use crate::error::{Result, UIndexError};
use crate::excludes::CompiledExcludes;
use crate::hash_cache::{CacheKey, HashCache};
use crate::hasher::{self, HashBudget, HashOutcome};
use crate::parallel_map::ordered_parallel_map;
use crate::reader::{iter_entries, PathTransforms};
use crate::walker::{self, WalkItem, WalkKind};
use crate::writer::IndexWriter;

pub struct CreateConfig {
    pub path_to_index: PathBuf,
    /// Directory the walker descends from.
    pub scan_path: PathBuf,
    /// Root relative paths (and exclude path-matchers) are computed against;
    /// defaults to `scan_path` but may differ when `-C/--root` names an
    /// ancestor of `scan_path`.
    pub root: PathBuf,
    pub start: Option<PathBuf>,
    pub raw_excludes: Vec<String>,
    pub include_dotfiles: bool,
    pub head: Option<String>,
    pub tail: Option<String>,
    pub checksum_algo: String,
    pub threads: usize,
    pub sorted: bool,
    pub verbose: u8,
}

#[derive(Default)]
pub struct CreateStats {
    pub added_count: u64,
    pub added_bytes: u64,
    pub total_count: u64,
    pub total_bytes: u64,
    pub error_count: u64,
}

/// `path -> prior entry`, used by `--update` to skip unchanged files.
pub type ExistingEntryMap = HashMap<String, Entry>;

/// Parse an existing index into a lookup keyed by relative path. Only the
/// last entry for a given path is kept, matching an appended/updated index.
pub fn load_existing_entries(lines: impl BufRead) -> ExistingEntryMap {
    let mut map = ExistingEntryMap::new();
    iter_entries(lines, &PathTransforms::default(), |entry| {
        map.insert(entry.path.clone(), entry);
    });
    map
}

/// Derive the resume path from the tail of an existing sorted index: the
/// last non-empty line's final tab-separated field (the `path` column).
pub fn auto_start_path(tail_bytes: &[u8], root: &Path) -> Option<PathBuf> {
    let text = String::from_utf8_lossy(tail_bytes);
    let last_line = text.lines().rev().find(|l| !l.trim().is_empty())?;
    let rel_path = last_line.rsplit('\t').next()?;
    Some(root.join(rel_path))
}

/// Number of subsecond decimal digits that survive a 53-bit mantissa at the
/// current epoch magnitude, per the legacy format's float precision.
pub fn time_digits(now: f64) -> i32 {
    let magnitude = now.floor().max(1.0).log2();
    (((53.0 - magnitude) / 10f64.log2()).floor()) as i32
}

fn format_time(value: f64, digits: i32) -> String {
    format!("{:.*}", digits.max(0) as usize, value)
}

pub fn run_create<W: Write>(
    config: &CreateConfig,
    existing: Option<&ExistingEntryMap>,
    writer: &mut IndexWriter<W>,
) -> Result<CreateStats> {
    crate::digest::new_hasher(&config.checksum_algo)?;
    if let Some(h) = &config.head {
        crate::bytesize::parse_bytes(h)?;
    }
    if let Some(t) = &config.tail {
        crate::bytesize::parse_bytes(t)?;
    }

    let excludes = CompiledExcludes::compile(&config.raw_excludes, config.include_dotfiles)?;
    let budget = HashBudget { head: config.head.clone(), tail: config.tail.clone() };
    let algo_key = hasher::algo_key(&config.checksum_algo, &budget);
    let cache = Arc::new(HashCache::new());
    let digits = time_digits(now_secs());

    let uuid = Uuid::new_v4().to_string();
    let started_at = Utc::now().to_rfc3339();

    let header = ScanStart {
        path_to_index: config.path_to_index.to_string_lossy().into_owned(),
        root: config.root.to_string_lossy().into_owned(),
        start: config.start.as_ref().map(|p| p.to_string_lossy().into_owned()),
        started_at,
        uuid: uuid.clone(),
        excludes: config.raw_excludes.clone(),
        checksum_algo: config.checksum_algo.clone(),
        head: config.head.clone(),
        tail: config.tail.clone(),
        columns: crate::entry::DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect(),
        cli: {
            let mut cli = serde_json::Map::new();
            // Per the open question in the error-handling design: broadened
            // from exactly EPERM to any permission-class read error, recorded
            // here so a reader of this index knows which policy produced it.
            cli.insert(
                "unreadable_errno_policy".to_string(),
                serde_json::Value::String("permission-class".to_string()),
            );
            cli
        },
    };
    writer.write_scan_start(&header)?;

    let start_stack = walker::resume_stack(&config.scan_path, config.start.as_deref());

    // The walker runs on its own thread and feeds a bounded channel; the
    // ordered parallel map drains that channel directly instead of a fully
    // materialized `Vec`, so memory stays O(threads) in flight rather than
    // O(tree size) — see DESIGN.md on the streaming producer.
    let queue_capacity = config.threads.max(1) * 2;
    let (item_tx, item_rx) = bounded::<WalkItem>(queue_capacity);

    let root = config.root.clone();
    let algo = config.checksum_algo.clone();
    let cache_for_workers = Arc::clone(&cache);
    let algo_key_string = algo_key.to_key_string();

    let progress = progress_bar(config.verbose);
    let progress_for_rows = progress.clone();
    let mut error_count = 0u64;

    let (worker_result, walk_result) = std::thread::scope(|scope| {
        // `move` so `item_tx` is owned by this thread alone and drops (closing
        // the channel) as soon as the walk finishes, whether it ran to
        // completion or bailed out early on a send error.
        let walk_handle = scope.spawn(move || -> Result<CreateStats> {
            let mut local = CreateStats::default();
            let outcome = walker::walk(&config.scan_path, &config.root, &start_stack, &excludes, &mut |item| {
                if !matches!(item.kind, WalkKind::Regular | WalkKind::Symlink) {
                    return Ok(());
                }
                local.total_count += 1;
                local.total_bytes += item.stat.size;

                let rel_path = rel_path_string(&item, &config.root);
                if let Some(existing) = existing {
                    if let Some(prior) = existing.get(&rel_path) {
                        if prior.size == item.stat.size && (prior.mtime - item.stat.mtime).abs() < prior.epsilon() {
                            return Ok(());
                        }
                    }
                }

                local.added_count += 1;
                local.added_bytes += item.stat.size;
                item_tx.send(item).map_err(|_| UIndexError::Cancelled)
            });
            match outcome {
                Ok(()) | Err(UIndexError::Cancelled) => Ok(local),
                Err(e) => Err(e),
            }
        });

        let worker_result = ordered_parallel_map(
            item_rx,
            config.threads,
            config.sorted,
            move |item: WalkItem| -> std::result::Result<HashResult, (WalkItem, std::io::Error)> {
                let cache_key = CacheKey { dev: item.stat.dev, ino: item.stat.ino, algo_key: algo_key_string.clone() };
                if let Some(digest) = cache_for_workers.get(&cache_key, item.stat.ctime) {
                    return Ok(HashResult::Digest(item, digest, algo_key_string.clone()));
                }
                match hasher::hash_item(&item, &algo, &budget) {
                    Ok(HashOutcome::Digest(digest)) => {
                        cache_for_workers.insert(cache_key, digest.clone(), item.stat.ctime);
                        Ok(HashResult::Digest(item, digest, algo_key_string.clone()))
                    }
                    // EPERM is recorded as a per-item #scan-error and the run
                    // continues (it never reaches the Err/abort path below).
                    Ok(HashOutcome::Unreadable) => {
                        let msg = std::io::Error::from_raw_os_error(libc::EPERM).to_string();
                        Ok(HashResult::Unreadable(item, msg))
                    }
                    Err(UIndexError::Io(e)) => Err((item, e)),
                    Err(other) => Err((item, std::io::Error::other(other.to_string()))),
                }
            },
            |result: HashResult| -> std::result::Result<(), (WalkItem, std::io::Error)> {
                match result {
                    HashResult::Digest(item, digest, algo_key_string) => {
                        let rel_path = rel_path_string(&item, &root);
                        let raw_checksum = format!("{algo_key_string}:{digest}");
                        let type_char = match item.kind {
                            WalkKind::Regular => TypeCode::Regular.as_char(),
                            WalkKind::Symlink => TypeCode::Symlink.as_char(),
                            _ => unreachable!(),
                        };
                        writer
                            .write_row(
                                &raw_checksum,
                                Some(item.stat.ino),
                                type_char,
                                item.stat.mode & 0o7777,
                                item.stat.size,
                                item.stat.uid,
                                item.stat.gid,
                                &format_time(item.stat.mtime, digits),
                                &format_time(item.stat.ctime, digits),
                                &rel_path,
                            )
                            .map_err(|e| (item, std::io::Error::other(e.to_string())))?;
                        progress_for_rows.inc(1);
                    }
                    HashResult::Unreadable(item, msg) => {
                        error_count += 1;
                        let rel_path = rel_path_string(&item, &root);
                        if let Err(e) = writer.write_scan_error(&ScanError { path: rel_path, error: msg }) {
                            warn!(error = %e, "failed to write scan-error record");
                        }
                    }
                }
                Ok(())
            },
        );

        let walk_result = walk_handle
            .join()
            .unwrap_or_else(|_| Err(UIndexError::Worker("walker thread panicked".to_string())));

        (worker_result, walk_result)
    });

    let mut stats = walk_result?;
    stats.error_count = error_count;

    if let Err((item, source)) = worker_result {
        return Err(UIndexError::Unreadable { path: item.full_path(), source });
    }
    progress.finish_and_clear();

    writer.write_scan_end(&ScanEnd {
        added_count: stats.added_count,
        added_bytes: stats.added_bytes,
        total_count: stats.total_count,
        total_bytes: stats.total_bytes,
        error_count: stats.error_count,
        ended_at: Utc::now().to_rfc3339(),
        uuid,
    })?;

    info!(added = stats.added_count, total = stats.total_count, errors = stats.error_count, "scan complete");
    Ok(stats)
}

/// One hashed item's outcome, fed through the ordered parallel map as `Ok` in
/// both cases — an unreadable (`EPERM`) file is not a run-aborting error, it
/// is a `#scan-error` record that the run continues past.
enum HashResult {
    Digest(WalkItem, String, String),
    Unreadable(WalkItem, String),
}

fn rel_path_string(item: &WalkItem, root: &Path) -> String {
    item.full_path()
        .strip_prefix(root)
        .unwrap_or(&item.full_path())
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/")
}

/// A hashing progress spinner, shown on stderr when `-v/--verbose` was given
/// at least once; hidden (but still a valid, zero-cost sink) otherwise. The
/// total item count isn't known ahead of time since the walker streams
/// items rather than being collected upfront, so this counts up rather than
/// showing a fraction.
fn progress_bar(verbose: u8) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if verbose == 0 {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    } else if let Ok(style) = ProgressStyle::with_template("{spinner} {pos} files hashed") {
        bar.set_style(style);
    }
    bar
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Compile an `AlgoKey` into its canonical string for logging/debugging.
pub fn describe_algo_key(key: &AlgoKey) -> String {
    key.to_key_string()
}
