//! `uindex-create`: scan a directory tree into a checksummed, resumable index.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use uindex::cli::create::CreateArgs;
use uindex::cli::init_tracing;
use uindex::error::{exit_code, UIndexError};
use uindex::indexer::{auto_start_path, load_existing_entries, run_create, CreateConfig};
use uindex::writer::IndexWriter;

fn main() {
    let args = CreateArgs::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => std::process::exit(exit_code::OK),
        Err(err) => {
            error!(error = %err, "uindex-create failed");
            eprintln!("uindex-create: {err}");
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.chain().find_map(|cause| cause.downcast_ref::<UIndexError>()) {
        Some(UIndexError::MutuallyExclusive { .. }) => exit_code::MUTUALLY_EXCLUSIVE_FLAGS,
        Some(UIndexError::MissingOut) => exit_code::MISSING_OUT,
        Some(UIndexError::MissingReferencedOut(_)) => exit_code::MISSING_REFERENCED_OUT,
        _ => 1,
    }
}

fn run(args: &CreateArgs) -> anyhow::Result<()> {
    args.validate().context("invalid flag combination")?;

    let root = args.effective_root();
    let start = resolve_start(args)?;

    let existing = if args.update {
        let out = args.out.as_ref().expect("validated: update requires --out");
        let file = File::open(out).with_context(|| format!("opening {} for --update", out.display()))?;
        Some(load_existing_entries(BufReader::new(file)))
    } else {
        None
    };

    let config = CreateConfig {
        path_to_index: args.out.clone().unwrap_or_else(|| "-".into()),
        scan_path: args.path.clone(),
        root,
        start,
        raw_excludes: args.excludes.clone(),
        include_dotfiles: args.include_dotfiles,
        head: args.head.clone(),
        tail: args.tail.clone(),
        checksum_algo: args.checksum_algo.clone(),
        threads: args.threads,
        sorted: !args.unsorted,
        verbose: args.verbose,
    };

    let stats = match &args.out {
        Some(out_path) => {
            // Any form of resuming (explicit start, auto-start, or update)
            // appends to the existing file rather than truncating it.
            let append = args.start.is_some() || args.auto_start || args.update;
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(append)
                .truncate(!append)
                .open(out_path)
                .with_context(|| format!("opening {} for write", out_path.display()))?;
            let mut writer = IndexWriter::new(file);
            run_create(&config, existing.as_ref(), &mut writer)?
        }
        None => {
            let stdout = io::stdout();
            let mut writer = IndexWriter::new(stdout.lock());
            run_create(&config, existing.as_ref(), &mut writer)?
        }
    };

    info!(
        added = stats.added_count,
        total = stats.total_count,
        errors = stats.error_count,
        "uindex-create finished"
    );
    Ok(())
}

/// Resolve the walker's resume point from `--start`, `--auto-start`, or
/// neither (a fresh run from the top).
fn resolve_start(args: &CreateArgs) -> anyhow::Result<Option<std::path::PathBuf>> {
    if let Some(start) = &args.start {
        return Ok(Some(start.clone()));
    }
    if args.auto_start {
        let out = args.out.as_ref().expect("validated: auto-start requires --out");
        let mut file = File::open(out).with_context(|| format!("opening {} for --auto-start", out.display()))?;
        let tail = read_tail(&mut file, 1000)?;
        return Ok(auto_start_path(&tail, &args.effective_root()));
    }
    Ok(None)
}

fn read_tail(file: &mut File, max_bytes: u64) -> io::Result<Vec<u8>> {
    let len = file.metadata()?.len();
    let start = len.saturating_sub(max_bytes);
    file.seek(SeekFrom::Start(start))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}
