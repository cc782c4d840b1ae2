//! `uindex-dedupe`: delete files already present (by content) in a reference index.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use inquire::Confirm;
use tracing::warn;
use uindex::bytesize::format_bytes;
use uindex::cli::dedupe::{auto_confirm, load_reference, resolve_local_path, resolve_matches, DedupeArgs};
use uindex::cli::init_tracing;
use uindex::reader::{iter_entries, PathTransforms};

fn main() -> anyhow::Result<()> {
    let args = DedupeArgs::parse();
    init_tracing(args.verbose);

    let index_file = File::open(&args.index).with_context(|| format!("opening {}", args.index.display()))?;
    let (reference, dupe_bytes, dupe_count) =
        load_reference(BufReader::new(index_file), args.pop_path, args.prepend_path.clone());

    if args.verbose > 0 {
        println!("{} internal dupes (by checksum) across {} files.", format_bytes(dupe_bytes), dupe_count);
    }

    let Some(other_path) = &args.delete_matching else {
        return Ok(());
    };

    let root = args.root.clone().unwrap_or(std::env::current_dir()?);
    let mode = args.match_mode();
    let mut bytes_deleted = 0u64;

    let other_file = File::open(other_path).with_context(|| format!("opening {}", other_path.display()))?;
    let mut other_entries = Vec::new();
    iter_entries(BufReader::new(other_file), &PathTransforms::default(), |e| other_entries.push(e));

    for entry in &other_entries {
        let key = (entry.checksum().to_string(), entry.size);
        let Some(self_entries) = reference.get(&key) else { continue };

        let result = resolve_matches(&entry.path, self_entries, mode, args.minsize);
        if result.matched.len() != result.candidates && result.candidates > 0 {
            // Report one of the entries that did *not* match, not just the
            // alphabetically-first reference entry overall — that one may
            // well be among the matches, which would misreport why the file
            // wasn't fully matched.
            let mut non_matching: Vec<&str> = self_entries
                .iter()
                .filter(|e| !result.matched.iter().any(|m| std::ptr::eq(*m, *e)))
                .map(|e| e.path.as_str())
                .collect();
            non_matching.sort();
            println!(
                "{} in both at {} non-matching path(s) (of {}):",
                entry.raw_checksum,
                result.candidates - result.matched.len(),
                result.candidates
            );
            println!("\text: {}", entry.path);
            if let Some(first) = non_matching.first() {
                println!("\tint: {first}");
            }
        }

        for matched in &result.matched {
            bytes_deleted += entry.size;
            if args.verbose > 0 {
                println!("{}; {} at {}", format_bytes(bytes_deleted), entry.raw_checksum, matched.path);
            }

            let abspath = resolve_local_path(&root, matched);
            if !abspath.exists() {
                if args.verbose > 0 {
                    println!("Cannot find local file:\n\t{}", abspath.display());
                }
                continue;
            }

            if should_delete(&abspath, args.yes, args.dry_run, args.verbose)? {
                if args.verbose > 0 {
                    println!("\t$ rm {}", abspath.display());
                }
                if !args.dry_run {
                    if let Err(e) = std::fs::remove_file(&abspath) {
                        warn!(path = %abspath.display(), error = %e, "failed to delete matched file");
                    }
                }
            }
        }
    }

    Ok(())
}

fn should_delete(path: &Path, yes: bool, dry_run: bool, verbose: u8) -> anyhow::Result<bool> {
    if auto_confirm(yes, dry_run, verbose) {
        return Ok(true);
    }
    Ok(Confirm::new(&format!("Delete {}?", path.display())).with_default(true).prompt().unwrap_or(false))
}
