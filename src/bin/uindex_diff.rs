//! `uindex-diff`: compare two indexes as sorted path streams.

use std::fs::File;
use std::io::BufReader;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use uindex::cli::diff::{diff_entries, DiffArgs};
use uindex::cli::init_tracing;
use uindex::entry::Entry;
use uindex::reader::{iter_entries, PathTransforms};

fn main() -> anyhow::Result<()> {
    let args = DiffArgs::parse();
    init_tracing(args.verbose);

    let a = read_entries(&args.a, &args.transforms_a()?)?;
    let b = read_entries(&args.b, &args.transforms_b()?)?;

    let outcome = diff_entries(a, b, args.ignore_links);

    for line in &outcome.lines {
        let rendered = format!("{} {} {}", line.marker, line.checksum, line.path);
        match line.marker {
            '-' => println!("{}", rendered.red()),
            '+' => println!("{}", rendered.green()),
            '@' => println!("{}", rendered.yellow()),
            _ => println!("{rendered}"),
        }
    }

    println!("{} match, {} missing, {} extra.", outcome.matches, outcome.missing, outcome.extra);
    Ok(())
}

fn read_entries(path: &std::path::Path, transforms: &PathTransforms) -> anyhow::Result<Vec<Entry>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut out = Vec::new();
    iter_entries(BufReader::new(file), transforms, |entry| out.push(entry));
    Ok(out)
}
