//! Shared CLI plumbing for the three binaries.

pub mod create;
pub mod dedupe;
pub mod diff;

/// `-v` verbosity, counted by clap's `action = ArgAction::Count`.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "uindex=warn",
        1 => "uindex=info",
        2 => "uindex=debug",
        _ => "uindex=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
