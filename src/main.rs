// activity-log - main.rs
// Host-side runner: resolves the log path, replays or records lifecycle events

use clap::Parser;
use std::process::exit;
use user_activity_log::cli::{run, Cli};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("activity-log: {e:#}");
        exit(1);
    }
}
