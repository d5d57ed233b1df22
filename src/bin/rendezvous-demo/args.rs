//! CLI argument parsing for rendezvous-demo.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "rendezvous-demo", about = "Run participants through a distributed double barrier")]
pub struct Args {
    /// Path to TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Barrier root path, e.g. "/doublebarrier".
    #[arg(long)]
    pub barrier_path: Option<String>,

    /// Participants required to open the barrier.
    #[arg(long, short = 'n')]
    pub target_count: Option<u32>,

    /// Participant tasks to run, each with its own session.
    #[arg(long, short = 'p')]
    pub participants: Option<u32>,

    /// Barrier rounds each participant goes through.
    #[arg(long)]
    pub rounds: Option<u32>,

    /// Simulated work between enter and leave, in milliseconds.
    #[arg(long)]
    pub work_ms: Option<u64>,

    /// Give up on enter after this many milliseconds.
    #[arg(long)]
    pub enter_timeout_ms: Option<u64>,

    /// Give up on leave after this many milliseconds.
    #[arg(long)]
    pub leave_timeout_ms: Option<u64>,

    /// Attempts per idempotent coordination operation (1 disables retry).
    #[arg(long)]
    pub retry_attempts: Option<u32>,

    /// Fail if an existing barrier root stores a different target count.
    #[arg(long)]
    pub validate_existing_count: bool,

    /// Expire one participant's session right after it enters.
    #[arg(long)]
    pub crash_one: bool,
}
