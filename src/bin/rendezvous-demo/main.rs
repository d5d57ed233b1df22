//! rendezvous-demo: run participants through a distributed double barrier.
//!
//! Creates an in-process deterministic coordination service, gives every
//! participant task its own session and runs `init → enter → work → leave`
//! for the configured number of rounds, then releases the barrier.
//!
//! Configuration layers: Environment < TOML < CLI args.
//!
//! # Usage
//!
//! ```bash
//! # Two participants, one round (the defaults)
//! rendezvous-demo
//!
//! # Five participants, three rounds, short work phase
//! rendezvous-demo -n 5 -p 5 --rounds 3 --work-ms 200
//!
//! # Crash one participant after it entered
//! rendezvous-demo -n 3 -p 3 --crash-one
//!
//! # Environment variables
//! export RENDEZVOUS_TARGET_COUNT=4
//! rendezvous-demo --config demo.toml
//! ```

mod args;
mod config;
mod runner;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::args::Args;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_tracing();

    let args = Args::parse();
    let demo = config::load_config(args.config.as_deref(), config::build_overrides(&args))?;
    info!(
        path = %demo.barrier_path,
        target = demo.target_count,
        participants = demo.participants,
        rounds = demo.rounds,
        "starting double barrier demo"
    );

    tokio::select! {
        result = runner::run(&demo) => match result {
            Ok(report) => {
                info!(completed = report.completed, crashed = report.crashed, "demo finished");
                Ok(())
            }
            Err(err) => {
                error!("demo failed: {err:#}");
                Err(err)
            }
        },
        _ = signal::ctrl_c() => {
            warn!("interrupted, exiting");
            Ok(())
        }
    }
}
