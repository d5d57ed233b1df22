//! Configuration loading for rendezvous-demo.

use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use rendezvous::config::DemoConfig;
use rendezvous_barrier::RetryPolicy;
use tracing_subscriber::EnvFilter;

use crate::args::Args;

/// Initialize tracing subscriber with environment-based filtering.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

/// Build the CLI override layer.
///
/// Unset arguments keep their defaults so they do not override lower layers.
pub fn build_overrides(args: &Args) -> DemoConfig {
    let defaults = DemoConfig::default();
    DemoConfig {
        barrier_path: args.barrier_path.clone().unwrap_or(defaults.barrier_path),
        target_count: args.target_count.unwrap_or(defaults.target_count),
        participants: args.participants.unwrap_or(defaults.participants),
        rounds: args.rounds.unwrap_or(defaults.rounds),
        work_ms: args.work_ms.unwrap_or(defaults.work_ms),
        enter_timeout_ms: args.enter_timeout_ms,
        leave_timeout_ms: args.leave_timeout_ms,
        retry: args.retry_attempts.map(RetryPolicy::with_attempts).unwrap_or_default(),
        validate_existing_count: args.validate_existing_count,
        crash_one: args.crash_one,
    }
}

/// Load configuration from all layers and validate the result.
///
/// 1. Environment variables
/// 2. TOML file (if provided)
/// 3. Overrides (typically from CLI args)
pub fn load_config(toml_path: Option<&Path>, overrides: DemoConfig) -> Result<DemoConfig> {
    let mut config = DemoConfig::from_env();

    if let Some(path) = toml_path {
        let toml_config =
            DemoConfig::from_toml_file(path).with_context(|| format!("failed to load config from {}", path.display()))?;
        config.merge(toml_config);
    }

    config.merge(overrides);
    config.validate().context("configuration validation failed")?;

    Ok(config)
}
