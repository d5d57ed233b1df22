//! Layered configuration for the demo harness.
//!
//! Configuration is loaded in layers, later layers overriding earlier ones:
//!
//! 1. Environment variables (`RENDEZVOUS_*`)
//! 2. TOML configuration file
//! 3. Command-line overrides
//!
//! # Tiger Style
//!
//! - Explicit types: u32 counts, u64 milliseconds
//! - Fixed limits: participants and rounds are bounded
//! - Fail fast: the merged configuration is validated before anything runs

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use rendezvous_barrier::BarrierConfig;
use rendezvous_barrier::BarrierError;
use rendezvous_barrier::RetryPolicy;
use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use snafu::Snafu;

/// Maximum number of participant tasks the demo spawns.
pub const MAX_DEMO_PARTICIPANTS: u32 = 1024;

/// Maximum number of barrier rounds per demo run.
pub const MAX_DEMO_ROUNDS: u32 = 1000;

/// Configuration for one demo run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Barrier root path.
    #[serde(default = "default_barrier_path")]
    pub barrier_path: String,

    /// Participants required to open the barrier.
    #[serde(default = "default_target_count")]
    pub target_count: u32,

    /// Participant tasks to run, each with its own session.
    #[serde(default = "default_participants")]
    pub participants: u32,

    /// Barrier rounds each participant goes through.
    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// Simulated work between enter and leave, in milliseconds.
    #[serde(default = "default_work_ms")]
    pub work_ms: u64,

    /// Bound on `enter`, in milliseconds.
    #[serde(default)]
    pub enter_timeout_ms: Option<u64>,

    /// Bound on `leave`, in milliseconds.
    #[serde(default)]
    pub leave_timeout_ms: Option<u64>,

    /// Retry policy for idempotent coordination operations.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Reject an existing barrier root that stores a different target count.
    #[serde(default)]
    pub validate_existing_count: bool,

    /// Expire one participant's session right after it enters the first round.
    #[serde(default)]
    pub crash_one: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            barrier_path: default_barrier_path(),
            target_count: default_target_count(),
            participants: default_participants(),
            rounds: default_rounds(),
            work_ms: default_work_ms(),
            enter_timeout_ms: None,
            leave_timeout_ms: None,
            retry: RetryPolicy::default(),
            validate_existing_count: false,
            crash_one: false,
        }
    }
}

impl DemoConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        toml::from_str(&content).context(ParseTomlSnafu { path })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables follow the pattern `RENDEZVOUS_<FIELD_NAME>`; retry fields
    /// use `RENDEZVOUS_RETRY_<FIELD_NAME>`.
    pub fn from_env() -> Self {
        let retry_defaults = RetryPolicy::default();
        Self {
            barrier_path: parse_env("RENDEZVOUS_BARRIER_PATH").unwrap_or_else(default_barrier_path),
            target_count: parse_env("RENDEZVOUS_TARGET_COUNT").unwrap_or_else(default_target_count),
            participants: parse_env("RENDEZVOUS_PARTICIPANTS").unwrap_or_else(default_participants),
            rounds: parse_env("RENDEZVOUS_ROUNDS").unwrap_or_else(default_rounds),
            work_ms: parse_env("RENDEZVOUS_WORK_MS").unwrap_or_else(default_work_ms),
            enter_timeout_ms: parse_env("RENDEZVOUS_ENTER_TIMEOUT_MS"),
            leave_timeout_ms: parse_env("RENDEZVOUS_LEAVE_TIMEOUT_MS"),
            retry: RetryPolicy {
                max_attempts: parse_env("RENDEZVOUS_RETRY_MAX_ATTEMPTS").unwrap_or(retry_defaults.max_attempts),
                initial_backoff_ms: parse_env("RENDEZVOUS_RETRY_INITIAL_BACKOFF_MS")
                    .unwrap_or(retry_defaults.initial_backoff_ms),
                max_backoff_ms: parse_env("RENDEZVOUS_RETRY_MAX_BACKOFF_MS").unwrap_or(retry_defaults.max_backoff_ms),
            },
            validate_existing_count: parse_env("RENDEZVOUS_VALIDATE_EXISTING_COUNT").unwrap_or(false),
            crash_one: parse_env("RENDEZVOUS_CRASH_ONE").unwrap_or(false),
        }
    }

    /// Merge another configuration into this one.
    ///
    /// Fields of `other` that differ from their defaults override this
    /// configuration's values. Flags can only be switched on.
    pub fn merge(&mut self, other: Self) {
        if other.barrier_path != default_barrier_path() {
            self.barrier_path = other.barrier_path;
        }
        if other.target_count != default_target_count() {
            self.target_count = other.target_count;
        }
        if other.participants != default_participants() {
            self.participants = other.participants;
        }
        if other.rounds != default_rounds() {
            self.rounds = other.rounds;
        }
        if other.work_ms != default_work_ms() {
            self.work_ms = other.work_ms;
        }
        if other.enter_timeout_ms.is_some() {
            self.enter_timeout_ms = other.enter_timeout_ms;
        }
        if other.leave_timeout_ms.is_some() {
            self.leave_timeout_ms = other.leave_timeout_ms;
        }
        if other.retry != RetryPolicy::default() {
            self.retry = other.retry;
        }
        if other.validate_existing_count {
            self.validate_existing_count = true;
        }
        if other.crash_one {
            self.crash_one = true;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.barrier_config()?;

        if self.participants == 0 || self.participants > MAX_DEMO_PARTICIPANTS {
            return Err(ConfigError::Validation {
                message: format!("participants must be in 1..={MAX_DEMO_PARTICIPANTS}, got {}", self.participants),
            });
        }
        if self.rounds == 0 || self.rounds > MAX_DEMO_ROUNDS {
            return Err(ConfigError::Validation {
                message: format!("rounds must be in 1..={MAX_DEMO_ROUNDS}, got {}", self.rounds),
            });
        }
        if self.participants < self.target_count && self.enter_timeout_ms.is_none() {
            return Err(ConfigError::Validation {
                message: format!(
                    "{} participants can never open a barrier of {} without an enter timeout",
                    self.participants, self.target_count
                ),
            });
        }
        // Later rounds only open and drain cleanly when exactly target_count
        // participants survive the first one.
        let survivors = self.participants - u32::from(self.crash_one);
        if self.rounds > 1 && survivors != self.target_count {
            return Err(ConfigError::Validation {
                message: format!(
                    "{} rounds need exactly {} surviving participants, got {survivors}",
                    self.rounds, self.target_count
                ),
            });
        }
        Ok(())
    }

    /// Build the barrier configuration shared by every participant.
    pub fn barrier_config(&self) -> Result<BarrierConfig, ConfigError> {
        let mut config = BarrierConfig::new(self.barrier_path.clone(), self.target_count)
            .and_then(|config| config.with_retry(self.retry))
            .context(BarrierSnafu)?
            .with_count_validation(self.validate_existing_count);
        if let Some(ms) = self.enter_timeout_ms {
            config = config.with_enter_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.leave_timeout_ms {
            config = config.with_leave_timeout(Duration::from_millis(ms));
        }
        Ok(config)
    }

    pub fn work_duration(&self) -> Duration {
        Duration::from_millis(self.work_ms)
    }
}

fn default_barrier_path() -> String {
    "/doublebarrier".into()
}

fn default_target_count() -> u32 {
    2
}

fn default_participants() -> u32 {
    2
}

fn default_rounds() -> u32 {
    1
}

fn default_work_ms() -> u64 {
    5_000
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}

/// Configuration loading and parsing errors.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("failed to read config file {}: {source}", path.display()))]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[snafu(display("failed to parse TOML config file {}: {source}", path.display()))]
    ParseToml { path: PathBuf, source: toml::de::Error },

    #[snafu(display("invalid barrier settings: {source}"))]
    Barrier { source: BarrierError },

    #[snafu(display("configuration validation failed: {message}"))]
    Validation { message: String },
}
