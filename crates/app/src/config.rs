//! CLI Config

use std::time::Duration;

use clap::Args;
use repricer_app::{context::ServiceOptions, domain::rollback::SegmentPolicy};

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub(crate) struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Database settings.
#[derive(Debug, Args)]
pub(crate) struct DatabaseConfig {
    /// `PostgreSQL` connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,
}

/// Rollback settings.
#[derive(Debug, Args)]
pub(crate) struct RollbackConfig {
    /// What a revert does with a detail segment it cannot apply (skip, strict)
    #[arg(
        long,
        env = "ROLLBACK_SEGMENT_POLICY",
        value_enum,
        default_value_t = SegmentPolicy::SkipMalformed
    )]
    pub segment_policy: SegmentPolicy,
}

impl RollbackConfig {
    pub(crate) fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            segment_policy: self.segment_policy,
        }
    }
}

/// Sweeper settings.
#[derive(Debug, Args)]
pub(crate) struct SweepConfig {
    /// Seconds between sweeps
    #[arg(
        long,
        env = "SWEEP_INTERVAL_SECONDS",
        default_value_t = 60_u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_seconds: u64,
}

impl SweepConfig {
    pub(crate) fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Output settings.
#[derive(Debug, Args)]
pub(crate) struct OutputConfig {
    /// ISO 4217 code used to format amounts
    #[arg(long, env = "CURRENCY", default_value = "ARS")]
    pub currency: String,
}
