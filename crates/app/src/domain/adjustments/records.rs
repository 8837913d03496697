//! Adjustment Records

use std::{fmt, str::FromStr};

use jiff::{SignedDuration, Timestamp};
use repricer::{
    percentage::{Direction, Percentage},
    pricing::PriceFields,
    products::ProductId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{domain::audit::records::AuditEntryUuid, uuids::TypedUuid};

const SECONDS_PER_DAY: i64 = 86_400;

/// Adjustment UUID
pub type AdjustmentUuid = TypedUuid<AdjustmentRecord>;

/// Lifecycle of a temporal adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentState {
    /// Waiting for its start; prices untouched.
    Scheduled,

    /// Adjusted prices are live.
    Active,

    /// Original prices restored. Terminal.
    Finished,
}

impl AdjustmentState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for AdjustmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown adjustment state {0:?}")]
pub struct UnknownAdjustmentState(pub String);

impl FromStr for AdjustmentState {
    type Err = UnknownAdjustmentState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            other => Err(UnknownAdjustmentState(other.to_string())),
        }
    }
}

/// Raised when a window does not start strictly before it ends.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("window start {starts_at} must be before its end {ends_at}")]
pub struct InvalidWindow {
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
}

/// The half-open interval `[starts_at, ends_at)` a temporal adjustment covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalWindow {
    starts_at: Timestamp,
    ends_at: Timestamp,
}

impl TemporalWindow {
    /// Creates a window, rejecting empty or inverted ranges.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWindow`] unless `starts_at < ends_at`.
    pub fn new(starts_at: Timestamp, ends_at: Timestamp) -> Result<Self, InvalidWindow> {
        if starts_at >= ends_at {
            return Err(InvalidWindow { starts_at, ends_at });
        }

        Ok(Self { starts_at, ends_at })
    }

    pub fn starts_at(&self) -> Timestamp {
        self.starts_at
    }

    pub fn ends_at(&self) -> Timestamp {
        self.ends_at
    }

    /// Whether the start has been reached.
    pub fn has_started(&self, now: Timestamp) -> bool {
        now >= self.starts_at
    }

    /// Whether the end has been reached.
    pub fn has_ended(&self, now: Timestamp) -> bool {
        now >= self.ends_at
    }

    /// Length of the window in whole days, rounded up.
    pub fn duration_days(&self) -> i64 {
        let duration: SignedDuration = self.ends_at.duration_since(self.starts_at);
        let seconds = duration.as_secs();
        let partial = seconds % SECONDS_PER_DAY != 0 || duration.subsec_nanos() != 0;

        seconds / SECONDS_PER_DAY + i64::from(partial)
    }
}

/// Prices of one product captured when a temporal adjustment went live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub product_id: ProductId,

    /// Prices before the adjustment; restored on finalisation.
    pub before: PriceFields,

    /// Prices the adjustment wrote.
    pub applied: PriceFields,
}

/// Lifecycle data only temporal adjustments carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalDetails {
    pub window: TemporalWindow,
    pub category: String,
    pub state: AdjustmentState,

    /// Captured at activation; empty while scheduled.
    pub snapshot: Vec<PriceSnapshot>,

    pub activated_at: Option<Timestamp>,
    pub finalized_at: Option<Timestamp>,
}

/// Adjustment Record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRecord {
    pub uuid: AdjustmentUuid,
    pub product_ids: Vec<ProductId>,
    pub percentage: Percentage,
    pub direction: Direction,
    pub description: String,
    pub created_at: Timestamp,
    pub created_by: String,

    /// Audit entry written when the adjustment was applied.
    pub audit_entry: Option<AuditEntryUuid>,

    pub is_reverted: bool,
    pub temporal: Option<TemporalDetails>,
}

impl AdjustmentRecord {
    pub fn is_temporal(&self) -> bool {
        self.temporal.is_some()
    }

    pub fn state(&self) -> Option<AdjustmentState> {
        self.temporal.as_ref().map(|temporal| temporal.state)
    }
}

/// A compare-and-set move between lifecycle states.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    pub uuid: AdjustmentUuid,
    pub from: AdjustmentState,
    pub to: AdjustmentState,
    pub at: Timestamp,

    /// Replaces the stored snapshot when present.
    pub snapshot: Option<Vec<PriceSnapshot>>,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn at(seconds: i64) -> TestResult<Timestamp> {
        Ok(Timestamp::from_second(seconds)?)
    }

    #[test]
    fn window_requires_strict_ordering() -> TestResult {
        let start = at(1_000)?;

        assert!(TemporalWindow::new(start, start).is_err());
        assert!(TemporalWindow::new(at(2_000)?, start).is_err());
        assert!(TemporalWindow::new(start, at(1_001)?).is_ok());

        Ok(())
    }

    #[test]
    fn duration_days_rounds_up() -> TestResult {
        let start = at(0)?;

        assert_eq!(TemporalWindow::new(start, at(SECONDS_PER_DAY)?)?.duration_days(), 1);
        assert_eq!(TemporalWindow::new(start, at(SECONDS_PER_DAY + 1)?)?.duration_days(), 2);
        assert_eq!(TemporalWindow::new(start, at(60)?)?.duration_days(), 1);
        assert_eq!(TemporalWindow::new(start, at(7 * SECONDS_PER_DAY)?)?.duration_days(), 7);

        Ok(())
    }

    #[test]
    fn window_bounds_are_half_open() -> TestResult {
        let window = TemporalWindow::new(at(100)?, at(200)?)?;

        assert!(!window.has_started(at(99)?));
        assert!(window.has_started(at(100)?));
        assert!(!window.has_ended(at(199)?));
        assert!(window.has_ended(at(200)?));

        Ok(())
    }

    #[test]
    fn state_names_round_trip() -> TestResult {
        for state in [
            AdjustmentState::Scheduled,
            AdjustmentState::Active,
            AdjustmentState::Finished,
        ] {
            assert_eq!(state.as_str().parse::<AdjustmentState>()?, state);
        }

        Ok(())
    }
}
