//! Rollback segment policy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a revert does with a detail segment it cannot apply.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SegmentPolicy {
    /// Log the segment, skip it and restore the rest.
    #[default]
    #[value(name = "skip")]
    SkipMalformed,

    /// Abort the revert before writing anything.
    Strict,
}

impl SegmentPolicy {
    pub fn is_strict(self) -> bool {
        self == Self::Strict
    }
}

impl fmt::Display for SegmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SkipMalformed => "skip",
            Self::Strict => "strict",
        })
    }
}
