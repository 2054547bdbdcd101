use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HeraldError;

/// Terminal status of a completed build, ordered from best to worst.
///
/// The derived `Ord` follows declaration order, so `Success < Unstable < Failure
/// < NotBuilt < Aborted` and comparisons never need the explicit rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl Outcome {
    pub const ALL: [Self; 5] = [
        Self::Success,
        Self::Unstable,
        Self::Failure,
        Self::NotBuilt,
        Self::Aborted,
    ];

    /// Severity rank; higher is worse.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Unstable => 1,
            Self::Failure => 2,
            Self::NotBuilt => 3,
            Self::Aborted => 4,
        }
    }

    /// Returns the worse of the two outcomes. Equal ranks are equal values.
    #[must_use]
    pub fn worse_of(self, other: Self) -> Self {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// `true` when `self` is at or below `threshold` in severity.
    pub const fn is_better_or_equal_to(self, threshold: Self) -> bool {
        self.rank() <= threshold.rank()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Unstable => "UNSTABLE",
            Self::Failure => "FAILURE",
            Self::NotBuilt => "NOT_BUILT",
            Self::Aborted => "ABORTED",
        }
    }

    /// Base colour of the status icon, used for chat attachments.
    pub const fn html_color(self) -> &'static str {
        match self {
            Self::Success => "#729FCF",
            Self::Unstable => "#FCE94F",
            Self::Failure => "#EF2929",
            Self::NotBuilt | Self::Aborted => "#888A85",
        }
    }

    /// Outcome whose icon colour is `color`. `NOT_BUILT` and `ABORTED` share
    /// one, so the lesser of the two is returned.
    pub fn from_html_color(color: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|outcome| outcome.html_color().eq_ignore_ascii_case(color))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = HeraldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|outcome| outcome.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| HeraldError::Scenario(format!("Unknown build outcome: {s}")))
    }
}
