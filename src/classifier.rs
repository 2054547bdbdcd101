use std::fmt;

use serde::{Deserialize, Serialize};

use crate::host::Build;
use crate::outcome::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionClass {
    FirstFailure,
    StillFailing,
    Recovered,
    None,
}

impl TransitionClass {
    /// Human-readable verb used in notifications; `None` has no verb.
    pub const fn verb(self) -> Option<&'static str> {
        match self {
            Self::FirstFailure => Some("first failure"),
            Self::StillFailing => Some("still failing"),
            Self::Recovered => Some("recovered"),
            Self::None => None,
        }
    }
}

/// The change between a build's outcome and the outcome before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub previous: Option<Outcome>,
    pub current: Outcome,
    pub class: TransitionClass,
}

impl Transition {
    pub fn is_notable(&self) -> bool {
        self.class != TransitionClass::None
    }

    /// Status phrase such as `status is still *FAILURE*`.
    pub fn status_text(&self) -> String {
        match self.class {
            TransitionClass::StillFailing => format!("status is still *{}*", self.current),
            TransitionClass::Recovered => format!("status is back to *{}*", self.current),
            TransitionClass::FirstFailure | TransitionClass::None => {
                format!("status is *{}*", self.current)
            }
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class.verb() {
            Some(verb) => write!(f, "{verb}, {}", self.status_text()),
            None => f.write_str(&self.status_text()),
        }
    }
}

/// Whether a single build counts as failed. Broader than the set of outcomes
/// that take part in view aggregation.
pub const fn is_failure_like(outcome: Outcome) -> bool {
    matches!(
        outcome,
        Outcome::Unstable | Outcome::Failure | Outcome::NotBuilt | Outcome::Aborted
    )
}

/// Classifies `current` against the outcome that preceded it.
pub fn classify_outcomes(previous: Option<Outcome>, current: Outcome) -> Transition {
    let failed = is_failure_like(current);

    let class = match previous {
        None if failed => TransitionClass::FirstFailure,
        None => TransitionClass::None,
        Some(prev) => match (is_failure_like(prev), failed) {
            (true, true) if prev == current => TransitionClass::StillFailing,
            (true, false) => TransitionClass::Recovered,
            (false, true) => TransitionClass::FirstFailure,
            // Both green, or two different kinds of failure.
            _ => TransitionClass::None,
        },
    };

    Transition {
        previous,
        current,
        class,
    }
}

/// Classifies a completed build against its predecessor. A predecessor that
/// is still running counts as absent. Returns `None` while `build` runs.
pub fn classify(build: &Build) -> Option<Transition> {
    let current = build.outcome()?;
    let previous = build.previous().and_then(|prev| prev.outcome());
    Some(classify_outcomes(previous, current))
}
