use std::sync::{Arc, OnceLock, Weak};

use crate::error::{HeraldError, Result};
use crate::outcome::Outcome;
use crate::ownership::{Container, HasContainer};

use super::Job;

/// One execution of a job.
///
/// The outcome is absent while the build runs and can be set exactly once.
/// The predecessor is held weakly; the job's history owns every build.
#[derive(Debug)]
pub struct Build {
    number: u32,
    job: Weak<Job>,
    previous: Option<Weak<Build>>,
    outcome: OnceLock<Outcome>,
}

impl Build {
    pub(super) fn new(number: u32, job: Weak<Job>, previous: Option<Weak<Self>>) -> Self {
        Self {
            number,
            job,
            previous,
            outcome: OnceLock::new(),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn job(&self) -> Option<Arc<Job>> {
        self.job.upgrade()
    }

    /// The build before this one, while its job still holds it.
    pub fn previous(&self) -> Option<Arc<Self>> {
        self.previous.as_ref().and_then(Weak::upgrade)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome.get().copied()
    }

    pub fn is_building(&self) -> bool {
        self.outcome.get().is_none()
    }

    /// Records the outcome of a finished build.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::AlreadyCompleted`] if an outcome was already set.
    pub fn complete(&self, outcome: Outcome) -> Result<()> {
        self.outcome
            .set(outcome)
            .map_err(|_| HeraldError::AlreadyCompleted(self.full_display_name()))
    }

    /// `<job full name> #<number>`, or `#<number>` once the job is gone.
    pub fn full_display_name(&self) -> String {
        match self.job() {
            Some(job) => format!("{} #{}", job.full_name(), self.number),
            None => format!("#{}", self.number),
        }
    }

    /// Relative URL of the build page.
    pub fn url(&self) -> String {
        let job_url = self.job().map(|job| job.url()).unwrap_or_default();
        format!("{job_url}{}/", self.number)
    }
}

impl HasContainer for Build {
    fn container(&self) -> Option<Container> {
        self.job().map(Container::Job)
    }
}
