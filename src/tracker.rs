use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::aggregator::compute_aggregate;
use crate::error::Result;
use crate::host::{Build, Instance, View};
use crate::outcome::Outcome;
use crate::ownership::resolve_top_level_owner;

/// A view's aggregate moved from `old` to `new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewChange {
    pub view: String,
    pub old: Outcome,
    pub new: Outcome,
}

/// Receives view changes synchronously, on the thread that observed them.
///
/// Changes reach listeners in the order the baselines moved. Listeners must
/// not call back into the tracker that notifies them.
pub trait ViewListener: Send + Sync {
    fn view_changed(&self, change: &ViewChange) -> Result<()>;
}

/// Remembers the last aggregate of every view it has seen and reports changes.
///
/// Baselines are keyed by display name and are only created when a build
/// starts; a completion for a view with no baseline fires nothing.
#[derive(Default)]
pub struct ViewTracker {
    results: Mutex<HashMap<String, Outcome>>,
    /// Held from the baseline update until every listener has run.
    fan_out: Mutex<()>,
    listeners: RwLock<Vec<Arc<dyn ViewListener>>>,
}

impl ViewTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Listeners are notified in registration order.
    pub fn add_view_listener(&self, listener: Arc<dyn ViewListener>) -> &Self {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
        self
    }

    /// Observes every view the build belongs to.
    ///
    /// A build whose owner cannot be resolved belongs to no view for this
    /// cycle; that is logged and otherwise ignored.
    pub fn track_views(&self, instance: &Instance, build: &Build) -> Vec<ViewChange> {
        let Some(owner) = resolve_top_level_owner(build) else {
            warn!(
                "{} is not reachable from any top-level item, skipping view tracking",
                build.full_display_name()
            );
            return Vec::new();
        };

        debug!(
            "{} belongs to {}",
            build.full_display_name(),
            owner.full_name()
        );
        let in_progress = build.is_building();
        instance
            .views_containing(&owner)
            .iter()
            .filter_map(|view| self.observe(view, in_progress))
            .collect()
    }

    /// Records a baseline when a build starts, or diffs against it when one
    /// completes. Returns the change that was fired, if any.
    pub fn observe(&self, view: &View, in_progress: bool) -> Option<ViewChange> {
        let key = view.display_name();
        let mut results = self.results.lock().unwrap_or_else(PoisonError::into_inner);

        if in_progress {
            if !results.contains_key(key) {
                let baseline = compute_aggregate(view);
                debug!("Baseline for view {key} is {baseline}");
                results.insert(key.to_string(), baseline);
            }
            return None;
        }

        let new = compute_aggregate(view);
        let old = results.get_mut(key)?;
        if *old == new {
            return None;
        }

        let change = ViewChange {
            view: key.to_string(),
            old: *old,
            new,
        };
        *old = new;
        let _fan_out = self.fan_out.lock().unwrap_or_else(PoisonError::into_inner);
        drop(results);

        self.fire_view_changed(&change);
        Some(change)
    }

    fn fire_view_changed(&self, change: &ViewChange) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for listener in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.view_changed(change))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("View listener failed for {}: {e}", change.view),
                Err(_) => warn!("View listener panicked for {}", change.view),
            }
        }
    }

    #[cfg(test)]
    pub fn baseline(&self, view: &str) -> Option<Outcome> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(view)
            .copied()
    }

    /// Forgets every baseline.
    pub fn disable(&self) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
