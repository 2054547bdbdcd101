use std::sync::Arc;

use log::{debug, info, warn};

use crate::classifier::{classify, classify_outcomes, Transition};
use crate::config::{Config, NotifyConfig};
use crate::delivery::{Delivery, Notification};
use crate::error::Result;
use crate::host::{Build, Instance};
use crate::tracker::{ViewChange, ViewListener, ViewTracker};

/// Turns transitions into notifications and hands them to the delivery
/// transport. Never fails: delivery errors are logged and dropped.
pub struct Dispatcher {
    delivery: Arc<dyn Delivery>,
    root_url: String,
    room: Option<String>,
    use_all_mentions: bool,
}

impl Dispatcher {
    pub fn new(config: &Config, delivery: Arc<dyn Delivery>) -> Self {
        Self {
            delivery,
            root_url: config.webhook.root_url.clone(),
            room: config.webhook.room.clone(),
            use_all_mentions: config.notify.all_mentions,
        }
    }

    /// Sends one notification for a notable build transition.
    pub fn dispatch_build(&self, build: &Build, transition: &Transition) {
        if !transition.is_notable() {
            debug!("No notification for {}", build.full_display_name());
            return;
        }

        let run_name = build.full_display_name();
        let notification = Notification {
            text: format!("Build *{run_name}*: {transition}"),
            run_url: format!("{}{}", self.root_url, build.url()),
            color: transition.current.html_color().to_string(),
            run_name,
        };
        self.send(&notification);
    }

    /// Sends one notification for a view whose aggregate changed.
    pub fn dispatch_view(&self, change: &ViewChange) {
        let verb = classify_outcomes(Some(change.old), change.new)
            .class
            .verb()
            .unwrap_or("changed");

        let notification = Notification {
            text: format!(
                "view/{}: {verb} ({} -> {})",
                change.view, change.old, change.new
            ),
            run_url: format!("{}view/{}/", self.root_url, change.view),
            color: change.new.html_color().to_string(),
            run_name: change.view.clone(),
        };
        self.send(&notification);
    }

    fn send(&self, notification: &Notification) {
        info!(
            "Notifying {}/{} '{}'",
            self.delivery.describe(),
            self.room.as_deref().unwrap_or("-"),
            notification.text
        );

        if let Err(e) = self.delivery.send(notification, self.use_all_mentions) {
            warn!("Rocket.Chat notification failed: {e}");
        }
    }
}

impl ViewListener for Dispatcher {
    fn view_changed(&self, change: &ViewChange) -> Result<()> {
        self.dispatch_view(change);
        Ok(())
    }
}

/// Entry point for host build-lifecycle callbacks.
pub struct Notifier {
    toggles: NotifyConfig,
    dispatcher: Arc<Dispatcher>,
    tracker: ViewTracker,
    instance: Arc<Instance>,
}

impl Notifier {
    pub fn new(config: &Config, delivery: Arc<dyn Delivery>, instance: Arc<Instance>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(config, delivery));
        let tracker = ViewTracker::new();
        tracker.add_view_listener(dispatcher.clone());

        Self {
            toggles: config.notify.clone(),
            dispatcher,
            tracker,
            instance,
        }
    }

    #[cfg(test)]
    pub fn tracker(&self) -> &ViewTracker {
        &self.tracker
    }

    /// A build has started. Only view baselines are affected.
    pub fn on_started(&self, build: &Build) {
        self.track(build);
    }

    /// A build has completed: notify on its own transition, then on any view
    /// whose aggregate it changed.
    pub fn on_completed(&self, build: &Build) {
        if self.toggles.builds {
            match classify(build) {
                Some(transition) => self.dispatcher.dispatch_build(build, &transition),
                None => warn!(
                    "{} reported as completed without an outcome",
                    build.full_display_name()
                ),
            }
        }
        self.track(build);
    }

    fn track(&self, build: &Build) {
        if self.toggles.views {
            self.tracker.track_views(&self.instance, build);
        } else {
            self.tracker.disable();
        }
    }
}
