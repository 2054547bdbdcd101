use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;

use crate::ownership::TopLevelItem;

/// A named, dynamically-membered grouping of top-level items.
#[derive(Debug)]
pub struct View {
    name: String,
    items: RwLock<Vec<TopLevelItem>>,
}

impl View {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            items: RwLock::new(Vec::new()),
        })
    }

    pub fn display_name(&self) -> &str {
        &self.name
    }

    pub fn add_item(&self, item: TopLevelItem) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
    }

    pub fn remove_item(&self, item: &TopLevelItem) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|listed| !listed.is_same(item));
    }

    /// Current membership. Callers must not cache this across observations.
    pub fn items(&self) -> Vec<TopLevelItem> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `true` when `item` is listed directly or nested inside a listed folder.
    pub fn contains(&self, item: &TopLevelItem) -> bool {
        self.items().iter().any(|listed| listed.contains(item))
    }
}

/// The build server as seen by the notifier: its views, in registration order.
#[derive(Debug, Default)]
pub struct Instance {
    views: RwLock<IndexMap<String, Arc<View>>>,
}

impl Instance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a view, replacing any view with the same display name.
    pub fn add_view(&self, view: Arc<View>) {
        self.views
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(view.display_name().to_string(), view);
    }

    #[cfg(test)]
    pub fn remove_view(&self, name: &str) -> Option<Arc<View>> {
        self.views
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(name)
    }

    pub fn view(&self, name: &str) -> Option<Arc<View>> {
        self.views
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn views(&self) -> Vec<Arc<View>> {
        self.views
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn views_containing(&self, item: &TopLevelItem) -> Vec<Arc<View>> {
        self.views()
            .into_iter()
            .filter(|view| view.contains(item))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Folder, Job};

    #[test]
    fn view_contains_jobs_nested_in_listed_folders() {
        let folder = Folder::new("platform");
        let job = Job::in_folder("api", &folder);
        let view = View::new("Platform");
        view.add_item(TopLevelItem::Folder(folder));

        assert!(view.contains(&TopLevelItem::Job(job)));
    }

    #[test]
    fn removed_item_is_no_longer_contained() {
        let job = TopLevelItem::Job(Job::standalone("api"));
        let view = View::new("All");
        view.add_item(job.clone());
        view.remove_item(&job);

        assert!(!view.contains(&job));
    }

    #[test]
    fn views_containing_keeps_registration_order() {
        let job = TopLevelItem::Job(Job::standalone("api"));
        let instance = Instance::new();
        for name in ["zeta", "alpha", "other"] {
            let view = View::new(name);
            if name != "other" {
                view.add_item(job.clone());
            }
            instance.add_view(view);
        }

        let names: Vec<_> = instance
            .views_containing(&job)
            .iter()
            .map(|v| v.display_name().to_string())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn add_view_replaces_same_name() {
        let instance = Instance::new();
        instance.add_view(View::new("All"));
        let replacement = View::new("All");
        instance.add_view(replacement.clone());

        assert_eq!(instance.views().len(), 1);
        assert!(Arc::ptr_eq(&instance.view("All").unwrap(), &replacement));
        assert!(instance.remove_view("All").is_some());
        assert!(instance.views().is_empty());
    }
}
