//! In-memory model of the build server the notifier is attached to.
//!
//! Items form a tree: folders hold folders and jobs, multi-configuration jobs
//! hold configuration jobs, jobs hold builds. Children keep their parent only
//! through a `Weak` link so that removing a parent really drops it.

mod build;
mod view;

use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::ownership::{Container, HasContainer, TopLevelItem};

pub use build::Build;
pub use view::{Instance, View};

#[derive(Debug)]
pub struct Folder {
    name: String,
    parent: Option<Weak<Folder>>,
    items: RwLock<Vec<TopLevelItem>>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            parent: None,
            items: RwLock::new(Vec::new()),
        })
    }

    /// Creates a folder inside `parent` and registers it there.
    pub fn nested(name: impl Into<String>, parent: &Arc<Self>) -> Arc<Self> {
        let folder = Arc::new(Self {
            name: name.into(),
            parent: Some(Arc::downgrade(parent)),
            items: RwLock::new(Vec::new()),
        });
        parent.add_item(TopLevelItem::Folder(folder.clone()));
        folder
    }

    pub fn full_name(&self) -> String {
        match self.parent.as_ref().and_then(Weak::upgrade) {
            Some(parent) => format!("{}/{}", parent.full_name(), self.name),
            None => self.name.clone(),
        }
    }

    pub fn add_item(&self, item: TopLevelItem) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
    }

    pub fn items(&self) -> Vec<TopLevelItem> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn all_jobs(&self) -> Vec<Arc<Job>> {
        self.items()
            .iter()
            .flat_map(TopLevelItem::all_jobs)
            .collect()
    }
}

#[derive(Debug, Clone)]
enum JobParent {
    Folder(Weak<Folder>),
    /// Configurations belong to a multi-configuration job.
    Job(Weak<Job>),
}

/// A build-producing entity.
#[derive(Debug)]
pub struct Job {
    name: String,
    parent: Option<JobParent>,
    builds: RwLock<Vec<Arc<Build>>>,
    configurations: RwLock<Vec<Arc<Job>>>,
}

impl Job {
    fn build_with(name: String, parent: Option<JobParent>) -> Arc<Self> {
        Arc::new(Self {
            name,
            parent,
            builds: RwLock::new(Vec::new()),
            configurations: RwLock::new(Vec::new()),
        })
    }

    /// A top-level job living directly on the instance.
    pub fn standalone(name: impl Into<String>) -> Arc<Self> {
        Self::build_with(name.into(), None)
    }

    /// A top-level job inside `folder`; registers itself in the folder.
    pub fn in_folder(name: impl Into<String>, folder: &Arc<Folder>) -> Arc<Self> {
        let job = Self::build_with(name.into(), Some(JobParent::Folder(Arc::downgrade(folder))));
        folder.add_item(TopLevelItem::Job(job.clone()));
        job
    }

    /// A configuration of a multi-configuration job. Configurations are not
    /// addressable by views on their own.
    pub fn configuration(name: impl Into<String>, parent: &Arc<Self>) -> Arc<Self> {
        let job = Self::build_with(name.into(), Some(JobParent::Job(Arc::downgrade(parent))));
        parent
            .configurations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job.clone());
        job
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.parent, Some(JobParent::Job(_)))
    }

    pub fn full_name(&self) -> String {
        let parent_name = match &self.parent {
            Some(JobParent::Folder(folder)) => folder.upgrade().map(|f| f.full_name()),
            Some(JobParent::Job(job)) => job.upgrade().map(|j| j.full_name()),
            None => None,
        };
        match parent_name {
            Some(parent) => format!("{parent}/{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Relative URL in the `job/<a>/job/<b>/` form.
    pub fn url(&self) -> String {
        self.full_name()
            .split('/')
            .map(|segment| format!("job/{segment}/"))
            .collect()
    }

    /// Starts a new build. Its predecessor is the previous build by number,
    /// whether or not that one has finished.
    pub fn start_build(self: &Arc<Self>) -> Arc<Build> {
        let mut builds = self.builds.write().unwrap_or_else(PoisonError::into_inner);
        let number = builds.last().map_or(1, |last| last.number() + 1);
        let previous = builds.last().map(Arc::downgrade);
        let build = Arc::new(Build::new(number, Arc::downgrade(self), previous));
        builds.push(build.clone());
        build
    }

    /// Most recent build that has an outcome; running builds are skipped.
    pub fn last_completed_build(&self) -> Option<Arc<Build>> {
        self.builds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|build| !build.is_building())
            .cloned()
    }

    /// Builds ordered most recent first.
    pub fn builds(&self) -> Vec<Arc<Build>> {
        let mut builds = self
            .builds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        builds.reverse();
        builds
    }

    pub fn configurations(&self) -> Vec<Arc<Job>> {
        self.configurations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// This job followed by every configuration it owns.
    pub fn all_jobs(self: &Arc<Self>) -> Vec<Arc<Job>> {
        std::iter::once(self.clone())
            .chain(self.configurations().iter().flat_map(Job::all_jobs))
            .collect()
    }
}

impl HasContainer for Arc<Folder> {
    fn container(&self) -> Option<Container> {
        self.parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Container::Folder)
    }

    fn as_top_level(&self) -> Option<TopLevelItem> {
        Some(TopLevelItem::Folder(self.clone()))
    }
}

impl HasContainer for Arc<Job> {
    fn container(&self) -> Option<Container> {
        match self.parent.as_ref()? {
            JobParent::Folder(folder) => folder.upgrade().map(Container::Folder),
            JobParent::Job(job) => job.upgrade().map(Container::Job),
        }
    }

    fn as_top_level(&self) -> Option<TopLevelItem> {
        (!self.is_configuration()).then(|| TopLevelItem::Job(self.clone()))
    }
}
