use std::sync::Arc;

use crate::host::{Folder, Job};

/// The immediate owner of an entity in the host's item tree.
#[derive(Debug, Clone)]
pub enum Container {
    Folder(Arc<Folder>),
    Job(Arc<Job>),
}

/// An entity that views may list directly.
#[derive(Debug, Clone)]
pub enum TopLevelItem {
    Folder(Arc<Folder>),
    Job(Arc<Job>),
}

/// Capability exposed by every ownable entity: "who contains me".
///
/// Entities that are themselves addressable by views report it through
/// [`HasContainer::as_top_level`]; resolution stops there.
pub trait HasContainer {
    /// Immediate container, or `None` when the relation is absent or the
    /// container is no longer alive.
    fn container(&self) -> Option<Container>;

    fn as_top_level(&self) -> Option<TopLevelItem> {
        None
    }
}

/// Walks the container relation upwards until an entity that views can
/// address is found.
///
/// Returns `None` when the chain ends before reaching such an entity; callers
/// treat that as "belongs to no view this cycle".
pub fn resolve_top_level_owner<E>(entity: &E) -> Option<TopLevelItem>
where
    E: HasContainer + ?Sized,
{
    if let Some(top) = entity.as_top_level() {
        return Some(top);
    }

    let mut current = entity.container()?;
    loop {
        if let Some(top) = current.as_top_level() {
            return Some(top);
        }
        current = current.container()?;
    }
}

impl HasContainer for Container {
    fn container(&self) -> Option<Container> {
        match self {
            Self::Folder(folder) => folder.container(),
            Self::Job(job) => job.container(),
        }
    }

    fn as_top_level(&self) -> Option<TopLevelItem> {
        match self {
            Self::Folder(folder) => folder.as_top_level(),
            Self::Job(job) => job.as_top_level(),
        }
    }
}

impl TopLevelItem {
    pub fn full_name(&self) -> String {
        match self {
            Self::Folder(folder) => folder.full_name(),
            Self::Job(job) => job.full_name(),
        }
    }

    /// Every job reachable from this item, including jobs of nested folders
    /// and the configurations of multi-configuration jobs.
    pub fn all_jobs(&self) -> Vec<Arc<Job>> {
        match self {
            Self::Folder(folder) => folder.all_jobs(),
            Self::Job(job) => job.all_jobs(),
        }
    }

    /// Identity comparison; two distinct items may share a name.
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Folder(a), Self::Folder(b)) => Arc::ptr_eq(a, b),
            (Self::Job(a), Self::Job(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `true` when `other` is this item or is nested somewhere inside it.
    pub fn contains(&self, other: &Self) -> bool {
        if self.is_same(other) {
            return true;
        }
        match self {
            Self::Folder(folder) => folder.items().iter().any(|child| child.contains(other)),
            Self::Job(_) => false,
        }
    }
}
