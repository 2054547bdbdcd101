use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{HeraldError, Result};
use crate::host::{Build, Folder, Instance, Job, View};
use crate::notifier::Notifier;
use crate::outcome::Outcome;
use crate::ownership::TopLevelItem;

/// A replayable description of a build server and what happens on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Scenario {
    #[serde(default)]
    pub folders: Vec<FolderSpec>,
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
    #[serde(default)]
    pub views: Vec<ViewSpec>,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FolderSpec {
    pub name: String,
    /// Enclosing folder, declared earlier
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobSpec {
    pub name: String,
    pub folder: Option<String>,
    /// Multi-configuration job this job is a configuration of, declared earlier
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ViewSpec {
    pub name: String,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Event {
    Start { job: String },
    Complete { job: String, outcome: Outcome },
    /// Start immediately followed by completion.
    Run { job: String, outcome: Outcome },
    AddItem { view: String, item: String },
    RemoveItem { view: String, item: String },
}

impl Scenario {
    /// Reads a scenario from TOML, JSON or YAML, picked by extension.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON scenario: {}", path.display())),
            Some("yaml" | "yml") => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML scenario: {}", path.display())),
            _ => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML scenario: {}", path.display())),
        }
    }

    /// Materialises folders, jobs and views into a fresh [`Instance`].
    pub fn build(&self) -> Result<World> {
        let mut world = World {
            instance: Arc::new(Instance::new()),
            folders: HashMap::new(),
            jobs: HashMap::new(),
        };

        for spec in &self.folders {
            world.ensure_unique(&spec.name)?;
            let folder = match &spec.parent {
                Some(parent) => Folder::nested(spec.name.clone(), world.folder(parent)?),
                None => Folder::new(spec.name.clone()),
            };
            world.folders.insert(spec.name.clone(), folder);
        }

        for spec in &self.jobs {
            world.ensure_unique(&spec.name)?;
            let job = match (&spec.parent, &spec.folder) {
                (Some(_), Some(_)) => {
                    return Err(HeraldError::Scenario(format!(
                        "Job {} cannot have both a parent and a folder",
                        spec.name
                    )))
                }
                (Some(parent), None) => Job::configuration(spec.name.clone(), world.job(parent)?),
                (None, Some(folder)) => Job::in_folder(spec.name.clone(), world.folder(folder)?),
                (None, None) => Job::standalone(spec.name.clone()),
            };
            world.jobs.insert(spec.name.clone(), job);
        }

        for spec in &self.views {
            if world.instance.view(&spec.name).is_some() {
                return Err(HeraldError::Scenario(format!(
                    "Duplicate view name: {}",
                    spec.name
                )));
            }
            let view = View::new(spec.name.clone());
            for item in &spec.items {
                view.add_item(world.item(item)?);
            }
            world.instance.add_view(view);
        }

        Ok(world)
    }
}

/// The live objects built from a [`Scenario`].
pub struct World {
    instance: Arc<Instance>,
    folders: HashMap<String, Arc<Folder>>,
    jobs: HashMap<String, Arc<Job>>,
}

impl World {
    pub fn instance(&self) -> Arc<Instance> {
        self.instance.clone()
    }

    fn ensure_unique(&self, name: &str) -> Result<()> {
        if self.folders.contains_key(name) || self.jobs.contains_key(name) {
            return Err(HeraldError::Scenario(format!("Duplicate item name: {name}")));
        }
        Ok(())
    }

    fn folder(&self, name: &str) -> Result<&Arc<Folder>> {
        self.folders
            .get(name)
            .ok_or_else(|| HeraldError::Scenario(format!("Unknown folder: {name}")))
    }

    pub fn job(&self, name: &str) -> Result<&Arc<Job>> {
        self.jobs
            .get(name)
            .ok_or_else(|| HeraldError::Scenario(format!("Unknown job: {name}")))
    }

    fn item(&self, name: &str) -> Result<TopLevelItem> {
        if let Some(folder) = self.folders.get(name) {
            return Ok(TopLevelItem::Folder(folder.clone()));
        }
        let job = self.job(name)?;
        if job.is_configuration() {
            return Err(HeraldError::Scenario(format!(
                "{name} is a configuration and cannot be listed in a view"
            )));
        }
        Ok(TopLevelItem::Job(job.clone()))
    }

    fn view(&self, name: &str) -> Result<Arc<View>> {
        self.instance
            .view(name)
            .ok_or_else(|| HeraldError::Scenario(format!("Unknown view: {name}")))
    }

    fn running_build(&self, job: &str) -> Result<Arc<Build>> {
        self.job(job)?
            .builds()
            .into_iter()
            .find(|build| build.is_building())
            .ok_or_else(|| HeraldError::Scenario(format!("Job {job} has no running build")))
    }

    /// Applies one event, forwarding lifecycle callbacks to `notifier`.
    pub fn apply(&self, event: &Event, notifier: &Notifier) -> Result<()> {
        debug!("Applying {event:?}");
        match event {
            Event::Start { job } => {
                let build = self.job(job)?.start_build();
                notifier.on_started(&build);
            }
            Event::Complete { job, outcome } => {
                let build = self.running_build(job)?;
                build.complete(*outcome)?;
                notifier.on_completed(&build);
            }
            Event::Run { job, outcome } => {
                let build = self.job(job)?.start_build();
                notifier.on_started(&build);
                build.complete(*outcome)?;
                notifier.on_completed(&build);
            }
            Event::AddItem { view, item } => self.view(view)?.add_item(self.item(item)?),
            Event::RemoveItem { view, item } => self.view(view)?.remove_item(&self.item(item)?),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::compute_aggregate;
    use crate::config::Config;
    use crate::delivery::RecordingDelivery;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SCENARIO: &str = r#"
[[folders]]
name = "platform"

[[folders]]
name = "backend"
parent = "platform"

[[jobs]]
name = "api"
folder = "backend"

[[jobs]]
name = "matrix"

[[jobs]]
name = "linux"
parent = "matrix"

[[views]]
name = "Platform"
items = ["platform"]

[[views]]
name = "Matrix"
items = ["matrix"]

[[events]]
action = "start"
job = "api"

[[events]]
action = "complete"
job = "api"
outcome = "FAILURE"

[[events]]
action = "run"
job = "linux"
outcome = "UNSTABLE"
"#;

    fn load(contents: &str, suffix: &str) -> Scenario {
        let mut file = NamedTempFile::with_suffix(suffix).unwrap();
        write!(file, "{contents}").unwrap();
        Scenario::load(file.path()).unwrap()
    }

    fn notifier_for(world: &World) -> (Notifier, Arc<RecordingDelivery>) {
        let mut config = Config::default();
        config.webhook.url = Some("https://chat.example.com/hooks/abc".to_string());
        let delivery = Arc::new(RecordingDelivery::default());
        let notifier = Notifier::new(&config, delivery.clone(), world.instance());
        (notifier, delivery)
    }

    #[test]
    fn loads_toml_scenario() {
        let scenario = load(SCENARIO, ".toml");
        assert_eq!(scenario.folders.len(), 2);
        assert_eq!(scenario.jobs.len(), 3);
        assert_eq!(
            scenario.events[1],
            Event::Complete {
                job: "api".to_string(),
                outcome: Outcome::Failure
            }
        );
    }

    #[test]
    fn loads_yaml_scenario() {
        let yaml = "jobs:\n  - name: api\nevents:\n  - action: run\n    job: api\n    outcome: SUCCESS\n";
        let scenario = load(yaml, ".yaml");
        assert_eq!(scenario.jobs[0].name, "api");
        assert_eq!(scenario.events.len(), 1);
    }

    #[test]
    fn replays_events_through_notifier() {
        let scenario = load(SCENARIO, ".toml");
        let world = scenario.build().unwrap();
        let (notifier, delivery) = notifier_for(&world);

        for event in &scenario.events {
            world.apply(event, &notifier).unwrap();
        }

        let texts: Vec<_> = delivery.sent().into_iter().map(|(n, _)| n.text).collect();
        assert_eq!(
            texts,
            vec![
                "Build *platform/backend/api #1*: first failure, status is *FAILURE*",
                "view/Platform: first failure (SUCCESS -> FAILURE)",
                "Build *matrix/linux #1*: first failure, status is *UNSTABLE*",
                "view/Matrix: first failure (SUCCESS -> UNSTABLE)",
            ]
        );
    }

    #[test]
    fn membership_events_change_aggregate() {
        let scenario = load(SCENARIO, ".toml");
        let world = scenario.build().unwrap();
        let (notifier, _) = notifier_for(&world);
        for event in &scenario.events {
            world.apply(event, &notifier).unwrap();
        }

        let remove = Event::RemoveItem {
            view: "Platform".to_string(),
            item: "platform".to_string(),
        };
        world.apply(&remove, &notifier).unwrap();
        let view = world.instance().view("Platform").unwrap();
        assert_eq!(compute_aggregate(&view), Outcome::Success);
    }

    #[test]
    fn completing_without_running_build_fails() {
        let scenario = load(SCENARIO, ".toml");
        let world = scenario.build().unwrap();
        let (notifier, _) = notifier_for(&world);

        let err = world
            .apply(
                &Event::Complete {
                    job: "api".to_string(),
                    outcome: Outcome::Success,
                },
                &notifier,
            )
            .unwrap_err();
        assert!(err.to_string().contains("no running build"));
    }

    mod build {
        use super::*;

        #[test]
        fn rejects_duplicate_names() {
            let scenario = Scenario {
                folders: vec![FolderSpec {
                    name: "x".to_string(),
                    parent: None,
                }],
                jobs: vec![JobSpec {
                    name: "x".to_string(),
                    folder: None,
                    parent: None,
                }],
                ..Scenario::default()
            };
            assert!(scenario.build().is_err());
        }

        #[test]
        fn rejects_configuration_in_view() {
            let scenario = Scenario {
                jobs: vec![
                    JobSpec {
                        name: "matrix".to_string(),
                        folder: None,
                        parent: None,
                    },
                    JobSpec {
                        name: "cell".to_string(),
                        folder: None,
                        parent: Some("matrix".to_string()),
                    },
                ],
                views: vec![ViewSpec {
                    name: "V".to_string(),
                    items: vec!["cell".to_string()],
                }],
                ..Scenario::default()
            };
            let err = scenario.build().err().expect("configuration rejected");
            assert!(err.to_string().contains("configuration"));
        }

        #[test]
        fn rejects_duplicate_view_names() {
            let view = |item: &str| ViewSpec {
                name: "Main".to_string(),
                items: vec![item.to_string()],
            };
            let scenario = Scenario {
                jobs: vec![
                    JobSpec {
                        name: "api".to_string(),
                        folder: None,
                        parent: None,
                    },
                    JobSpec {
                        name: "web".to_string(),
                        folder: None,
                        parent: None,
                    },
                ],
                views: vec![view("api"), view("web")],
                ..Scenario::default()
            };
            let err = scenario.build().err().expect("second view rejected");
            assert!(err.to_string().contains("Duplicate view name: Main"));
        }

        #[test]
        fn rejects_unknown_folder() {
            let scenario = Scenario {
                jobs: vec![JobSpec {
                    name: "api".to_string(),
                    folder: Some("missing".to_string()),
                    parent: None,
                }],
                ..Scenario::default()
            };
            assert!(scenario.build().is_err());
        }
    }
}
