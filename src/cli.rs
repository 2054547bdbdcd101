use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::delivery::{
    ConsoleDelivery, Delivery, Notification, RecordingDelivery, Tee, WebhookClient,
};
use crate::notifier::Notifier;
use crate::outcome::Outcome;
use crate::output::{bright_green, cyan, dim, print_summary};
use crate::report::{ReplayReport, SentNotification};
use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "buildherald")]
#[command(author, version, about = "Build & view status notifier", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, env = "BUILDHERALD_CONFIG")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario through the notifier
    Replay {
        file: PathBuf,

        /// Print notifications instead of posting them
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Emit the replay report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Check the configuration (and optionally a scenario)
    Validate {
        #[arg(short, long)]
        scenario: Option<PathBuf>,
    },

    /// Send a test notification through the webhook
    Ping {
        #[arg(short, long, env = "BUILDHERALD_WEBHOOK")]
        webhook: Option<String>,

        #[arg(short, long, default_value = "buildherald test notification")]
        message: String,
    },

    /// Write a default configuration file
    Init {
        #[arg(default_value = "buildherald.toml")]
        path: PathBuf,

        #[arg(short, long, default_value_t = false)]
        force: bool,
    },
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        Config::load(self.config.as_deref())
    }

    fn emit_json(&self, report: &ReplayReport, pretty: bool) -> Result<()> {
        let json_output = if pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Report written to: {}", output_path.display());
        } else {
            println!("{}", json_output);
        }

        Ok(())
    }

    async fn execute_replay(&self, file: &Path, dry_run: bool, json: bool) -> Result<()> {
        info!("Replaying scenario: {}", file.display());

        let config = self.load_config()?;
        if !dry_run {
            config.validate()?;
        }
        let pretty = self.pretty || config.output.pretty;
        let scenario = Scenario::load(file)?;
        let name = file.display().to_string();
        let quiet = json || self.output.is_some();

        // The webhook client blocks, so the replay stays off the runtime threads.
        let report =
            tokio::task::spawn_blocking(move || replay(name, &scenario, &config, dry_run, quiet))
                .await
                .context("Replay task panicked")??;

        if quiet {
            self.emit_json(&report, pretty)
        } else {
            print_summary(&report);
            Ok(())
        }
    }

    fn execute_validate(&self, scenario: Option<&Path>) -> Result<()> {
        let config = self.load_config()?;
        config.validate()?;

        println!("{}", bright_green("✓ Configuration is valid"));
        println!("{}", dim(toml::to_string_pretty(&config)?));

        if let Some(path) = scenario {
            let scenario = Scenario::load(path)?;
            scenario.build()?;
            println!(
                "{} {} ({} events)",
                bright_green("✓ Scenario is valid:"),
                cyan(path.display()),
                scenario.events.len()
            );
        }

        Ok(())
    }

    async fn execute_ping(&self, webhook: Option<&str>, message: &str) -> Result<()> {
        let config = self.load_config()?;
        let Some(webhook) = webhook.or(config.webhook.url.as_deref()) else {
            bail!("No webhook URL provided (use --webhook or set webhook.url)");
        };

        let notification = Notification {
            run_name: "buildherald".to_string(),
            run_url: config.webhook.root_url.clone(),
            text: message.to_string(),
            color: Outcome::Success.html_color().to_string(),
        };
        let urgent = config.notify.all_mentions;
        let target = webhook.to_string();

        info!("Pinging {webhook}");
        // The blocking client owns a runtime of its own and must be built,
        // used and dropped off the async threads.
        tokio::task::spawn_blocking(move || {
            WebhookClient::new(&target)?.send(&notification, urgent)
        })
        .await
        .context("Ping task panicked")??;

        println!("{} {}", bright_green("✓ Delivered to"), cyan(webhook));
        Ok(())
    }

    fn execute_init(&self, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }

        Config::default().save(path)?;
        println!("{} {}", bright_green("✓ Wrote"), cyan(path.display()));
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Replay {
                file,
                dry_run,
                json,
            } => self.execute_replay(file, *dry_run, *json).await,
            Commands::Validate { scenario } => self.execute_validate(scenario.as_deref()),
            Commands::Ping { webhook, message } => {
                self.execute_ping(webhook.as_deref(), message).await
            }
            Commands::Init { path, force } => self.execute_init(path, *force),
        }
    }
}

/// Runs every scenario event through a notifier backed by the chosen transport.
fn replay(
    name: String,
    scenario: &Scenario,
    config: &Config,
    dry_run: bool,
    quiet: bool,
) -> Result<ReplayReport> {
    match (dry_run, quiet) {
        (true, true) => replay_with(name, scenario, config, RecordingDelivery::default()),
        (true, false) => replay_with(name, scenario, config, ConsoleDelivery),
        (false, _) => {
            let webhook = config.webhook.url.as_deref().unwrap_or_default();
            replay_with(name, scenario, config, WebhookClient::new(webhook)?)
        }
    }
}

fn replay_with<D: Delivery + 'static>(
    name: String,
    scenario: &Scenario,
    config: &Config,
    transport: D,
) -> Result<ReplayReport> {
    let delivery = Arc::new(Tee::new(transport));
    let world = scenario.build()?;
    let notifier = Notifier::new(config, delivery.clone(), world.instance());

    let started_at = Utc::now();
    for event in &scenario.events {
        world.apply(event, &notifier)?;
    }
    let finished_at = Utc::now();

    Ok(ReplayReport {
        scenario: name,
        delivered_to: delivery.describe(),
        started_at,
        finished_at,
        events_applied: scenario.events.len(),
        notifications: delivery
            .sent()
            .into_iter()
            .map(|(notification, urgent)| SentNotification {
                notification,
                urgent,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SCENARIO: &str = r#"
[[jobs]]
name = "api"

[[views]]
name = "Main"
items = ["api"]

[[events]]
action = "run"
job = "api"
outcome = "SUCCESS"

[[events]]
action = "run"
job = "api"
outcome = "FAILURE"
"#;

    fn scenario_file() -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(file, "{SCENARIO}").unwrap();
        file
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("buildherald").chain(args.iter().copied())).unwrap()
    }

    mod parse {
        use super::*;

        #[test]
        fn replay_flags() {
            let cli = cli(&["replay", "s.toml", "--dry-run", "--json", "--pretty"]);
            assert!(cli.pretty);
            assert!(matches!(
                cli.command,
                Commands::Replay { dry_run: true, json: true, .. }
            ));
        }

        #[test]
        fn global_config_after_subcommand() {
            let cli = cli(&["validate", "--config", "custom.toml"]);
            assert_eq!(cli.config.as_deref(), Some(Path::new("custom.toml")));
        }
    }

    mod replay {
        use super::*;

        #[test]
        fn dry_run_records_notifications() {
            let file = scenario_file();
            let scenario = Scenario::load(file.path()).unwrap();

            let report = replay(
                "s.toml".to_string(),
                &scenario,
                &Config::default(),
                true,
                true,
            )
            .unwrap();

            assert_eq!(report.events_applied, 2);
            assert_eq!(report.delivered_to, "memory");
            assert_eq!(report.build_notifications(), 1, "one build transition");
            assert_eq!(report.view_notifications(), 1, "one view transition");
        }

        #[test]
        fn posts_to_webhook() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("POST", "/hooks/abc")
                .with_status(200)
                .expect(2)
                .create();

            let mut config = Config::default();
            config.webhook.url = Some(format!("{}/hooks/abc", server.url()));
            let scenario = Scenario::load(scenario_file().path()).unwrap();

            let report = replay("s.toml".to_string(), &scenario, &config, false, true).unwrap();

            mock.assert();
            assert_eq!(report.notifications.len(), 2);
        }

        #[test]
        fn rejected_notifications_are_not_reported() {
            let mut server = mockito::Server::new();
            let _mock = server.mock("POST", "/hooks/abc").with_status(500).create();

            let mut config = Config::default();
            config.webhook.url = Some(format!("{}/hooks/abc", server.url()));
            let scenario = Scenario::load(scenario_file().path()).unwrap();

            let report = replay("s.toml".to_string(), &scenario, &config, false, true).unwrap();
            assert!(report.notifications.is_empty());
        }
    }

    mod execute {
        use super::*;

        #[test]
        fn replay_writes_json_report() {
            let file = scenario_file();
            let dir = tempfile::tempdir().unwrap();
            let out = dir.path().join("report.json");

            let missing = cli(&[
                "replay",
                file.path().to_str().unwrap(),
                "--dry-run",
                "--output",
                out.to_str().unwrap(),
                "--config",
                dir.path().join("missing.toml").to_str().unwrap(),
            ]);
            // A missing explicit config is an error, even for dry runs.
            assert!(tokio_test::block_on(missing.execute()).is_err());

            let config = dir.path().join("buildherald.toml");
            Config::default().save(&config).unwrap();
            let replay = cli(&[
                "replay",
                file.path().to_str().unwrap(),
                "--dry-run",
                "--output",
                out.to_str().unwrap(),
                "--config",
                config.to_str().unwrap(),
            ]);
            tokio_test::block_on(replay.execute()).unwrap();

            let report: ReplayReport =
                serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
            assert_eq!(report.notifications.len(), 2);
        }

        #[test]
        fn init_refuses_to_overwrite() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("buildherald.toml");

            tokio_test::block_on(cli(&["init", path.to_str().unwrap()]).execute()).unwrap();
            assert!(path.exists());

            let again = tokio_test::block_on(cli(&["init", path.to_str().unwrap()]).execute());
            assert!(again.is_err());

            tokio_test::block_on(cli(&["init", path.to_str().unwrap(), "--force"]).execute())
                .unwrap();
        }

        #[test]
        fn ping_posts_test_notification() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("POST", "/hooks/abc")
                .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                    "text": "hello from ci",
                })))
                .with_status(200)
                .create();

            let dir = tempfile::tempdir().unwrap();
            let config = dir.path().join("buildherald.toml");
            Config::default().save(&config).unwrap();
            let webhook = format!("{}/hooks/abc", server.url());

            let ping = cli(&[
                "ping",
                "--config",
                config.to_str().unwrap(),
                "--webhook",
                webhook.as_str(),
                "--message",
                "hello from ci",
            ]);
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(ping.execute()).unwrap();

            mock.assert();
        }

        #[test]
        fn ping_reports_rejected_delivery() {
            let mut server = mockito::Server::new();
            let _mock = server.mock("POST", "/hooks/abc").with_status(404).create();

            let dir = tempfile::tempdir().unwrap();
            let config = dir.path().join("buildherald.toml");
            Config::default().save(&config).unwrap();
            let webhook = format!("{}/hooks/abc", server.url());

            let ping = cli(&[
                "ping",
                "--config",
                config.to_str().unwrap(),
                "--webhook",
                webhook.as_str(),
            ]);
            let err = tokio_test::block_on(ping.execute()).unwrap_err();
            assert!(err.to_string().contains("404"));
        }

        #[test]
        fn ping_requires_webhook() {
            let dir = tempfile::tempdir().unwrap();
            let config = dir.path().join("buildherald.toml");
            Config::default().save(&config).unwrap();

            let result = tokio_test::block_on(
                cli(&["ping", "--config", config.to_str().unwrap()]).execute(),
            );
            assert!(result.unwrap_err().to_string().contains("No webhook URL"));
        }
    }
}
