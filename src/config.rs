use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration file structure for buildherald.
///
/// Holds the webhook target and the feature toggles. The loaded value is
/// handed to the notifier explicitly; nothing reads it from global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Where notifications are delivered
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Which notifications are produced
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WebhookConfig {
    /// Rocket.Chat incoming-webhook URL
    pub url: Option<String>,

    /// Channel label, only used in log lines
    pub room: Option<String>,

    /// Build server root URL, prefixed onto build links
    #[serde(default)]
    pub root_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NotifyConfig {
    /// Notify on per-build transitions
    #[serde(default = "default_true")]
    pub builds: bool,

    /// Track views and notify on aggregate changes
    #[serde(default = "default_true")]
    pub views: bool,

    /// Mention everybody in the room
    #[serde(default)]
    pub all_mentions: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            builds: true,
            views: true,
            all_mentions: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./buildherald.toml
    /// 3. ./buildherald.json
    /// 4. ./buildherald.yaml
    /// 5. ./buildherald.yml
    /// 6. `<config dir>/buildherald/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "buildherald.toml",
            "buildherald.json",
            "buildherald.yaml",
            "buildherald.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(user_config) = Self::user_config_path().filter(|p| p.exists()) {
            return Self::load_from_path(&user_config);
        }

        Ok(Self::default())
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("buildherald").join("config.toml"))
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notify.builds || self.notify.views
    }

    /// Checks that an enabled notifier has somewhere to deliver to.
    pub fn validate(&self) -> Result<()> {
        if !self.notifications_enabled() {
            return Ok(());
        }

        let Some(webhook) = self.webhook.url.as_deref().map(str::trim) else {
            bail!("webhook.url must be set when notifications are enabled");
        };
        if webhook.is_empty() {
            bail!("webhook.url must not be empty");
        }
        Url::parse(webhook).with_context(|| format!("Invalid webhook URL: {webhook}"))?;

        if !self.webhook.root_url.is_empty() {
            Url::parse(&self.webhook.root_url)
                .with_context(|| format!("Invalid root URL: {}", self.webhook.root_url))?;
        }

        Ok(())
    }
}
