use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde_derive::Deserialize;

pub const WEBHOOK_URL_ENV: &str = "PRESENCE_WEBHOOK_URL";

const DEFAULT_HOST: &str = "maker.ifttt.com";
const DEFAULT_DEVICE_LABEL: &str = "UNO Q";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_IDLE_INTERVAL_MS: u64 = 1000;
const DEFAULT_HANDLER_NAME: &str = "presence_mm";

#[derive(Deserialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub webhook: WebhookConfig,
    pub bridge: Option<BridgeConfig>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub event: Option<String>,
    pub key: Option<String>,
    pub device_label: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct BridgeConfig {
    pub idle_interval_ms: Option<u64>,
    pub handler_name: Option<String>,
}

impl AppConfig {
    /// Reads the config file. A missing file yields the defaults when the
    /// webhook URL is supplied through the environment instead.
    pub fn load(path: &Path, url_from_env: bool) -> anyhow::Result<Self> {
        if url_from_env && !path.exists() {
            return Ok(AppConfig::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::de::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn bridge(&self) -> BridgeConfig {
        self.bridge.clone().unwrap_or_default()
    }
}

impl WebhookConfig {
    /// Picks the webhook URL: environment override, then `url`, then one
    /// assembled from `host`, `event` and `key`.
    pub fn resolve_url(&self, env_override: Option<String>) -> anyhow::Result<String> {
        let url = match (env_override, &self.url) {
            (Some(url), _) if !url.trim().is_empty() => url.trim().to_string(),
            (_, Some(url)) => url.trim().to_string(),
            _ => {
                let (Some(event), Some(key)) = (&self.event, &self.key) else {
                    bail!("no webhook url configured: set {WEBHOOK_URL_ENV}, webhook.url, or webhook.event and webhook.key");
                };
                if event.is_empty() || key.is_empty() {
                    bail!("webhook.event and webhook.key must not be empty");
                }
                let host = self.host.as_deref().unwrap_or(DEFAULT_HOST);
                format!("https://{host}/trigger/{event}/with/key/{key}")
            }
        };

        if !(url.starts_with("https://") || url.starts_with("http://")) {
            let scheme = url.split_once("://").map_or("none", |(scheme, _)| scheme);
            bail!("webhook url must be http or https, got scheme `{scheme}`");
        }
        Ok(url)
    }

    pub fn device_label(&self) -> String {
        self.device_label
            .clone()
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| DEFAULT_DEVICE_LABEL.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }
}

impl BridgeConfig {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms.unwrap_or(DEFAULT_IDLE_INTERVAL_MS).max(1))
    }

    pub fn handler_name(&self) -> String {
        self.handler_name
            .clone()
            .unwrap_or_else(|| DEFAULT_HANDLER_NAME.to_string())
    }
}
