use anyhow::Context as _;
use chrono::Local;
use log::{debug, info};

use crate::config::WebhookConfig;
use crate::messages::{NotificationPayload, PresenceEvent};

/// Posts presence readings to the automation webhook.
///
/// Every call is a single attempt over its own connection: the client keeps
/// no idle connections, so nothing is held open between notifications.
#[derive(Debug, Clone)]
pub struct PresenceNotifier {
    client: reqwest::Client,
    url: String,
    device_label: String,
}

impl PresenceNotifier {
    pub fn new(config: &WebhookConfig, url: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(0)
            .build()
            .context("building webhook http client")?;

        Ok(PresenceNotifier {
            client,
            url,
            device_label: config.device_label(),
        })
    }

    /// Sends one notification for `distance_mm`.
    ///
    /// Returns `Ok(true)` as soon as any HTTP response arrives, whatever its
    /// status. Connection, TLS and timeout failures are returned as errors.
    pub async fn notify(&self, distance_mm: u32) -> anyhow::Result<bool> {
        info!("Presence detected, mm = {}", distance_mm);

        let payload =
            NotificationPayload::new(PresenceEvent { distance_mm }, Local::now(), &self.device_label);
        debug!("Webhook payload: {:?}", payload);

        // The url embeds the api key, keep it out of error messages.
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| err.without_url())
            .context("posting presence notification")?;

        // TODO: report non-2xx statuses as a failed delivery once callers can act on it.
        info!("Webhook status: {}", response.status().as_u16());

        Ok(true)
    }
}
