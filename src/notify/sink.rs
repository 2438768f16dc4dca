use tracing::warn;

use super::Message;

/// Best-effort webhook delivery. A failure here is logged and swallowed --
/// it must never fail the caller, since notification delivery is
/// orthogonal to backup correctness.
pub struct NotificationSink {
    client: reqwest::Client,
}

impl NotificationSink {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }

    /// Send to a specific webhook. A missing URL is a silent no-op.
    pub async fn send(&self, webhook_url: Option<&str>, message: &Message) {
        let Some(url) = webhook_url else { return };

        match self.client.post(url).json(message).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!("notification webhook returned status {}", response.status());
            }
            Err(e) => {
                warn!("failed to deliver notification: {e}");
            }
        }
    }
}

impl Default for NotificationSink {
    fn default() -> Self {
        Self::new()
    }
}
