use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde_json::json;
use std::path::Path;
use tracing::info;

pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
        }
    }

    /// Announce a freshly saved post.
    pub async fn notify_post_saved(&self, path: &Path) -> Result<()> {
        let payload = json!({ "text": post_saved_message(path) });

        let response = self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .context("Failed to reach Slack webhook")?;

        if !response.status().is_success() {
            bail!("Slack webhook returned {}", response.status());
        }

        info!("Slack notification sent");
        Ok(())
    }
}

pub fn post_saved_message(path: &Path) -> String {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    format!(
        ":memo: *New Trade Summary Generated!* `{}` has been saved.\nLocation: `{}`",
        filename,
        path.display()
    )
}
