//! Network utilities

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("musichub/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by every source adapter.
///
/// The timeout bounds each request, so no adapter call outlives it.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Check that a stream url answers.
///
/// Sends HEAD first; servers that reject HEAD (405/501, common for
/// icecast) get a ranged GET instead.
pub async fn stream_reachable(client: &Client, url: &str, timeout: Duration) -> bool {
    match client.head(url).timeout(timeout).send().await {
        Ok(resp) if resp.status().is_success() => true,
        Ok(resp)
            if resp.status() == StatusCode::METHOD_NOT_ALLOWED
                || resp.status() == StatusCode::NOT_IMPLEMENTED =>
        {
            reachable_with_get(client, url, timeout).await
        }
        Ok(resp) => {
            debug!("Stream check for {} returned {}", url, resp.status());
            false
        }
        Err(e) => {
            debug!("Stream check for {} failed: {}", url, e);
            false
        }
    }
}

async fn reachable_with_get(client: &Client, url: &str, timeout: Duration) -> bool {
    client
        .get(url)
        .header(reqwest::header::RANGE, "bytes=0-0")
        .timeout(timeout)
        .send()
        .await
        .map(|resp| resp.status().is_success())
        .unwrap_or(false)
}
