//! Browser automation handle bound to a sandbox's debugging endpoint.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Version document served at `/json/version` by the debugging endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser", default)]
    pub browser: String,
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// Entry point for driving a sandbox's browser.
///
/// Automation clients connect to [`cdp_url`](Self::cdp_url) directly; this
/// handle only knows how to discover the websocket endpoint.
#[derive(Debug, Clone)]
pub struct BrowserHandle {
    cdp_url: String,
    client: Client,
}

impl BrowserHandle {
    /// Binds `cdp_url`, issuing requests through `client`.
    pub fn new(cdp_url: impl Into<String>, client: Client) -> Self {
        Self {
            cdp_url: cdp_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn cdp_url(&self) -> &str {
        &self.cdp_url
    }

    /// Fetches the browser's version document.
    pub async fn version(&self) -> Result<BrowserVersion> {
        let url = format!("{}/json/version", self.cdp_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .with_context(|| format!("Failed to reach browser at {url}"))?
            .error_for_status()
            .with_context(|| format!("Browser at {url} returned an error"))?
            .json()
            .await
            .with_context(|| format!("Invalid version document from {url}"))
    }

    /// Websocket URL automation clients attach to.
    pub async fn websocket_debugger_url(&self) -> Result<String> {
        Ok(self.version().await?.web_socket_debugger_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_discovers_websocket_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Browser": "Chrome/120.0.6099.109",
                "Protocol-Version": "1.3",
                "webSocketDebuggerUrl": "ws://10.0.0.5:9222/devtools/browser/abc"
            })))
            .mount(&server)
            .await;

        let handle = BrowserHandle::new(format!("{}/", server.uri()), Client::new());
        assert_eq!(handle.cdp_url(), server.uri());

        let version = handle.version().await.unwrap();
        assert_eq!(version.protocol_version, "1.3");
        assert_eq!(
            handle.websocket_debugger_url().await.unwrap(),
            "ws://10.0.0.5:9222/devtools/browser/abc"
        );
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_an_error() {
        let server = MockServer::start().await;
        let handle = BrowserHandle::new(server.uri(), Client::new());
        let err = handle.version().await.unwrap_err();
        assert!(err.to_string().contains("returned an error"));
    }
}
