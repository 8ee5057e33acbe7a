//! HTTP client for a sandbox control API.
//!
//! Each operation is described by a [`CallPlan`]: a primary [`Route`] and at
//! most one fallback route on an older or newer API shape of the same
//! server family. The first route that answers wins. A fallback is never
//! retried, and side-effecting operations only fall back when the primary
//! failure shows the request was not applied.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::error::SandboxError;
use super::result::ToolResult;

/// Longest error body kept in a failure message.
const MAX_ERROR_BODY: usize = 512;

/// Whether an operation may be re-issued on the fallback route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Replay {
    /// Re-issuing is harmless (reads, existence checks, deletes, kills).
    Always,
    /// Only re-issue when the primary request provably never took effect.
    Unsent,
}

/// Request/response encoding used by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    /// JSON body passed through; response is a [`ToolResult`] envelope.
    Envelope,
    /// Native shell endpoint: `{session_id, command, cwd}` in,
    /// `{output, error}` out.
    NativeShell,
}

/// One endpoint an operation can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Route {
    pub path: &'static str,
    pub shape: Shape,
}

impl Route {
    pub const fn envelope(path: &'static str) -> Self {
        Self {
            path,
            shape: Shape::Envelope,
        }
    }

    pub const fn native_shell(path: &'static str) -> Self {
        Self {
            path,
            shape: Shape::NativeShell,
        }
    }

    fn render(&self, body: &Value) -> Value {
        match self.shape {
            Shape::Envelope => body.clone(),
            Shape::NativeShell => json!({
                "session_id": body.get("id").cloned().unwrap_or(Value::Null),
                "command": body.get("command").cloned().unwrap_or(Value::Null),
                "cwd": body.get("exec_dir").cloned().unwrap_or(Value::Null),
            }),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<ToolResult, CallError> {
        match self.shape {
            Shape::Envelope => {
                serde_json::from_slice(bytes).map_err(|e| CallError::Decode(e.to_string()))
            }
            Shape::NativeShell => {
                let body: Value =
                    serde_json::from_slice(bytes).map_err(|e| CallError::Decode(e.to_string()))?;
                if !body.is_object() {
                    return Err(CallError::Decode(format!("expected an object, got {body}")));
                }
                Ok(ToolResult::from_shell_output(&body))
            }
        }
    }
}

/// Ordered routes for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CallPlan {
    /// Operation name used in failure messages, e.g. "Command execution".
    pub label: &'static str,
    pub replay: Replay,
    pub primary: Route,
    pub fallback: Option<Route>,
}

impl CallPlan {
    pub const fn single(label: &'static str, replay: Replay, primary: Route) -> Self {
        Self {
            label,
            replay,
            primary,
            fallback: None,
        }
    }

    pub const fn with_fallback(
        label: &'static str,
        replay: Replay,
        primary: Route,
        fallback: Route,
    ) -> Self {
        Self {
            label,
            replay,
            primary,
            fallback: Some(fallback),
        }
    }

    /// Same routes under a different replay policy.
    pub fn replay(self, replay: Replay) -> Self {
        Self { replay, ..self }
    }
}

/// Failure of a single route.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CallError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl CallError {
    /// True when the server cannot have acted on the request: the
    /// connection never opened, or the route does not exist on this shape.
    pub fn proves_unapplied(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_builder(),
            Self::Status { status, .. } => matches!(
                *status,
                StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
            ),
            Self::Decode(_) => false,
        }
    }
}

/// Tries `plan`'s routes in order until one succeeds.
///
/// Returns the failure description when every permitted route failed.
pub(crate) async fn run_plan<T, F, Fut>(plan: &CallPlan, mut call: F) -> Result<T, String>
where
    F: FnMut(Route) -> Fut,
    Fut: Future<Output = Result<T, CallError>>,
{
    let primary_err = match call(plan.primary).await {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let Some(fallback) = plan.fallback else {
        error!("{} failed on {}: {}", plan.label, plan.primary.path, primary_err);
        return Err(format!("{} failed: {primary_err}", plan.label));
    };

    if plan.replay == Replay::Unsent && !primary_err.proves_unapplied() {
        error!(
            "{} failed on {} and may have been applied; not replaying: {}",
            plan.label, plan.primary.path, primary_err
        );
        return Err(format!(
            "{} failed: {primary_err} (fallback skipped: request may already have been applied)",
            plan.label
        ));
    }

    warn!(
        "{} failed on {}: {}; trying {}",
        plan.label, plan.primary.path, primary_err, fallback.path
    );

    match call(fallback).await {
        Ok(value) => Ok(value),
        Err(fallback_err) => {
            error!(
                "Both API shapes failed for {}: {}, fallback: {}",
                plan.label, primary_err, fallback_err
            );
            Err(format!(
                "{} failed: {primary_err}; fallback: {fallback_err}",
                plan.label
            ))
        }
    }
}

/// Client bound to one sandbox's control API.
#[derive(Debug, Clone)]
pub(crate) struct SandboxApi {
    client: Client,
    base_url: String,
}

impl SandboxApi {
    /// Creates a client whose requests time out after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SandboxError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SandboxError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying HTTP client, shared with other endpoints of the sandbox.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POSTs `body` along `plan`, folding every failure into the result.
    pub async fn call(&self, plan: &CallPlan, body: Value) -> ToolResult {
        run_plan(plan, |route| self.post_route(route, route.render(&body)))
            .await
            .unwrap_or_else(ToolResult::failure)
    }

    async fn post_route(&self, route: Route, body: Value) -> Result<ToolResult, CallError> {
        debug!("POST {}{}", self.base_url, route.path);
        let response = self.client.post(self.url(route.path)).json(&body).send().await?;
        let bytes = checked_body(response).await?;
        route.decode(&bytes)
    }

    /// Uploads `data` as multipart form fields `file` and `path`.
    pub async fn upload(
        &self,
        plan: &CallPlan,
        data: Bytes,
        path: &str,
        filename: &str,
    ) -> ToolResult {
        run_plan(plan, |route| self.upload_route(route, data.clone(), path, filename))
            .await
            .unwrap_or_else(ToolResult::failure)
    }

    async fn upload_route(
        &self,
        route: Route,
        data: Bytes,
        path: &str,
        filename: &str,
    ) -> Result<ToolResult, CallError> {
        let part = Part::stream(data)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part).text("path", path.to_string());

        debug!("POST (multipart) {}{}", self.base_url, route.path);
        let response = self
            .client
            .post(self.url(route.path))
            .multipart(form)
            .send()
            .await?;
        let bytes = checked_body(response).await?;
        route.decode(&bytes)
    }

    /// Downloads `path`, raising when every route fails.
    pub async fn download(&self, plan: &CallPlan, path: &str) -> Result<Bytes, SandboxError> {
        run_plan(plan, |route| self.download_route(route, path))
            .await
            .map_err(SandboxError::download)
    }

    async fn download_route(&self, route: Route, path: &str) -> Result<Bytes, CallError> {
        debug!("GET {}{} path={}", self.base_url, route.path, path);
        let response = self
            .client
            .get(self.url(route.path))
            .query(&[("path", path)])
            .send()
            .await?;
        checked_body(response).await
    }

    /// GETs a JSON document with a per-request timeout.
    pub async fn get_json(&self, path: &str, timeout: Duration) -> Result<Value, CallError> {
        let response = self
            .client
            .get(self.url(path))
            .timeout(timeout)
            .send()
            .await?;
        let bytes = checked_body(response).await?;
        serde_json::from_slice(&bytes).map_err(|e| CallError::Decode(e.to_string()))
    }
}

async fn checked_body(response: reqwest::Response) -> Result<Bytes, CallError> {
    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        return Err(CallError::Status { status, body });
    }
    Ok(response.bytes().await?)
}
