//! Sandbox handle shared by both variants.
//!
//! The variants differ only in their [`VariantProfile`]; the handle turns
//! each capability call into the profile's [`CallPlan`] against the
//! sandbox's control API.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

use super::api::{CallPlan, Replay, SandboxApi};
use super::error::SandboxError;
use super::profile::{RouteTable, VariantProfile};
use super::provider::InstanceCache;
use super::readiness::{wait_until_ready, ReadinessProbe};
use super::runtime::{ContainerEndpoint, ContainerRuntime, Ownership};
use super::{BrowserHandle, FileRead, FileWrite, Sandbox, SandboxKind, ToolResult};
use crate::config::ReadinessConfig;

pub(crate) struct HttpSandbox {
    id: String,
    kind: SandboxKind,
    vnc_url: String,
    cdp_url: String,
    api: SandboxApi,
    routes: &'static RouteTable,
    probe: ReadinessProbe,
    readiness: ReadinessConfig,
    /// Container removed on destroy, if this process may remove it.
    teardown: Option<String>,
    runtime: Arc<dyn ContainerRuntime>,
    cache: Weak<InstanceCache>,
    closed: AtomicBool,
}

impl HttpSandbox {
    pub fn new(
        profile: &VariantProfile,
        endpoint: ContainerEndpoint,
        runtime: Arc<dyn ContainerRuntime>,
        cache: Weak<InstanceCache>,
    ) -> Result<Self, SandboxError> {
        let host = endpoint.host;
        let ports = profile.ports;
        let api = SandboxApi::new(format!("http://{host}:{}", ports.api), profile.api_timeout)?;

        let teardown = match endpoint.ownership {
            Ownership::External => None,
            Ownership::Created | Ownership::Attached => endpoint
                .name
                .clone()
                .filter(|name| profile.owns_name(name)),
        };

        Ok(Self {
            id: endpoint.name.unwrap_or_else(|| profile.placeholder_id()),
            kind: profile.kind,
            vnc_url: format!("ws://{host}:{}", ports.vnc),
            cdp_url: format!("http://{host}:{}", ports.cdp),
            api,
            routes: profile.routes,
            probe: profile.probe,
            readiness: profile.readiness.clone(),
            teardown,
            runtime,
            cache,
            closed: AtomicBool::new(false),
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn call(&self, plan: &CallPlan, body: Value) -> ToolResult {
        if self.is_closed() {
            return ToolResult::failure(format!("Sandbox {} has been destroyed", self.id));
        }
        self.api.call(plan, body).await
    }
}

#[async_trait]
impl Sandbox for HttpSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SandboxKind {
        self.kind
    }

    fn base_url(&self) -> &str {
        self.api.base_url()
    }

    fn vnc_url(&self) -> &str {
        &self.vnc_url
    }

    fn cdp_url(&self) -> &str {
        &self.cdp_url
    }

    async fn ensure_ready(&self) -> Result<(), SandboxError> {
        match self.verify_ready().await {
            Err(e) if e.is_readiness_timeout() && !self.readiness.strict => {
                warn!("Continuing with sandbox {} although {}", self.id, e);
                Ok(())
            }
            outcome => outcome,
        }
    }

    async fn verify_ready(&self) -> Result<(), SandboxError> {
        wait_until_ready(&self.api, self.probe, &self.readiness).await
    }

    async fn exec_command(&self, session_id: &str, exec_dir: &str, command: &str) -> ToolResult {
        self.call(
            &self.routes.exec,
            json!({ "id": session_id, "exec_dir": exec_dir, "command": command }),
        )
        .await
    }

    async fn view_shell(&self, session_id: &str, console: bool) -> ToolResult {
        self.call(&self.routes.view, json!({ "id": session_id, "console": console }))
            .await
    }

    async fn wait_for_process(&self, session_id: &str, seconds: Option<u64>) -> ToolResult {
        self.call(&self.routes.wait, json!({ "id": session_id, "seconds": seconds }))
            .await
    }

    async fn write_to_process(
        &self,
        session_id: &str,
        input: &str,
        press_enter: bool,
    ) -> ToolResult {
        self.call(
            &self.routes.write_input,
            json!({ "id": session_id, "input": input, "press_enter": press_enter }),
        )
        .await
    }

    async fn kill_process(&self, session_id: &str) -> ToolResult {
        self.call(&self.routes.kill, json!({ "id": session_id })).await
    }

    async fn file_write(&self, request: FileWrite) -> ToolResult {
        // Replaying an append would duplicate the content
        let plan = if request.append {
            self.routes.file_write.replay(Replay::Unsent)
        } else {
            self.routes.file_write
        };
        match serde_json::to_value(&request) {
            Ok(body) => self.call(&plan, body).await,
            Err(e) => ToolResult::failure(format!("{} failed: {e}", plan.label)),
        }
    }

    async fn file_read(&self, request: FileRead) -> ToolResult {
        match serde_json::to_value(&request) {
            Ok(body) => self.call(&self.routes.file_read, body).await,
            Err(e) => ToolResult::failure(format!("{} failed: {e}", self.routes.file_read.label)),
        }
    }

    async fn file_exists(&self, path: &str) -> ToolResult {
        self.call(&self.routes.file_exists, json!({ "path": path })).await
    }

    async fn file_delete(&self, path: &str) -> ToolResult {
        self.call(&self.routes.file_delete, json!({ "path": path })).await
    }

    async fn file_list(&self, path: &str) -> ToolResult {
        self.call(&self.routes.file_list, json!({ "path": path })).await
    }

    async fn file_replace(
        &self,
        file: &str,
        old_str: &str,
        new_str: &str,
        sudo: bool,
    ) -> ToolResult {
        self.call(
            &self.routes.file_replace,
            json!({ "file": file, "old_str": old_str, "new_str": new_str, "sudo": sudo }),
        )
        .await
    }

    async fn file_search(&self, file: &str, regex: &str, sudo: bool) -> ToolResult {
        self.call(
            &self.routes.file_search,
            json!({ "file": file, "regex": regex, "sudo": sudo }),
        )
        .await
    }

    async fn file_find(&self, path: &str, glob: &str) -> ToolResult {
        self.call(&self.routes.file_find, json!({ "path": path, "glob": glob }))
            .await
    }

    async fn file_upload(&self, data: Bytes, path: &str, filename: Option<&str>) -> ToolResult {
        if self.is_closed() {
            return ToolResult::failure(format!("Sandbox {} has been destroyed", self.id));
        }
        self.api
            .upload(&self.routes.file_upload, data, path, filename.unwrap_or("upload"))
            .await
    }

    async fn file_download(&self, path: &str) -> Result<Cursor<Bytes>, SandboxError> {
        if self.is_closed() {
            return Err(SandboxError::download(format!(
                "sandbox {} has been destroyed",
                self.id
            )));
        }
        let bytes = self.api.download(&self.routes.file_download, path).await?;
        Ok(Cursor::new(bytes))
    }

    fn browser(&self) -> BrowserHandle {
        BrowserHandle::new(self.cdp_url.as_str(), self.api.client().clone())
    }

    async fn destroy(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Sandbox {} already destroyed", self.id);
            return true;
        }

        if let Some(cache) = self.cache.upgrade() {
            cache.evict(&self.id);
        }

        let Some(name) = &self.teardown else {
            debug!("Sandbox {} is not owned here; leaving it running", self.id);
            return true;
        };

        match self.runtime.remove(name).await {
            Ok(()) => {
                info!("Destroyed {} sandbox {}", self.kind, name);
                true
            }
            Err(e) => {
                error!("Failed to destroy {} sandbox {}: {}", self.kind, name, e);
                false
            }
        }
    }
}
