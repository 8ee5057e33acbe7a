use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::selection::SelectionService;
use crate::server::{self, AppState};

pub async fn run(config: Arc<Config>, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.bind.clone());

    match &config.sandbox_address {
        Some(address) => info!("Sandboxes are served from {}", address),
        None => info!("Sandboxes are provisioned through Docker"),
    }

    let state = AppState {
        selection: Arc::new(SelectionService::new(config)),
    };
    server::serve(state, &bind).await
}
