use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::schema::{
    variant_comparison, ApiResponse, KindQuery, SandboxStatusResponse, SandboxTypeRequest,
    SandboxTypeResponse,
};
use super::AppState;
use crate::sandbox::factory::SandboxFactory;
use crate::sandbox::{SandboxError, SandboxKind};
use crate::selection::HealthReport;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/sandbox/type", get(get_sandbox_type).post(set_sandbox_type))
        .route("/sandbox/status/{sandbox_id}", get(sandbox_status))
        .route("/sandbox/health", get(sandbox_health))
        .route("/sandbox/compare", get(compare_sandbox_types))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn not_found(req: axum::extract::Request) -> impl IntoResponse {
    warn!("unhandled path: {}", req.uri());
    ApiError::new(StatusCode::NOT_FOUND, "Not Found")
}

/// Error response in the `{code, msg, data: null}` envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Prefixes server errors with what was being attempted.
    fn context(self, what: &str) -> Self {
        if self.status.is_server_error() {
            Self {
                message: format!("{what}: {}", self.message),
                ..self
            }
        } else {
            self
        }
    }
}

impl From<SandboxError> for ApiError {
    fn from(err: SandboxError) -> Self {
        let status = if err.is_configuration() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.status.as_u16(),
            "msg": self.message,
            "data": null,
        }));
        (self.status, body).into_response()
    }
}

fn parse_kind(query: &KindQuery) -> Result<Option<SandboxKind>, ApiError> {
    query
        .sandbox_type
        .as_deref()
        .map(SandboxFactory::parse_kind)
        .transpose()
        .map_err(ApiError::from)
}

async fn get_sandbox_type(State(state): State<AppState>) -> Json<ApiResponse<SandboxTypeResponse>> {
    let selection = &state.selection;
    Json(ApiResponse::success(SandboxTypeResponse::new(
        selection.default_kind(),
        selection.is_aio_enabled(),
    )))
}

/// Validates a variant preference. Nothing is persisted.
async fn set_sandbox_type(
    State(state): State<AppState>,
    payload: Result<Json<SandboxTypeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SandboxTypeResponse>>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.body_text()))?;
    let selection = &state.selection;
    let kind = selection.validate_preference(SandboxFactory::parse_kind(&request.sandbox_type)?)?;
    info!("Requested sandbox type: {}", kind);

    Ok(Json(ApiResponse::success(SandboxTypeResponse::new(
        selection.default_kind(),
        selection.is_aio_enabled(),
    ))))
}

async fn sandbox_status(
    State(state): State<AppState>,
    Path(sandbox_id): Path<String>,
    Query(query): Query<KindQuery>,
) -> Result<Json<ApiResponse<SandboxStatusResponse>>, ApiError> {
    let kind = parse_kind(&query)?;

    let sandbox = state
        .selection
        .get_sandbox(&sandbox_id, kind)
        .await
        .map_err(|e| {
            error!("Failed to get sandbox status: {}", e);
            ApiError::from(e).context("Failed to get sandbox status")
        })?;

    info!("Status requested for sandbox {}", sandbox_id);
    Ok(Json(ApiResponse::success(SandboxStatusResponse {
        sandbox_id: sandbox.id().to_string(),
        sandbox_type: sandbox.kind(),
        // Liveness of the container itself is not probed
        status: "running".to_string(),
        base_url: sandbox.base_url().to_string(),
        vnc_url: sandbox.vnc_url().to_string(),
        cdp_url: sandbox.cdp_url().to_string(),
    })))
}

/// Provisions a throwaway sandbox and reports how long it took to get ready.
///
/// The probe runs on its own task so the sandbox is still destroyed if the
/// client disconnects mid-check.
async fn sandbox_health(
    State(state): State<AppState>,
    Query(query): Query<KindQuery>,
) -> Result<Json<ApiResponse<HealthReport>>, ApiError> {
    let kind = parse_kind(&query)?;
    let selection = state.selection.clone();

    let report = tokio::spawn(async move { selection.check_health(kind).await })
        .await
        .map_err(|e| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Sandbox health check aborted: {e}"),
            )
        })?;

    Ok(Json(ApiResponse::success(report)))
}

async fn compare_sandbox_types(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let selection = &state.selection;
    Json(ApiResponse::success(variant_comparison(
        selection.default_kind(),
        selection.is_aio_enabled(),
    )))
}
