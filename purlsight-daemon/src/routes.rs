//! HTTP routing for the issue service.
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | POST | `/api/v2/semgrep/echo` | `Echo` |
//! | POST | `/api/v2/semgrep/issues` | `GetIssues` |
//! | POST | `/api/v2/semgrep/components/issues` | `GetComponentsIssues` |
//! | POST | `/api/v2/semgrep/component/issues` | `GetComponentIssues` |
//! | GET | `/health` | aggregated health |
//!
//! Every request runs inside a `request` span carrying a fresh request id.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use purlsight_core::HealthStatus;
use purlsight_issue_resolver::{BulkKeyValueStore, ComponentRepository};

use crate::health::{
    DATABASE_MODULE, DaemonHealth, LDB_MODULE, ModuleHealth, aggregate_status, database_status,
};
use crate::service::{
    ComponentRequest, ComponentsRequest, EchoRequest, FailureResponse, IssueService, PurlRequest,
    ServiceError,
};

/// Shared state behind every handler.
pub struct AppState<R, S> {
    service: IssueService<R, S>,
    /// LDB status determined by the startup table check.
    ldb_status: HealthStatus,
    started_at: Instant,
}

impl<R: ComponentRepository, S: BulkKeyValueStore> AppState<R, S> {
    pub fn new(service: IssueService<R, S>, ldb_status: HealthStatus) -> Self {
        Self {
            service,
            ldb_status,
            started_at: Instant::now(),
        }
    }

    pub fn service(&self) -> &IssueService<R, S> {
        &self.service
    }

    /// Ping the database and combine it with the LDB status.
    pub async fn health(&self) -> DaemonHealth {
        let ping = self.service.resolver().repository().ping().await;
        let modules = vec![
            ModuleHealth::enabled(DATABASE_MODULE, database_status(ping)),
            ModuleHealth::enabled(LDB_MODULE, self.ldb_status.clone()),
        ];
        DaemonHealth {
            status: aggregate_status(&modules),
            uptime_secs: self.started_at.elapsed().as_secs(),
            modules,
        }
    }
}

/// Build the API router.
pub fn router<R: ComponentRepository, S: BulkKeyValueStore>(state: Arc<AppState<R, S>>) -> Router {
    Router::new()
        .route("/api/v2/semgrep/echo", post(echo::<R, S>))
        .route("/api/v2/semgrep/issues", post(get_issues::<R, S>))
        .route(
            "/api/v2/semgrep/components/issues",
            post(get_components_issues::<R, S>),
        )
        .route(
            "/api/v2/semgrep/component/issues",
            post(get_component_issues::<R, S>),
        )
        .route("/health", get(health::<R, S>))
        .with_state(state)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let code = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            code,
            Json(FailureResponse {
                status: self.status(),
            }),
        )
            .into_response()
    }
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        ServiceError::BadRequest(format!(
            "Problem parsing request data: {}",
            rejection.body_text()
        ))
    })
}

fn respond<T: Serialize>(result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Run `fut` inside a `request` span with a new request id.
async fn traced<F: Future<Output = Response>>(operation: &'static str, fut: F) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("request", %request_id, operation);
    async move {
        let started = Instant::now();
        let response = fut.await;
        debug!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        response
    }
    .instrument(span)
    .await
}

async fn echo<R: ComponentRepository, S: BulkKeyValueStore>(
    State(state): State<Arc<AppState<R, S>>>,
    payload: Result<Json<EchoRequest>, JsonRejection>,
) -> Response {
    traced("echo", async move {
        respond(parse_body(payload).map(|req| state.service.echo(req)))
    })
    .await
}

async fn get_issues<R: ComponentRepository, S: BulkKeyValueStore>(
    State(state): State<Arc<AppState<R, S>>>,
    payload: Result<Json<PurlRequest>, JsonRejection>,
) -> Response {
    traced("get_issues", async move {
        let request = match parse_body(payload) {
            Ok(request) => request,
            Err(e) => return e.into_response(),
        };
        respond(state.service.get_issues(request).await)
    })
    .await
}

async fn get_components_issues<R: ComponentRepository, S: BulkKeyValueStore>(
    State(state): State<Arc<AppState<R, S>>>,
    payload: Result<Json<ComponentsRequest>, JsonRejection>,
) -> Response {
    traced("get_components_issues", async move {
        let request = match parse_body(payload) {
            Ok(request) => request,
            Err(e) => return e.into_response(),
        };
        respond(state.service.get_components_issues(request).await)
    })
    .await
}

async fn get_component_issues<R: ComponentRepository, S: BulkKeyValueStore>(
    State(state): State<Arc<AppState<R, S>>>,
    payload: Result<Json<ComponentRequest>, JsonRejection>,
) -> Response {
    traced("get_component_issues", async move {
        let request = match parse_body(payload) {
            Ok(request) => request,
            Err(e) => return e.into_response(),
        };
        respond(state.service.get_component_issues(request).await)
    })
    .await
}

async fn health<R: ComponentRepository, S: BulkKeyValueStore>(
    State(state): State<Arc<AppState<R, S>>>,
) -> Response {
    let report = state.health().await;
    let code = if report.status.is_unhealthy() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(report)).into_response()
}
