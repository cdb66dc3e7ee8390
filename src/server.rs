//! HTTP front end for the machine.
//!
//! Thin axum adapter: decodes requests, calls the [`Machine`], and maps each
//! [`MachineError`] to its fixed status code.

use std::net::SocketAddr;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::MachineError;
use crate::machine::{Job, Machine, MachineState};

const OPENAPI_SPEC: &str = include_str!("openapi.yaml");

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Body of `POST /start-job`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StartJobRequest {
    pub product: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: MachineState,
    pub code: u8,
}

impl From<MachineState> for StatusReport {
    fn from(state: MachineState) -> Self {
        Self {
            state,
            code: state.code(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RetrieveParams {
    #[serde(rename = "jobID")]
    job_id: Option<String>,
}

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Machine(#[from] MachineError),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("missing jobID")]
    MissingJobId,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Machine(err) => StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::InvalidPayload(_) | ApiError::MissingJobId => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Short fixed messages; identifiers and entropy errors stay in the logs.
        let body = match &self {
            ApiError::Machine(MachineError::Busy) => "machine unavailable",
            ApiError::Machine(MachineError::UnsupportedProduct(_)) => "unsupported product",
            ApiError::Machine(MachineError::JobIdExists(_)) => "job ID already exists",
            ApiError::Machine(MachineError::NotFound(_)) => "job not found",
            ApiError::Machine(MachineError::NotReady(_)) => "job not ready",
            ApiError::Machine(MachineError::AlreadyRetrieved(_)) => "job already retrieved",
            ApiError::Machine(MachineError::IdGeneration(_)) => "internal error",
            ApiError::InvalidPayload(_) => "invalid payload",
            ApiError::MissingJobId => "missing jobID",
        };
        warn!(status = status.as_u16(), error = %self, "request rejected");

        (status, body).into_response()
    }
}

/// Build the router over an explicitly provided machine.
pub fn router(machine: Machine) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/status", get(status))
        .route("/start-job", post(start_job))
        .route("/retrieve-job", get(retrieve_job))
        .route("/history", get(history))
        .route("/metrics", get(metrics))
        .route("/openapi.yaml", get(openapi))
        .layer(middleware::from_fn(log_requests))
        .with_state(machine)
}

/// Bind `addr` and serve until SIGINT/SIGTERM.
///
/// Brew timers still pending at shutdown are dropped with the runtime.
pub async fn serve(addr: SocketAddr, machine: Machine) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(addr = %addr, "coffee machine listening");

    axum::serve(listener, router(machine))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("coffee machine stopped");
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(machine): State<Machine>) -> (StatusCode, &'static str) {
    if machine.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "busy")
    }
}

async fn status(State(machine): State<Machine>) -> (StatusCode, Json<StatusReport>) {
    let state = machine.status();
    let code = if state.accepts_jobs() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(state.into()))
}

async fn start_job(
    State(machine): State<Machine>,
    body: Bytes,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let req: StartJobRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

    let job = machine.start_job(&req.product, req.job_id.as_deref())?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

async fn retrieve_job(
    State(machine): State<Machine>,
    Query(params): Query<RetrieveParams>,
) -> Result<Json<Job>, ApiError> {
    let job_id = params
        .job_id
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::MissingJobId)?;

    Ok(Json(machine.retrieve_job(&job_id)?))
}

async fn history(State(machine): State<Machine>) -> Json<Vec<Job>> {
    Json(machine.history())
}

async fn metrics(State(machine): State<Machine>) -> impl IntoResponse {
    let body = render_metrics(machine.status(), machine.job_count());
    ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body)
}

async fn openapi() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/yaml")], OPENAPI_SPEC)
}

fn render_metrics(state: MachineState, jobs_total: usize) -> String {
    format!(
        "# HELP coffee_machine_status Current state of the coffee machine (0=available, 1=brewing, 2=blocked)\n\
         # TYPE coffee_machine_status gauge\n\
         coffee_machine_status {}\n\
         # HELP coffee_machine_jobs_total Jobs accepted since start\n\
         # TYPE coffee_machine_jobs_total counter\n\
         coffee_machine_jobs_total {}\n",
        state.code(),
        jobs_total
    )
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::FixedBrewTime;
    use axum::body::{Body, to_bytes};
    use axum::http::Method;
    use std::time::Duration;
    use tower::ServiceExt;

    fn machine_with_ms(ms: u64) -> Machine {
        Machine::with_brew_time(FixedBrewTime::from_millis(ms))
    }

    async fn send(machine: &Machine, method: Method, uri: &str, body: Option<&str>) -> Response {
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        let req = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap();
        router(machine.clone()).oneshot(req).await.unwrap()
    }

    async fn body_string(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn healthz_is_ok_even_when_busy() {
        let m = machine_with_ms(500);
        m.start_job("COFFEE", None).unwrap();

        let resp = send(&m, Method::GET, "/healthz", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "ok");
    }

    #[tokio::test]
    async fn readyz_tracks_availability() {
        let m = machine_with_ms(500);

        let resp = send(&m, Method::GET, "/readyz", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "ready");

        m.start_job("COFFEE", None).unwrap();
        let resp = send(&m, Method::GET, "/readyz", None).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_string(resp).await, "busy");
    }

    #[tokio::test]
    async fn status_reports_state_and_code() {
        let m = machine_with_ms(500);

        let resp = send(&m, Method::GET, "/status", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let report: StatusReport = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(report, StatusReport { state: MachineState::Available, code: 0 });

        m.start_job("COFFEE", None).unwrap();
        let resp = send(&m, Method::GET, "/status", None).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let value: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(value["state"], "brewing");
        assert_eq!(value["code"], 1);
    }

    #[tokio::test]
    async fn start_job_accepts_and_returns_job() {
        let m = machine_with_ms(500);

        let resp = send(
            &m,
            Method::POST,
            "/start-job",
            Some(r#"{"product":"CAPPUCCINO","jobId":"order-7"}"#),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        let job: Job = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(job.job_id, "order-7");
        assert_eq!(job.product.to_string(), "CAPPUCCINO");
        assert!(job.job_retrieved.is_none());
        assert_eq!(m.status(), MachineState::Brewing);
    }

    #[tokio::test]
    async fn start_job_error_mapping() {
        let m = machine_with_ms(500);

        let resp = send(&m, Method::POST, "/start-job", Some(r#"{"product":"INVALID"}"#)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(resp).await, "unsupported product");

        let resp = send(&m, Method::POST, "/start-job", Some(r#"{"product":"KAKAO","jobId":"k"}"#)).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        let resp = send(&m, Method::POST, "/start-job", Some(r#"{"product":"KAKAO","jobId":"k"}"#)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = send(&m, Method::POST, "/start-job", Some(r#"{"product":"KAKAO"}"#)).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_string(resp).await, "machine unavailable");
    }

    #[tokio::test]
    async fn start_job_rejects_bad_payloads() {
        let m = machine_with_ms(500);

        for body in [
            "not json",
            r#"{"jobId":"x"}"#,
            r#"{"product":"COFFEE","size":"large"}"#,
        ] {
            let resp = send(&m, Method::POST, "/start-job", Some(body)).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(body_string(resp).await, "invalid payload");
        }
        assert!(m.history().is_empty());

        let resp = send(&m, Method::GET, "/start-job", None).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn retrieve_job_uses_job_id_parameter() {
        let m = machine_with_ms(1);
        let job = m.start_job("ESPRESSO", None).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let uri = format!("/retrieve-job?jobID={}", job.job_id);
        let resp = send(&m, Method::GET, &uri, None).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let got: Job = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(got.job_id, job.job_id);
        assert!(got.job_retrieved.is_some());

        let resp = send(&m, Method::GET, &uri, None).await;
        assert_eq!(resp.status(), StatusCode::GONE);
    }

    #[tokio::test]
    async fn retrieve_job_missing_parameter() {
        let m = machine_with_ms(1);

        for uri in ["/retrieve-job", "/retrieve-job?jobId=legacy", "/retrieve-job?jobID="] {
            let resp = send(&m, Method::GET, uri, None).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
            assert_eq!(body_string(resp).await, "missing jobID");
        }
    }

    #[tokio::test]
    async fn retrieve_job_not_found_and_not_ready() {
        let m = machine_with_ms(500);

        let resp = send(&m, Method::GET, "/retrieve-job?jobID=nope", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        m.start_job("COFFEE", Some("slow")).unwrap();
        let resp = send(&m, Method::GET, "/retrieve-job?jobID=slow", None).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_string(resp).await, "job not ready");
    }

    #[tokio::test]
    async fn history_lists_jobs_in_order() {
        let m = machine_with_ms(1);
        for id in ["first", "second"] {
            m.start_job("HOT_WATER", Some(id)).unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            m.retrieve_job(id).unwrap();
        }

        let resp = send(&m, Method::GET, "/history", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let jobs: Vec<Job> = serde_json::from_str(&body_string(resp).await).unwrap();
        let ids: Vec<&str> = jobs.iter().map(|j| j.job_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn metrics_exports_state_gauge() {
        let m = machine_with_ms(500);
        m.start_job("COFFEE", None).unwrap();

        let resp = send(&m, Method::GET, "/metrics", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            METRICS_CONTENT_TYPE
        );
        let body = body_string(resp).await;
        assert!(body.contains("# TYPE coffee_machine_status gauge\n"));
        assert!(body.contains("\ncoffee_machine_status 1\n"));
        assert!(body.contains("\ncoffee_machine_jobs_total 1\n"));
    }

    #[test]
    fn render_metrics_for_each_state() {
        assert!(render_metrics(MachineState::Available, 0).contains("coffee_machine_status 0\n"));
        assert!(render_metrics(MachineState::Blocked, 3).contains("coffee_machine_status 2\n"));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let m = machine_with_ms(1);
        let resp = send(&m, Method::GET, "/openapi.yaml", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_string(resp).await;
        assert!(body.starts_with("openapi: 3.0.3"));
        assert!(body.contains("/retrieve-job"));
    }

    #[test]
    fn api_error_status_codes() {
        assert_eq!(ApiError::MissingJobId.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidPayload("eof".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(MachineError::AlreadyRetrieved("j".into())).status_code(),
            StatusCode::GONE
        );
        assert_eq!(
            ApiError::from(MachineError::IdGeneration("eof".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
