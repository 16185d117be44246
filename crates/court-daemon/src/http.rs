//! HTTP surface: job submission + per-job SSE event stream.
//!
//! `POST /check_slots` validates the range, registers a job, spawns the
//! runner and returns `{job_id}`.  `GET /events/{job_id}` replays the job's
//! event log as SSE frames, honouring `Last-Event-ID` so a dropped client can
//! resume where it left off instead of losing partials.  The stream ends only
//! after the terminal `done` event has been delivered; idle periods are
//! bridged with empty `data: {}` keep-alive frames.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use court_proto::config::CheckerConfig;
use court_proto::dates::DateRange;
use court_proto::protocol::{ApiError, CheckAccepted, StreamEvent};

use crate::checker::{run_job, SimulatedProber};
use crate::jobs::JobRegistry;

/// How long an SSE handler waits for new events before emitting a keep-alive.
const KEEPALIVE_IDLE: Duration = Duration::from_secs(15);

#[derive(Clone)]
struct HttpState {
    registry: Arc<JobRegistry>,
    prober: Arc<SimulatedProber>,
}

/// Build the daemon router.  Exposed for integration tests.
pub fn router(checker: CheckerConfig) -> Router {
    let state = HttpState {
        registry: Arc::new(JobRegistry::new()),
        prober: Arc::new(SimulatedProber::new(checker)),
    };
    Router::new()
        .route("/check_slots", post(check_slots))
        .route("/events/:job_id", get(events))
        .with_state(state)
}

pub fn start_server(
    bind_address: String,
    port: u16,
    checker: CheckerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(checker);
        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };
        info!("court-daemon listening on http://{}", addr);
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

// ── Submission ────────────────────────────────────────────────────────────────

/// Loose wire form — all fields optional so validation owns the error text.
#[derive(Debug, Default, Deserialize)]
struct CheckSlotsBody {
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn check_slots(
    State(state): State<HttpState>,
    body: Option<Json<CheckSlotsBody>>,
) -> Result<Json<CheckAccepted>, (StatusCode, Json<ApiError>)> {
    let Json(body) = body.unwrap_or_default();
    let range = DateRange::parse(
        body.start_date.as_deref().unwrap_or(""),
        body.end_date.as_deref(),
    )
    .map_err(|e| {
        warn!("rejected check request: {e}");
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: e.to_string(),
            }),
        )
    })?;

    let (job_id, job) = state.registry.create().await;
    info!(
        "job {job_id}: checking {} → {}",
        range.start_string(),
        range.end_string()
    );
    let prober = Arc::clone(&state.prober);
    tokio::spawn(run_job(range, prober, job));

    Ok(Json(CheckAccepted { job_id }))
}

// ── Event stream ──────────────────────────────────────────────────────────────

async fn events(
    Path(job_id): Path<String>,
    State(state): State<HttpState>,
    headers: HeaderMap,
) -> Sse<BoxStream<'static, Result<Event, Infallible>>> {
    let Some(job) = state.registry.get(&job_id).await else {
        warn!("events request for unknown job {job_id}");
        let err = StreamEvent::Error {
            msg: "unknown job_id".to_string(),
        };
        let frame = Event::default().data(serde_json::to_string(&err).unwrap_or_default());
        return Sse::new(stream::once(async move { Ok(frame) }).boxed());
    };

    // Resume after the last frame the client acknowledged, if any.
    let cursor = headers
        .get("last-event-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .map(|id| id + 1)
        .unwrap_or(0);
    if cursor > 0 {
        info!("events for job {job_id}: resuming at {cursor}");
    }

    let stream = stream::unfold((job, cursor), |(job, cursor)| async move {
        loop {
            // Register the wakeup before checking the log, or a push landing
            // between the check and the await is lost.
            let notified = job.notified();
            if let Some(event) = job.event_at(cursor).await {
                let frame = Event::default()
                    .id(cursor.to_string())
                    .data(serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string()));
                // The wakeup guard borrows `job`; release it before moving
                // `job` into the next unfold state.
                drop(notified);
                return Some((Ok(frame), (job, cursor + 1)));
            }
            if job.is_finished() {
                // Whole log delivered, terminal event included: end the stream.
                return None;
            }
            if tokio::time::timeout(KEEPALIVE_IDLE, notified).await.is_err() {
                let ping = Event::default().data("{}");
                return Some((Ok(ping), (job, cursor)));
            }
        }
    });

    Sse::new(stream.boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn instant() -> CheckerConfig {
        CheckerConfig {
            probe_delay_ms: 0,
            failure_one_in: 0,
        }
    }

    async fn post_json(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::post("/check_slots")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn submission_returns_a_job_id() {
        let (status, body) = post_json(router(instant()), r#"{"start_date":"2024-03-01"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["job_id"].as_str().unwrap().len(), 32);
    }

    #[tokio::test]
    async fn submission_rejects_bad_ranges_with_the_original_messages() {
        let cases = [
            (r#"{}"#, "start_date is required"),
            (
                r#"{"start_date":"2024-03-05","end_date":"2024-03-01"}"#,
                "end_date must be same or after start_date",
            ),
            (
                r#"{"start_date":"2024-03-01","end_date":"2024-03-09"}"#,
                "Maximum allowed window is 3 days",
            ),
            (
                r#"{"start_date":"01-03-2024"}"#,
                "dates must be YYYY-MM-DD",
            ),
        ];
        for (body, expected) in cases {
            let (status, json) = post_json(router(instant()), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json["error"], expected, "body: {body}");
        }
    }

    #[tokio::test]
    async fn unknown_job_yields_a_single_error_event() {
        let app = router(instant());
        let response = app
            .oneshot(
                Request::get("/events/deadbeef")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains(r#""type":"error""#), "got: {text}");
        assert!(text.contains("unknown job_id"), "got: {text}");
    }

    #[tokio::test]
    async fn event_stream_ends_after_done() {
        let app = router(instant());
        let (status, body) =
            post_json(app.clone(), r#"{"start_date":"2024-03-01"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let job_id = body["job_id"].as_str().unwrap();

        // The whole body is readable because the stream closes after `done`.
        let response = app
            .oneshot(
                Request::get(format!("/events/{job_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 22)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains(r#""type":"result_partial""#));
        let done_count = text.matches(r#""type":"done""#).count();
        assert_eq!(done_count, 1);
        // 7 partials for the single date.
        assert_eq!(text.matches(r#""type":"result_partial""#).count(), 7);
    }
}
