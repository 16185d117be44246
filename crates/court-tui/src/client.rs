//! HTTP client for the checker daemon: one-shot job submission plus the
//! long-lived SSE subscriber task.
//!
//! The subscriber owns its connection.  Transport drops before the terminal
//! `done` are diagnostics, not failures: the task logs them, waits, and
//! reconnects with `Last-Event-ID` so the daemon resumes the replay.  On
//! `done` the task forwards the event and returns, which closes the
//! connection — the one place where "just drop it" is not good enough is a
//! finished job, where a dangling auto-reconnect loop would hammer the
//! daemon forever.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use court_proto::dates::DateRange;
use court_proto::error::ClientError;
use court_proto::protocol::{ApiError, CheckAccepted, CheckRequest, StreamEvent};

use crate::app::AppMessage;

/// Delay before reattempting a dropped stream connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

// ── Job submission ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct JobClient {
    http: reqwest::Client,
    base_url: String,
}

impl JobClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Submit a validated range.  One attempt, no retries — the caller
    /// decides what a failure means.
    pub async fn submit(&self, range: &DateRange) -> Result<String, ClientError> {
        let body = CheckRequest {
            start_date: range.start_string(),
            end_date: range.end_string(),
        };
        let resp = self
            .http
            .post(format!("{}/check_slots", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<ApiError>().await {
                Ok(api) => api.error,
                Err(_) => format!("Request failed (HTTP {status})"),
            };
            return Err(ClientError::Request(message));
        }

        let accepted: CheckAccepted = resp
            .json()
            .await
            .map_err(|_| ClientError::Protocol("missing job id".to_string()))?;
        if accepted.job_id.is_empty() {
            return Err(ClientError::Protocol("missing job id".to_string()));
        }
        Ok(accepted.job_id)
    }

    /// Spawn the stream subscriber for `job_id`.  Every decoded event is
    /// forwarded to `tx`; the task exits after forwarding `done`.  The
    /// returned handle lets a new submission abort a stale stream before
    /// opening its own.
    pub fn subscribe(&self, job_id: String, tx: mpsc::Sender<AppMessage>) -> AbortHandle {
        let http = self.http.clone();
        let url = format!("{}/events/{}", self.base_url, job_id);
        tokio::spawn(async move {
            let mut last_event_id: Option<u64> = None;
            'connect: loop {
                let mut req = http.get(&url);
                if let Some(id) = last_event_id {
                    req = req.header("Last-Event-ID", id.to_string());
                }
                let resp = match req.send().await {
                    Ok(r) if r.status().is_success() => r,
                    Ok(r) => {
                        notice(&tx, format!("event stream HTTP {}; retrying", r.status())).await;
                        tokio::time::sleep(RECONNECT_DELAY).await;
                        continue 'connect;
                    }
                    Err(e) => {
                        notice(&tx, format!("event stream unreachable: {e}; retrying")).await;
                        tokio::time::sleep(RECONNECT_DELAY).await;
                        continue 'connect;
                    }
                };

                info!("event stream open for job {job_id}");
                let mut decoder = SseDecoder::new();
                let mut bytes = resp.bytes_stream();
                loop {
                    match bytes.next().await {
                        Some(Ok(chunk)) => {
                            for frame in decoder.push(&chunk) {
                                if let Some(id) = frame.id {
                                    last_event_id = Some(id);
                                }
                                // Malformed frames (including keep-alive `{}`
                                // pings) decode to None and are dropped.
                                let Some(event) = StreamEvent::decode(&frame.data) else {
                                    debug!("dropping undecodable frame: {}", frame.data);
                                    continue;
                                };
                                let terminal = event.is_terminal();
                                if tx.send(AppMessage::Stream(event)).await.is_err() {
                                    return;
                                }
                                if terminal {
                                    // Explicit close on the terminal event —
                                    // nothing past `done` is ever forwarded.
                                    info!("job {job_id} done, closing event stream");
                                    return;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            warn!("event stream read error: {e}");
                            notice(&tx, format!("event stream interrupted: {e}; retrying")).await;
                            tokio::time::sleep(RECONNECT_DELAY).await;
                            continue 'connect;
                        }
                        None => {
                            // Server closed without a terminal event.
                            notice(&tx, "event stream closed early; retrying".to_string()).await;
                            tokio::time::sleep(RECONNECT_DELAY).await;
                            continue 'connect;
                        }
                    }
                }
            }
        })
        .abort_handle()
    }
}

async fn notice(tx: &mpsc::Sender<AppMessage>, msg: String) {
    let _ = tx.send(AppMessage::StreamNotice(msg)).await;
}

// ── SSE wire decoding ─────────────────────────────────────────────────────────

/// One complete server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub id: Option<u64>,
    pub data: String,
}

/// Incremental SSE frame splitter.  Chunks arrive at arbitrary boundaries;
/// frames are separated by a blank line.  Comment lines (leading ':') and
/// unknown fields are ignored; multiple `data:` lines within one frame are
/// joined with newlines, as SSE requires.
pub struct SseDecoder {
    // Raw bytes: a chunk boundary can land inside a multi-byte character,
    // so text conversion happens per complete frame, never per chunk.
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        // Normalize CRLF so the frame boundary is always "\n\n".  A lone
        // trailing '\r' stays put until its '\n' arrives.
        if self.buf.windows(2).any(|w| w == b"\r\n") {
            let mut out = Vec::with_capacity(self.buf.len());
            let mut i = 0;
            while i < self.buf.len() {
                if self.buf[i] == b'\r' && self.buf.get(i + 1) == Some(&b'\n') {
                    i += 1;
                    continue;
                }
                out.push(self.buf[i]);
                i += 1;
            }
            self.buf = out;
        }

        let mut frames = Vec::new();
        while let Some(split) = self.buf.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buf.drain(..split + 2).collect();
            let text = String::from_utf8_lossy(&raw);
            if let Some(frame) = parse_frame(text.trim_end_matches('\n')) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut id = None;
    let mut data_lines: Vec<&str> = Vec::new();
    for line in raw.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        } else if let Some(rest) = line.strip_prefix("id:") {
            id = rest.trim().parse::<u64>().ok();
        }
        // event:, retry:, anything else — ignored.
    }
    if data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        id,
        data: data_lines.join("\n"),
    })
}
