//! Wire protocol between the TUI client and the checker daemon.
//!
//! Submission is one JSON POST; everything after that arrives on a single
//! SSE stream multiplexing log lines, partial results, backend errors and
//! the terminal `done` event.

use serde::{Deserialize, Serialize};

use crate::results::{CellValue, ResultsTable};

/// The fixed court grid.  Rendering always shows courts 1..=7 regardless of
/// which courts a job actually reported.
pub const COURT_RANGE: std::ops::RangeInclusive<u32> = 1..=7;

/// Display label for a court, matching the backend's log wording.
pub fn court_label(court: u32) -> String {
    format!("Wooden Court {court}")
}

// ── Submission ────────────────────────────────────────────────────────────────

/// Body of `POST /check_slots`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    pub start_date: String,
    pub end_date: String,
}

/// Success response: the opaque handle for the spawned job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckAccepted {
    pub job_id: String,
}

/// Failure response body for any non-success status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

// ── Event stream ──────────────────────────────────────────────────────────────

/// One decoded message from the per-job event stream.
///
/// `Error` is non-terminal — it reports a backend-side failure for some unit
/// of work and the stream keeps going.  Only `Done` ends a job.  Unrecognized
/// `type` values land in `Unknown` so newer daemons stay compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Log {
        msg: String,
    },
    ResultPartial {
        date: String,
        court: String,
        value: CellValue,
    },
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        results: Option<ResultsTable>,
    },
    Error {
        msg: String,
    },
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Decode one SSE data payload.  Malformed input is not a fatal
    /// condition — the frame is dropped and the connection lives on.
    pub fn decode(payload: &str) -> Option<StreamEvent> {
        serde_json::from_str(payload).ok()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. })
    }
}
