//! Client-side error taxonomy for job submission and streaming.

use thiserror::Error;

/// What went wrong while talking to the daemon.
///
/// Only submission-time errors are fatal to a job attempt.  Transport drops
/// on the event stream are logged and retried by the subscriber; they never
/// move the lifecycle to Failed.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend rejected the submission (non-success status).  Carries the
    /// response body's `error` field when present.
    #[error("{0}")]
    Request(String),

    /// The backend answered success but the payload made no sense.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Could not reach the backend at all.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
