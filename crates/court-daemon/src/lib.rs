//! Checker daemon — job registry, availability prober, HTTP/SSE surface.
//!
//! Exposed as a library so integration tests can mount the router on an
//! ephemeral port and drive the real client against it.

pub mod checker;
pub mod http;
pub mod jobs;
