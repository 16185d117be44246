//! Terminal client for the court availability checker.
//!
//! Submits a date range to the daemon, consumes the job's event stream and
//! renders the per-date court grid as results trickle in.

pub mod action;
pub mod aggregator;
pub mod app;
pub mod app_state;
pub mod client;
pub mod component;
pub mod components;
pub mod lifecycle;
pub mod render;
pub mod theme;
