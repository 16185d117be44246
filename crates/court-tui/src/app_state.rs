//! AppState — shared read-only data passed to all components during render
//! and event handling.  The App event loop is the only writer; it re-syncs
//! this snapshot from the lifecycle controller after every message.

use crate::lifecycle::Phase;
use crate::render::DisplayModel;

#[derive(Default)]
pub struct AppState {
    pub phase: Phase,
    pub elapsed_secs: u64,
    /// Visible log lines, arrival order.
    pub logs: Vec<String>,
    /// Current projection of the active results table.
    pub display: DisplayModel,
    /// Last submission failure, shown in the status bar until the next job.
    pub error_message: Option<String>,
}

impl AppState {
    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }
}
