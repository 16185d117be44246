//! Action enum — user intents produced by components, dispatched by the App.

use court_proto::dates::DateRange;

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    DateForm,
    ResultsGrid,
    LogPanel,
}

/// All actions that can flow through the system.
#[derive(Debug, Clone)]
pub enum Action {
    /// Submit an already-validated date range.  Validation happens in the
    /// form, so a bad range can never reach the network path.
    Submit(DateRange),
    /// Surface a user-facing problem (validation failure etc.) in the log.
    ShowError(String),
    /// The booking affordance for one slot line.  Hook point only — logged,
    /// never executed.
    Book {
        date: String,
        court: String,
        slot: String,
    },
    FocusNext,
    Quit,
}
