//! ResultAggregator — folds stream events into the active results table.
//!
//! The aggregator owns the one mutable `ResultsTable` for the current job and
//! the ordered log history.  Every operation is synchronous and cheap; the
//! app event loop applies events strictly in arrival order, so no locking is
//! needed anywhere.

use court_proto::protocol::StreamEvent;
use court_proto::results::ResultsTable;

#[derive(Default)]
pub struct ResultAggregator {
    table: ResultsTable,
    logs: Vec<String>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all state for a new job.  The old table never outlives its
    /// job.
    pub fn reset(&mut self) {
        self.table = ResultsTable::new();
        self.logs.clear();
    }

    /// Fold one decoded event in.  Returns true when the event was terminal.
    pub fn apply(&mut self, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Log { msg } => {
                self.push_log(msg);
                false
            }
            StreamEvent::ResultPartial { date, court, value } => {
                // Last-write-wins, out-of-range courts recorded anyway —
                // rendering decides what to show.
                self.table.set(&date, &court, value);
                false
            }
            StreamEvent::Done { results } => {
                if let Some(snapshot) = results {
                    // The backend's final view supersedes every partial.
                    self.table.replace_all(snapshot);
                }
                true
            }
            StreamEvent::Error { msg } => {
                // Non-terminal: recorded, table untouched, stream continues.
                self.push_log(format!("ERROR: {msg}"));
                false
            }
            StreamEvent::Unknown => false,
        }
    }

    /// Append one line to the visible log (arrival order, no dedup).
    pub fn push_log(&mut self, msg: String) {
        self.logs.push(msg);
    }

    pub fn table(&self) -> &ResultsTable {
        &self.table
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_proto::results::CellValue;

    fn partial(date: &str, court: &str, value: CellValue) -> StreamEvent {
        StreamEvent::ResultPartial {
            date: date.into(),
            court: court.into(),
            value,
        }
    }

    #[test]
    fn partials_accumulate_without_loss() {
        let mut agg = ResultAggregator::new();
        agg.apply(partial("2024-03-01", "1", CellValue::Slots(vec![])));
        agg.apply(partial("2024-03-01", "2", CellValue::slots(&["09:00-10:00"])));
        agg.apply(partial("2024-03-02", "1", CellValue::Unavailable));
        assert_eq!(agg.table().cell_count(), 3);
        assert_eq!(
            agg.table().get("2024-03-01", "2"),
            Some(&CellValue::slots(&["09:00-10:00"]))
        );
    }

    #[test]
    fn done_snapshot_wins_over_earlier_partials() {
        let mut agg = ResultAggregator::new();
        agg.apply(partial("2024-01-01", "3", CellValue::slots(&["10:00"])));
        let mut snapshot = ResultsTable::new();
        snapshot.set("2024-01-01", "3", CellValue::Unavailable);
        let terminal = agg.apply(StreamEvent::Done {
            results: Some(snapshot),
        });
        assert!(terminal);
        assert_eq!(
            agg.table().get("2024-01-01", "3"),
            Some(&CellValue::Unavailable)
        );
    }

    #[test]
    fn done_without_snapshot_leaves_the_table_as_is() {
        let mut agg = ResultAggregator::new();
        agg.apply(partial("2024-03-01", "5", CellValue::Slots(vec![])));
        let terminal = agg.apply(StreamEvent::Done { results: None });
        assert!(terminal);
        assert_eq!(agg.table().cell_count(), 1);
    }

    #[test]
    fn logs_keep_arrival_order_and_duplicates() {
        let mut agg = ResultAggregator::new();
        agg.apply(StreamEvent::Log { msg: "a".into() });
        agg.apply(StreamEvent::Error { msg: "x".into() });
        agg.apply(StreamEvent::Log { msg: "a".into() });
        assert_eq!(agg.logs(), &["a", "ERROR: x", "a"]);
        // Error events never touch the table.
        assert!(agg.table().is_empty());
    }

    #[test]
    fn unknown_events_are_noops() {
        let mut agg = ResultAggregator::new();
        assert!(!agg.apply(StreamEvent::Unknown));
        assert!(agg.table().is_empty());
        assert!(agg.logs().is_empty());
    }

    #[test]
    fn out_of_range_court_is_recorded() {
        let mut agg = ResultAggregator::new();
        agg.apply(partial("2024-03-01", "9", CellValue::Slots(vec![])));
        assert!(agg.table().get("2024-03-01", "9").is_some());
    }

    #[test]
    fn reset_discards_table_and_logs() {
        let mut agg = ResultAggregator::new();
        agg.apply(partial("2024-03-01", "1", CellValue::Slots(vec![])));
        agg.apply(StreamEvent::Log { msg: "a".into() });
        agg.reset();
        assert!(agg.table().is_empty());
        assert!(agg.logs().is_empty());
    }
}
