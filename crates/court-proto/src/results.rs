//! Results model — the aggregation target for a single availability job.
//!
//! A `ResultsTable` maps date → court → `CellValue`.  Dates keep first-seen
//! order (the daemon walks the range chronologically, but partials may arrive
//! for any date once reconnection enters the picture).  Courts inside a date
//! are an unordered map; the renderer imposes the fixed 1..7 grid.
//!
//! A cell that is absent means "pending" — the daemon has not reported it
//! yet.  Pending has no wire representation.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Marker string the wire format uses for a failed cell check.
const ERROR_MARKER: &str = "ERROR";

/// The value recorded for one (date, court) cell.
///
/// On the wire this is either the string `"ERROR"` or a JSON array of slot
/// labels; an empty array means the court was checked and nothing is free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    /// Checking this cell failed on the backend.
    Unavailable,
    /// Ordered slot labels, e.g. `["09:00-10:00", "18:00-19:00"]`.
    Slots(Vec<String>),
}

impl CellValue {
    pub fn slots(labels: &[&str]) -> Self {
        CellValue::Slots(labels.iter().map(|s| s.to_string()).collect())
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Unavailable => serializer.serialize_str(ERROR_MARKER),
            CellValue::Slots(slots) => slots.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Any bare string is treated as the error marker — the backend only
        // ever emits "ERROR", but an unknown marker is still not a slot list.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Slots(Vec<String>),
            Marker(String),
        }
        Ok(match Wire::deserialize(deserializer)? {
            Wire::Slots(slots) => CellValue::Slots(slots),
            Wire::Marker(_) => CellValue::Unavailable,
        })
    }
}

// ── ResultsTable ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
struct DateEntry {
    date: String,
    courts: HashMap<String, CellValue>,
}

/// Date → court → value, with dates kept in first-seen order.
///
/// The table only grows: `set` inserts or overwrites, nothing deletes.  The
/// single exception is `replace_all`, which installs the terminal snapshot
/// delivered with a `done` event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsTable {
    dates: Vec<DateEntry>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of recorded cells across all dates.
    pub fn cell_count(&self) -> usize {
        self.dates.iter().map(|d| d.courts.len()).sum()
    }

    /// Insert or overwrite one cell.  Last write wins; the backend is the
    /// source of truth, so no regression check is applied.  Court ids outside
    /// the rendered 1..7 grid are recorded anyway.
    pub fn set(&mut self, date: &str, court: &str, value: CellValue) {
        let entry = match self.dates.iter_mut().find(|d| d.date == date) {
            Some(e) => e,
            None => {
                self.dates.push(DateEntry {
                    date: date.to_string(),
                    courts: HashMap::new(),
                });
                self.dates.last_mut().unwrap()
            }
        };
        entry.courts.insert(court.to_string(), value);
    }

    pub fn get(&self, date: &str, court: &str) -> Option<&CellValue> {
        self.dates
            .iter()
            .find(|d| d.date == date)
            .and_then(|d| d.courts.get(court))
    }

    /// Replace the whole table with a terminal snapshot.  O(total cells).
    pub fn replace_all(&mut self, snapshot: ResultsTable) {
        *self = snapshot;
    }

    /// Date keys in first-seen order.
    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.dates.iter().map(|d| d.date.as_str())
    }

    /// All courts recorded for a date (unordered).
    pub fn courts(&self, date: &str) -> Option<&HashMap<String, CellValue>> {
        self.dates.iter().find(|d| d.date == date).map(|d| &d.courts)
    }
}

// Wire form is a plain JSON object-of-objects; the manual impls preserve the
// document's date order, which HashMap-backed derives would scramble.
impl Serialize for ResultsTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.dates.len()))?;
        for entry in &self.dates {
            map.serialize_entry(&entry.date, &entry.courts)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ResultsTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = ResultsTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of date → court → value")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut table = ResultsTable::new();
                while let Some((date, courts)) =
                    access.next_entry::<String, HashMap<String, CellValue>>()?
                {
                    table.dates.push(DateEntry { date, courts });
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_preserves_date_insertion_order() {
        let mut t = ResultsTable::new();
        t.set("2024-03-02", "1", CellValue::Slots(vec![]));
        t.set("2024-03-01", "1", CellValue::Slots(vec![]));
        t.set("2024-03-02", "2", CellValue::Unavailable);
        let dates: Vec<&str> = t.dates().collect();
        assert_eq!(dates, vec!["2024-03-02", "2024-03-01"]);
    }

    #[test]
    fn set_is_last_write_wins() {
        let mut t = ResultsTable::new();
        t.set("2024-03-01", "3", CellValue::slots(&["10:00"]));
        t.set("2024-03-01", "3", CellValue::Unavailable);
        assert_eq!(t.get("2024-03-01", "3"), Some(&CellValue::Unavailable));
    }

    #[test]
    fn partials_never_delete_cells() {
        let mut t = ResultsTable::new();
        t.set("2024-03-01", "1", CellValue::slots(&["10:00"]));
        t.set("2024-03-01", "2", CellValue::Unavailable);
        t.set("2024-03-02", "5", CellValue::Slots(vec![]));
        assert_eq!(t.cell_count(), 3);
        t.set("2024-03-01", "1", CellValue::Slots(vec![]));
        assert_eq!(t.cell_count(), 3);
        assert!(t.get("2024-03-01", "2").is_some());
        assert!(t.get("2024-03-02", "5").is_some());
    }

    #[test]
    fn replace_all_supersedes_partials() {
        let mut t = ResultsTable::new();
        t.set("2024-01-01", "3", CellValue::slots(&["10:00"]));
        let mut snapshot = ResultsTable::new();
        snapshot.set("2024-01-01", "3", CellValue::Unavailable);
        t.replace_all(snapshot);
        assert_eq!(t.get("2024-01-01", "3"), Some(&CellValue::Unavailable));
        assert_eq!(t.cell_count(), 1);
    }

    #[test]
    fn cell_value_wire_format() {
        assert_eq!(
            serde_json::to_string(&CellValue::Unavailable).unwrap(),
            "\"ERROR\""
        );
        assert_eq!(
            serde_json::to_string(&CellValue::slots(&["09:00-10:00"])).unwrap(),
            "[\"09:00-10:00\"]"
        );
        let v: CellValue = serde_json::from_str("\"ERROR\"").unwrap();
        assert_eq!(v, CellValue::Unavailable);
        let v: CellValue = serde_json::from_str("[]").unwrap();
        assert_eq!(v, CellValue::Slots(vec![]));
    }

    #[test]
    fn table_round_trips_with_date_order() {
        let json = r#"{"2024-03-02":{"1":["10:00"]},"2024-03-01":{"2":"ERROR"}}"#;
        let t: ResultsTable = serde_json::from_str(json).unwrap();
        let dates: Vec<&str> = t.dates().collect();
        assert_eq!(dates, vec!["2024-03-02", "2024-03-01"]);
        assert_eq!(serde_json::to_string(&t).unwrap(), json);
    }
}
