//! Pure projection from a `ResultsTable` to the display structure.
//!
//! Every date shows the full fixed grid of courts 1..7 no matter which
//! courts have reported; cells with no data render as pending.  Projection
//! never touches the table and can run on every frame.

use court_proto::protocol::COURT_RANGE;
use court_proto::results::{CellValue, ResultsTable};

/// What one court cell shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellDisplay {
    /// Not reported yet.
    Pending,
    /// The check for this cell failed.
    Error,
    /// Checked, nothing free.
    NoSlots,
    /// Bookable slot labels, in reported order.
    Slots(Vec<String>),
}

impl CellDisplay {
    /// The placeholder text for non-slot cells, mirroring the booking page.
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            CellDisplay::Pending => Some("Pending..."),
            CellDisplay::Error => Some("ERROR while checking"),
            CellDisplay::NoSlots => Some("No available slots"),
            CellDisplay::Slots(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourtCell {
    /// Court id, "1".."7".
    pub court: String,
    pub display: CellDisplay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSection {
    pub date: String,
    /// Always exactly 7 cells, courts in numeric order.
    pub cells: Vec<CourtCell>,
}

/// A slot line paired with its booking affordance payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookableSlot {
    pub date: String,
    pub court: String,
    pub slot: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayModel {
    pub sections: Vec<DateSection>,
}

impl DisplayModel {
    pub fn project(table: &ResultsTable) -> Self {
        let sections = table
            .dates()
            .map(|date| {
                let courts = table.courts(date);
                let cells = COURT_RANGE
                    .map(|n| {
                        let id = n.to_string();
                        let display = match courts.and_then(|c| c.get(&id)) {
                            None => CellDisplay::Pending,
                            Some(CellValue::Unavailable) => CellDisplay::Error,
                            Some(CellValue::Slots(s)) if s.is_empty() => CellDisplay::NoSlots,
                            Some(CellValue::Slots(s)) => CellDisplay::Slots(s.clone()),
                        };
                        CourtCell { court: id, display }
                    })
                    .collect();
                DateSection {
                    date: date.to_string(),
                    cells,
                }
            })
            .collect();
        Self { sections }
    }

    /// All bookable slot lines in display order — the selection space for
    /// the booking affordance.
    pub fn bookable_slots(&self) -> Vec<BookableSlot> {
        let mut out = Vec::new();
        for section in &self.sections {
            for cell in &section.cells {
                if let CellDisplay::Slots(slots) = &cell.display {
                    for slot in slots {
                        out.push(BookableSlot {
                            date: section.date.clone(),
                            court: cell.court.clone(),
                            slot: slot.clone(),
                        });
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_date_gets_the_full_court_grid() {
        let mut t = ResultsTable::new();
        t.set("2024-01-01", "2", CellValue::slots(&["10:00-11:00"]));
        let model = DisplayModel::project(&t);

        assert_eq!(model.sections.len(), 1);
        let cells = &model.sections[0].cells;
        assert_eq!(cells.len(), 7);
        let courts: Vec<&str> = cells.iter().map(|c| c.court.as_str()).collect();
        assert_eq!(courts, vec!["1", "2", "3", "4", "5", "6", "7"]);
        for cell in cells {
            if cell.court == "2" {
                assert_eq!(cell.display, CellDisplay::Slots(vec!["10:00-11:00".into()]));
            } else {
                assert_eq!(cell.display, CellDisplay::Pending);
            }
        }
    }

    #[test]
    fn value_to_presentation_mapping() {
        let mut t = ResultsTable::new();
        t.set("2024-03-01", "1", CellValue::Slots(vec![]));
        t.set("2024-03-01", "2", CellValue::Unavailable);
        let model = DisplayModel::project(&t);
        let cells = &model.sections[0].cells;
        assert_eq!(cells[0].display, CellDisplay::NoSlots);
        assert_eq!(cells[0].display.placeholder(), Some("No available slots"));
        assert_eq!(cells[1].display, CellDisplay::Error);
        assert_eq!(cells[1].display.placeholder(), Some("ERROR while checking"));
        assert_eq!(cells[2].display.placeholder(), Some("Pending..."));
    }

    #[test]
    fn projection_is_idempotent_and_side_effect_free() {
        let mut t = ResultsTable::new();
        t.set("2024-03-01", "3", CellValue::slots(&["08:00-09:00"]));
        let before = t.clone();
        let a = DisplayModel::project(&t);
        let b = DisplayModel::project(&t);
        assert_eq!(a, b);
        assert_eq!(t, before);
    }

    #[test]
    fn out_of_range_courts_are_not_projected() {
        let mut t = ResultsTable::new();
        t.set("2024-03-01", "9", CellValue::slots(&["10:00"]));
        let model = DisplayModel::project(&t);
        assert_eq!(model.sections[0].cells.len(), 7);
        assert!(model.bookable_slots().is_empty());
    }

    #[test]
    fn bookable_slots_flatten_in_display_order() {
        let mut t = ResultsTable::new();
        t.set("2024-03-01", "2", CellValue::slots(&["09:00-10:00", "10:00-11:00"]));
        t.set("2024-03-01", "5", CellValue::slots(&["18:00-19:00"]));
        let slots = DisplayModel::project(&t).bookable_slots();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].court, "2");
        assert_eq!(slots[2].court, "5");
        assert_eq!(slots[2].slot, "18:00-19:00");
    }
}
