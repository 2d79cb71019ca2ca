use std::fmt;

use crate::calendar::{calendar_month, DayRecord};

/// Structured month label carried from detection to the header and the
/// persisted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisibleMonth {
    pub month: u8,
    pub year: i32,
}

impl VisibleMonth {
    pub fn of(day: &DayRecord) -> Self {
        Self {
            month: day.month(),
            year: day.year(),
        }
    }

    pub fn month_name(&self) -> String {
        calendar_month(self.month).to_string()
    }
}

impl fmt::Display for VisibleMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", calendar_month(self.month), self.year)
    }
}

/// Picks the item whose top edge is closest to the reference edge. Items
/// must arrive in document order; the first of equally close items wins.
pub fn detect_closest<T, I>(positions: I, reference_edge: f64) -> Option<T>
where
    I: IntoIterator<Item = (T, f64)>,
{
    let mut closest: Option<(T, f64)> = None;
    for (item, top) in positions {
        let distance = (top - reference_edge).abs();
        if !distance.is_finite() {
            continue;
        }
        let better = closest
            .as_ref()
            .map_or(true, |(_, best)| distance < *best);
        if better {
            closest = Some((item, distance));
        }
    }
    closest.map(|(item, _)| item)
}
