use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::DayRecord;
use crate::viewport::VisibleMonth;

mod adapter;

pub use adapter::{PersistenceAdapter, PersistenceEvent, PersistenceStatus};

pub const DEFAULT_NAMESPACE: &str = "calendarState";

/// Key-value backend holding one serialized view state per namespace.
pub trait StateProvider {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<bool>;
}

#[derive(Debug, Error)]
pub enum ViewStateError {
    #[error("malformed view state: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("visible month {0} is outside 0..=11")]
    MonthOutOfRange(i64),
    #[error("visible year {0} is out of range")]
    YearOutOfRange(i64),
    #[error("scroll offset {0} is not a finite, non-negative number")]
    InvalidScrollOffset(f64),
}

/// Snapshot of what the user was looking at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPersistenceRecord {
    pub visible_month: u8,
    pub visible_year: i32,
    pub scroll_offset: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRecord {
    current_month: i64,
    current_year: i64,
    scroll_top: f64,
}

impl ViewPersistenceRecord {
    pub fn new(visible: VisibleMonth, scroll_offset: f64) -> Self {
        Self {
            visible_month: visible.month,
            visible_year: visible.year,
            scroll_offset,
        }
    }

    pub fn visible_month(&self) -> VisibleMonth {
        VisibleMonth {
            month: self.visible_month,
            year: self.visible_year,
        }
    }

    /// Day the window is rebuilt around on startup.
    pub fn seed(&self) -> Option<DayRecord> {
        DayRecord::first_of_month(self.visible_month, self.visible_year)
    }

    pub fn from_json(raw: &str) -> Result<Self, ViewStateError> {
        let wire: WireRecord = serde_json::from_str(raw)?;
        let visible_month = u8::try_from(wire.current_month)
            .ok()
            .filter(|month| *month <= 11)
            .ok_or(ViewStateError::MonthOutOfRange(wire.current_month))?;
        let visible_year = i32::try_from(wire.current_year)
            .ok()
            .filter(|year| DayRecord::first_of_month(visible_month, *year).is_some())
            .ok_or(ViewStateError::YearOutOfRange(wire.current_year))?;
        if !wire.scroll_top.is_finite() || wire.scroll_top < 0.0 {
            return Err(ViewStateError::InvalidScrollOffset(wire.scroll_top));
        }
        Ok(Self {
            visible_month,
            visible_year,
            scroll_offset: wire.scroll_top,
        })
    }

    pub fn to_json(&self) -> Result<String, ViewStateError> {
        let wire = WireRecord {
            current_month: i64::from(self.visible_month),
            current_year: i64::from(self.visible_year),
            scroll_top: self.scroll_offset,
        };
        Ok(serde_json::to_string(&wire)?)
    }
}

/// In-process provider. Clones share the same map, so a test can keep a
/// handle after boxing one into an adapter.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateProvider {
    inner: Rc<RefCell<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: HashMap<String, String>,
    writes: usize,
}

impl MemoryStateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let provider = Self::new();
        provider
            .inner
            .borrow_mut()
            .values
            .insert(key.to_string(), value.to_string());
        provider
    }

    /// Number of `set` calls that reached this provider.
    pub fn writes(&self) -> usize {
        self.inner.borrow().writes
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.inner.borrow().values.get(key).cloned()
    }
}

impl StateProvider for MemoryStateProvider {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.value(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.writes += 1;
        inner.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        Ok(self.inner.borrow_mut().values.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_the_wire_format() {
        let record = ViewPersistenceRecord::from_json(
            r#"{"currentMonth":5,"currentYear":2024,"scrollTop":120}"#,
        )
        .expect("valid record");
        assert_eq!(
            record,
            ViewPersistenceRecord {
                visible_month: 5,
                visible_year: 2024,
                scroll_offset: 120.0,
            }
        );
        assert_eq!(record.seed(), DayRecord::new(1, 5, 2024));
    }

    #[test]
    fn serialises_to_the_wire_format() -> anyhow::Result<()> {
        let record = ViewPersistenceRecord {
            visible_month: 0,
            visible_year: 2025,
            scroll_offset: 42.5,
        };
        let json: serde_json::Value = serde_json::from_str(&record.to_json()?)?;
        assert_eq!(
            json,
            serde_json::json!({"currentMonth": 0, "currentYear": 2025, "scrollTop": 42.5})
        );
        Ok(())
    }

    #[test]
    fn rejects_invalid_fields() {
        assert_matches!(
            ViewPersistenceRecord::from_json("not json"),
            Err(ViewStateError::Malformed(_))
        );
        assert_matches!(
            ViewPersistenceRecord::from_json(r#"{"currentMonth":5,"currentYear":2024}"#),
            Err(ViewStateError::Malformed(_))
        );
        assert_matches!(
            ViewPersistenceRecord::from_json(
                r#"{"currentMonth":12,"currentYear":2024,"scrollTop":0}"#
            ),
            Err(ViewStateError::MonthOutOfRange(12))
        );
        assert_matches!(
            ViewPersistenceRecord::from_json(
                r#"{"currentMonth":-1,"currentYear":2024,"scrollTop":0}"#
            ),
            Err(ViewStateError::MonthOutOfRange(-1))
        );
        assert_matches!(
            ViewPersistenceRecord::from_json(
                r#"{"currentMonth":1,"currentYear":99999999999,"scrollTop":0}"#
            ),
            Err(ViewStateError::YearOutOfRange(_))
        );
        assert_matches!(
            ViewPersistenceRecord::from_json(
                r#"{"currentMonth":1,"currentYear":2024,"scrollTop":-3}"#
            ),
            Err(ViewStateError::InvalidScrollOffset(_))
        );
    }

    #[test]
    fn rejects_years_the_calendar_cannot_walk_past() {
        assert_matches!(
            ViewPersistenceRecord::from_json(
                r#"{"currentMonth":0,"currentYear":-2147483648,"scrollTop":0}"#
            ),
            Err(ViewStateError::YearOutOfRange(-2147483648))
        );
        assert_matches!(
            ViewPersistenceRecord::from_json(
                r#"{"currentMonth":11,"currentYear":2147483647,"scrollTop":0}"#
            ),
            Err(ViewStateError::YearOutOfRange(2147483647))
        );
        assert_matches!(
            ViewPersistenceRecord::from_json(
                r#"{"currentMonth":11,"currentYear":9999,"scrollTop":0}"#
            ),
            Ok(_)
        );
    }

    #[test]
    fn memory_provider_clones_share_state() -> anyhow::Result<()> {
        let observer = MemoryStateProvider::new();
        let mut writer = observer.clone();
        writer.set("k", "v")?;
        assert_eq!(observer.value("k").as_deref(), Some("v"));
        assert_eq!(observer.writes(), 1);
        assert!(writer.remove("k")?);
        assert!(observer.get("k")?.is_none());
        Ok(())
    }
}
