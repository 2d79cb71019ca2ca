use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::DayRecord;

static ENTRY_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,2})/(\d{1,2})/(\d{1,6})\s*$").expect("valid entry date regex")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// `DD/MM/YYYY`
    pub date: String,
    #[serde(default)]
    pub img_url: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl JournalEntry {
    pub fn day(&self) -> Result<DayRecord, EntryDateError> {
        parse_entry_date(&self.date)
    }

    pub fn falls_on(&self, day: &DayRecord) -> bool {
        self.day().map(|parsed| parsed == *day).unwrap_or(false)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryDateError {
    #[error("'{0}' is not in DD/MM/YYYY form")]
    Format(String),
    #[error("'{0}' is not a calendar date")]
    OutOfRange(String),
}

pub fn parse_entry_date(raw: &str) -> Result<DayRecord, EntryDateError> {
    let captures = ENTRY_DATE
        .captures(raw)
        .ok_or_else(|| EntryDateError::Format(raw.to_string()))?;
    let field = |index: usize| captures.get(index).map(|m| m.as_str());
    let day = field(1).and_then(|s| s.parse::<u8>().ok());
    let month = field(2).and_then(|s| s.parse::<u8>().ok());
    let year = field(3).and_then(|s| s.parse::<i32>().ok());
    match (day, month, year) {
        (Some(day), Some(month), Some(year)) if month >= 1 => DayRecord::new(day, month - 1, year)
            .ok_or_else(|| EntryDateError::OutOfRange(raw.to_string())),
        _ => Err(EntryDateError::OutOfRange(raw.to_string())),
    }
}

/// Full scan; entries with unparseable dates never match.
pub fn match_entries<'a>(day: &DayRecord, entries: &'a [JournalEntry]) -> Vec<&'a JournalEntry> {
    entries.iter().filter(|entry| entry.falls_on(day)).collect()
}

pub fn parse_entries_json(raw: &str) -> serde_json::Result<Vec<JournalEntry>> {
    serde_json::from_str(raw)
}

/// Date → positions in the source collection, built once so rendering does
/// not rescan every entry for every visible day.
#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
    by_day: IndexMap<DayRecord, Vec<usize>>,
    skipped: usize,
}

impl EntryIndex {
    pub fn build(entries: &[JournalEntry]) -> Self {
        let mut by_day: IndexMap<DayRecord, Vec<usize>> = IndexMap::new();
        let mut skipped = 0;
        for (position, entry) in entries.iter().enumerate() {
            match entry.day() {
                Ok(day) => by_day.entry(day).or_default().push(position),
                Err(err) => {
                    tracing::debug!(%err, position, "skipping entry with unusable date");
                    skipped += 1;
                }
            }
        }
        Self { by_day, skipped }
    }

    pub fn positions(&self, day: &DayRecord) -> &[usize] {
        self.by_day.get(day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first_index_for(&self, day: &DayRecord) -> Option<usize> {
        self.positions(day).first().copied()
    }

    pub fn entries_for<'a>(
        &self,
        day: &DayRecord,
        entries: &'a [JournalEntry],
    ) -> Vec<&'a JournalEntry> {
        self.positions(day)
            .iter()
            .filter_map(|position| entries.get(*position))
            .collect()
    }

    pub fn dated_days(&self) -> usize {
        self.by_day.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
