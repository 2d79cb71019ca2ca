use std::collections::VecDeque;

use super::date::DayRecord;

pub const DEFAULT_SPAN: usize = 30;

/// Contiguous, ascending run of materialized days. Grows at either end and
/// never shrinks.
#[derive(Debug, Clone)]
pub struct WindowState {
    days: VecDeque<DayRecord>,
    anchor: usize,
}

impl WindowState {
    pub fn initialize(seed: DayRecord, backward: usize, forward: usize) -> Self {
        let mut days = VecDeque::with_capacity(backward + forward + 1);
        days.push_back(seed);
        let mut state = Self { days, anchor: 0 };
        state.prepend_batch(backward);
        state.append_batch(forward);
        state
    }

    pub fn around(seed: DayRecord) -> Self {
        Self::initialize(seed, DEFAULT_SPAN, DEFAULT_SPAN)
    }

    pub fn append_batch(&mut self, count: usize) {
        let Some(mut cursor) = self.days.back().copied() else {
            return;
        };
        self.days.reserve(count);
        for _ in 0..count {
            cursor = cursor.next();
            self.days.push_back(cursor);
        }
    }

    /// Discovers `count` days backwards from the head and places them in
    /// ascending order in front of it. Shifts the anchor by `count`.
    pub fn prepend_batch(&mut self, count: usize) {
        let Some(mut cursor) = self.days.front().copied() else {
            return;
        };
        let mut discovered = Vec::with_capacity(count);
        for _ in 0..count {
            cursor = cursor.prev();
            discovered.push(cursor);
        }
        self.days.reserve(count);
        // discovered is newest-first; pushing each to the front yields ascending order
        for day in discovered {
            self.days.push_front(day);
        }
        self.anchor += count;
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first(&self) -> Option<DayRecord> {
        self.days.front().copied()
    }

    pub fn last(&self) -> Option<DayRecord> {
        self.days.back().copied()
    }

    pub fn get(&self, index: usize) -> Option<DayRecord> {
        self.days.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DayRecord> + '_ {
        self.days.iter()
    }

    pub fn range(
        &self,
        start: usize,
        end: usize,
    ) -> impl Iterator<Item = (usize, DayRecord)> + '_ {
        let end = end.min(self.days.len());
        let start = start.min(end);
        self.days
            .range(start..end)
            .enumerate()
            .map(move |(offset, day)| (start + offset, *day))
    }

    pub fn position(&self, day: &DayRecord) -> Option<usize> {
        self.days.binary_search(day).ok()
    }

    pub fn contains(&self, day: &DayRecord) -> bool {
        self.position(day).is_some()
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn anchor_day(&self) -> Option<DayRecord> {
        self.get(self.anchor)
    }

    pub fn set_anchor(&mut self, index: usize) {
        if index < self.days.len() {
            self.anchor = index;
        }
    }

    pub fn is_contiguous(&self) -> bool {
        self.days
            .iter()
            .zip(self.days.iter().skip(1))
            .all(|(a, b)| a.next() == *b)
    }
}
