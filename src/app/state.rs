use std::rc::Rc;
use std::time::Duration;

use crate::calendar::{DayRecord, WindowState};
use crate::config::CalendarOptions;
use crate::entries::{EntryIndex, JournalEntry};
use crate::persistence::{
    PersistenceAdapter, PersistenceEvent, PersistenceStatus, ViewPersistenceRecord,
};
use crate::scheduler::{Clock, Scheduler};
use crate::viewport::{
    detect_closest, AnchorCorrection, Boundary, BoundaryProbe, ExpansionTrigger,
    SentinelPosition, Viewport, VisibleMonth,
};

use super::modal::ModalState;

const MAX_DEFERRED_ROUNDS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Deferred {
    AnchorCorrection(AnchorCorrection),
    RestoreScroll { offset: f64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionStats {
    pub head: usize,
    pub tail: usize,
}

/// Everything the calendar view knows, driven one event at a time: layout,
/// scroll, tick and key handlers are plain method calls.
pub struct CalendarState {
    options: CalendarOptions,
    window: WindowState,
    viewport: Viewport,
    trigger: ExpansionTrigger,
    visible: VisibleMonth,
    focus: Option<DayRecord>,
    seed: DayRecord,
    today: DayRecord,
    awaiting_first_layout: bool,
    entries: Vec<JournalEntry>,
    index: EntryIndex,
    modal: Option<ModalState>,
    deferred: Scheduler<Deferred>,
    persistence: PersistenceAdapter,
    clock: Rc<dyn Clock>,
    restore_delay: Duration,
    expansions: ExpansionStats,
    status_message: Option<String>,
}

impl CalendarState {
    /// Seeds the window from the persisted view state when it is valid,
    /// otherwise from `today`.
    pub fn new(
        options: CalendarOptions,
        persistence: PersistenceAdapter,
        restore_delay: Duration,
        entries: Vec<JournalEntry>,
        clock: Rc<dyn Clock>,
        today: DayRecord,
    ) -> Self {
        let restored = persistence.load();
        let seed = restored.and_then(|record| record.seed()).unwrap_or(today);
        let window = WindowState::initialize(seed, options.initial_span, options.initial_span);
        let mut trigger = ExpansionTrigger::new(options.proximity_margin);
        if let (Some(first), Some(last)) = (window.first(), window.last()) {
            trigger.attach(first, last);
        }
        let index = EntryIndex::build(&entries);
        tracing::info!(
            %seed,
            restored = restored.is_some(),
            entries = entries.len(),
            "calendar window initialised"
        );

        let mut state = Self {
            visible: VisibleMonth::of(&seed),
            focus: Some(seed),
            seed,
            today,
            awaiting_first_layout: true,
            options,
            window,
            viewport: Viewport::default(),
            trigger,
            entries,
            index,
            modal: None,
            deferred: Scheduler::new(),
            persistence,
            clock,
            restore_delay,
            expansions: ExpansionStats::default(),
            status_message: None,
        };
        if let Some(record) = restored {
            let now = state.clock.now();
            state.deferred.schedule(
                now,
                restore_delay,
                Deferred::RestoreScroll {
                    offset: record.scroll_offset,
                },
            );
        }
        state
    }

    pub fn window(&self) -> &WindowState {
        &self.window
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn visible_month(&self) -> VisibleMonth {
        self.visible
    }

    /// Day at the reference edge; the one `Enter` opens.
    pub fn focus(&self) -> Option<DayRecord> {
        self.focus
    }

    /// Host date as of the last refresh; highlighted by the renderer.
    pub fn today(&self) -> DayRecord {
        self.today
    }

    /// Returns whether the date rolled over.
    pub fn set_today(&mut self, today: DayRecord) -> bool {
        if today == self.today {
            return false;
        }
        tracing::debug!(%today, "date rolled over");
        self.today = today;
        true
    }

    pub fn expansions(&self) -> ExpansionStats {
        self.expansions
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn entries_for(&self, day: &DayRecord) -> Vec<&JournalEntry> {
        self.index.entries_for(day, &self.entries)
    }

    pub fn persistence_status(&self) -> PersistenceStatus {
        self.persistence.status()
    }

    pub fn snapshot(&self) -> ViewPersistenceRecord {
        ViewPersistenceRecord::new(self.visible, self.viewport.scroll_offset())
    }

    pub fn has_pending_correction(&self) -> bool {
        self.deferred
            .any_pending(|task| matches!(task, Deferred::AnchorCorrection(_)))
    }

    /// Earliest moment a deferred task or the debounced save wants to run.
    pub fn next_wakeup(&self) -> Option<Duration> {
        match (self.deferred.next_due(), self.persistence.next_due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    /// Records the measured viewport and row height. The first call places
    /// the seed day at the reference edge.
    pub fn on_layout(&mut self, viewport_height: f64, row_height: f64) {
        let changed = (self.viewport.height() - viewport_height).abs() > f64::EPSILON
            || self.viewport.row_height() != Some(row_height);
        if !changed && !self.awaiting_first_layout {
            return;
        }
        self.viewport.set_layout(viewport_height, row_height);
        if !self.viewport.is_laid_out() {
            return;
        }
        if self.awaiting_first_layout {
            self.awaiting_first_layout = false;
            if let Some(position) = self.window.position(&self.seed) {
                self.viewport
                    .scroll_to(position as f64 * row_height, self.window.len());
            }
        } else {
            // a taller viewport can shrink the scrollable range
            self.viewport
                .scroll_to(self.viewport.scroll_offset(), self.window.len());
        }
        self.on_scroll();
    }

    pub fn scroll_by(&mut self, delta: f64) {
        let target = self.viewport.scroll_offset() + delta;
        self.scroll_to(target);
    }

    pub fn scroll_to(&mut self, offset: f64) {
        if self.viewport.scroll_to(offset, self.window.len()) {
            self.on_scroll();
        }
    }

    pub fn scroll_rows(&mut self, days: i32) {
        if let Some(height) = self.viewport.row_height() {
            self.scroll_by(f64::from(days) * height);
        }
    }

    pub fn scroll_pages(&mut self, pages: i32) {
        let page = self.viewport.height();
        self.scroll_by(f64::from(pages) * page);
    }

    /// Expands in the given direction as though the boundary had crossed the
    /// proximity margin.
    pub fn on_boundary_crossed(&mut self, boundary: Boundary) {
        self.expand(boundary);
    }

    /// Runs every due deferred task, then the debounced save. Call before
    /// each paint so anchor corrections land before the user sees a frame.
    pub fn tick(&mut self) -> Option<PersistenceEvent> {
        let now = self.clock.now();
        for _ in 0..MAX_DEFERRED_ROUNDS {
            let due = self.deferred.drain_due(now);
            if due.is_empty() {
                break;
            }
            for task in due {
                self.run_deferred(task, now);
            }
        }
        let event = self.persistence.poll(now);
        if let Some(PersistenceEvent::Error { message }) = &event {
            tracing::warn!(%message, "saving view state failed");
            self.set_status_message(Some(format!("Could not save view state: {message}")));
        }
        event
    }

    /// Writes any pending view state, then cancels every outstanding timer so
    /// nothing fires after the view is gone.
    pub fn shutdown(&mut self) -> Option<PersistenceEvent> {
        let event = self.persistence.flush_now();
        let cancelled = self.deferred.cancel_all();
        self.persistence.cancel();
        tracing::debug!(cancelled, "calendar view torn down");
        event
    }

    pub fn modal(&self) -> Option<ModalState> {
        self.modal
    }

    pub fn modal_entry(&self) -> Option<(ModalState, &JournalEntry)> {
        let modal = self.modal?;
        let entry = self.entries.get(modal.active())?;
        Some((modal, entry))
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal.is_some()
    }

    pub fn open_focused_entry(&mut self) -> bool {
        let Some(day) = self.focus else {
            return false;
        };
        match self.index.first_index_for(&day) {
            Some(index) => {
                self.modal = ModalState::open(index, self.entries.len());
                self.status_message = None;
                self.modal.is_some()
            }
            None => {
                self.set_status_message(Some(format!("No entries on {day}")));
                false
            }
        }
    }

    pub fn modal_step(&mut self, delta: isize) -> bool {
        self.modal
            .as_mut()
            .map(|modal| modal.step(delta))
            .unwrap_or(false)
    }

    pub fn close_modal(&mut self) {
        self.modal = None;
    }

    fn run_deferred(&mut self, task: Deferred, now: Duration) {
        match task {
            Deferred::AnchorCorrection(correction) => {
                let target = correction.apply(self.viewport.scroll_offset());
                self.viewport.scroll_to(target, self.window.len());
                tracing::trace!(delta = correction.delta, "applied anchor correction");
                self.on_scroll();
            }
            Deferred::RestoreScroll { offset } => {
                if !self.viewport.is_laid_out() {
                    self.deferred.schedule(
                        now,
                        self.restore_delay,
                        Deferred::RestoreScroll { offset },
                    );
                    return;
                }
                self.viewport.scroll_to(offset, self.window.len());
                tracing::debug!(offset, "restored scroll offset");
                self.on_scroll();
            }
        }
    }

    fn on_scroll(&mut self) {
        self.detect_visible_month();
        self.evaluate_boundaries();
        let snapshot = self.snapshot();
        let now = self.clock.now();
        self.persistence.save(snapshot, now);
    }

    fn detect_visible_month(&mut self) {
        let rows = self.viewport.rendered_rows(self.window.len());
        let viewport = &self.viewport;
        let positions = self
            .window
            .range(rows.start, rows.end)
            .filter_map(|(index, day)| {
                viewport
                    .span_of(index)
                    .map(|span| ((index, day), span.top))
            });
        let Some((index, day)) = detect_closest(positions, 0.0) else {
            return;
        };
        self.window.set_anchor(index);
        self.focus = Some(day);
        let visible = VisibleMonth::of(&day);
        if visible != self.visible {
            tracing::debug!(label = %visible, "visible month changed");
            self.visible = visible;
        }
    }

    fn boundary_probe(&self) -> BoundaryProbe {
        let sentinel = |index: usize| {
            let record = self.window.get(index)?;
            let span = self.viewport.span_of(index)?;
            Some(SentinelPosition { record, span })
        };
        BoundaryProbe {
            head: sentinel(0),
            tail: self.window.len().checked_sub(1).and_then(sentinel),
            viewport_height: self.viewport.height(),
        }
    }

    fn evaluate_boundaries(&mut self) {
        let probe = self.boundary_probe();
        let correction_pending = self.has_pending_correction();
        for boundary in self.trigger.observe(&probe, correction_pending) {
            self.expand(boundary);
        }
    }

    fn expand(&mut self, boundary: Boundary) {
        let batch = self.options.batch_size;
        match boundary {
            Boundary::Head => {
                let unit_height = self.viewport.span_of(0).map(|span| span.bottom - span.top);
                self.window.prepend_batch(batch);
                self.expansions.head += 1;
                match AnchorCorrection::measure(unit_height, batch) {
                    Some(correction) => {
                        let now = self.clock.now();
                        self.deferred.schedule(
                            now,
                            Duration::ZERO,
                            Deferred::AnchorCorrection(correction),
                        );
                    }
                    None => {
                        tracing::debug!("first row not measured, skipping anchor correction");
                    }
                }
            }
            Boundary::Tail => {
                self.window.append_batch(batch);
                self.expansions.tail += 1;
            }
        }
        if let (Some(first), Some(last)) = (self.window.first(), self.window.last()) {
            self.trigger.attach(first, last);
            tracing::debug!(
                ?boundary,
                batch,
                len = self.window.len(),
                %first,
                %last,
                "expanded calendar window"
            );
        }
    }
}
