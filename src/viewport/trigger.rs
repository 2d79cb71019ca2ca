use crate::calendar::DayRecord;

use super::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Head,
    Tail,
}

/// Where a boundary sentinel is currently rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentinelPosition {
    pub record: DayRecord,
    pub span: Span,
}

/// Rendered positions of the first and last materialized days. A `None`
/// side has no mounted sentinel and is not observed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundaryProbe {
    pub head: Option<SentinelPosition>,
    pub tail: Option<SentinelPosition>,
    pub viewport_height: f64,
}

#[derive(Debug, Clone, Default)]
struct BoundaryWatch {
    sentinel: Option<DayRecord>,
    armed: bool,
}

impl BoundaryWatch {
    fn attach(&mut self, sentinel: DayRecord) {
        if self.sentinel != Some(sentinel) {
            self.sentinel = Some(sentinel);
            self.armed = true;
        }
    }

    fn check(
        &mut self,
        position: Option<SentinelPosition>,
        viewport_height: f64,
        margin: f64,
    ) -> bool {
        let Some(position) = position else {
            return false;
        };
        if !self.armed || self.sentinel != Some(position.record) {
            return false;
        }
        if position.span.is_near(viewport_height, margin) {
            self.armed = false;
            return true;
        }
        false
    }
}

/// Fires once per boundary crossing. After firing, a watch stays quiet
/// until it is attached to a different sentinel.
#[derive(Debug, Clone)]
pub struct ExpansionTrigger {
    margin: f64,
    head: BoundaryWatch,
    tail: BoundaryWatch,
}

impl ExpansionTrigger {
    pub fn new(margin: f64) -> Self {
        Self {
            margin: margin.max(0.0),
            head: BoundaryWatch::default(),
            tail: BoundaryWatch::default(),
        }
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Re-attaches both watches; a watch whose sentinel changed is re-armed.
    pub fn attach(&mut self, head: DayRecord, tail: DayRecord) {
        self.head.attach(head);
        self.tail.attach(tail);
    }

    pub fn is_armed(&self, boundary: Boundary) -> bool {
        match boundary {
            Boundary::Head => self.head.armed,
            Boundary::Tail => self.tail.armed,
        }
    }

    /// Evaluates the probe and returns the crossed boundaries, head first.
    pub fn observe(&mut self, probe: &BoundaryProbe, skip_head: bool) -> Vec<Boundary> {
        let mut crossed = Vec::with_capacity(2);
        if !skip_head && self.head.check(probe.head, probe.viewport_height, self.margin) {
            crossed.push(Boundary::Head);
        }
        if self.tail.check(probe.tail, probe.viewport_height, self.margin) {
            crossed.push(Boundary::Tail);
        }
        crossed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u8, m: u8, y: i32) -> DayRecord {
        DayRecord::new(d, m, y).expect("valid test date")
    }

    fn probe(head: (DayRecord, f64), tail: (DayRecord, f64)) -> BoundaryProbe {
        BoundaryProbe {
            head: Some(SentinelPosition {
                record: head.0,
                span: Span::new(head.1, 100.0),
            }),
            tail: Some(SentinelPosition {
                record: tail.0,
                span: Span::new(tail.1, 100.0),
            }),
            viewport_height: 800.0,
        }
    }

    #[test]
    fn far_boundaries_do_not_fire() {
        let (head, tail) = (day(1, 0, 2024), day(1, 2, 2024));
        let mut trigger = ExpansionTrigger::new(300.0);
        trigger.attach(head, tail);
        let crossed = trigger.observe(&probe((head, -2000.0), (tail, 3000.0)), false);
        assert!(crossed.is_empty());
    }

    #[test]
    fn crossing_fires_once_until_reattached() {
        let (head, tail) = (day(1, 0, 2024), day(1, 2, 2024));
        let mut trigger = ExpansionTrigger::new(300.0);
        trigger.attach(head, tail);

        let near_tail = probe((head, -2000.0), (tail, 1050.0));
        assert_eq!(trigger.observe(&near_tail, false), vec![Boundary::Tail]);
        assert!(trigger.observe(&near_tail, false).is_empty());
        assert!(!trigger.is_armed(Boundary::Tail));

        let new_tail = day(31, 2, 2024);
        trigger.attach(head, new_tail);
        assert!(trigger.is_armed(Boundary::Tail));
        let moved_on = probe((head, -2000.0), (new_tail, 4050.0));
        assert!(trigger.observe(&moved_on, false).is_empty());
    }

    #[test]
    fn margin_makes_head_fire_before_reaching_edge() {
        let (head, tail) = (day(1, 0, 2024), day(1, 2, 2024));
        let mut trigger = ExpansionTrigger::new(300.0);
        trigger.attach(head, tail);
        assert!(trigger
            .observe(&probe((head, -450.0), (tail, 3000.0)), false)
            .is_empty());
        assert_eq!(
            trigger.observe(&probe((head, -350.0), (tail, 3000.0)), false),
            vec![Boundary::Head]
        );
    }

    #[test]
    fn suppressed_or_unmounted_head_is_ignored() {
        let (head, tail) = (day(1, 0, 2024), day(1, 2, 2024));
        let mut trigger = ExpansionTrigger::new(300.0);
        trigger.attach(head, tail);
        let near_head = probe((head, 0.0), (tail, 3000.0));
        assert!(trigger.observe(&near_head, true).is_empty());
        assert!(trigger.is_armed(Boundary::Head));

        let unmounted = BoundaryProbe {
            head: None,
            tail: None,
            viewport_height: 800.0,
        };
        assert!(trigger.observe(&unmounted, false).is_empty());
        assert_eq!(trigger.observe(&near_head, false), vec![Boundary::Head]);
    }

    #[test]
    fn stale_sentinel_positions_are_ignored() {
        let (head, tail) = (day(1, 0, 2024), day(1, 2, 2024));
        let mut trigger = ExpansionTrigger::new(300.0);
        trigger.attach(head, tail);
        let stale = probe((day(2, 0, 2024), 0.0), (tail, 3000.0));
        assert!(trigger.observe(&stale, false).is_empty());
    }
}
