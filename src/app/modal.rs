/// Cursor over the full entry collection while the detail view is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModalState {
    active: usize,
    len: usize,
}

impl ModalState {
    pub fn open(active: usize, len: usize) -> Option<Self> {
        (active < len).then_some(Self { active, len })
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Moves by `delta`, clamped to `[0, len - 1]`. Returns whether the
    /// active index changed.
    pub fn step(&mut self, delta: isize) -> bool {
        let last = self.len.saturating_sub(1) as isize;
        let target = (self.active as isize + delta).clamp(0, last) as usize;
        let moved = target != self.active;
        self.active = target;
        moved
    }

    pub fn next(&mut self) -> bool {
        self.step(1)
    }

    pub fn prev(&mut self) -> bool {
        self.step(-1)
    }
}
