//! Scroll geometry for a vertically stacked list of day rows.
//!
//! Offsets are logical units (terminal rows in the TUI). Content coordinates
//! start at zero on the first materialized day; positions relative to the
//! viewport are content positions minus the scroll offset.

mod anchor;
mod detector;
mod trigger;

pub use anchor::AnchorCorrection;
pub use detector::{detect_closest, VisibleMonth};
pub use trigger::{Boundary, BoundaryProbe, ExpansionTrigger, SentinelPosition};

/// Vertical extent of a rendered element relative to the viewport's top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub top: f64,
    pub bottom: f64,
}

impl Span {
    pub fn new(top: f64, height: f64) -> Self {
        Self {
            top,
            bottom: top + height,
        }
    }

    /// Intersection test against `[0, viewport_height]` grown by `margin` on
    /// both sides.
    pub fn is_near(&self, viewport_height: f64, margin: f64) -> bool {
        self.bottom >= -margin && self.top <= viewport_height + margin
    }
}

#[derive(Debug, Clone, Default)]
pub struct Viewport {
    scroll_offset: f64,
    height: f64,
    row_height: Option<f64>,
}

impl Viewport {
    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Height of one rendered day; `None` until the first layout pass.
    pub fn row_height(&self) -> Option<f64> {
        self.row_height.filter(|height| *height > 0.0)
    }

    pub fn is_laid_out(&self) -> bool {
        self.row_height().is_some()
    }

    pub fn set_layout(&mut self, height: f64, row_height: f64) {
        self.height = height.max(0.0);
        self.row_height = Some(row_height);
    }

    pub fn content_height(&self, rows: usize) -> f64 {
        self.row_height().map(|h| h * rows as f64).unwrap_or(0.0)
    }

    pub fn max_scroll(&self, rows: usize) -> f64 {
        (self.content_height(rows) - self.height).max(0.0)
    }

    /// Sets the offset clamped to the scrollable range. Returns whether it
    /// moved.
    pub fn scroll_to(&mut self, offset: f64, rows: usize) -> bool {
        let target = if offset.is_finite() {
            offset.clamp(0.0, self.max_scroll(rows))
        } else {
            0.0
        };
        let moved = (target - self.scroll_offset).abs() > f64::EPSILON;
        self.scroll_offset = target;
        moved
    }

    /// Position of row `index` relative to the viewport top.
    pub fn span_of(&self, index: usize) -> Option<Span> {
        let height = self.row_height()?;
        Some(Span::new(index as f64 * height - self.scroll_offset, height))
    }

    /// Rows intersecting the viewport, extended by one on each side.
    pub fn rendered_rows(&self, rows: usize) -> std::ops::Range<usize> {
        let Some(height) = self.row_height() else {
            return 0..0;
        };
        if rows == 0 {
            return 0..0;
        }
        let first = (self.scroll_offset / height).floor() as usize;
        let last = ((self.scroll_offset + self.height) / height).ceil() as usize;
        first.saturating_sub(1).min(rows)..(last + 1).min(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laid_out(height: f64, row: f64) -> Viewport {
        let mut viewport = Viewport::default();
        viewport.set_layout(height, row);
        viewport
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let mut viewport = laid_out(20.0, 2.0);
        assert!(viewport.scroll_to(500.0, 61));
        assert_eq!(viewport.scroll_offset(), 102.0);
        viewport.scroll_to(-4.0, 61);
        assert_eq!(viewport.scroll_offset(), 0.0);
        viewport.scroll_to(f64::NAN, 61);
        assert_eq!(viewport.scroll_offset(), 0.0);
    }

    #[test]
    fn unmeasured_viewport_has_no_geometry() {
        let viewport = Viewport::default();
        assert!(viewport.span_of(0).is_none());
        assert_eq!(viewport.rendered_rows(61), 0..0);
    }

    #[test]
    fn rendered_rows_cover_viewport_with_overscan() {
        let mut viewport = laid_out(10.0, 2.0);
        viewport.scroll_to(21.0, 61);
        assert_eq!(viewport.rendered_rows(61), 9..17);
        assert_eq!(viewport.span_of(10), Some(Span::new(-1.0, 2.0)));
    }

    #[test]
    fn span_proximity_honours_margin() {
        let above = Span::new(-12.0, 2.0);
        assert!(!above.is_near(20.0, 6.0));
        assert!(above.is_near(20.0, 10.0));
        let below = Span::new(25.0, 2.0);
        assert!(below.is_near(20.0, 6.0));
        assert!(!below.is_near(20.0, 4.0));
    }
}
