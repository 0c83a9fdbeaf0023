//! Viewport handling for lazy grid passes.
//!
//! Validates the host-reported extent (falling back when the grid sits in an
//! unconstrained parent) and keeps the scroll offset within content bounds.

use super::grid_config::DEFAULT_ITEM_SIZE_ESTIMATE;
use super::size_cache::quantize;

/// Maximum reasonable viewport extent before treating it as infinite.
const MAX_REASONABLE_VIEWPORT: f32 = 100_000.0;

/// Rows worth of estimated content used when the viewport is infinite.
const INFINITE_VIEWPORT_ITEM_COUNT: f32 = 20.0;

/// Effective viewport extent for one pass.
#[derive(Clone, Copy, Debug)]
pub struct ViewportHandler {
    effective_extent: f32,
    is_infinite: bool,
}

impl ViewportHandler {
    /// * `viewport_extent` - extent reported by the host
    /// * `average_item_size` - measured average, or the estimate
    /// * `gap` - main-axis gap between items
    pub fn new(viewport_extent: f32, average_item_size: f32, gap: f32) -> Self {
        let is_infinite =
            viewport_extent.is_infinite() || viewport_extent > MAX_REASONABLE_VIEWPORT;

        let effective_extent = if is_infinite {
            let average = average_item_size.max(DEFAULT_ITEM_SIZE_ESTIMATE);
            (average + gap) * INFINITE_VIEWPORT_ITEM_COUNT
        } else if viewport_extent.is_nan() {
            0.0
        } else {
            viewport_extent.max(0.0)
        };

        Self {
            effective_extent,
            is_infinite,
        }
    }

    #[inline]
    pub fn effective_extent(&self) -> f32 {
        self.effective_extent
    }

    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.is_infinite
    }

    /// Largest scroll offset that still shows content at the viewport end.
    pub fn max_scroll_offset(&self, content_extent: f32) -> f32 {
        (content_extent - self.effective_extent).max(0.0)
    }

    /// Clamps `offset` into `[0, max_scroll_offset]`, snapped to the size grid.
    pub fn clamp_scroll(&self, offset: f32, content_extent: f32) -> f32 {
        if !offset.is_finite() {
            return 0.0;
        }
        quantize(offset.clamp(0.0, self.max_scroll_offset(content_extent)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_viewport() {
        let handler = ViewportHandler::new(500.0, 50.0, 0.0);
        assert_eq!(handler.effective_extent(), 500.0);
        assert!(!handler.is_infinite());
    }

    #[test]
    fn infinite_viewport_falls_back_to_estimate() {
        let handler = ViewportHandler::new(f32::INFINITY, 50.0, 8.0);
        assert!(handler.is_infinite());
        // (50 + 8) * 20
        assert_eq!(handler.effective_extent(), 1160.0);
    }

    #[test]
    fn huge_viewport_treated_as_infinite() {
        let handler = ViewportHandler::new(200_000.0, 50.0, 0.0);
        assert!(handler.is_infinite());
        assert!(handler.effective_extent() < MAX_REASONABLE_VIEWPORT);
    }

    #[test]
    fn clamp_scroll_respects_content_bounds() {
        let handler = ViewportHandler::new(400.0, 50.0, 0.0);
        assert_eq!(handler.clamp_scroll(-20.0, 1000.0), 0.0);
        assert_eq!(handler.clamp_scroll(700.0, 1000.0), 600.0);
        assert_eq!(handler.clamp_scroll(120.03, 1000.0), 120.0);
        // Content shorter than the viewport cannot scroll.
        assert_eq!(handler.clamp_scroll(50.0, 300.0), 0.0);
    }
}
