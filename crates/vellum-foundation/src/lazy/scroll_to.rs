//! Programmatic scrolling to an item index.

use super::item_key::ItemKey;

/// Options for [`LazyGrid::scroll_to_index`](super::LazyGrid::scroll_to_index).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollToOptions {
    /// Ask the host to animate the scroll.
    pub animated: bool,
    /// Fractional viewport position of the item: 0 start, 0.5 center, 1 end.
    pub view_position: f32,
}

impl ScrollToOptions {
    pub fn centered() -> Self {
        Self {
            animated: false,
            view_position: 0.5,
        }
    }

    pub fn animated(mut self) -> Self {
        self.animated = true;
        self
    }
}

/// Scroll offset that puts an item of `item_size` at `item_offset` at
/// `view_position` within a viewport of `viewport_extent`.
pub fn target_offset(item_offset: f32, item_size: f32, viewport_extent: f32, view_position: f32) -> f32 {
    let fraction = if view_position.is_finite() {
        view_position.clamp(0.0, 1.0)
    } else {
        0.0
    };
    item_offset - fraction * (viewport_extent - item_size)
}

/// A scroll request issued while the target's size was only estimated.
///
/// Kept until the target is measured so the offset can be corrected.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingScrollTarget {
    pub key: ItemKey,
    pub options: ScrollToOptions,
    /// Offset last sent to the host for this request.
    pub issued: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_position_places_item() {
        assert_eq!(target_offset(4200.0, 100.0, 500.0, 0.0), 4200.0);
        assert_eq!(target_offset(4200.0, 100.0, 500.0, 0.5), 4000.0);
        assert_eq!(target_offset(4200.0, 100.0, 500.0, 1.0), 3800.0);
    }

    #[test]
    fn out_of_range_view_position_is_clamped() {
        assert_eq!(target_offset(100.0, 50.0, 450.0, 3.0), -300.0);
        assert_eq!(target_offset(100.0, 50.0, 450.0, f32::NAN), 100.0);
    }
}
