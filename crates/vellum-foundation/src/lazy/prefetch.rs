//! Direction-aware overscan for lazy grids.
//!
//! Rows on the side the user is scrolling towards get bound before they enter
//! the viewport, so their content has a frame to render and measure.

/// How many rows beyond the regular overscan to keep ahead of the scroll.
#[derive(Clone, Debug, PartialEq)]
pub struct PrefetchStrategy {
    /// Extra rows on the leading side of the scroll direction.
    pub extra_rows: usize,

    /// Whether prefetching is enabled.
    pub enabled: bool,
}

impl Default for PrefetchStrategy {
    fn default() -> Self {
        Self {
            extra_rows: 1,
            enabled: true,
        }
    }
}

impl PrefetchStrategy {
    pub fn new(extra_rows: usize) -> Self {
        Self {
            extra_rows,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            extra_rows: 0,
            enabled: false,
        }
    }
}

/// Direction of the most recent scroll movement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrollDirection {
    Forward,
    Backward,
    #[default]
    Idle,
}

impl ScrollDirection {
    /// Positive deltas move content towards the end of the list.
    pub fn from_delta(delta: f32) -> Self {
        if delta > 0.001 {
            ScrollDirection::Forward
        } else if delta < -0.001 {
            ScrollDirection::Backward
        } else {
            ScrollDirection::Idle
        }
    }
}

/// Rows to keep bound on each side of the visible rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowMargins {
    pub before: usize,
    pub after: usize,
}

/// Combines the symmetric overscan with the prefetch bias for `direction`.
///
/// An idle list prefetches forward, matching the usual first gesture.
pub fn row_margins(
    overscan_rows: usize,
    direction: ScrollDirection,
    strategy: &PrefetchStrategy,
) -> RowMargins {
    let extra = if strategy.enabled {
        strategy.extra_rows
    } else {
        0
    };
    match direction {
        ScrollDirection::Backward => RowMargins {
            before: overscan_rows + extra,
            after: overscan_rows,
        },
        ScrollDirection::Forward | ScrollDirection::Idle => RowMargins {
            before: overscan_rows,
            after: overscan_rows + extra,
        },
    }
}
