//! Configuration for lazy grids.

use super::prefetch::PrefetchStrategy;
use super::size_cache::quantize;

/// Default estimated item size used when neither the provider nor the caller
/// gives a hint. 48.0 is a common list tile height.
pub const DEFAULT_ITEM_SIZE_ESTIMATE: f32 = 48.0;

/// Scroll axis of the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    /// Items flow top to bottom; columns are laid out left to right.
    #[default]
    Vertical,
    /// Items flow left to right; "columns" are stacked top to bottom.
    Horizontal,
}

/// Spacing between cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GridGap {
    /// Same gap along both axes.
    Uniform(f32),
    /// Independent gap between rows (vertical spacing) and between columns
    /// (horizontal spacing).
    Split { row: f32, column: f32 },
}

impl Default for GridGap {
    fn default() -> Self {
        GridGap::Uniform(0.0)
    }
}

impl GridGap {
    /// Gap between consecutive items of the same column, along the scroll axis.
    pub fn main_axis(&self, orientation: Orientation) -> f32 {
        match (*self, orientation) {
            (GridGap::Uniform(gap), _) => gap,
            (GridGap::Split { row, .. }, Orientation::Vertical) => row,
            (GridGap::Split { column, .. }, Orientation::Horizontal) => column,
        }
    }

    /// Gap between neighbouring columns, across the scroll axis.
    pub fn cross_axis(&self, orientation: Orientation) -> f32 {
        match (*self, orientation) {
            (GridGap::Uniform(gap), _) => gap,
            (GridGap::Split { column, .. }, Orientation::Vertical) => column,
            (GridGap::Split { row, .. }, Orientation::Horizontal) => row,
        }
    }

    fn sanitized(self) -> Self {
        let clean = |gap: f32| {
            if gap.is_finite() && gap > 0.0 {
                quantize(gap)
            } else {
                0.0
            }
        };
        match self {
            GridGap::Uniform(gap) => GridGap::Uniform(clean(gap)),
            GridGap::Split { row, column } => GridGap::Split {
                row: clean(row),
                column: clean(column),
            },
        }
    }
}

/// Configuration for a [`LazyGrid`](super::LazyGrid).
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig {
    /// Number of columns. Zero or negative values are treated as one.
    pub columns: i32,

    pub gap: GridGap,

    pub orientation: Orientation,

    /// Keep already visible content in place when items are inserted or
    /// removed outside the viewport.
    pub maintain_visible_content_position: bool,

    /// Main-axis size assumed for items that have no provider hint and have
    /// not been measured yet.
    pub estimated_item_size: f32,

    /// Rows kept bound beyond each viewport edge.
    pub overscan_rows: usize,

    /// Content padding before the first row.
    pub before_content_padding: f32,

    /// Content padding after the last row.
    pub after_content_padding: f32,

    pub prefetch: PrefetchStrategy,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 1,
            gap: GridGap::default(),
            orientation: Orientation::Vertical,
            maintain_visible_content_position: false,
            estimated_item_size: DEFAULT_ITEM_SIZE_ESTIMATE,
            overscan_rows: 2,
            before_content_padding: 0.0,
            after_content_padding: 0.0,
            prefetch: PrefetchStrategy::default(),
        }
    }
}

impl GridConfig {
    /// Column count clamped to at least one.
    pub fn column_count(&self) -> usize {
        self.columns.max(1) as usize
    }

    pub fn main_axis_gap(&self) -> f32 {
        self.gap.main_axis(self.orientation)
    }

    pub fn cross_axis_gap(&self) -> f32 {
        self.gap.cross_axis(self.orientation)
    }

    /// Returns a copy with every out-of-range setting clamped to a safe value.
    ///
    /// These values come from continuously adjustable UI settings, so bad
    /// input is corrected and logged rather than rejected.
    pub fn sanitized(&self) -> Self {
        let mut clean = self.clone();

        if clean.columns < 1 {
            log::warn!("LazyGrid: column count {} clamped to 1", clean.columns);
            clean.columns = 1;
        }

        let gap = clean.gap.sanitized();
        if gap != clean.gap {
            log::warn!("LazyGrid: gap {:?} clamped to {:?}", clean.gap, gap);
            clean.gap = gap;
        }

        if !(clean.estimated_item_size.is_finite() && clean.estimated_item_size > 0.0) {
            log::warn!(
                "LazyGrid: estimated item size {} replaced by {}",
                clean.estimated_item_size,
                DEFAULT_ITEM_SIZE_ESTIMATE
            );
            clean.estimated_item_size = DEFAULT_ITEM_SIZE_ESTIMATE;
        }
        clean.estimated_item_size = quantize(clean.estimated_item_size);

        clean.before_content_padding = clamp_padding(clean.before_content_padding);
        clean.after_content_padding = clamp_padding(clean.after_content_padding);
        clean
    }
}

fn clamp_padding(padding: f32) -> f32 {
    if padding.is_finite() && padding > 0.0 {
        quantize(padding)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_columns_clamp_to_one() {
        let config = GridConfig {
            columns: -3,
            ..Default::default()
        };
        assert_eq!(config.column_count(), 1);
        assert_eq!(config.sanitized().columns, 1);
    }

    #[test]
    fn negative_gaps_clamp_to_zero() {
        let config = GridConfig {
            gap: GridGap::Split {
                row: -4.0,
                column: 6.0,
            },
            ..Default::default()
        };
        assert_eq!(
            config.sanitized().gap,
            GridGap::Split {
                row: 0.0,
                column: 6.0
            }
        );
    }

    #[test]
    fn split_gap_follows_orientation() {
        let gap = GridGap::Split {
            row: 12.0,
            column: 4.0,
        };
        assert_eq!(gap.main_axis(Orientation::Vertical), 12.0);
        assert_eq!(gap.cross_axis(Orientation::Vertical), 4.0);
        assert_eq!(gap.main_axis(Orientation::Horizontal), 4.0);
        assert_eq!(gap.cross_axis(Orientation::Horizontal), 12.0);
    }

    #[test]
    fn invalid_estimate_uses_default() {
        let config = GridConfig {
            estimated_item_size: 0.0,
            ..Default::default()
        };
        assert_eq!(
            config.sanitized().estimated_item_size,
            DEFAULT_ITEM_SIZE_ESTIMATE
        );
    }
}
