//! Grid layout over item keys.
//!
//! Layout is a pure function of (ordered keys, size cache, column count,
//! main-axis gap, padding). Items are assigned to columns round-robin by
//! index, like a wrapping CSS grid, and each column stacks its items:
//!
//! ```text
//! column(i) = i % columns
//! offset(i) = end of the previous item in column(i) + gap   (or the leading padding)
//! ```
//!
//! Results are cached. A size correction invalidates from the corrected index
//! onward; items before it keep their offsets. Changing columns, gap, padding
//! or the key sequence invalidates everything.

use super::item_key::ItemKey;
use super::size_cache::{quantize, SizeCache};
use std::ops::Range;
use vellum_core::collections::map::{HashMap, HashSet};
use vellum_core::collections::map_with_capacity;
use web_time::{Duration, Instant};

/// A pass taking longer than one frame is worth a warning.
const LAYOUT_TIME_BUDGET: Duration = Duration::from_millis(16);

/// Where one item sits along the main axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemPlacement {
    /// Offset from the content start.
    pub offset: f32,
    /// Column index across the cross axis.
    pub column: usize,
    /// Main-axis size used for this pass.
    pub size: f32,
    /// Whether `size` came from a measurement rather than an estimate.
    pub measured: bool,
}

impl ItemPlacement {
    #[inline]
    pub fn end(&self) -> f32 {
        self.offset + self.size
    }
}

#[derive(Debug)]
pub struct LayoutEngine {
    keys: Vec<ItemKey>,
    positions: HashMap<ItemKey, usize>,
    estimates: Vec<f32>,
    placements: Vec<ItemPlacement>,
    columns: usize,
    main_gap: f32,
    before_padding: f32,
    after_padding: f32,
    last_in_row: HashSet<ItemKey>,
    content_extent: f32,
    dirty_from: Option<usize>,
    passes: u64,
}

impl LayoutEngine {
    pub fn new(columns: usize, main_gap: f32) -> Self {
        Self {
            keys: Vec::new(),
            positions: HashMap::default(),
            estimates: Vec::new(),
            placements: Vec::new(),
            columns: columns.max(1),
            main_gap,
            before_padding: 0.0,
            after_padding: 0.0,
            last_in_row: HashSet::default(),
            content_extent: 0.0,
            dirty_from: Some(0),
            passes: 0,
        }
    }

    /// Replaces the key sequence. `estimates[i]` is the size assumed for
    /// `keys[i]` until it is measured.
    pub fn set_items(&mut self, keys: Vec<ItemKey>, estimates: Vec<f32>) {
        debug_assert_eq!(keys.len(), estimates.len());
        let mut positions = map_with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            if positions.insert(key.clone(), index).is_some() {
                log::warn!("LazyGrid: duplicate item key {key} at index {index}");
            }
        }
        self.keys = keys;
        self.positions = positions;
        self.estimates = estimates;
        self.placements.clear();
        self.rebuild_last_in_row();
        self.dirty_from = Some(0);
    }

    pub fn set_columns(&mut self, columns: usize) {
        let columns = columns.max(1);
        if columns != self.columns {
            self.columns = columns;
            self.rebuild_last_in_row();
            self.dirty_from = Some(0);
        }
    }

    pub fn set_main_gap(&mut self, gap: f32) {
        if gap != self.main_gap {
            self.main_gap = gap;
            self.dirty_from = Some(0);
        }
    }

    pub fn set_padding(&mut self, before: f32, after: f32) {
        if before != self.before_padding || after != self.after_padding {
            self.before_padding = before;
            self.after_padding = after;
            self.dirty_from = Some(0);
        }
    }

    /// Marks `index` and everything after it for recomputation.
    pub fn invalidate_from(&mut self, index: usize) {
        self.dirty_from = Some(self.dirty_from.map_or(index, |dirty| dirty.min(index)));
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_from.is_some()
    }

    /// Recomputes invalidated placements. Returns whether any placement or
    /// the content extent changed.
    pub fn relayout(&mut self, sizes: &SizeCache) -> bool {
        let Some(start) = self.dirty_from.take() else {
            return false;
        };
        let started = Instant::now();
        let len = self.keys.len();
        let start = start.min(self.placements.len()).min(len);
        let columns = self.columns;

        // Running end-of-column offsets as of `start`.
        let mut running = vec![self.before_padding; columns];
        for index in start.saturating_sub(columns)..start {
            let placement = &self.placements[index];
            running[placement.column] = quantize(placement.end() + self.main_gap);
        }
        let mut filled = vec![false; columns];
        for (column, flag) in filled.iter_mut().enumerate() {
            *flag = column < start;
        }

        let mut changed = self.placements.len() != len;
        self.placements.truncate(len);
        for index in start..len {
            let column = index % columns;
            let key = &self.keys[index];
            let (size, measured) = match sizes.get(key) {
                Some(size) => (size, true),
                None => (self.estimates[index], false),
            };
            let placement = ItemPlacement {
                offset: running[column],
                column,
                size,
                measured,
            };
            running[column] = quantize(placement.end() + self.main_gap);
            filled[column] = true;

            if index < self.placements.len() {
                if self.placements[index] != placement {
                    self.placements[index] = placement;
                    changed = true;
                }
            } else {
                self.placements.push(placement);
                changed = true;
            }
        }

        let content_end = running
            .iter()
            .zip(&filled)
            .filter(|(_, filled)| **filled)
            .map(|(end, _)| end - self.main_gap)
            .fold(self.before_padding, f32::max);
        let extent = quantize(content_end + self.after_padding);
        if extent != self.content_extent {
            self.content_extent = extent;
            changed = true;
        }

        self.passes += 1;
        let elapsed = started.elapsed();
        if elapsed > LAYOUT_TIME_BUDGET {
            log::warn!(
                "LazyGrid: layout of {} items from index {} took {:?}",
                len,
                start,
                elapsed
            );
        } else {
            log::trace!("layout pass from {} over {} items in {:?}", start, len, elapsed);
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn main_gap(&self) -> f32 {
        self.main_gap
    }

    pub fn content_extent(&self) -> f32 {
        self.content_extent
    }

    pub fn key(&self, index: usize) -> Option<&ItemKey> {
        self.keys.get(index)
    }

    pub fn keys(&self) -> &[ItemKey] {
        &self.keys
    }

    pub fn index_of(&self, key: &ItemKey) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn placement(&self, index: usize) -> Option<&ItemPlacement> {
        self.placements.get(index)
    }

    pub fn placements(&self) -> &[ItemPlacement] {
        &self.placements
    }

    /// Whether `key` is the last cell of its row (or the last item overall).
    pub fn is_last_in_row(&self, key: &ItemKey) -> bool {
        self.last_in_row.contains(key)
    }

    pub fn last_in_row(&self) -> &HashSet<ItemKey> {
        &self.last_in_row
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn row_count(&self) -> usize {
        self.keys.len().div_ceil(self.columns)
    }

    /// Index range of the rows that intersect `[start, end)`.
    ///
    /// Within a column offsets grow with the row, so each column is binary
    /// searched and the widest row span across columns wins. The range is
    /// row-aligned: it may include cells of a row that do not themselves
    /// intersect.
    pub fn rows_in_range(&self, start: f32, end: f32) -> Range<usize> {
        let len = self.placements.len();
        if len == 0 || end <= start {
            return 0..0;
        }
        let columns = self.columns;

        let mut first_row = usize::MAX;
        let mut last_row_exclusive = 0;
        for column in 0..columns.min(len) {
            let rows = (len - column).div_ceil(columns);
            let placement = |row: usize| &self.placements[row * columns + column];

            // First row in this column that ends after `start`.
            let first = partition(rows, |row| placement(row).end() <= start);
            // Rows in this column that begin before `end`.
            let last = partition(rows, |row| placement(row).offset < end);
            if first < last {
                first_row = first_row.min(first);
                last_row_exclusive = last_row_exclusive.max(last);
            }
        }

        if first_row >= last_row_exclusive {
            return 0..0;
        }
        (first_row * columns)..(last_row_exclusive * columns).min(len)
    }

    fn rebuild_last_in_row(&mut self) {
        let len = self.keys.len();
        let columns = self.columns;
        self.last_in_row = self
            .keys
            .iter()
            .enumerate()
            .filter(|(index, _)| index % columns == columns - 1 || index + 1 == len)
            .map(|(_, key)| key.clone())
            .collect();
    }
}

/// Number of leading rows in `0..rows` for which `pred` holds, assuming
/// `pred` is true for a prefix and false afterwards.
fn partition(rows: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut low, mut high) = (0, rows);
    while low < high {
        let mid = low + (high - low) / 2;
        if pred(mid) {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    low
}
