//! The lazy grid engine.
//!
//! [`LazyGrid`] owns the size cache, layout engine, container pool and
//! anchor manager of one list instance, and drives them in synchronous
//! passes:
//!
//! 1. recompute invalidated placements,
//! 2. clamp the scroll offset and derive the item window (visible rows plus
//!    overscan, biased towards the scroll direction),
//! 3. inside one binding-store batch: reconcile container bindings, settle
//!    anchors and write per-container values,
//! 4. report the content extent to the viewport host.
//!
//! Containers are notified only when the batch closes, so a render slot never
//! observes a half-updated binding set.

use super::anchor::{anchored_offset, Anchor, AnchorCandidate, AnchorManager};
use super::container::{BoundItem, Container, ItemRenderer, Measurement, SlotKeys, SlotValue};
use super::grid_config::{GridConfig, GridGap};
use super::item_key::ItemKey;
use super::item_provider::LazyItemProvider;
use super::layout_engine::{ItemPlacement, LayoutEngine};
use super::prefetch::{row_margins, ScrollDirection};
use super::recycler::{
    ContainerPool, LazyLayoutStats, MeasureTicket, Reconciliation, SlotId, WindowItem,
};
use super::scroll_to::{target_offset, PendingScrollTarget, ScrollToOptions};
use super::size_cache::{quantize, SizeCache, SizeUpdate, SIZE_QUANTUM};
use super::viewport::ViewportHandler;
use crate::error::GridError;
use std::ops::Range;
use vellum_core::BindingStore;

/// Scroll container the grid lives in.
pub trait ViewportHost {
    /// Moves the viewport to `offset`.
    fn scroll_to(&mut self, offset: f32, animated: bool);

    /// Total content extent changed; resize the scrollable area.
    fn content_extent_changed(&mut self, extent: f32);
}

/// Result of reporting a measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasureOutcome {
    /// Size cache updated and layout recomputed.
    Applied,
    /// Same quantized size as cached; nothing recomputed.
    Unchanged,
    /// Zero extent, treated as not yet known.
    ZeroIgnored,
    /// The report belongs to a binding that has since been recycled.
    Stale,
}

/// Information about the items visible after the last pass.
#[derive(Clone, Debug, Default)]
pub struct LazyGridLayoutInfo {
    /// Visible items in index order.
    pub visible_items_info: Vec<LazyGridItemInfo>,

    pub total_items_count: usize,

    /// Effective viewport extent along the main axis.
    pub viewport_size: f32,

    pub scroll_offset: f32,

    pub content_extent: f32,

    pub columns: usize,

    pub before_content_padding: f32,

    pub after_content_padding: f32,
}

/// One visible item.
#[derive(Clone, Debug, PartialEq)]
pub struct LazyGridItemInfo {
    pub index: usize,
    pub key: ItemKey,
    /// Offset from the content start.
    pub offset: f32,
    pub column: usize,
    pub size: f32,
    /// Container showing the item.
    pub slot: Option<SlotId>,
}

/// Cross-axis span of a column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrossAxisSpan {
    pub offset: f32,
    pub size: f32,
}

/// Full rectangle of an item in content coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemGeometry {
    pub main_offset: f32,
    pub main_size: f32,
    pub cross_offset: f32,
    pub cross_size: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PassCause {
    Scroll,
    Viewport,
    Data,
    Measure,
    Config,
    Refresh,
}

pub struct LazyGrid {
    config: GridConfig,
    store: BindingStore<SlotValue>,
    sizes: SizeCache,
    layout: LayoutEngine,
    pool: ContainerPool,
    anchors: AnchorManager,
    slot_keys: Vec<SlotKeys>,
    content_types: Vec<Option<u64>>,
    /// Provider size hints, kept to rebuild estimates when the default changes.
    size_hints: Vec<Option<f32>>,
    scroll_offset: f32,
    viewport_extent: f32,
    cross_extent: f32,
    direction: ScrollDirection,
    window: Range<usize>,
    pending_scroll: Option<PendingScrollTarget>,
    host: Option<Box<dyn ViewportHost>>,
    reported_extent: Option<f32>,
    layout_info: LazyGridLayoutInfo,
    passes: u64,
    /// Last unbounded viewport extent a warning was logged for.
    warned_unbounded: Option<f32>,
    unbounded_warnings: u32,
}

impl LazyGrid {
    pub fn new(config: GridConfig) -> Self {
        let config = config.sanitized();
        let mut layout = LayoutEngine::new(config.column_count(), config.main_axis_gap());
        layout.set_padding(config.before_content_padding, config.after_content_padding);
        Self {
            config,
            store: BindingStore::new(),
            sizes: SizeCache::new(),
            layout,
            pool: ContainerPool::new(),
            anchors: AnchorManager::new(),
            slot_keys: Vec::new(),
            content_types: Vec::new(),
            size_hints: Vec::new(),
            scroll_offset: 0.0,
            viewport_extent: 0.0,
            cross_extent: 0.0,
            direction: ScrollDirection::Idle,
            window: 0..0,
            pending_scroll: None,
            host: None,
            reported_extent: None,
            layout_info: LazyGridLayoutInfo::default(),
            passes: 0,
            warned_unbounded: None,
            unbounded_warnings: 0,
        }
    }

    /// Store the containers subscribe to.
    pub fn store(&self) -> &BindingStore<SlotValue> {
        &self.store
    }

    /// Mounts a render slot for `slot` on this grid's store.
    pub fn mount_container<R: ItemRenderer + 'static>(
        &self,
        slot: SlotId,
        renderer: std::rc::Rc<std::cell::RefCell<R>>,
    ) -> Container<R> {
        Container::mount(slot, &self.store, renderer)
    }

    pub fn set_host(&mut self, host: impl ViewportHost + 'static) {
        self.host = Some(Box::new(host));
        self.reported_extent = None;
        self.report_extent();
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Replaces the data sequence.
    ///
    /// With maintain-visible mode on, the first visible item keeps its screen
    /// position: the scroll offset follows the item and the host is asked to
    /// scroll there. Otherwise the numeric scroll offset is kept.
    pub fn submit_items(&mut self, provider: &dyn LazyItemProvider) {
        let anchor = self.first_visible();

        let count = provider.item_count();
        let mut keys = Vec::with_capacity(count);
        let mut hints = Vec::with_capacity(count);
        let mut content_types = Vec::with_capacity(count);
        for index in 0..count {
            keys.push(provider.key(index));
            hints.push(
                provider
                    .estimated_size(index)
                    .filter(|size| size.is_finite() && *size > 0.0)
                    .map(quantize),
            );
            content_types.push(provider.content_type(index));
        }
        let estimates = self.estimates_for(&hints);
        self.layout.set_items(keys, estimates);
        self.size_hints = hints;
        self.content_types = content_types;
        self.layout.relayout(&self.sizes);

        let mut adjusted = false;
        if let Some((key, old_index, screen)) = anchor {
            if self.config.maintain_visible_content_position {
                if let Some(new_index) = self.layout.index_of(&key) {
                    if new_index != old_index {
                        log::debug!(
                            "LazyGrid: first visible item {key} moved from {old_index} to {new_index}"
                        );
                        self.anchors.note_split(key.clone());
                    }
                    adjusted = self.keep_on_screen(&key, screen);
                }
            }
        }
        if self
            .pending_scroll
            .as_ref()
            .is_some_and(|pending| self.layout.index_of(&pending.key).is_none())
        {
            self.pending_scroll = None;
        }

        self.run_pass(PassCause::Data);
        if adjusted {
            self.notify_host_scroll(false);
        }
    }

    /// Host reports scroll offset and viewport size.
    pub fn set_viewport(&mut self, scroll_offset: f32, viewport_extent: f32, cross_extent: f32) {
        let scroll_offset = if scroll_offset.is_finite() {
            scroll_offset
        } else {
            self.scroll_offset
        };
        let cross_extent = if cross_extent.is_finite() {
            cross_extent.max(0.0)
        } else {
            self.cross_extent
        };
        let delta = scroll_offset - self.scroll_offset;
        let resized = viewport_extent != self.viewport_extent || cross_extent != self.cross_extent;
        if delta == 0.0 && !resized && self.passes > 0 {
            return;
        }

        self.direction = ScrollDirection::from_delta(delta);
        if delta != 0.0 && self.pending_scroll.take().is_some() {
            log::trace!("LazyGrid: user scroll cancels pending scroll-to correction");
        }
        self.scroll_offset = scroll_offset;
        self.viewport_extent = viewport_extent;
        self.cross_extent = cross_extent;
        self.warn_if_unbounded();
        let cause = if delta != 0.0 {
            PassCause::Scroll
        } else {
            PassCause::Viewport
        };
        self.run_pass(cause);
    }

    /// Scrolls by `delta` and returns the distance actually scrolled.
    pub fn scroll_by(&mut self, delta: f32) -> f32 {
        let before = self.scroll_offset;
        self.set_viewport(before + delta, self.viewport_extent, self.cross_extent);
        self.scroll_offset - before
    }

    /// Scrolls so the item at `index` sits at `options.view_position`.
    ///
    /// Returns the new scroll offset. If the item's size is still an
    /// estimate, the request is remembered and corrected once the real size
    /// arrives, provided the difference is larger than one size quantum.
    pub fn scroll_to_index(&mut self, index: usize, options: ScrollToOptions) -> Result<f32, GridError> {
        let len = self.layout.len();
        if index >= len {
            return Err(GridError::IndexOutOfBounds { index, len });
        }
        self.layout.relayout(&self.sizes);

        let target = self.scroll_target(index, options.view_position);
        let measured = self.layout.placement(index).is_some_and(|p| p.measured);
        self.direction = ScrollDirection::from_delta(target - self.scroll_offset);
        self.scroll_offset = target;
        self.pending_scroll = match self.layout.key(index) {
            Some(key) if !measured => Some(PendingScrollTarget {
                key: key.clone(),
                options,
                issued: target,
            }),
            _ => None,
        };

        self.run_pass(PassCause::Scroll);
        if let Some(pending) = self.pending_scroll.as_mut() {
            pending.issued = self.scroll_offset;
        }
        self.notify_host_scroll(options.animated);
        Ok(self.scroll_offset)
    }

    pub fn set_columns(&mut self, columns: i32) {
        let mut config = self.config.clone();
        config.columns = columns;
        self.set_config(config);
    }

    pub fn set_gap(&mut self, gap: GridGap) {
        let mut config = self.config.clone();
        config.gap = gap;
        self.set_config(config);
    }

    pub fn set_maintain_visible_content_position(&mut self, enabled: bool) {
        let mut config = self.config.clone();
        config.maintain_visible_content_position = enabled;
        self.set_config(config);
    }

    /// Applies a new configuration. Layout-affecting changes recompute every
    /// placement and keep the first visible item on screen.
    pub fn set_config(&mut self, config: GridConfig) {
        let config = config.sanitized();
        if config == self.config {
            return;
        }
        let anchor = self.first_visible();
        let estimate_changed = config.estimated_item_size != self.config.estimated_item_size;
        self.config = config;

        self.layout.set_columns(self.config.column_count());
        self.layout.set_main_gap(self.config.main_axis_gap());
        self.layout.set_padding(
            self.config.before_content_padding,
            self.config.after_content_padding,
        );
        if estimate_changed {
            let keys = self.layout.keys().to_vec();
            let estimates = self.estimates_for(&self.size_hints);
            self.layout.set_items(keys, estimates);
        }

        let mut adjusted = false;
        if self.layout.is_dirty() {
            self.layout.relayout(&self.sizes);
            if let Some((key, _, screen)) = anchor {
                adjusted = self.keep_on_screen(&key, screen);
            }
        }
        self.run_pass(PassCause::Config);
        if adjusted {
            self.notify_host_scroll(false);
        }
    }

    /// Runs a pass without any input change.
    pub fn refresh(&mut self) {
        self.run_pass(PassCause::Refresh);
    }

    /// Reports a measured main-axis size for the binding named by `ticket`.
    pub fn report_size(&mut self, ticket: MeasureTicket, raw: f32) -> MeasureOutcome {
        if !self.pool.is_current(ticket) {
            log::debug!(
                "LazyGrid: stale measurement for container {} (generation {}) discarded",
                ticket.slot,
                ticket.generation
            );
            return MeasureOutcome::Stale;
        }
        let Some((key, index)) = self
            .pool
            .record(ticket.slot)
            .and_then(|record| Some((record.item.clone()?, record.index?)))
        else {
            return MeasureOutcome::Stale;
        };

        let anchor = if self.config.maintain_visible_content_position {
            self.first_visible()
        } else {
            None
        };
        let before = self.layout.placement(index).copied();

        match self.sizes.record(&key, raw) {
            SizeUpdate::ZeroIgnored => {
                log::debug!("LazyGrid: zero extent for item {key} ignored");
                return MeasureOutcome::ZeroIgnored;
            }
            SizeUpdate::Unchanged => {
                if let Some(size) = self.sizes.get(&key) {
                    self.pool.record_size(ticket, size);
                }
                self.correct_pending_scroll(&key);
                return MeasureOutcome::Unchanged;
            }
            SizeUpdate::Inserted(size) | SizeUpdate::Changed { current: size, .. } => {
                self.pool.record_size(ticket, size);
            }
        }

        self.layout.invalidate_from(index);
        self.layout.relayout(&self.sizes);

        let mut adjusted = false;
        if let (Some((anchor_key, _, screen)), Some(before)) = (anchor, before) {
            if before.end() <= self.scroll_offset {
                adjusted = self.keep_on_screen(&anchor_key, screen);
            }
        }

        self.run_pass(PassCause::Measure);
        if adjusted {
            self.notify_host_scroll(false);
        }
        self.correct_pending_scroll(&key);
        MeasureOutcome::Applied
    }

    /// Takes a container's post-layout extent and reports it if it matters.
    pub fn deliver<R: ItemRenderer>(&mut self, container: &Container<R>, raw: f32) -> MeasureOutcome {
        let cached = container
            .item()
            .and_then(|item| self.sizes.get(&item.key));
        match container.measured(raw, cached) {
            Measurement::Report { ticket, size } => self.report_size(ticket, size),
            Measurement::Unbound => {
                log::debug!(
                    "LazyGrid: measurement from unbound container {} discarded",
                    container.slot()
                );
                MeasureOutcome::Stale
            }
            Measurement::Zero => MeasureOutcome::ZeroIgnored,
            Measurement::SameAsCached => MeasureOutcome::Unchanged,
        }
    }

    pub fn layout_info(&self) -> &LazyGridLayoutInfo {
        &self.layout_info
    }

    pub fn stats(&self) -> LazyLayoutStats {
        self.pool.stats()
    }

    pub fn item_count(&self) -> usize {
        self.layout.len()
    }

    pub fn placement_of(&self, index: usize) -> Option<ItemPlacement> {
        self.layout.placement(index).copied()
    }

    pub fn index_of(&self, key: &ItemKey) -> Option<usize> {
        self.layout.index_of(key)
    }

    pub fn cached_size(&self, key: &ItemKey) -> Option<f32> {
        self.sizes.get(key)
    }

    pub fn is_last_in_row(&self, key: &ItemKey) -> bool {
        self.layout.is_last_in_row(key)
    }

    pub fn content_extent(&self) -> f32 {
        self.layout.content_extent()
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn scroll_direction(&self) -> ScrollDirection {
        self.direction
    }

    /// Index range currently kept bound.
    pub fn window(&self) -> Range<usize> {
        self.window.clone()
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    pub fn slot_for(&self, key: &ItemKey) -> Option<SlotId> {
        self.pool.slot_for(key)
    }

    pub fn ticket_for(&self, key: &ItemKey) -> Option<MeasureTicket> {
        self.pool.ticket(self.pool.slot_for(key)?)
    }

    /// Bound containers whose item index lies in `window`.
    pub fn containers_in_window(&self, window: Range<usize>) -> Vec<SlotId> {
        self.pool.containers_in_window(window)
    }

    pub fn anchor_of(&self, slot: SlotId) -> Anchor {
        self.anchors.anchor(slot)
    }

    pub fn anchor_flips(&self) -> u64 {
        self.anchors.flips()
    }

    pub fn has_pending_scroll(&self) -> bool {
        self.pending_scroll.is_some()
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn can_scroll_forward(&self) -> bool {
        self.scroll_offset < self.viewport().max_scroll_offset(self.layout.content_extent())
    }

    pub fn can_scroll_backward(&self) -> bool {
        self.scroll_offset > 0.0
    }

    /// Cross-axis span of `column` for the last reported cross extent.
    pub fn column_span(&self, column: usize) -> CrossAxisSpan {
        let columns = self.layout.columns() as f32;
        let gap = self.config.cross_axis_gap();
        let size = ((self.cross_extent - (columns - 1.0) * gap) / columns).max(0.0);
        CrossAxisSpan {
            offset: quantize(column as f32 * (size + gap)),
            size: quantize(size),
        }
    }

    pub fn item_geometry(&self, index: usize) -> Option<ItemGeometry> {
        let placement = self.layout.placement(index)?;
        let span = self.column_span(placement.column);
        Some(ItemGeometry {
            main_offset: placement.offset,
            main_size: placement.size,
            cross_offset: span.offset,
            cross_size: span.size,
        })
    }

    /// Warns once per distinct unbounded extent the host reports.
    fn warn_if_unbounded(&mut self) {
        let viewport = self.viewport();
        if !viewport.is_infinite() {
            self.warned_unbounded = None;
            return;
        }
        if self.warned_unbounded == Some(self.viewport_extent) {
            return;
        }
        self.warned_unbounded = Some(self.viewport_extent);
        self.unbounded_warnings += 1;
        log::warn!(
            "LazyGrid: viewport extent {} is unbounded, using {} instead. \
             Place the grid in a constrained container.",
            self.viewport_extent,
            viewport.effective_extent()
        );
    }

    fn viewport(&self) -> ViewportHandler {
        let average = self
            .sizes
            .average()
            .unwrap_or(self.config.estimated_item_size);
        ViewportHandler::new(self.viewport_extent, average, self.config.main_axis_gap())
    }

    fn estimates_for(&self, hints: &[Option<f32>]) -> Vec<f32> {
        hints
            .iter()
            .map(|hint| hint.unwrap_or(self.config.estimated_item_size))
            .collect()
    }

    /// Key, index and screen offset of the first item intersecting the
    /// viewport.
    fn first_visible(&self) -> Option<(ItemKey, usize, f32)> {
        let extent = self.viewport().effective_extent();
        if extent <= 0.0 || self.layout.is_dirty() {
            return None;
        }
        let start = self.scroll_offset;
        self.layout
            .rows_in_range(start, start + extent)
            .find_map(|index| {
                let placement = self.layout.placement(index)?;
                if placement.end() <= start {
                    return None;
                }
                let key = self.layout.key(index)?.clone();
                Some((key, index, placement.offset - start))
            })
    }

    /// Moves the scroll offset so `key` sits at `screen_offset`.
    fn keep_on_screen(&mut self, key: &ItemKey, screen_offset: f32) -> bool {
        let Some(placement) = self
            .layout
            .index_of(key)
            .and_then(|index| self.layout.placement(index))
        else {
            return false;
        };
        let target = quantize(placement.offset - screen_offset);
        if target == self.scroll_offset {
            return false;
        }
        log::debug!(
            "LazyGrid: scroll offset {} -> {} to keep item {key} in place",
            self.scroll_offset,
            target
        );
        self.scroll_offset = target;
        true
    }

    fn scroll_target(&self, index: usize, view_position: f32) -> f32 {
        let viewport = self.viewport();
        let Some(placement) = self.layout.placement(index) else {
            return self.scroll_offset;
        };
        let target = target_offset(
            placement.offset,
            placement.size,
            viewport.effective_extent(),
            view_position,
        );
        viewport.clamp_scroll(target, self.layout.content_extent())
    }

    fn correct_pending_scroll(&mut self, measured: &ItemKey) {
        let Some(pending) = self.pending_scroll.clone() else {
            return;
        };
        let Some(index) = self.layout.index_of(&pending.key) else {
            self.pending_scroll = None;
            return;
        };

        let target = self.scroll_target(index, pending.options.view_position);
        if (target - pending.issued).abs() > SIZE_QUANTUM {
            log::debug!(
                "LazyGrid: correcting scroll to item {} from {} to {}",
                pending.key,
                pending.issued,
                target
            );
            self.direction = ScrollDirection::from_delta(target - self.scroll_offset);
            self.scroll_offset = target;
            self.run_pass(PassCause::Scroll);
            if let Some(pending) = self.pending_scroll.as_mut() {
                pending.issued = self.scroll_offset;
            }
            self.notify_host_scroll(pending.options.animated);
        }
        if &pending.key == measured {
            self.pending_scroll = None;
        }
    }

    fn notify_host_scroll(&mut self, animated: bool) {
        let offset = self.scroll_offset;
        if let Some(host) = self.host.as_mut() {
            host.scroll_to(offset, animated);
        }
    }

    fn report_extent(&mut self) {
        let extent = self.layout.content_extent();
        if self.reported_extent == Some(extent) {
            return;
        }
        self.reported_extent = Some(extent);
        if let Some(host) = self.host.as_mut() {
            host.content_extent_changed(extent);
        }
    }

    fn run_pass(&mut self, cause: PassCause) {
        self.layout.relayout(&self.sizes);
        let viewport = self.viewport();
        let content_extent = self.layout.content_extent();
        self.scroll_offset = viewport.clamp_scroll(self.scroll_offset, content_extent);

        let len = self.layout.len();
        let effective = viewport.effective_extent();
        self.window = if effective > 0.0 {
            self.compute_window(effective)
        } else {
            // No viewport yet: keep whatever is bound.
            self.window.start.min(len)..self.window.end.min(len)
        };

        let window_items: Vec<WindowItem> = self
            .window
            .clone()
            .filter_map(|index| {
                let key = self.layout.key(index)?.clone();
                let placement = self.layout.placement(index)?;
                Some(WindowItem {
                    index,
                    key,
                    content_type: self.content_types.get(index).copied().flatten(),
                    expected_size: placement.size,
                })
            })
            .collect();
        let split_index = self
            .anchors
            .take_split()
            .and_then(|key| self.layout.index_of(&key));

        let store = self.store.clone();
        let result = store.batch(|| self.apply_window(&store, &window_items, split_index, cause));
        match result {
            Ok(changes) if !changes.is_empty() => log::debug!(
                "LazyGrid: {:?} pass bound {} / unbound {} / moved {} (window {:?}, pool {})",
                cause,
                changes.bound.len(),
                changes.unbound.len(),
                changes.moved.len(),
                self.window,
                self.pool.len()
            ),
            Ok(_) => {}
            Err(err) => log::error!("LazyGrid: binding pass failed: {err}"),
        }

        self.report_extent();
        self.update_layout_info(effective);
        self.passes += 1;
    }

    fn compute_window(&self, effective: f32) -> Range<usize> {
        let len = self.layout.len();
        if len == 0 {
            return 0..0;
        }
        let columns = self.layout.columns();
        let gap = self.layout.main_gap();
        let mut rows = self
            .layout
            .rows_in_range(self.scroll_offset - gap, self.scroll_offset + effective + gap);
        if rows.is_empty() {
            let before_first = self
                .layout
                .placement(0)
                .is_some_and(|first| first.offset >= self.scroll_offset + effective);
            let edge = if before_first {
                0
            } else {
                self.layout.row_count() * columns
            };
            rows = edge..edge;
        }

        let margins = row_margins(self.config.overscan_rows, self.direction, &self.config.prefetch);
        let start = rows.start.saturating_sub(margins.before * columns);
        let end = (rows.end + margins.after * columns).min(len);
        start.min(end)..end
    }

    fn apply_window(
        &mut self,
        store: &BindingStore<SlotValue>,
        window_items: &[WindowItem],
        split_index: Option<usize>,
        cause: PassCause,
    ) -> Result<Reconciliation, GridError> {
        let changes = self.pool.reconcile(window_items)?;
        while self.slot_keys.len() < self.pool.len() {
            self.slot_keys
                .push(SlotKeys::new(SlotId(self.slot_keys.len() as u32)));
        }
        self.anchors.ensure_slots(self.pool.len());

        for &slot in &changes.unbound {
            self.anchors.reset(slot);
            store.set(&self.slot_keys[slot.index()].item, SlotValue::Item(None));
        }

        let mut candidates = Vec::with_capacity(window_items.len());
        for slot in self.pool.containers_in_window(self.window.clone()) {
            let Some(record) = self.pool.record(slot) else {
                continue;
            };
            let (Some(key), Some(index)) = (record.item.clone(), record.index) else {
                continue;
            };
            let generation = record.generation;
            store.set(
                &self.slot_keys[slot.index()].item,
                SlotValue::Item(Some(BoundItem {
                    key,
                    index,
                    generation,
                })),
            );
            if let Some(placement) = self.layout.placement(index) {
                candidates.push(AnchorCandidate {
                    slot,
                    index,
                    end: placement.end(),
                });
            }
        }

        self.anchors.settle(
            self.config.maintain_visible_content_position,
            cause == PassCause::Scroll,
            self.scroll_offset,
            split_index,
            &candidates,
        );

        let content_extent = self.layout.content_extent();
        let cross_gap = self.config.cross_axis_gap();
        for candidate in &candidates {
            let (Some(placement), Some(key)) = (
                self.layout.placement(candidate.index),
                self.layout.key(candidate.index),
            ) else {
                continue;
            };
            let keys = &self.slot_keys[candidate.slot.index()];
            let anchor = self.anchors.anchor(candidate.slot);
            store.set(
                &keys.position,
                SlotValue::Position(anchored_offset(anchor, placement.offset, content_extent)),
            );
            store.set(&keys.column, SlotValue::Column(placement.column));
            let trailing = if self.layout.is_last_in_row(key) {
                0.0
            } else {
                cross_gap
            };
            store.set(&keys.trailing_gap, SlotValue::TrailingGap(trailing));
        }
        Ok(changes)
    }

    fn update_layout_info(&mut self, effective: f32) {
        let start = self.scroll_offset;
        let end = start + effective;
        let visible_items_info = self
            .window
            .clone()
            .filter_map(|index| {
                let placement = self.layout.placement(index)?;
                if placement.end() <= start || placement.offset >= end {
                    return None;
                }
                let key = self.layout.key(index)?.clone();
                Some(LazyGridItemInfo {
                    index,
                    slot: self.pool.slot_for(&key),
                    key,
                    offset: placement.offset,
                    column: placement.column,
                    size: placement.size,
                })
            })
            .collect();

        self.layout_info = LazyGridLayoutInfo {
            visible_items_info,
            total_items_count: self.layout.len(),
            viewport_size: effective,
            scroll_offset: self.scroll_offset,
            content_extent: self.layout.content_extent(),
            columns: self.layout.columns(),
            before_content_padding: self.config.before_content_padding,
            after_content_padding: self.config.after_content_padding,
        };
    }
}

impl std::fmt::Debug for LazyGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyGrid")
            .field("items", &self.layout.len())
            .field("columns", &self.layout.columns())
            .field("scroll_offset", &self.scroll_offset)
            .field("viewport_extent", &self.viewport_extent)
            .field("window", &self.window)
            .field("pool", &self.pool.len())
            .finish()
    }
}
