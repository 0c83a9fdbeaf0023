//! Lazy grid infrastructure.
//!
//! The pieces, leaves first:
//!
//! - [`SizeCache`]: last measured size per item key, kept across recycling
//! - [`LayoutEngine`]: per-item offset and column from keys and sizes
//! - [`ContainerPool`]: bounded set of render slots bound to item keys
//! - [`AnchorManager`]: top/bottom anchoring for maintain-visible mode
//! - [`Container`]: render slot subscribed to its own binding-store keys
//! - [`LazyGrid`]: runs the passes tying them together

mod anchor;
mod container;
mod grid_config;
mod item_key;
mod item_provider;
mod layout_engine;
mod lazy_grid;
mod prefetch;
mod recycler;
mod scroll_to;
mod size_cache;
mod viewport;

pub use anchor::{anchored_offset, Anchor, AnchorCandidate, AnchorManager, AnchoredOffset};
pub use container::{
    BoundItem, Container, ItemRenderer, Measurement, SlotKeys, SlotValue,
};
pub use grid_config::{GridConfig, GridGap, Orientation, DEFAULT_ITEM_SIZE_ESTIMATE};
pub use item_key::ItemKey;
pub use item_provider::{KeyedItems, LazyItemProvider};
pub use layout_engine::{ItemPlacement, LayoutEngine};
pub use lazy_grid::{
    CrossAxisSpan, ItemGeometry, LazyGrid, LazyGridItemInfo, LazyGridLayoutInfo, MeasureOutcome,
    ViewportHost,
};
pub use prefetch::{row_margins, PrefetchStrategy, RowMargins, ScrollDirection};
pub use recycler::{
    ContainerPool, LazyLayoutStats, MeasureTicket, Reconciliation, SlotId, SlotRecord, WindowItem,
};
pub use scroll_to::{target_offset, PendingScrollTarget, ScrollToOptions};
pub use size_cache::{quantize, SizeCache, SizeUpdate, SIZE_QUANTUM};
pub use viewport::ViewportHandler;
