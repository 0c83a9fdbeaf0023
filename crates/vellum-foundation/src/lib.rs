//! List virtualization and container recycling for Vellum.
//!
//! Renders only a bounded window of containers over an arbitrarily long
//! sequence of keyed items, lays the items out in a multi-column grid from
//! measured and estimated sizes, and keeps visible content in place while
//! items are inserted around it.

mod error;
pub mod lazy;

pub use error::GridError;
pub use lazy::{
    GridConfig, GridGap, ItemKey, ItemRenderer, KeyedItems, LazyGrid, LazyItemProvider,
    MeasureOutcome, ScrollToOptions, ViewportHost,
};
