//! Core reactive plumbing for the Vellum list engine.
//!
//! The only primitive is [`BindingStore`]: a string-keyed map whose entries
//! each carry their own subscriber list. The engine writes per-container keys
//! (`itemKey:<id>`, `position:<id>`, ...) and each render slot subscribes to
//! its own, so a write wakes exactly the slot that owns the key.

pub mod binding_store;
pub mod collections;

pub use binding_store::{BindingStore, SubscriberId, Subscription};
