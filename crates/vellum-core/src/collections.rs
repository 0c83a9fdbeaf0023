//! Hash map aliases shared by the engine crates.
//!
//! The default build uses `rustc-hash`'s Fx hasher: keys are small
//! (container ids, item keys, store key names) and never attacker controlled.
//! Enable the `std-hash` feature to fall back to SipHash.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
}

/// Creates an empty map with room for `capacity` entries using the configured hasher.
pub fn map_with_capacity<K, V>(capacity: usize) -> map::HashMap<K, V> {
    map::HashMap::with_capacity_and_hasher(capacity, Default::default())
}
