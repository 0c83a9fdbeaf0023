//! Item provider trait for lazy grids.
//!
//! The engine never owns item data. It reads identity, content type and an
//! optional size hint per index through [`LazyItemProvider`] and keeps only
//! the keys.

use super::item_key::ItemKey;
use vellum_core::collections::map::HashMap;
use vellum_core::collections::map_with_capacity;

/// Provides the information the engine needs about the data sequence.
///
/// Implementations describe one snapshot of the data; when the data changes
/// the caller submits the provider again.
pub trait LazyItemProvider {
    /// Total number of items (visible or not).
    fn item_count(&self) -> usize;

    /// Stable key for the item at `index`.
    fn key(&self, index: usize) -> ItemKey;

    /// Content type used to steer container reuse.
    ///
    /// Containers that last rendered the same content type are preferred when
    /// recycling. `None` means the item has no particular type.
    fn content_type(&self, index: usize) -> Option<u64> {
        let _ = index;
        None
    }

    /// Size hint used until the item has been measured.
    ///
    /// `None` falls back to the grid-wide estimate.
    fn estimated_size(&self, index: usize) -> Option<f32> {
        let _ = index;
        None
    }

    /// Index of the item with `key`, if present.
    fn index_of(&self, key: &ItemKey) -> Option<usize> {
        (0..self.item_count()).find(|&index| &self.key(index) == key)
    }
}

/// Vector-backed provider with an O(1) key lookup.
#[derive(Clone, Debug, Default)]
pub struct KeyedItems {
    keys: Vec<ItemKey>,
    content_types: Vec<Option<u64>>,
    estimates: Vec<Option<f32>>,
    positions: HashMap<ItemKey, usize>,
}

impl KeyedItems {
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ItemKey>,
    {
        let keys: Vec<ItemKey> = keys.into_iter().map(Into::into).collect();
        let mut positions = map_with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            positions.entry(key.clone()).or_insert(index);
        }
        let len = keys.len();
        Self {
            keys,
            content_types: vec![None; len],
            estimates: vec![None; len],
            positions,
        }
    }

    /// Numeric keys `0..count`.
    pub fn sequential(count: usize) -> Self {
        Self::new((0..count as u64).map(ItemKey::Num))
    }

    pub fn with_content_type(mut self, index: usize, content_type: u64) -> Self {
        if let Some(slot) = self.content_types.get_mut(index) {
            *slot = Some(content_type);
        }
        self
    }

    pub fn with_estimated_size(mut self, index: usize, size: f32) -> Self {
        if let Some(slot) = self.estimates.get_mut(index) {
            *slot = Some(size);
        }
        self
    }

    /// Returns a copy with `keys` inserted before `index`.
    pub fn inserted<I, K>(&self, index: usize, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ItemKey>,
    {
        let at = index.min(self.keys.len());
        let added: Vec<ItemKey> = keys.into_iter().map(Into::into).collect();
        let added_len = added.len();

        let mut all = self.keys.clone();
        all.splice(at..at, added);
        let mut next = Self::new(all);
        for (old, ct) in self.content_types.iter().enumerate() {
            let new_index = if old < at { old } else { old + added_len };
            next.content_types[new_index] = *ct;
        }
        for (old, estimate) in self.estimates.iter().enumerate() {
            let new_index = if old < at { old } else { old + added_len };
            next.estimates[new_index] = *estimate;
        }
        next
    }

    /// Returns a copy with the items in `range` removed.
    pub fn removed(&self, range: std::ops::Range<usize>) -> Self {
        let end = range.end.min(self.keys.len());
        let start = range.start.min(end);
        let keep = |index: &usize| *index < start || *index >= end;

        let mut next = Self::new(
            self.keys
                .iter()
                .enumerate()
                .filter(|(index, _)| keep(index))
                .map(|(_, key)| key.clone()),
        );
        next.content_types = self
            .content_types
            .iter()
            .enumerate()
            .filter(|(index, _)| keep(index))
            .map(|(_, ct)| *ct)
            .collect();
        next.estimates = self
            .estimates
            .iter()
            .enumerate()
            .filter(|(index, _)| keep(index))
            .map(|(_, estimate)| *estimate)
            .collect();
        next
    }

    pub fn keys(&self) -> &[ItemKey] {
        &self.keys
    }
}

impl LazyItemProvider for KeyedItems {
    fn item_count(&self) -> usize {
        self.keys.len()
    }

    fn key(&self, index: usize) -> ItemKey {
        self.keys[index].clone()
    }

    fn content_type(&self, index: usize) -> Option<u64> {
        self.content_types.get(index).copied().flatten()
    }

    fn estimated_size(&self, index: usize) -> Option<f32> {
        self.estimates.get(index).copied().flatten()
    }

    fn index_of(&self, key: &ItemKey) -> Option<usize> {
        self.positions.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_keys_follow_indices() {
        let items = KeyedItems::sequential(3);
        assert_eq!(items.item_count(), 3);
        assert_eq!(items.key(2), ItemKey::Num(2));
        assert_eq!(items.index_of(&ItemKey::Num(1)), Some(1));
    }

    #[test]
    fn insertion_shifts_indices_but_keeps_keys() {
        let items = KeyedItems::new(["a", "b"]).with_content_type(1, 9);
        let grown = items.inserted(0, ["x", "y"]);

        assert_eq!(grown.item_count(), 4);
        assert_eq!(grown.index_of(&ItemKey::from("b")), Some(3));
        assert_eq!(grown.content_type(3), Some(9));
        assert_eq!(grown.content_type(0), None);
    }

    #[test]
    fn removal_drops_range() {
        let items = KeyedItems::sequential(5).with_estimated_size(4, 120.0);
        let trimmed = items.removed(1..3);

        assert_eq!(
            trimmed.keys(),
            &[ItemKey::Num(0), ItemKey::Num(3), ItemKey::Num(4)]
        );
        assert_eq!(trimmed.estimated_size(2), Some(120.0));
    }

    #[test]
    fn default_index_of_scans_keys() {
        struct Plain;
        impl LazyItemProvider for Plain {
            fn item_count(&self) -> usize {
                4
            }
            fn key(&self, index: usize) -> ItemKey {
                ItemKey::Num(index as u64 * 10)
            }
        }

        assert_eq!(Plain.index_of(&ItemKey::Num(30)), Some(3));
        assert_eq!(Plain.index_of(&ItemKey::Num(31)), None);
    }
}
