//! Container pool and recycling.
//!
//! Slots are allocated once and referenced by a small integer id. Binding a
//! slot to an item overwrites its record; nothing is allocated per scroll.
//! Every bind and unbind bumps the slot's generation, and measurement reports
//! carry the generation they were issued for so a report that raced with
//! recycling can be recognised and dropped.

use super::item_key::ItemKey;
use crate::error::GridError;
use std::fmt;
use std::ops::Range;
use vellum_core::collections::map::{HashMap, HashSet};

/// Identifier of a pooled render slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl SlotId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies one binding of one slot. Issued on bind, required to report a
/// measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeasureTicket {
    pub slot: SlotId,
    pub generation: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SlotRecord {
    /// Bound item, `None` while the slot is free.
    pub item: Option<ItemKey>,
    pub index: Option<usize>,
    pub generation: u64,
    /// Measured size of the most recent content this slot displayed.
    pub last_size: Option<f32>,
    /// Content type of the most recent content this slot displayed.
    pub content_type: Option<u64>,
}

/// One entry of the window the recycler is asked to cover.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowItem {
    pub index: usize,
    pub key: ItemKey,
    pub content_type: Option<u64>,
    /// Size the item is expected to take (measured or estimated).
    pub expected_size: f32,
}

/// Changes applied by [`ContainerPool::reconcile`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reconciliation {
    /// Slots released because their item left the window.
    pub unbound: Vec<SlotId>,
    /// Slots newly bound to an item that entered the window.
    pub bound: Vec<SlotId>,
    /// Slots that kept their item but whose item moved to another index.
    pub moved: Vec<SlotId>,
    /// Number of slots added to the pool.
    pub grown: usize,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.unbound.is_empty() && self.bound.is_empty() && self.moved.is_empty()
    }
}

/// Pool occupancy counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LazyLayoutStats {
    /// Slots currently bound to an item.
    pub slots_in_use: usize,
    /// Slots sitting in the free list.
    pub slots_in_pool: usize,
    /// Binds performed since creation.
    pub total_bound: u64,
    /// Binds that reused a slot which had displayed other content before.
    pub reuse_count: u64,
}

#[derive(Debug, Default)]
pub struct ContainerPool {
    slots: Vec<SlotRecord>,
    /// Free slots, most recently freed last.
    free: Vec<SlotId>,
    by_key: HashMap<ItemKey, SlotId>,
    total_bound: u64,
    reuse_count: u64,
}

impl ContainerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots ever allocated. Never decreases.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn bound_count(&self) -> usize {
        self.by_key.len()
    }

    /// Grows the pool to at least `capacity` slots.
    pub fn ensure_capacity(&mut self, capacity: usize) -> usize {
        let current = self.slots.len();
        if capacity <= current {
            return 0;
        }
        self.slots.resize_with(capacity, SlotRecord::default);
        // Lowest new id ends up on top of the stack.
        self.free
            .extend((current..capacity).rev().map(|id| SlotId(id as u32)));
        let grown = capacity - current;
        log::debug!("LazyGrid: container pool grew by {grown} to {capacity}");
        grown
    }

    /// Binds `slot` to `key` at `index`.
    pub fn bind(
        &mut self,
        slot: SlotId,
        key: ItemKey,
        index: usize,
        content_type: Option<u64>,
    ) -> Result<MeasureTicket, GridError> {
        let record = self
            .slots
            .get(slot.index())
            .ok_or(GridError::UnknownSlot { slot })?;
        if record.item.is_some() {
            return Err(GridError::SlotAlreadyBound { slot });
        }
        if let Some(&owner) = self.by_key.get(&key) {
            return Err(GridError::KeyAlreadyBound { key, slot: owner });
        }

        self.free.retain(|free| *free != slot);
        let record = &mut self.slots[slot.index()];
        if record.generation > 0 {
            self.reuse_count += 1;
        }
        record.generation += 1;
        record.item = Some(key.clone());
        record.index = Some(index);
        record.content_type = content_type;
        self.by_key.insert(key, slot);
        self.total_bound += 1;

        Ok(MeasureTicket {
            slot,
            generation: record.generation,
        })
    }

    /// Releases `slot`. Returns the key it was bound to, `None` if it was free.
    pub fn unbind(&mut self, slot: SlotId) -> Result<Option<ItemKey>, GridError> {
        let record = self
            .slots
            .get_mut(slot.index())
            .ok_or(GridError::UnknownSlot { slot })?;
        let Some(key) = record.item.take() else {
            return Ok(None);
        };
        record.index = None;
        record.generation += 1;
        self.by_key.remove(&key);
        self.free.push(slot);
        Ok(Some(key))
    }

    /// Updates the index of a bound slot whose item moved.
    pub fn rebind_index(&mut self, slot: SlotId, index: usize) -> Result<(), GridError> {
        let record = self
            .slots
            .get_mut(slot.index())
            .ok_or(GridError::UnknownSlot { slot })?;
        if record.item.is_some() {
            record.index = Some(index);
        }
        Ok(())
    }

    /// Whether `ticket` still refers to the live binding of its slot.
    pub fn is_current(&self, ticket: MeasureTicket) -> bool {
        self.slots
            .get(ticket.slot.index())
            .is_some_and(|record| record.item.is_some() && record.generation == ticket.generation)
    }

    /// Remembers the measured size of the slot's current content.
    pub fn record_size(&mut self, ticket: MeasureTicket, size: f32) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.slots[ticket.slot.index()].last_size = Some(size);
        true
    }

    pub fn record(&self, slot: SlotId) -> Option<&SlotRecord> {
        self.slots.get(slot.index())
    }

    pub fn slot_for(&self, key: &ItemKey) -> Option<SlotId> {
        self.by_key.get(key).copied()
    }

    pub fn ticket(&self, slot: SlotId) -> Option<MeasureTicket> {
        let record = self.slots.get(slot.index())?;
        record.item.as_ref()?;
        Some(MeasureTicket {
            slot,
            generation: record.generation,
        })
    }

    /// Bound slots whose item index lies in `window`, in index order.
    pub fn containers_in_window(&self, window: Range<usize>) -> Vec<SlotId> {
        let mut found: Vec<(usize, SlotId)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(id, record)| {
                let index = record.index?;
                window
                    .contains(&index)
                    .then_some((index, SlotId(id as u32)))
            })
            .collect();
        found.sort_unstable();
        found.into_iter().map(|(_, slot)| slot).collect()
    }

    /// Picks the free slot best suited for new content.
    ///
    /// Preference order: same content type, then previous size closest to
    /// `expected_size`, then most recently freed.
    pub fn take_free_for(&mut self, content_type: Option<u64>, expected_size: f32) -> Option<SlotId> {
        let slots = &self.slots;
        let (position, _) = self
            .free
            .iter()
            .enumerate()
            .min_by(|(pos_a, a), (pos_b, b)| {
                let score = |slot: &SlotId| {
                    let record = &slots[slot.index()];
                    let type_mismatch = record.content_type != content_type;
                    let distance = record
                        .last_size
                        .map_or(f32::INFINITY, |size| (size - expected_size).abs());
                    (type_mismatch, distance)
                };
                let (mismatch_a, distance_a) = score(*a);
                let (mismatch_b, distance_b) = score(*b);
                mismatch_a
                    .cmp(&mismatch_b)
                    .then(distance_a.total_cmp(&distance_b))
                    .then(pos_b.cmp(pos_a))
            })?;
        Some(self.free.remove(position))
    }

    /// Makes the bound set equal to `window`.
    ///
    /// Items that left are unbound first so their slots can be reused by the
    /// items that entered; items present before and after keep their slot.
    pub fn reconcile(&mut self, window: &[WindowItem]) -> Result<Reconciliation, GridError> {
        let mut result = Reconciliation::default();
        let wanted: HashSet<&ItemKey> = window.iter().map(|item| &item.key).collect();

        let leaving: Vec<SlotId> = self
            .by_key
            .iter()
            .filter(|(key, _)| !wanted.contains(key))
            .map(|(_, slot)| *slot)
            .collect();
        for slot in leaving {
            self.unbind(slot)?;
            result.unbound.push(slot);
        }
        result.unbound.sort_unstable();

        result.grown = self.ensure_capacity(window.len());

        for item in window {
            if let Some(slot) = self.slot_for(&item.key) {
                if self.slots[slot.index()].index != Some(item.index) {
                    self.rebind_index(slot, item.index)?;
                    result.moved.push(slot);
                }
                continue;
            }
            let slot = match self.take_free_for(item.content_type, item.expected_size) {
                Some(slot) => slot,
                None => {
                    let id = self.slots.len();
                    result.grown += self.ensure_capacity(id + 1);
                    self.free.retain(|free| free.index() != id);
                    SlotId(id as u32)
                }
            };
            self.bind(slot, item.key.clone(), item.index, item.content_type)?;
            result.bound.push(slot);
        }
        Ok(result)
    }

    pub fn stats(&self) -> LazyLayoutStats {
        LazyLayoutStats {
            slots_in_use: self.by_key.len(),
            slots_in_pool: self.free.len(),
            total_bound: self.total_bound,
            reuse_count: self.reuse_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(range: Range<usize>) -> Vec<WindowItem> {
        range
            .map(|index| WindowItem {
                index,
                key: ItemKey::Num(index as u64),
                content_type: None,
                expected_size: 100.0,
            })
            .collect()
    }

    fn assert_exclusive(pool: &ContainerPool) {
        let mut seen = HashSet::default();
        for id in 0..pool.len() {
            if let Some(key) = &pool.record(SlotId(id as u32)).unwrap().item {
                assert!(seen.insert(key.clone()), "{key} bound twice");
                assert_eq!(pool.slot_for(key), Some(SlotId(id as u32)));
            }
        }
        assert_eq!(seen.len(), pool.bound_count());
    }

    #[test]
    fn bind_rejects_double_bindings() {
        let mut pool = ContainerPool::new();
        pool.ensure_capacity(2);

        pool.bind(SlotId(0), ItemKey::from("a"), 0, None).unwrap();
        assert_eq!(
            pool.bind(SlotId(0), ItemKey::from("b"), 1, None),
            Err(GridError::SlotAlreadyBound { slot: SlotId(0) })
        );
        assert_eq!(
            pool.bind(SlotId(1), ItemKey::from("a"), 0, None),
            Err(GridError::KeyAlreadyBound {
                key: ItemKey::from("a"),
                slot: SlotId(0)
            })
        );
        assert_eq!(
            pool.unbind(SlotId(9)),
            Err(GridError::UnknownSlot { slot: SlotId(9) })
        );
        assert_exclusive(&pool);
    }

    #[test]
    fn rebinding_invalidates_old_ticket() {
        let mut pool = ContainerPool::new();
        pool.ensure_capacity(1);

        let first = pool.bind(SlotId(0), ItemKey::from("a"), 0, None).unwrap();
        assert!(pool.is_current(first));
        pool.unbind(SlotId(0)).unwrap();
        assert!(!pool.is_current(first));

        let second = pool.bind(SlotId(0), ItemKey::from("b"), 5, None).unwrap();
        assert!(!pool.record_size(first, 80.0));
        assert!(pool.record_size(second, 80.0));
        assert_eq!(pool.record(SlotId(0)).unwrap().last_size, Some(80.0));
    }

    #[test]
    fn reconcile_keeps_slots_for_surviving_keys() {
        let mut pool = ContainerPool::new();
        pool.reconcile(&window(0..6)).unwrap();
        let slot_of_4 = pool.slot_for(&ItemKey::Num(4)).unwrap();

        let changes = pool.reconcile(&window(3..9)).unwrap();

        assert_eq!(changes.unbound.len(), 3);
        assert_eq!(changes.bound.len(), 3);
        assert_eq!(changes.grown, 0);
        assert_eq!(pool.slot_for(&ItemKey::Num(4)), Some(slot_of_4));
        assert_eq!(pool.len(), 6);
        assert_exclusive(&pool);
    }

    #[test]
    fn pool_grows_but_never_shrinks() {
        let mut pool = ContainerPool::new();
        assert_eq!(pool.reconcile(&window(0..4)).unwrap().grown, 4);
        assert_eq!(pool.reconcile(&window(0..10)).unwrap().grown, 6);
        pool.reconcile(&window(0..2)).unwrap();

        assert_eq!(pool.len(), 10);
        assert_eq!(pool.stats().slots_in_use, 2);
        assert_eq!(pool.stats().slots_in_pool, 8);
    }

    #[test]
    fn free_slot_choice_prefers_type_then_size() {
        let mut pool = ContainerPool::new();
        pool.ensure_capacity(3);
        for (slot, (content_type, size)) in [(Some(1), 300.0), (Some(2), 120.0), (Some(2), 90.0)]
            .into_iter()
            .enumerate()
        {
            let slot = SlotId(slot as u32);
            let ticket = pool
                .bind(slot, ItemKey::Num(slot.0 as u64), slot.index(), content_type)
                .unwrap();
            pool.record_size(ticket, size);
            pool.unbind(slot).unwrap();
        }

        assert_eq!(pool.take_free_for(Some(2), 100.0), Some(SlotId(2)));
        assert_eq!(pool.take_free_for(Some(1), 100.0), Some(SlotId(0)));
        assert_eq!(pool.take_free_for(Some(7), 100.0), Some(SlotId(1)));
        assert_eq!(pool.take_free_for(None, 100.0), None);
    }

    #[test]
    fn fresh_slots_are_handed_out_lowest_first() {
        let mut pool = ContainerPool::new();
        pool.ensure_capacity(3);
        assert_eq!(pool.take_free_for(None, 50.0), Some(SlotId(0)));
        assert_eq!(pool.take_free_for(None, 50.0), Some(SlotId(1)));
    }

    #[test]
    fn moved_items_keep_slot_and_generation() {
        let mut pool = ContainerPool::new();
        pool.reconcile(&window(0..3)).unwrap();
        let slot = pool.slot_for(&ItemKey::Num(1)).unwrap();
        let ticket = pool.ticket(slot).unwrap();

        let mut shifted = window(0..3);
        for item in &mut shifted {
            item.index += 5;
        }
        let changes = pool.reconcile(&shifted).unwrap();

        assert_eq!(changes.moved.len(), 3);
        assert!(changes.bound.is_empty());
        assert!(pool.is_current(ticket));
        assert_eq!(pool.record(slot).unwrap().index, Some(6));
        assert_eq!(pool.containers_in_window(5..7).len(), 2);
    }

    #[test]
    fn stats_count_reuse() {
        let mut pool = ContainerPool::new();
        pool.reconcile(&window(0..4)).unwrap();
        pool.reconcile(&window(4..8)).unwrap();

        let stats = pool.stats();
        assert_eq!(stats.total_bound, 8);
        assert_eq!(stats.reuse_count, 4);
    }
}
