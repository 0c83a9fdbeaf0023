//! Top/bottom anchoring of container positions.
//!
//! A bottom-anchored container expresses its offset from the content end.
//! Growth above it then changes only the scroll offset, not the number the
//! renderer positions it with. Anchoring never changes the layout engine's
//! row or column math.

use super::item_key::ItemKey;
use super::recycler::SlotId;
use super::size_cache::quantize;

/// Reference edge for a container's offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Anchor {
    #[default]
    Top,
    Bottom,
}

/// Container offset as seen by the rendering layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnchoredOffset {
    /// Distance from the content start.
    FromStart(f32),
    /// Distance from the content end to the item start.
    FromEnd(f32),
}

impl Default for AnchoredOffset {
    fn default() -> Self {
        AnchoredOffset::FromStart(0.0)
    }
}

impl AnchoredOffset {
    /// Offset from the content start for a content of `content_extent`.
    pub fn resolve(self, content_extent: f32) -> f32 {
        match self {
            AnchoredOffset::FromStart(offset) => offset,
            AnchoredOffset::FromEnd(distance) => quantize(content_extent - distance),
        }
    }

    pub fn anchor(self) -> Anchor {
        match self {
            AnchoredOffset::FromStart(_) => Anchor::Top,
            AnchoredOffset::FromEnd(_) => Anchor::Bottom,
        }
    }
}

/// Expresses `offset` relative to the edge named by `anchor`.
pub fn anchored_offset(anchor: Anchor, offset: f32, content_extent: f32) -> AnchoredOffset {
    match anchor {
        Anchor::Top => AnchoredOffset::FromStart(offset),
        Anchor::Bottom => AnchoredOffset::FromEnd(quantize(content_extent - offset)),
    }
}

/// A bound container taking part in an anchor pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnchorCandidate {
    pub slot: SlotId,
    pub index: usize,
    /// Main-axis end of the bound item.
    pub end: f32,
}

/// Per-container anchor state machine.
#[derive(Debug, Default)]
pub struct AnchorManager {
    anchors: Vec<Anchor>,
    /// First visible key of an insertion above the viewport, settled on the
    /// next pass.
    pending_split: Option<ItemKey>,
    flips: u64,
}

impl AnchorManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_slots(&mut self, count: usize) {
        if self.anchors.len() < count {
            self.anchors.resize(count, Anchor::Top);
        }
    }

    pub fn anchor(&self, slot: SlotId) -> Anchor {
        self.anchors.get(slot.index()).copied().unwrap_or_default()
    }

    /// Records that content was inserted above `key`, which was the first
    /// visible item before the change.
    pub fn note_split(&mut self, key: ItemKey) {
        self.pending_split = Some(key);
    }

    pub fn take_split(&mut self) -> Option<ItemKey> {
        self.pending_split.take()
    }

    /// Back to top anchoring, used when a slot is unbound.
    pub fn reset(&mut self, slot: SlotId) {
        if let Some(anchor) = self.anchors.get_mut(slot.index()) {
            *anchor = Anchor::Top;
        }
    }

    /// Total anchor flips so far.
    pub fn flips(&self) -> u64 {
        self.flips
    }

    /// Evaluates transitions once for a settled pass. Returns the number of
    /// flips applied.
    ///
    /// * `split_index` - current index of the key passed to `note_split`.
    ///   Candidates at or above it become bottom anchored.
    /// * `scroll_driven` - whether the pass was caused by scrolling. Only then
    ///   are bottom anchored items that left through the viewport start
    ///   returned to top anchoring.
    pub fn settle(
        &mut self,
        maintain_visible: bool,
        scroll_driven: bool,
        viewport_start: f32,
        split_index: Option<usize>,
        candidates: &[AnchorCandidate],
    ) -> usize {
        if let Some(max) = candidates.iter().map(|c| c.slot.index() + 1).max() {
            self.ensure_slots(max);
        }

        let mut flips = 0;
        for candidate in candidates {
            let current = self.anchors[candidate.slot.index()];
            let next = if !maintain_visible {
                Anchor::Top
            } else if split_index.is_some_and(|split| candidate.index <= split) {
                Anchor::Bottom
            } else if scroll_driven
                && current == Anchor::Bottom
                && candidate.end <= viewport_start
            {
                Anchor::Top
            } else {
                current
            };

            if next != current {
                log::trace!(
                    "anchor of container {} (index {}) flips {:?} -> {:?}",
                    candidate.slot,
                    candidate.index,
                    current,
                    next
                );
                self.anchors[candidate.slot.index()] = next;
                flips += 1;
            }
        }
        self.flips += flips as u64;
        flips
    }
}
