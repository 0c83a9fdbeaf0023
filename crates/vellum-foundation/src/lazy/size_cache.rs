//! Per-key cache of measured main-axis sizes.

use super::item_key::ItemKey;
use vellum_core::collections::map::HashMap;

/// Sub-pixel grid every size and offset is snapped to.
pub const SIZE_QUANTUM: f32 = 0.125;

/// Rounds `value` to the nearest [`SIZE_QUANTUM`].
///
/// Offsets are sums of many sizes; snapping each term keeps long lists from
/// accumulating visible drift.
#[inline]
pub fn quantize(value: f32) -> f32 {
    (value / SIZE_QUANTUM).round() * SIZE_QUANTUM
}

/// Result of offering a measurement to the cache.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SizeUpdate {
    /// First measurement for this key.
    Inserted(f32),
    /// The quantized size differs from the cached one.
    Changed { previous: f32, current: f32 },
    /// Same quantized size as already cached.
    Unchanged,
    /// Zero, negative or non-finite extent; never cached.
    ZeroIgnored,
}

/// Last known measured size per item key.
///
/// Entries are kept when the item's container is recycled so a previously
/// seen item reappears at its real size instead of the estimate.
#[derive(Clone, Debug, Default)]
pub struct SizeCache {
    sizes: HashMap<ItemKey, f32>,
    /// Sum of cached sizes, for the running average.
    total: f64,
}

impl SizeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ItemKey) -> Option<f32> {
        self.sizes.get(key).copied()
    }

    /// Records a raw measurement for `key`.
    pub fn record(&mut self, key: &ItemKey, raw: f32) -> SizeUpdate {
        if !raw.is_finite() {
            return SizeUpdate::ZeroIgnored;
        }
        let size = quantize(raw);
        if size <= 0.0 {
            return SizeUpdate::ZeroIgnored;
        }

        match self.sizes.get_mut(key) {
            Some(previous) if *previous == size => SizeUpdate::Unchanged,
            Some(previous) => {
                let old = *previous;
                *previous = size;
                self.total += f64::from(size) - f64::from(old);
                SizeUpdate::Changed {
                    previous: old,
                    current: size,
                }
            }
            None => {
                self.sizes.insert(key.clone(), size);
                self.total += f64::from(size);
                SizeUpdate::Inserted(size)
            }
        }
    }

    /// Mean of all cached sizes, `None` while nothing has been measured.
    pub fn average(&self) -> Option<f32> {
        if self.sizes.is_empty() {
            None
        } else {
            Some((self.total / self.sizes.len() as f64) as f32)
        }
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_snaps_to_eighths() {
        assert_eq!(quantize(199.96), 200.0);
        assert_eq!(quantize(199.94), 200.0);
        assert_eq!(quantize(10.06), 10.0);
        assert_eq!(quantize(10.07), 10.125);
    }

    #[test]
    fn near_identical_measurements_are_unchanged() {
        let mut cache = SizeCache::new();
        let key = ItemKey::from("a");

        assert_eq!(cache.record(&key, 199.96), SizeUpdate::Inserted(200.0));
        assert_eq!(cache.record(&key, 199.94), SizeUpdate::Unchanged);
        assert_eq!(cache.get(&key), Some(200.0));
    }

    #[test]
    fn zero_is_never_written() {
        let mut cache = SizeCache::new();
        let key = ItemKey::from(1u64);

        assert_eq!(cache.record(&key, 0.0), SizeUpdate::ZeroIgnored);
        assert_eq!(cache.record(&key, 0.04), SizeUpdate::ZeroIgnored);
        assert_eq!(cache.record(&key, f32::NAN), SizeUpdate::ZeroIgnored);
        assert!(cache.is_empty());

        cache.record(&key, 80.0);
        assert_eq!(cache.record(&key, 0.0), SizeUpdate::ZeroIgnored);
        assert_eq!(cache.get(&key), Some(80.0));
    }

    #[test]
    fn average_tracks_replacements() {
        let mut cache = SizeCache::new();
        cache.record(&ItemKey::Num(0), 100.0);
        cache.record(&ItemKey::Num(1), 200.0);
        assert_eq!(cache.average(), Some(150.0));

        cache.record(&ItemKey::Num(1), 300.0);
        assert_eq!(cache.average(), Some(200.0));
    }
}
