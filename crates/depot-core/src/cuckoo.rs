//! # Cuckoo Filter
//!
//! Probabilistic set with deletion, used to answer "is this SKU sold out?"
//! without touching storage.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Partial-Key Cuckoo Hashing                             │
//! │                                                                         │
//! │  key ──hash──► h (64 bit)                                              │
//! │                 ├── low bits  → i1 = h & mask                          │
//! │                 └── high bits → fp (16 bit, never 0)                   │
//! │                                 i2 = i1 ^ (hash(fp) & mask)            │
//! │                                                                         │
//! │  buckets (power of two)                                                │
//! │  ┌────┬────┬────┬────┐                                                 │
//! │  │ fp │ fp │ 0  │ 0  │  ← bucket i1 (4 slots, 0 = empty)               │
//! │  └────┴────┴────┴────┘                                                 │
//! │  ┌────┬────┬────┬────┐                                                 │
//! │  │ fp │ fp │ fp │ fp │  ← bucket i2 full → evict, move victim to its   │
//! │  └────┴────┴────┴────┘    alternate bucket, repeat up to MAX_KICKS     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - No false negatives for inserted keys that were not removed.
//! - False positives bounded by the 16-bit fingerprint (~0.01% at 95% load).
//! - Removing a key that was never inserted may remove a colliding one, so
//!   callers only remove keys they know they inserted.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::{CoreError, CoreResult};

/// Slots per bucket.
const BUCKET_SIZE: usize = 4;

/// Eviction chain length before an insert gives up.
const MAX_KICKS: usize = 500;

/// Target load factor used to size the table.
const TARGET_LOAD: f64 = 0.95;

type Bucket = [u16; BUCKET_SIZE];

/// A cuckoo filter over any hashable key.
///
/// ## Example
/// ```rust
/// use depot_core::CuckooFilter;
///
/// let mut sold_out = CuckooFilter::with_capacity(1_000);
/// sold_out.insert(&42i64).unwrap();
/// assert!(sold_out.contains(&42i64));
/// assert!(sold_out.remove(&42i64));
/// assert!(!sold_out.contains(&42i64));
/// ```
#[derive(Debug, Clone)]
pub struct CuckooFilter {
    buckets: Vec<Bucket>,
    mask: usize,
    len: usize,
    /// Fingerprint displaced by a failed insert, kept so it is not lost.
    victim: Option<(usize, u16)>,
}

impl CuckooFilter {
    /// Creates a filter sized for roughly `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        let wanted = ((capacity.max(1) as f64) / (BUCKET_SIZE as f64 * TARGET_LOAD)).ceil() as usize;
        let count = wanted.max(1).next_power_of_two();
        CuckooFilter {
            buckets: vec![[0u16; BUCKET_SIZE]; count],
            mask: count - 1,
            len: 0,
            victim: None,
        }
    }

    /// Number of stored fingerprints.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total slot count.
    pub fn capacity(&self) -> usize {
        self.buckets.len() * BUCKET_SIZE
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    /// Empties the filter, keeping its size.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = [0u16; BUCKET_SIZE];
        }
        self.len = 0;
        self.victim = None;
    }

    /// Adds a key.
    ///
    /// ## Returns
    /// * `Ok(())` - Stored (duplicates are stored again)
    /// * `Err(CoreError::FilterFull)` - Table is saturated; the key is still
    ///   reported by [`contains`](Self::contains)
    pub fn insert<K: Hash + ?Sized>(&mut self, key: &K) -> CoreResult<()> {
        if self.victim.is_some() {
            return Err(CoreError::FilterFull {
                capacity: self.capacity(),
            });
        }

        let (i1, fp) = self.index_and_fingerprint(key);
        let i2 = self.alt_index(i1, fp);
        if self.put(i1, fp) || self.put(i2, fp) {
            self.len += 1;
            return Ok(());
        }

        let mut index = if fp & 1 == 0 { i1 } else { i2 };
        let mut fp = fp;
        for kick in 0..MAX_KICKS {
            let slot = kick % BUCKET_SIZE;
            std::mem::swap(&mut fp, &mut self.buckets[index][slot]);
            index = self.alt_index(index, fp);
            if self.put(index, fp) {
                self.len += 1;
                return Ok(());
            }
        }

        // The displaced fingerprint stays visible through the victim slot.
        self.victim = Some((index, fp));
        self.len += 1;
        Err(CoreError::FilterFull {
            capacity: self.capacity(),
        })
    }

    /// Checks membership. False positives are possible, false negatives not.
    pub fn contains<K: Hash + ?Sized>(&self, key: &K) -> bool {
        let (i1, fp) = self.index_and_fingerprint(key);
        let i2 = self.alt_index(i1, fp);
        if let Some((vi, vfp)) = self.victim {
            if vfp == fp && (vi == i1 || vi == i2) {
                return true;
            }
        }
        self.buckets[i1].contains(&fp) || self.buckets[i2].contains(&fp)
    }

    /// Removes one occurrence of a key. Returns false when absent.
    pub fn remove<K: Hash + ?Sized>(&mut self, key: &K) -> bool {
        let (i1, fp) = self.index_and_fingerprint(key);
        let i2 = self.alt_index(i1, fp);

        if let Some((vi, vfp)) = self.victim {
            if vfp == fp && (vi == i1 || vi == i2) {
                self.victim = None;
                self.len -= 1;
                return true;
            }
        }

        for index in [i1, i2] {
            if let Some(slot) = self.buckets[index].iter().position(|&f| f == fp) {
                self.buckets[index][slot] = 0;
                self.len -= 1;
                self.reinsert_victim();
                return true;
            }
        }
        false
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn put(&mut self, index: usize, fp: u16) -> bool {
        match self.buckets[index].iter().position(|&f| f == 0) {
            Some(slot) => {
                self.buckets[index][slot] = fp;
                true
            }
            None => false,
        }
    }

    /// Moves a stashed victim back into the table once a slot frees up.
    fn reinsert_victim(&mut self) {
        if let Some((index, fp)) = self.victim {
            let alt = self.alt_index(index, fp);
            if self.put(index, fp) || self.put(alt, fp) {
                self.victim = None;
            }
        }
    }

    fn index_and_fingerprint<K: Hash + ?Sized>(&self, key: &K) -> (usize, u16) {
        let h = hash_of(key);
        let fp = match (h >> 48) as u16 {
            0 => 1,
            f => f,
        };
        ((h as usize) & self.mask, fp)
    }

    fn alt_index(&self, index: usize, fp: u16) -> usize {
        (index ^ (hash_of(&fp) as usize)) & self.mask
    }
}

fn hash_of<K: Hash + ?Sized>(key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizing_is_power_of_two() {
        let filter = CuckooFilter::with_capacity(1000);
        assert!(filter.capacity() >= 1000);
        assert!(filter.buckets.len().is_power_of_two());
        assert!(filter.is_empty());
        assert_eq!(CuckooFilter::with_capacity(0).capacity(), BUCKET_SIZE);
    }

    #[test]
    fn test_alt_index_is_involution() {
        let filter = CuckooFilter::with_capacity(4096);
        for key in 0i64..500 {
            let (i1, fp) = filter.index_and_fingerprint(&key);
            let i2 = filter.alt_index(i1, fp);
            assert_eq!(filter.alt_index(i2, fp), i1);
        }
    }

    #[test]
    fn test_no_false_negatives() {
        let mut filter = CuckooFilter::with_capacity(10_000);
        for sku in 0i64..9_000 {
            filter.insert(&sku).unwrap();
        }
        for sku in 0i64..9_000 {
            assert!(filter.contains(&sku), "lost sku {sku}");
        }
        assert_eq!(filter.len(), 9_000);
    }

    #[test]
    fn test_false_positive_rate_is_low() {
        let mut filter = CuckooFilter::with_capacity(10_000);
        for sku in 0i64..10_000 {
            filter.insert(&sku).unwrap();
        }
        let false_positives = (1_000_000i64..1_100_000)
            .filter(|sku| filter.contains(sku))
            .count();
        // 8 candidate slots × 2^-16 per slot ≈ 0.012%.
        assert!(false_positives < 200, "too many false positives: {false_positives}");
    }

    #[test]
    fn test_remove() {
        let mut filter = CuckooFilter::with_capacity(100);
        filter.insert(&7i64).unwrap();
        filter.insert(&8i64).unwrap();
        assert!(filter.remove(&7i64));
        assert!(!filter.contains(&7i64));
        assert!(filter.contains(&8i64));
        assert!(!filter.remove(&7i64));
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_overfill_keeps_every_key_visible() {
        let mut filter = CuckooFilter::with_capacity(8);
        let capacity = filter.capacity() as i64;
        let mut stored = Vec::new();
        for sku in 0..capacity * 4 {
            match filter.insert(&sku) {
                Ok(()) => stored.push(sku),
                Err(CoreError::FilterFull { .. }) => {
                    stored.push(sku);
                    break;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(filter.insert(&-1i64).is_err());
        for sku in &stored {
            assert!(filter.contains(sku), "lost sku {sku}");
        }
    }

    #[test]
    fn test_clear() {
        let mut filter = CuckooFilter::with_capacity(100);
        filter.insert("sku-1").unwrap();
        filter.clear();
        assert!(filter.is_empty());
        assert!(!filter.contains("sku-1"));
    }
}
