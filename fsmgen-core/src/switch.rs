//! Dispatch-strategy selection: turns a set of keyed entries into a dense or
//! sparse hash switch.
//!
//! The selector knows nothing about machines. It buckets keys by their
//! [`TokenValue::switch_hash`], decides between a dense slot table and a
//! sorted sparse key list, and resolves collisions inside a bucket with an
//! ordered chain of exact comparisons.

use std::collections::BTreeMap;

use crate::error::SwitchError;
use crate::token::TokenValue;

/// Upper bound on the number of slots a dense table may allocate.
pub const MAX_DENSE_SPAN: u64 = 1 << 16;

/// How values sharing a hash are told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// The hash is the value: equal hashes imply equal values.
    Identity,
    /// Numeric comparison of wide integers.
    Value,
    /// Comparison of canonical floating point bit patterns.
    Bits,
    /// Content comparison of strings.
    Content,
}

impl Comparison {
    pub fn hash_is_exact(self) -> bool {
        matches!(self, Self::Identity)
    }
}

/// Requested table representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Dense when the hash span fits `max_delta`, sparse otherwise.
    #[default]
    Auto,
    /// One slot per hash in `[min, max]`. Spans of [`MAX_DENSE_SPAN`] or
    /// more, as string and wide integer keys usually have, fall back to
    /// sparse in [`SwitchMap::with_strategy`]; [`SwitchMap::dense`] refuses
    /// them instead.
    Dense,
    Sparse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One slot per hash in `min..=max`.
    Dense { min: i32, max: i32 },
    /// Binary search over the sorted bucket hashes.
    Sparse,
}

/// All entries whose keys share one hash.
#[derive(Debug, Clone)]
pub struct Bucket<K, V> {
    hash: i32,
    entries: Vec<(K, V)>,
}

impl<K: TokenValue, V> Bucket<K, V> {
    pub fn hash(&self) -> i32 {
        self.hash
    }

    pub fn entries(&self) -> &[(K, V)] {
        &self.entries
    }

    pub fn is_collision(&self) -> bool {
        self.entries.len() > 1
    }

    #[inline]
    fn resolve(&self, key: &K, comparison: Comparison) -> Option<&V> {
        if comparison.hash_is_exact() && self.entries.len() == 1 {
            return self.entries.first().map(|(_, value)| value);
        }
        self.entries
            .iter()
            .find(|(candidate, _)| candidate.same(key))
            .map(|(_, value)| value)
    }
}

/// Groups entries by key hash, sorted by hash. A key repeated later in the
/// input replaces the earlier entry.
pub fn hash_buckets<K: TokenValue, V>(entries: impl IntoIterator<Item = (K, V)>) -> Vec<Bucket<K, V>> {
    let mut by_hash: BTreeMap<i32, Vec<(K, V)>> = BTreeMap::new();
    for (key, value) in entries {
        let bucket = by_hash.entry(key.switch_hash()).or_default();
        match bucket.iter_mut().find(|(existing, _)| existing.same(&key)) {
            Some(slot) => slot.1 = value,
            None => bucket.push((key, value)),
        }
    }
    by_hash
        .into_iter()
        .map(|(hash, entries)| Bucket { hash, entries })
        .collect()
}

fn span<K, V>(buckets: &[Bucket<K, V>]) -> u64 {
    match (buckets.first(), buckets.last()) {
        (Some(first), Some(last)) => (i64::from(last.hash) - i64::from(first.hash)) as u64,
        _ => 0,
    }
}

fn max_gap<K, V>(buckets: &[Bucket<K, V>]) -> u64 {
    buckets
        .windows(2)
        .map(|pair| (i64::from(pair[1].hash) - i64::from(pair[0].hash)) as u64)
        .max()
        .unwrap_or(0)
}

/// A hash switch over `K` resolving to payloads `V`.
#[derive(Debug, Clone)]
pub struct SwitchMap<K, V> {
    buckets: Vec<Bucket<K, V>>,
    /// Dense layout only: bucket index per hash offset, `None` for holes.
    slots: Vec<Option<u32>>,
    layout: Layout,
    comparison: Comparison,
}

impl<K: TokenValue, V> SwitchMap<K, V> {
    /// Chooses dense iff `max(max - min, max_gap) <= max_delta`.
    pub fn new(entries: impl IntoIterator<Item = (K, V)>, max_delta: u32) -> Result<Self, SwitchError> {
        Self::with_strategy(entries, max_delta, Strategy::Auto)
    }

    pub fn dense(entries: impl IntoIterator<Item = (K, V)>) -> Result<Self, SwitchError> {
        Self::from_buckets(hash_buckets(entries), true)
    }

    pub fn sparse(entries: impl IntoIterator<Item = (K, V)>) -> Result<Self, SwitchError> {
        Self::from_buckets(hash_buckets(entries), false)
    }

    pub fn with_strategy(
        entries: impl IntoIterator<Item = (K, V)>,
        max_delta: u32,
        strategy: Strategy,
    ) -> Result<Self, SwitchError> {
        if max_delta == 0 {
            return Err(SwitchError::ZeroDelta);
        }
        let buckets = hash_buckets(entries);
        let dense = match strategy {
            Strategy::Dense => {
                let span = span(&buckets);
                if span >= MAX_DENSE_SPAN {
                    tracing::warn!(
                        keys = buckets.len(),
                        span,
                        limit = MAX_DENSE_SPAN,
                        "hash span too wide for a dense table, using sparse"
                    );
                }
                span < MAX_DENSE_SPAN
            }
            Strategy::Sparse => false,
            Strategy::Auto => {
                let span = span(&buckets);
                let gap = max_gap(&buckets);
                let dense = span.max(gap) <= u64::from(max_delta) && span < MAX_DENSE_SPAN;
                tracing::trace!(
                    keys = buckets.len(),
                    span,
                    gap,
                    max_delta,
                    dense,
                    "selected switch strategy"
                );
                dense
            }
        };
        Self::from_buckets(buckets, dense)
    }

    fn from_buckets(buckets: Vec<Bucket<K, V>>, dense: bool) -> Result<Self, SwitchError> {
        let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
            return Err(SwitchError::Empty);
        };
        let (min, max) = (first.hash, last.hash);
        let comparison = K::KIND.comparison();
        if !dense {
            return Ok(Self {
                buckets,
                slots: Vec::new(),
                layout: Layout::Sparse,
                comparison,
            });
        }

        let width = span(&buckets) + 1;
        if width > MAX_DENSE_SPAN {
            return Err(SwitchError::TableTooLarge {
                span: width,
                limit: MAX_DENSE_SPAN,
            });
        }
        let mut slots = vec![None; width as usize];
        for (index, bucket) in buckets.iter().enumerate() {
            let offset = (i64::from(bucket.hash) - i64::from(min)) as usize;
            slots[offset] = Some(index as u32);
        }
        Ok(Self {
            buckets,
            slots,
            layout: Layout::Dense { min, max },
            comparison,
        })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn strategy(&self) -> Strategy {
        match self.layout {
            Layout::Dense { .. } => Strategy::Dense,
            Layout::Sparse => Strategy::Sparse,
        }
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    pub fn buckets(&self) -> &[Bucket<K, V>] {
        &self.buckets
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Switch cases in hash order. Dense layouts also yield their holes as
    /// `(hash, None)`.
    pub fn cases(&self) -> Box<dyn Iterator<Item = (i32, Option<&Bucket<K, V>>)> + '_> {
        match self.layout {
            Layout::Dense { min, .. } => Box::new(self.slots.iter().enumerate().map(move |(offset, slot)| {
                let hash = (i64::from(min) + offset as i64) as i32;
                (hash, slot.map(|index| &self.buckets[index as usize]))
            })),
            Layout::Sparse => Box::new(self.buckets.iter().map(|bucket| (bucket.hash, Some(bucket)))),
        }
    }

    /// Resolves `key` to its payload, `None` when the key is absent.
    #[inline]
    pub fn find(&self, key: &K) -> Option<&V> {
        let hash = key.switch_hash();
        let bucket = match self.layout {
            Layout::Dense { min, .. } => {
                let offset = usize::try_from(i64::from(hash) - i64::from(min)).ok()?;
                let index = (*self.slots.get(offset)?)?;
                self.buckets.get(index as usize)?
            }
            Layout::Sparse => {
                let index = self
                    .buckets
                    .binary_search_by_key(&hash, |bucket| bucket.hash)
                    .ok()?;
                &self.buckets[index]
            }
        };
        bucket.resolve(key, self.comparison)
    }
}
