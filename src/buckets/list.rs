use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::{Bucket, TotalsBucket};
use crate::models::DateRange;

/// Keyed buckets of one kind plus their totals.
#[derive(Debug, Clone)]
pub struct BucketList<K: Ord + Clone, B: Bucket> {
    buckets: BTreeMap<K, B>,
    totals: TotalsBucket<B::Attr>,
}

impl<K: Ord + Clone, B: Bucket> Default for BucketList<K, B> {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
            totals: TotalsBucket::default(),
        }
    }
}

impl<K: Ord + Clone, B: Bucket> BucketList<K, B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&B> {
        self.buckets.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut B> {
        self.buckets.get_mut(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.buckets.contains_key(key)
    }

    pub fn insert(&mut self, key: K, bucket: B) {
        self.buckets.insert(key, bucket);
    }

    /// The bucket for `key`, created by `create` on first reference.
    pub fn get_or_create(&mut self, key: &K, create: impl FnOnce() -> B) -> &mut B {
        self.buckets.entry(key.clone()).or_insert_with(create)
    }

    /// Fallible variant of [`Self::get_or_create`].
    pub fn get_or_try_create<E>(
        &mut self,
        key: &K,
        create: impl FnOnce() -> Result<B, E>,
    ) -> Result<&mut B, E> {
        match self.buckets.entry(key.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(create()?)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &B)> {
        self.buckets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut B)> {
        self.buckets.iter_mut()
    }

    pub fn buckets(&self) -> impl Iterator<Item = &B> {
        self.buckets.values()
    }

    pub fn buckets_mut(&mut self) -> impl Iterator<Item = &mut B> {
        self.buckets.values_mut()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn totals(&self) -> &TotalsBucket<B::Attr> {
        &self.totals
    }

    pub fn recompute_totals(&mut self) {
        let values = self.buckets.values().map(|b| b.values());
        self.totals.recompute(values);
    }

    pub fn derive_as_of(&self, date: NaiveDate) -> Self {
        self.derive_with(|b| b.derive_as_of(date))
    }

    pub fn derive_for_range(&self, range: DateRange) -> Self {
        self.derive_with(|b| b.derive_for_range(range))
    }

    pub fn derive_with(&self, derive: impl Fn(&B) -> B) -> Self {
        Self {
            buckets: self
                .buckets
                .iter()
                .map(|(k, b)| (k.clone(), derive(b)))
                .collect(),
            totals: TotalsBucket::default(),
        }
    }

    /// Drop buckets that are both idle and inactive.
    pub fn prune(&mut self) {
        self.buckets.retain(|_, b| !b.is_prunable());
    }
}
