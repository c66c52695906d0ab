//! Per-bucket snapshot history.
//!
//! A [`BucketHistory`] records the bucket's values immediately after every
//! transaction that touched it, in pass order. Dated and ranged views are cut
//! from that sequence with a binary search instead of replaying transactions.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{AnalysisError, Result};
use crate::models::{DateRange, Id};
use crate::values::{Attribute, BucketValues, Value};

/// Position of a transaction in the date-sorted pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionKey {
    pub seq: usize,
    pub date: NaiveDate,
}

impl TransactionKey {
    pub fn new(seq: usize, date: NaiveDate) -> Self {
        Self { seq, date }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry<A: Attribute> {
    pub key: TransactionKey,
    pub transaction: Id,
    pub values: BucketValues<A>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketHistory<A: Attribute> {
    /// Values the first entry was built on. Never rebased, so deltas of the
    /// first entry stay measurable after the period base has been reset.
    anchor: BucketValues<A>,
    base: BucketValues<A>,
    current: BucketValues<A>,
    entries: Vec<HistoryEntry<A>>,
}

impl<A: Attribute> BucketHistory<A> {
    /// History whose base and current values start as `initial`.
    pub fn new(initial: BucketValues<A>) -> Self {
        Self {
            anchor: initial.clone(),
            base: initial.clone(),
            current: initial,
            entries: Vec::new(),
        }
    }

    pub fn base(&self) -> &BucketValues<A> {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut BucketValues<A> {
        &mut self.base
    }

    pub fn current(&self) -> &BucketValues<A> {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut BucketValues<A> {
        &mut self.current
    }

    pub fn entries(&self) -> &[HistoryEntry<A>] {
        &self.entries
    }

    /// No transaction has touched the bucket.
    pub fn is_idle(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.entries.last().map(|e| e.key.date)
    }

    /// Snapshot the current values as the state after `transaction`.
    ///
    /// Registering the same transaction again replaces its snapshot, so a
    /// bucket touched several times by one transaction keeps one entry.
    pub fn register_transaction(&mut self, key: TransactionKey, transaction: &Id) -> Result<()> {
        if let Some(last) = self.entries.last_mut() {
            if last.key.seq == key.seq {
                last.values = self.current.snapshot(false);
                return Ok(());
            }
            if key.date < last.key.date || key.seq < last.key.seq {
                return Err(AnalysisError::OutOfOrder {
                    transaction: transaction.clone(),
                    date: key.date,
                    previous: last.key.date,
                });
            }
        }
        self.entries.push(HistoryEntry {
            key,
            transaction: transaction.clone(),
            values: self.current.snapshot(false),
        });
        Ok(())
    }

    fn position(&self, seq: usize) -> Option<usize> {
        self.entries.binary_search_by_key(&seq, |e| e.key.seq).ok()
    }

    /// Values immediately after the transaction at `seq`.
    pub fn values_for_transaction(&self, seq: usize) -> Option<&BucketValues<A>> {
        self.position(seq).map(|i| &self.entries[i].values)
    }

    /// Values immediately before the transaction at `seq`.
    pub fn previous_values_for_transaction(&self, seq: usize) -> Option<&BucketValues<A>> {
        let i = self.position(seq)?;
        Some(match i {
            0 => &self.anchor,
            _ => &self.entries[i - 1].values,
        })
    }

    pub fn delta_value(&self, seq: usize, attr: A) -> Option<Decimal> {
        let after = self.values_for_transaction(seq)?;
        let before = self.previous_values_for_transaction(seq)?;
        let after = after.get_value(attr).and_then(Value::decimal);
        let before = before.get_value(attr).and_then(Value::decimal);
        match (after, before) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or_default() - b.unwrap_or_default()),
        }
    }

    pub fn delta_money_value(&self, seq: usize, attr: A) -> Option<Decimal> {
        self.values_for_transaction(seq)?.get_money_value(attr)?;
        self.delta_value(seq, attr)
    }

    pub fn delta_units_value(&self, seq: usize, attr: A) -> Option<Decimal> {
        self.values_for_transaction(seq)?.get_units_value(attr)?;
        self.delta_value(seq, attr)
    }

    /// History restricted to transactions dated on or before `date`.
    pub fn as_of(&self, date: NaiveDate) -> Self {
        let end = self.entries.partition_point(|e| e.key.date <= date);
        let entries = self.entries[..end].to_vec();
        let current = entries
            .last()
            .map(|e| e.values.clone())
            .unwrap_or_else(|| self.anchor.clone());
        Self {
            anchor: self.anchor.clone(),
            base: self.anchor.clone(),
            current,
            entries,
        }
    }

    /// History restricted to transactions inside `range`, based on the state
    /// immediately before the range starts.
    pub fn for_range(&self, range: DateRange) -> Self {
        let start = self.entries.partition_point(|e| e.key.date < range.start);
        let end = self.entries.partition_point(|e| e.key.date <= range.end);
        let base = match start {
            0 => self.anchor.snapshot(true),
            i => self.entries[i - 1].values.snapshot(true),
        };
        let entries = self.entries[start..end.max(start)].to_vec();
        let current = entries
            .last()
            .map(|e| e.values.clone())
            .unwrap_or_else(|| base.clone());
        Self {
            anchor: base.clone(),
            base,
            current,
            entries,
        }
    }

    /// Measure flows from the period base, then clear the base's flows.
    ///
    /// Running this twice leaves the values unchanged the second time.
    pub fn rebase(&mut self) {
        self.current.adjust_to_base_values(&self.base);
        self.base.reset_base_values();
    }
}
