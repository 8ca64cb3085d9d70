//! Greedy partition planner.
//!
//! Packs a blob map into an ordered list of shards, each a copy of the
//! template holding a disjoint slice of the keys. Keys are visited in
//! ascending order, so equal inputs always produce equal shards no matter
//! how the map was filled.
//!
//! ```text
//! capacity = 10
//! a: 1 + 8  = 9   -> shard 0 (9)
//! b: 1 + 13 = 14  -> 9 + 14 > 10 and shard 0 is non-empty -> shard 1 (14)
//! ```
//!
//! The size of an entry is approximated as `key.len() + value.len()`. A
//! single entry larger than `capacity` still gets a shard of its own; the
//! store enforces the hard record limit, not the planner.

use record::Record;
use std::collections::BTreeMap;

use crate::naming::shard_name;

/// One planned shard: the template's metadata under the shard's name plus a
/// slice of the blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    index: usize,
    approx_size: usize,
    record: Record,
}

impl Shard {
    fn empty(template: &Record, index: usize) -> Self {
        let mut record = template.clone();
        record.meta.name = shard_name(&template.meta.name, index);
        record.meta.version = 0;
        record.data.clear();
        Self {
            index,
            approx_size: 0,
            record,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.record.meta.name
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    /// Number of blobs in the shard.
    pub fn len(&self) -> usize {
        self.record.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.data.is_empty()
    }

    /// Sum of [`entry_size`] over the shard's blobs.
    pub fn approx_size(&self) -> usize {
        self.approx_size
    }
}

/// Approximate stored size of one blob.
pub fn entry_size(key: &str, value: &[u8]) -> usize {
    key.len() + value.len()
}

/// Splits `blobs` into shards of at most `capacity` approximate bytes each
/// (except single oversized blobs). Always returns at least one shard.
pub fn plan(blobs: &BTreeMap<String, Vec<u8>>, template: &Record, capacity: usize) -> Vec<Shard> {
    let mut shards = Vec::new();
    let mut current = Shard::empty(template, 0);

    for (key, value) in blobs {
        let size = entry_size(key, value);
        if current.approx_size.saturating_add(size) > capacity && !current.is_empty() {
            let next = Shard::empty(template, current.index + 1);
            shards.push(std::mem::replace(&mut current, next));
        }
        current.approx_size = current.approx_size.saturating_add(size);
        current.record.data.insert(key.clone(), value.clone());
    }

    shards.push(current);
    shards
}
