use parking_lot::RwLock;
use record::Record;
use std::collections::BTreeMap;

use crate::{admit, validate_name, Context, RecordStore, StoreError};

type Key = (String, String);

/// In-memory [`RecordStore`].
///
/// Records are kept in a `BTreeMap` keyed by `(namespace, name)` so that
/// listing a namespace is an ordered range scan. Applies the same name and
/// size admission rules as [`crate::DirStore`].
#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<Key, Record>>,
    max_record_size: usize,
}

impl MemoryStore {
    pub fn new(max_record_size: usize) -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            max_record_size,
        }
    }

    pub fn max_record_size(&self) -> usize {
        self.max_record_size
    }

    /// Total number of records across all namespaces.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Names of the records in `namespace`, in order.
    pub fn names(&self, namespace: &str) -> Vec<String> {
        self.records
            .read()
            .range(namespace_range(namespace))
            .take_while(|((ns, _), _)| ns == namespace)
            .map(|((_, name), _)| name.clone())
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

fn namespace_range(namespace: &str) -> std::ops::RangeFrom<Key> {
    (namespace.to_string(), String::new())..
}

impl RecordStore for MemoryStore {
    fn create_or_update(&self, ctx: &Context, record: &Record) -> Result<Record, StoreError> {
        ctx.check()?;
        admit(record, self.max_record_size)?;

        let key = (record.namespace().to_string(), record.name().to_string());
        let mut records = self.records.write();

        let version = match records.get(&key) {
            Some(existing) if existing.same_content(record) => return Ok(existing.clone()),
            Some(existing) => existing.meta.version + 1,
            None => 1,
        };

        let mut stored = record.clone();
        stored.meta.version = version;
        records.insert(key, stored.clone());
        Ok(stored)
    }

    fn delete(&self, ctx: &Context, namespace: &str, name: &str) -> Result<(), StoreError> {
        ctx.check()?;
        let key = (namespace.to_string(), name.to_string());
        match self.records.write().remove(&key) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(namespace, name)),
        }
    }

    fn get(&self, ctx: &Context, namespace: &str, name: &str) -> Result<Record, StoreError> {
        ctx.check()?;
        let key = (namespace.to_string(), name.to_string());
        self.records
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(namespace, name))
    }

    fn list(&self, ctx: &Context, namespace: &str) -> Result<Vec<Record>, StoreError> {
        ctx.check()?;
        validate_name(namespace)?;
        Ok(self
            .records
            .read()
            .range(namespace_range(namespace))
            .take_while(|((ns, _), _)| ns == namespace)
            .map(|(_, r)| r.clone())
            .collect())
    }
}
