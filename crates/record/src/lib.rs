//! # Record - Stored Object Model
//!
//! A [`Record`] is the unit the backing store persists: metadata that
//! identifies and owns it ([`ObjectMeta`]) plus an ordered map of named
//! binary payloads. Shards, templates and everything the lister caches are
//! records.
//!
//! The binary on-disk form lives in [`codec`].
//!
//! ## Example
//!
//! ```rust
//! use record::Record;
//!
//! let mut r = Record::new("monitoring", "tls-assets");
//! r.meta.labels.insert("app".into(), "alertmanager".into());
//! r.data.insert("ca.crt".into(), b"-----BEGIN CERTIFICATE-----".to_vec());
//!
//! let bytes = record::codec::encode(&r);
//! assert_eq!(record::codec::decode(&bytes).unwrap(), r);
//! ```

pub mod codec;

use std::collections::BTreeMap;

pub use codec::CodecError;

/// A reference from a record to the object that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    pub uid: String,
    /// `true` if the owner manages the record's lifecycle.
    pub controller: bool,
}

/// Identity and ownership metadata shared by every stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub owner_references: Vec<OwnerReference>,
    /// Store-assigned revision. `0` means the record was never persisted.
    pub version: u64,
}

/// A named, namespaced map of binary payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub meta: ObjectMeta,
    pub data: BTreeMap<String, Vec<u8>>,
}

impl Record {
    /// Creates an empty record with the given identity.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            meta: ObjectMeta {
                name: name.into(),
                namespace: namespace.into(),
                ..ObjectMeta::default()
            },
            data: BTreeMap::new(),
        }
    }

    /// Builder-style label setter.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.labels.insert(key.into(), value.into());
        self
    }

    /// Builder-style owner reference setter.
    #[must_use]
    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.meta.owner_references.push(owner);
        self
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn namespace(&self) -> &str {
        &self.meta.namespace
    }

    /// Sum of `key.len() + value.len()` over all data entries.
    ///
    /// This is the approximation the shard planner packs by; it ignores
    /// metadata and framing overhead.
    pub fn data_size(&self) -> usize {
        self.data.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// Compares everything except the store-assigned version.
    ///
    /// Stores use this to skip rewriting a record whose content did not
    /// change.
    pub fn same_content(&self, other: &Record) -> bool {
        self.meta.name == other.meta.name
            && self.meta.namespace == other.meta.namespace
            && self.meta.labels == other.meta.labels
            && self.meta.owner_references == other.meta.owner_references
            && self.data == other.data
    }
}
