//! # Store - Record Store Clients
//!
//! The capability the sharding library persists through. A store keeps
//! [`Record`]s addressed by `(namespace, name)` and enforces a hard maximum
//! encoded size per record.
//!
//! ## Implementations
//!
//! | Type          | Backing                                               |
//! |---------------|-------------------------------------------------------|
//! | [`MemoryStore`] | `BTreeMap` behind a lock; tests and dry runs        |
//! | [`DirStore`]    | one checksummed file per record, atomic replacement |
//!
//! ## NotFound
//!
//! [`StoreError::NotFound`] is a distinguished variant. Callers that check
//! for existence (reclamation) match on it with
//! [`StoreError::is_not_found`] instead of treating it as a failure.
//!
//! ## Cancellation
//!
//! Every operation takes a [`Context`]. A cancelled or expired context makes
//! the operation fail with [`StoreError::Cancelled`] or
//! [`StoreError::DeadlineExceeded`] before any I/O is issued.

mod context;
mod dir;
mod memory;

use record::Record;
use std::io;
use std::sync::Arc;
use thiserror::Error;

pub use context::Context;
pub use dir::{DirStore, RECORD_EXTENSION};
pub use memory::MemoryStore;

/// Longest accepted record name or namespace, in bytes.
pub const MAX_NAME_LEN: usize = 253;

/// Errors returned by [`RecordStore`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists at this identity.
    #[error("record {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    /// The encoded record exceeds the store's hard size limit.
    #[error("record {name} is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge {
        name: String,
        size: usize,
        limit: usize,
    },

    #[error("invalid record name: {0}")]
    InvalidName(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A stored record failed to decode.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Returns `true` for the NotFound sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Returns `true` if the caller's context aborted the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Cancelled | StoreError::DeadlineExceeded)
    }

    pub(crate) fn not_found(namespace: &str, name: &str) -> Self {
        StoreError::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

/// A client of a record store.
///
/// Implementations must be safe to share between threads. Operations are
/// blocking and must check the [`Context`] before performing I/O.
pub trait RecordStore: Send + Sync {
    /// Creates the record or replaces the stored one with the same identity.
    ///
    /// Returns the record as stored, including its store-assigned version.
    /// If the stored content is identical the record is left untouched and
    /// keeps its version.
    fn create_or_update(&self, ctx: &Context, record: &Record) -> Result<Record, StoreError>;

    /// Deletes a record. Returns [`StoreError::NotFound`] if none exists.
    fn delete(&self, ctx: &Context, namespace: &str, name: &str) -> Result<(), StoreError>;

    /// Fetches one record.
    fn get(&self, ctx: &Context, namespace: &str, name: &str) -> Result<Record, StoreError>;

    /// Lists every record in `namespace`, ordered by name.
    fn list(&self, ctx: &Context, namespace: &str) -> Result<Vec<Record>, StoreError>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn create_or_update(&self, ctx: &Context, record: &Record) -> Result<Record, StoreError> {
        (**self).create_or_update(ctx, record)
    }

    fn delete(&self, ctx: &Context, namespace: &str, name: &str) -> Result<(), StoreError> {
        (**self).delete(ctx, namespace, name)
    }

    fn get(&self, ctx: &Context, namespace: &str, name: &str) -> Result<Record, StoreError> {
        (**self).get(ctx, namespace, name)
    }

    fn list(&self, ctx: &Context, namespace: &str) -> Result<Vec<Record>, StoreError> {
        (**self).list(ctx, namespace)
    }
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn create_or_update(&self, ctx: &Context, record: &Record) -> Result<Record, StoreError> {
        (**self).create_or_update(ctx, record)
    }

    fn delete(&self, ctx: &Context, namespace: &str, name: &str) -> Result<(), StoreError> {
        (**self).delete(ctx, namespace, name)
    }

    fn get(&self, ctx: &Context, namespace: &str, name: &str) -> Result<Record, StoreError> {
        (**self).get(ctx, namespace, name)
    }

    fn list(&self, ctx: &Context, namespace: &str) -> Result<Vec<Record>, StoreError> {
        (**self).list(ctx, namespace)
    }
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn create_or_update(&self, ctx: &Context, record: &Record) -> Result<Record, StoreError> {
        (**self).create_or_update(ctx, record)
    }

    fn delete(&self, ctx: &Context, namespace: &str, name: &str) -> Result<(), StoreError> {
        (**self).delete(ctx, namespace, name)
    }

    fn get(&self, ctx: &Context, namespace: &str, name: &str) -> Result<Record, StoreError> {
        (**self).get(ctx, namespace, name)
    }

    fn list(&self, ctx: &Context, namespace: &str) -> Result<Vec<Record>, StoreError> {
        (**self).list(ctx, namespace)
    }
}

/// Checks a record name or namespace.
///
/// Accepted: 1..=253 bytes of `[a-z0-9.-]`, not starting with `.`. The
/// restriction keeps names safe to use as file names.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() {
        return Err(StoreError::InvalidName("empty name".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(StoreError::InvalidName(format!(
            "{} bytes exceeds {}",
            name.len(),
            MAX_NAME_LEN
        )));
    }
    if name.starts_with('.') {
        return Err(StoreError::InvalidName(format!("{name:?} starts with '.'")));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.'))
    {
        return Err(StoreError::InvalidName(format!(
            "{name:?} contains {c:?}"
        )));
    }
    Ok(())
}

/// Shared admission check for writes: identity and encoded size.
pub(crate) fn admit(record: &Record, max_record_size: usize) -> Result<(), StoreError> {
    validate_name(record.namespace())?;
    validate_name(record.name())?;
    let size = record::codec::encoded_len(record);
    if size > max_record_size {
        return Err(StoreError::TooLarge {
            name: record.name().to_string(),
            size,
            limit: max_record_size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests;
