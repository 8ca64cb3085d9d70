//! # Lister - Read-Only Cached Object Access
//!
//! Typed, read-only access to a locally mirrored copy of remote objects.
//! The mirror is an [`Indexer`]; a [`Lister`] wraps it with list-by-selector
//! and get-by-name lookups, optionally scoped to one namespace through a
//! [`NamespacedLister`].
//!
//! The mirror is eventually consistent with the store it copies: a lookup
//! reflects the last resync, not the store's current state.
//!
//! ```rust
//! use lister::{Indexer, Lister, Selector};
//! use record::Record;
//! use std::sync::Arc;
//!
//! let indexer = Arc::new(Indexer::new());
//! indexer.add(Record::new("monitoring", "tls-0").with_label("app", "am"));
//!
//! let lister = Lister::new(indexer, "record");
//! let hits = lister.list(&Selector::parse("app=am").unwrap());
//! assert_eq!(hits.len(), 1);
//! assert!(lister.namespaced("monitoring").get("tls-0").is_ok());
//! ```

mod indexer;
mod selector;

use record::Record;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

pub use indexer::Indexer;
pub use selector::{Selector, SelectorError};

/// Anything the indexer can cache: identified by namespace and name and
/// carrying labels for selection.
pub trait Object: Send + Sync + 'static {
    fn namespace(&self) -> &str;
    fn name(&self) -> &str;
    fn labels(&self) -> &BTreeMap<String, String>;
}

impl Object for Record {
    fn namespace(&self) -> &str {
        &self.meta.namespace
    }

    fn name(&self) -> &str {
        &self.meta.name
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        &self.meta.labels
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListerError {
    #[error("{resource} {namespace}/{name} not found")]
    NotFound {
        resource: String,
        namespace: String,
        name: String,
    },
}

impl ListerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ListerError::NotFound { .. })
    }
}

/// Lists and gets objects across all namespaces.
pub struct Lister<T> {
    indexer: Arc<Indexer<T>>,
    resource: String,
}

impl<T: Object> Lister<T> {
    /// `resource` names the object kind in NotFound errors.
    pub fn new(indexer: Arc<Indexer<T>>, resource: impl Into<String>) -> Self {
        Self {
            indexer,
            resource: resource.into(),
        }
    }

    /// All cached objects whose labels match `selector`.
    pub fn list(&self, selector: &Selector) -> Vec<Arc<T>> {
        self.indexer.select(None, |o| selector.matches(o.labels()))
    }

    /// All cached objects accepted by `pred`.
    pub fn list_by<F>(&self, pred: F) -> Vec<Arc<T>>
    where
        F: Fn(&T) -> bool,
    {
        self.indexer.select(None, pred)
    }

    pub fn get(&self, namespace: &str, name: &str) -> Result<Arc<T>, ListerError> {
        self.indexer
            .get(namespace, name)
            .ok_or_else(|| ListerError::NotFound {
                resource: self.resource.clone(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    pub fn namespaced(&self, namespace: impl Into<String>) -> NamespacedLister<T> {
        NamespacedLister {
            indexer: Arc::clone(&self.indexer),
            resource: self.resource.clone(),
            namespace: namespace.into(),
        }
    }
}

impl<T> Clone for Lister<T> {
    fn clone(&self) -> Self {
        Self {
            indexer: Arc::clone(&self.indexer),
            resource: self.resource.clone(),
        }
    }
}

/// Lists and gets objects inside one namespace.
pub struct NamespacedLister<T> {
    indexer: Arc<Indexer<T>>,
    resource: String,
    namespace: String,
}

impl<T: Object> NamespacedLister<T> {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn list(&self, selector: &Selector) -> Vec<Arc<T>> {
        self.indexer
            .select(Some(&self.namespace), |o| selector.matches(o.labels()))
    }

    pub fn get(&self, name: &str) -> Result<Arc<T>, ListerError> {
        self.indexer
            .get(&self.namespace, name)
            .ok_or_else(|| ListerError::NotFound {
                resource: self.resource.clone(),
                namespace: self.namespace.clone(),
                name: name.to_string(),
            })
    }
}
