use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::Object;

type Key = (String, String);

struct Inner<T> {
    /// Primary index: `(namespace, name)` -> object.
    items: HashMap<Key, Arc<T>>,
    /// Secondary index: namespace -> ordered names. Drives ordered listing.
    by_namespace: BTreeMap<String, BTreeSet<String>>,
}

impl<T> Default for Inner<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            by_namespace: BTreeMap::new(),
        }
    }
}

/// Thread-safe local mirror of remote objects.
///
/// Writers (whatever keeps the mirror in sync) call [`add`](Indexer::add),
/// [`delete`](Indexer::delete) and [`replace`](Indexer::replace); readers go
/// through a [`crate::Lister`]. Objects are stored behind `Arc` and handed
/// out shared, so readers never copy them and must treat them as read-only.
pub struct Indexer<T> {
    inner: RwLock<Inner<T>>,
}

impl<T: Object> Indexer<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Inserts or replaces an object.
    pub fn add(&self, obj: T) {
        let key = (obj.namespace().to_string(), obj.name().to_string());
        let mut inner = self.inner.write();
        inner
            .by_namespace
            .entry(key.0.clone())
            .or_default()
            .insert(key.1.clone());
        inner.items.insert(key, Arc::new(obj));
    }

    /// Alias of [`add`](Indexer::add), kept for symmetry with watch events.
    pub fn update(&self, obj: T) {
        self.add(obj);
    }

    /// Removes an object, returning it if it was cached.
    pub fn delete(&self, namespace: &str, name: &str) -> Option<Arc<T>> {
        let mut inner = self.inner.write();
        let removed = inner
            .items
            .remove(&(namespace.to_string(), name.to_string()))?;
        if let Some(names) = inner.by_namespace.get_mut(namespace) {
            names.remove(name);
            if names.is_empty() {
                inner.by_namespace.remove(namespace);
            }
        }
        Some(removed)
    }

    /// Swaps the whole cache content for `objs` (a full resync).
    pub fn replace<I: IntoIterator<Item = T>>(&self, objs: I) {
        let mut fresh = Inner::default();
        for obj in objs {
            let key = (obj.namespace().to_string(), obj.name().to_string());
            fresh
                .by_namespace
                .entry(key.0.clone())
                .or_default()
                .insert(key.1.clone());
            fresh.items.insert(key, Arc::new(obj));
        }
        *self.inner.write() = fresh;
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<Arc<T>> {
        self.inner
            .read()
            .items
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Objects matching `pred`, ordered by `(namespace, name)`.
    ///
    /// With `namespace = Some(ns)` only that namespace is visited.
    pub fn select<F>(&self, namespace: Option<&str>, pred: F) -> Vec<Arc<T>>
    where
        F: Fn(&T) -> bool,
    {
        let inner = self.inner.read();
        let mut out = Vec::new();
        let mut visit = |ns: &str, names: &BTreeSet<String>| {
            for name in names {
                if let Some(obj) = inner.items.get(&(ns.to_string(), name.clone())) {
                    if pred(obj) {
                        out.push(Arc::clone(obj));
                    }
                }
            }
        };

        match namespace {
            Some(ns) => {
                if let Some(names) = inner.by_namespace.get(ns) {
                    visit(ns, names);
                }
            }
            None => {
                for (ns, names) in &inner.by_namespace {
                    visit(ns, names);
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    /// Namespaces that currently hold at least one object.
    pub fn namespaces(&self) -> Vec<String> {
        self.inner.read().by_namespace.keys().cloned().collect()
    }
}

impl<T: Object> Default for Indexer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Indexer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Indexer")
            .field("objects", &inner.items.len())
            .field("namespaces", &inner.by_namespace.len())
            .finish()
    }
}
