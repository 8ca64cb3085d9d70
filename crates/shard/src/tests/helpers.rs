use record::{OwnerReference, Record};
use std::collections::BTreeMap;
use std::io;
use std::sync::Mutex;
use store::{Context, MemoryStore, RecordStore, StoreError};

pub const NS: &str = "ns";
pub const BASE: &str = "base";

/// A store call as seen by [`ScriptedStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upsert(String),
    Delete(String),
    Get(String),
}

/// [`MemoryStore`] wrapper that records every call and fails on demand.
pub struct ScriptedStore {
    pub inner: MemoryStore,
    calls: Mutex<Vec<Call>>,
    fail_upsert: Option<String>,
    fail_delete: Option<String>,
    /// Deletes always succeed and gets always find something, the way a
    /// store that misclassifies NotFound would behave.
    blind: bool,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::with_limit(usize::MAX)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            inner: MemoryStore::new(limit),
            calls: Mutex::new(Vec::new()),
            fail_upsert: None,
            fail_delete: None,
            blind: false,
        }
    }

    pub fn failing_upsert(mut self, name: &str) -> Self {
        self.fail_upsert = Some(name.to_string());
        self
    }

    pub fn failing_delete(mut self, name: &str) -> Self {
        self.fail_delete = Some(name.to_string());
        self
    }

    pub fn blind(mut self) -> Self {
        self.blind = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Names stored in [`NS`], sorted.
    pub fn names(&self) -> Vec<String> {
        self.inner.names(NS)
    }

    /// Writes records `<BASE>-0 .. <BASE>-<count-1>` directly, bypassing
    /// the call log.
    pub fn seed_generation(&self, count: usize) {
        for i in 0..count {
            self.seed(&format!("{BASE}-{i}"));
        }
    }

    pub fn seed(&self, name: &str) {
        let mut r = Record::new(NS, name);
        r.data.insert("old".into(), b"generation".to_vec());
        self.inner
            .create_or_update(&Context::background(), &r)
            .unwrap();
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn injected(what: &str) -> StoreError {
    StoreError::Io(io::Error::new(io::ErrorKind::Other, format!("injected {what} failure")))
}

impl RecordStore for ScriptedStore {
    fn create_or_update(&self, ctx: &Context, record: &Record) -> Result<Record, StoreError> {
        self.log(Call::Upsert(record.meta.name.clone()));
        if self.fail_upsert.as_deref() == Some(record.name()) {
            return Err(injected("upsert"));
        }
        self.inner.create_or_update(ctx, record)
    }

    fn delete(&self, ctx: &Context, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.log(Call::Delete(name.to_string()));
        if self.fail_delete.as_deref() == Some(name) {
            return Err(injected("delete"));
        }
        if self.blind {
            ctx.check()?;
            let _ = self.inner.delete(ctx, namespace, name);
            return Ok(());
        }
        self.inner.delete(ctx, namespace, name)
    }

    fn get(&self, ctx: &Context, namespace: &str, name: &str) -> Result<Record, StoreError> {
        self.log(Call::Get(name.to_string()));
        if self.blind {
            ctx.check()?;
            return Ok(Record::new(namespace, name));
        }
        self.inner.get(ctx, namespace, name)
    }

    fn list(&self, ctx: &Context, namespace: &str) -> Result<Vec<Record>, StoreError> {
        self.inner.list(ctx, namespace)
    }
}

pub fn template() -> Record {
    Record::new(NS, BASE)
        .with_label("app", "alertmanager")
        .with_owner(OwnerReference {
            kind: "Alertmanager".into(),
            name: "main".into(),
            uid: "0b9d1a6e".into(),
            controller: true,
        })
}

/// Blob map with values of the given lengths.
pub fn blobs(sizes: &[(&str, usize)]) -> BTreeMap<String, Vec<u8>> {
    sizes
        .iter()
        .map(|(k, n)| (k.to_string(), vec![b'x'; *n]))
        .collect()
}

pub fn upserts(names: &[&str]) -> Vec<Call> {
    names.iter().map(|n| Call::Upsert(n.to_string())).collect()
}
