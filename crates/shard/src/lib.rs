//! # Shard - Sharded Record Collections
//!
//! Persists an unbounded set of named blobs into a store whose records have
//! a hard size limit, by spreading the blobs over several records
//! ("shards") cloned from a template.
//!
//! ## Pass
//!
//! ```text
//! append()* ──► materialize ──► synchronize ──► reclaim ──► (remove unsharded)
//!   Empty          Planned       Synchronized    Reclaimed
//!                      \              \             \
//!                       └──────────────┴─────────────┴──► Failed
//! ```
//!
//! | Module      | Purpose                                             |
//! |-------------|-----------------------------------------------------|
//! | [`naming`]  | `<base>-<index>` shard names                        |
//! | [`plan`]    | greedy, deterministic partition of the blob map     |
//! | [`sync`]    | ordered, fail-fast upsert of planned shards         |
//! | [`reclaim`] | delete-until-NotFound of shards from a larger generation |
//!
//! A [`ShardedCollection`] is built fresh for every reconciliation pass and
//! dropped afterwards. Nothing inside retries: a failed pass is rerun from
//! scratch by the caller, which converges because planning is
//! deterministic. Two passes over the same template must not run
//! concurrently.
//!
//! ## Example
//!
//! ```rust
//! use record::Record;
//! use shard::{ShardOptions, ShardedCollection};
//! use store::{Context, MemoryStore};
//!
//! let store = MemoryStore::new(1024 * 1024);
//! let template = Record::new("monitoring", "tls-assets");
//!
//! let mut coll = ShardedCollection::with_options(template, ShardOptions::default()).unwrap();
//! coll.append("ca.crt", b"...".to_vec());
//! coll.synchronize_and_reclaim(&Context::background(), &store).unwrap();
//!
//! assert_eq!(coll.shard_names().unwrap(), vec!["tls-assets-0"]);
//! ```

mod error;
pub mod naming;
pub mod plan;
pub mod reclaim;
pub mod sync;

use config::Config;
use record::Record;
use std::collections::BTreeMap;
use std::fmt;
use store::{Context, RecordStore};
use tracing::info;

pub use config::{DEFAULT_CAPACITY, DEFAULT_DELETE_LIMIT};
pub use error::ShardError;
pub use naming::{parse_shard_index, shard_name};
pub use plan::{entry_size, plan, Shard};

/// Progress of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting blobs; nothing planned yet.
    Empty,
    /// Shards computed in memory.
    Planned,
    /// Every shard persisted.
    Synchronized,
    /// Stale shards removed. Terminal success.
    Reclaimed,
    /// A store operation failed. Terminal.
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Empty => "empty",
            Phase::Planned => "planned",
            Phase::Synchronized => "synchronized",
            Phase::Reclaimed => "reclaimed",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Tunables of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardOptions {
    /// Advisory per-shard size the planner packs to.
    pub capacity: usize,
    /// Maximum deletions per reclamation (`0` = unbounded).
    pub delete_limit: usize,
    /// Also delete a record named exactly like the template. Off by
    /// default; refused for bases shaped like `<x>-<index>`.
    pub remove_unsharded: bool,
}

impl Default for ShardOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            delete_limit: DEFAULT_DELETE_LIMIT,
            remove_unsharded: false,
        }
    }
}

impl From<&Config> for ShardOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            capacity: cfg.capacity,
            delete_limit: cfg.delete_limit,
            remove_unsharded: cfg.remove_unsharded,
        }
    }
}

/// Outcome of a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Shards written (or confirmed unchanged).
    pub shards: usize,
    /// Stale shards deleted.
    pub reclaimed: usize,
    /// Whether an unsharded legacy record was deleted.
    pub legacy_removed: bool,
}

/// Blobs destined for one template, spread over as many shards as needed.
pub struct ShardedCollection {
    template: Record,
    blobs: BTreeMap<String, Vec<u8>>,
    options: ShardOptions,
    shards: Vec<Shard>,
    /// Stored copies of the shards, present once synchronization succeeded.
    realized: Option<Vec<Record>>,
    phase: Phase,
}

impl ShardedCollection {
    /// Creates a collection with [`ShardOptions::default`].
    ///
    /// The template's name is the shard base name; its namespace, labels
    /// and owner references are copied into every shard. Its data is
    /// ignored.
    pub fn new(template: Record) -> Result<Self, ShardError> {
        Self::with_options(template, ShardOptions::default())
    }

    pub fn with_options(template: Record, options: ShardOptions) -> Result<Self, ShardError> {
        store::validate_name(template.name())
            .map_err(|e| ShardError::InvalidTemplate(format!("name: {e}")))?;
        store::validate_name(&shard_name(template.name(), 0))
            .map_err(|e| ShardError::InvalidTemplate(format!("shard name: {e}")))?;
        store::validate_name(template.namespace())
            .map_err(|e| ShardError::InvalidTemplate(format!("namespace: {e}")))?;
        if options.capacity == 0 {
            return Err(ShardError::InvalidOptions("capacity must be positive".into()));
        }
        // the unsharded record of such a base is a shard of another collection
        if options.remove_unsharded && naming::is_shard_shaped(template.name()) {
            return Err(ShardError::InvalidOptions(format!(
                "remove_unsharded would delete {:?}, which is a shard name",
                template.name()
            )));
        }

        Ok(Self {
            template,
            blobs: BTreeMap::new(),
            options,
            shards: Vec::new(),
            realized: None,
            phase: Phase::Empty,
        })
    }

    /// Adds a blob, overwriting any previous value under `key`.
    ///
    /// Appending after [`materialize`](Self::materialize) discards the
    /// planned shards and returns the collection to [`Phase::Empty`].
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.blobs.insert(key.into(), value.into());
        self.invalidate();
    }

    pub fn extend<I, K, V>(&mut self, blobs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        self.blobs
            .extend(blobs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self.invalidate();
    }

    fn invalidate(&mut self) {
        if self.phase != Phase::Empty {
            self.shards.clear();
            self.realized = None;
            self.phase = Phase::Empty;
        }
    }

    /// Plans the shards for the current blobs.
    pub fn materialize(&mut self) -> &[Shard] {
        self.shards = plan(&self.blobs, &self.template, self.options.capacity);
        self.realized = None;
        self.phase = Phase::Planned;
        &self.shards
    }

    /// Runs a full pass: plan, upsert every shard in order, delete stale
    /// shards beyond the new count and, if enabled, the unsharded record.
    ///
    /// The first store failure ends the pass in [`Phase::Failed`]; nothing
    /// is rolled back and nothing is retried.
    pub fn synchronize_and_reclaim<S>(
        &mut self,
        ctx: &Context,
        store: &S,
    ) -> Result<ReconcileSummary, ShardError>
    where
        S: RecordStore + ?Sized,
    {
        self.materialize();

        match self.run(ctx, store) {
            Ok(summary) => {
                self.phase = Phase::Reclaimed;
                info!(
                    base = self.template.name(),
                    namespace = self.template.namespace(),
                    blobs = self.blobs.len(),
                    shards = summary.shards,
                    reclaimed = summary.reclaimed,
                    legacy_removed = summary.legacy_removed,
                    "sharded collection reconciled"
                );
                Ok(summary)
            }
            Err(e) => {
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }

    fn run<S>(&mut self, ctx: &Context, store: &S) -> Result<ReconcileSummary, ShardError>
    where
        S: RecordStore + ?Sized,
    {
        let (namespace, base) = (self.template.namespace(), self.template.name());

        let stored = sync::synchronize(ctx, store, &self.shards)?;
        self.realized = Some(stored);
        self.phase = Phase::Synchronized;

        let reclaimed = reclaim::reclaim(
            ctx,
            store,
            namespace,
            base,
            self.shards.len(),
            self.options.delete_limit,
        )?;

        let legacy_removed = if self.options.remove_unsharded {
            reclaim::remove_unsharded(ctx, store, namespace, base)?
        } else {
            false
        };

        Ok(ReconcileSummary {
            shards: self.shards.len(),
            reclaimed,
            legacy_removed,
        })
    }

    /// Names of the persisted shards, in index order.
    ///
    /// Available once synchronization succeeded, even if the reclamation
    /// that followed failed.
    pub fn shard_names(&self) -> Result<Vec<String>, ShardError> {
        match &self.realized {
            Some(stored) => Ok((0..stored.len())
                .map(|i| shard_name(self.template.name(), i))
                .collect()),
            None => Err(ShardError::NotSynchronized { phase: self.phase }),
        }
    }

    /// Stored copies of the shards after a successful synchronization.
    pub fn realized(&self) -> Option<&[Record]> {
        self.realized.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Planned shards (empty before materialization).
    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    pub fn template(&self) -> &Record {
        &self.template
    }

    pub fn capacity(&self) -> usize {
        self.options.capacity
    }

    pub fn options(&self) -> &ShardOptions {
        &self.options
    }

    /// Number of blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.blobs.get(key).map(Vec::as_slice)
    }

    /// Total approximate size of all blobs.
    pub fn approx_size(&self) -> usize {
        self.blobs.iter().map(|(k, v)| entry_size(k, v)).sum()
    }
}

impl fmt::Debug for ShardedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCollection")
            .field("namespace", &self.template.namespace())
            .field("base", &self.template.name())
            .field("phase", &self.phase)
            .field("blobs", &self.blobs.len())
            .field("approx_size", &self.approx_size())
            .field("capacity", &self.options.capacity)
            .field("planned_shards", &self.shards.len())
            .field(
                "realized_shards",
                &self.realized.as_ref().map(|r| r.len()),
            )
            .finish()
    }
}

/// Builds a collection from `blobs` and runs a full pass against `store`.
///
/// Returns the reconciled collection so the caller can read
/// [`shard_names`](ShardedCollection::shard_names) (e.g. to mount them).
pub fn reconcile<S, I, K, V>(
    ctx: &Context,
    store: &S,
    template: Record,
    blobs: I,
    options: ShardOptions,
) -> Result<ShardedCollection, ShardError>
where
    S: RecordStore + ?Sized,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Vec<u8>>,
{
    let mut coll = ShardedCollection::with_options(template, options)?;
    coll.extend(blobs);
    coll.synchronize_and_reclaim(ctx, store)?;
    Ok(coll)
}

#[cfg(test)]
mod tests;
