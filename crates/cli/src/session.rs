use anyhow::{Context as _, Result};
use config::Config;
use lister::{Indexer, Lister, Selector};
use record::Record;
use shard::{ShardOptions, ShardedCollection};
use std::io::Write;
use std::sync::Arc;
use store::{Context, DirStore, RecordStore};
use tracing::debug;

use crate::command::Command;

/// Label every shard written by the shell carries.
pub const MANAGED_BY_LABEL: &str = "managed-by";
pub const MANAGED_BY: &str = "shard-cli";

/// State of one shell: the store, a cached mirror of it and the collection
/// being assembled for the next pass.
pub struct Session {
    cfg: Config,
    store: DirStore,
    cache: Arc<Indexer<Record>>,
    lister: Lister<Record>,
    collection: ShardedCollection,
}

impl Session {
    pub fn open(cfg: Config) -> Result<Self> {
        let store = DirStore::open(&cfg.store_dir, cfg.max_record_size, cfg.sync_writes)
            .with_context(|| format!("opening store at {}", cfg.store_dir.display()))?;
        let collection = new_collection(&cfg)?;
        let cache = Arc::new(Indexer::new());
        let lister = Lister::new(Arc::clone(&cache), "record");

        Ok(Self {
            cfg,
            store,
            cache,
            lister,
            collection,
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runs one command, writing its output to `out`.
    pub fn execute<W: Write>(&mut self, cmd: Command, out: &mut W) -> Result<()> {
        match cmd {
            Command::Put { key, value } => {
                self.collection.append(key, value.into_bytes());
                writeln!(out, "OK ({} blobs)", self.collection.len())?;
            }
            Command::PutFile { key, path } => {
                let bytes = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
                let n = bytes.len();
                self.collection.append(key, bytes);
                writeln!(out, "OK ({n} bytes, {} blobs)", self.collection.len())?;
            }
            Command::Sync => {
                let summary = self
                    .collection
                    .synchronize_and_reclaim(&Context::background(), &self.store)
                    .context("sync failed")?;
                writeln!(
                    out,
                    "OK shards={} reclaimed={} legacy_removed={}",
                    summary.shards, summary.reclaimed, summary.legacy_removed
                )?;
            }
            Command::Names => {
                let names = self.collection.shard_names()?;
                for name in &names {
                    writeln!(out, "{name}")?;
                }
                writeln!(out, "({} shards)", names.len())?;
            }
            Command::Plan => {
                let shards = self.collection.materialize();
                for s in shards {
                    writeln!(out, "{} entries={} size={}", s.name(), s.len(), s.approx_size())?;
                }
                writeln!(out, "({} shards)", shards.len())?;
            }
            Command::List { selector } => {
                let selector: Selector = selector.parse()?;
                self.refresh()?;
                let records = self.lister.namespaced(self.cfg.namespace.as_str()).list(&selector);
                if records.is_empty() {
                    writeln!(out, "(empty)")?;
                } else {
                    for r in &records {
                        writeln!(
                            out,
                            "{} keys={} size={} version={}",
                            r.meta.name,
                            r.data.len(),
                            r.data_size(),
                            r.meta.version
                        )?;
                    }
                    writeln!(out, "({} records)", records.len())?;
                }
            }
            Command::Show { name } => {
                let r = self.lister.namespaced(self.cfg.namespace.as_str()).get(&name)?;
                writeln!(out, "{}/{} version={}", r.meta.namespace, r.meta.name, r.meta.version)?;
                for (k, v) in &r.meta.labels {
                    writeln!(out, "label {k}={v}")?;
                }
                for (k, v) in &r.data {
                    writeln!(out, "{k} ({} bytes)", v.len())?;
                }
            }
            Command::Reset => {
                self.collection = new_collection(&self.cfg)?;
                writeln!(out, "OK")?;
            }
            Command::Stats => {
                writeln!(out, "{:?}", self.collection)?;
                writeln!(out, "cached records: {}", self.cache.len())?;
            }
            Command::Exit => {}
        }
        Ok(())
    }

    /// Replaces the cache with the store's current contents of the
    /// configured namespace.
    fn refresh(&self) -> Result<()> {
        let records = self
            .store
            .list(&Context::background(), &self.cfg.namespace)
            .context("listing store")?;
        debug!(records = records.len(), "cache refreshed");
        self.cache.replace(records);
        Ok(())
    }
}

fn new_collection(cfg: &Config) -> Result<ShardedCollection> {
    let template = Record::new(cfg.namespace.as_str(), cfg.base_name.as_str())
        .with_label("app", cfg.base_name.as_str())
        .with_label(MANAGED_BY_LABEL, MANAGED_BY);
    Ok(ShardedCollection::with_options(template, ShardOptions::from(cfg))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn session(dir: &std::path::Path, capacity: usize) -> Session {
        Session::open(Config {
            store_dir: dir.to_path_buf(),
            capacity,
            sync_writes: false,
            ..Config::default()
        })
        .unwrap()
    }

    fn run(s: &mut Session, line: &str) -> Result<String> {
        let mut out = Vec::new();
        let cmd = Command::parse(line)?.unwrap();
        s.execute(cmd, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn put_sync_names() {
        let dir = tempdir().unwrap();
        let mut s = session(dir.path(), 16);

        run(&mut s, "PUT a 0123456789").unwrap();
        run(&mut s, "PUT b 0123456789").unwrap();
        assert_eq!(run(&mut s, "SYNC").unwrap(), "OK shards=2 reclaimed=0 legacy_removed=false\n");
        assert_eq!(run(&mut s, "NAMES").unwrap(), "blobs-0\nblobs-1\n(2 shards)\n");
    }

    #[test]
    fn names_before_sync_is_an_error() {
        let dir = tempdir().unwrap();
        let mut s = session(dir.path(), 16);
        assert!(run(&mut s, "NAMES").is_err());
    }

    #[test]
    fn list_and_show_read_the_refreshed_cache() {
        let dir = tempdir().unwrap();
        let mut s = session(dir.path(), 1024);

        run(&mut s, "PUT ca.crt hello").unwrap();
        run(&mut s, "SYNC").unwrap();
        // SHOW reads the cache, which LIST fills
        assert!(run(&mut s, "SHOW blobs-0").is_err());

        let listed = run(&mut s, "LIST app=blobs").unwrap();
        assert!(listed.contains("blobs-0 keys=1 size=11 version=1"));
        assert_eq!(run(&mut s, "LIST app=other").unwrap(), "(empty)\n");

        let shown = run(&mut s, "SHOW blobs-0").unwrap();
        assert!(shown.contains("ca.crt (5 bytes)"));
        assert!(shown.contains("label managed-by=shard-cli"));
    }

    #[test]
    fn reset_starts_a_new_collection() {
        let dir = tempdir().unwrap();
        let mut s = session(dir.path(), 16);

        run(&mut s, "PUT a x").unwrap();
        run(&mut s, "RESET").unwrap();
        assert_eq!(run(&mut s, "PLAN").unwrap(), "blobs-0 entries=0 size=0\n(1 shards)\n");
    }

    #[test]
    fn putfile_reads_bytes() {
        let dir = tempdir().unwrap();
        let blob = dir.path().join("blob.bin");
        std::fs::write(&blob, [0u8, 1, 2, 255]).unwrap();
        let mut s = session(&dir.path().join("store"), 1024);

        let out = run(&mut s, &format!("PUTFILE bin {}", blob.display())).unwrap();
        assert_eq!(out, "OK (4 bytes, 1 blobs)\n");
        assert!(run(&mut s, "PUTFILE x /definitely/not/here").is_err());
    }
}
