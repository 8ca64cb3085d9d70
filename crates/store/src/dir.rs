//! Directory-backed record store.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   <namespace>/
//!     <name>.rec        encoded record (see `record::codec`)
//!     <name>.rec.tmp    in-flight write, removed on open
//! ```
//!
//! ## Crash Safety
//!
//! A write goes to `<name>.rec.tmp`, is fsynced (when `sync` is on), then
//! renamed over `<name>.rec` and the namespace directory is fsynced. A crash
//! leaves either the old or the new record, never a torn one.

use parking_lot::Mutex;
use record::{codec, Record};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{admit, validate_name, Context, RecordStore, StoreError};

/// File extension of a stored record.
pub const RECORD_EXTENSION: &str = "rec";

const TMP_SUFFIX: &str = ".rec.tmp";

/// A [`RecordStore`] keeping one file per record under a root directory.
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
    max_record_size: usize,
    sync: bool,
    /// Serializes read-modify-write of versions.
    write_lock: Mutex<()>,
}

impl DirStore {
    /// Opens (or creates) a store rooted at `root`.
    ///
    /// Leftover `.rec.tmp` files from interrupted writes are removed.
    pub fn open<P: AsRef<Path>>(
        root: P,
        max_record_size: usize,
        sync: bool,
    ) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        for entry in fs::read_dir(&root)?.flatten() {
            if entry.path().is_dir() {
                Self::cleanup_tmp_files(&entry.path());
            }
        }

        Ok(Self {
            root,
            max_record_size,
            sync,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_record_size(&self) -> usize {
        self.max_record_size
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    fn record_path(&self, namespace: &str, name: &str) -> PathBuf {
        self.namespace_dir(namespace)
            .join(format!("{name}.{RECORD_EXTENSION}"))
    }

    fn read_record(&self, path: &Path, namespace: &str, name: &str) -> Result<Record, StoreError> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::not_found(namespace, name));
            }
            Err(e) => return Err(e.into()),
        };
        codec::decode(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::InvalidName(path.display().to_string()))?;
        fs::create_dir_all(dir)?;

        let tmp_path = path.with_extension(&TMP_SUFFIX[1..]);
        {
            let mut f = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            f.write_all(bytes)?;
            f.flush()?;
            if self.sync {
                f.sync_all()?;
            }
        }

        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        if self.sync {
            if let Ok(d) = fs::File::open(dir) {
                let _ = d.sync_all();
            }
        }
        Ok(())
    }

    /// Removes leftover `.rec.tmp` files from interrupted writes.
    fn cleanup_tmp_files(dir: &Path) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let p = entry.path();
            let is_tmp = p
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(TMP_SUFFIX))
                .unwrap_or(false);
            if is_tmp {
                if let Err(e) = fs::remove_file(&p) {
                    warn!(path = %p.display(), error = %e, "failed to remove stale tmp record");
                }
            }
        }
    }
}

impl RecordStore for DirStore {
    fn create_or_update(&self, ctx: &Context, record: &Record) -> Result<Record, StoreError> {
        ctx.check()?;
        admit(record, self.max_record_size)?;

        let (namespace, name) = (record.namespace(), record.name());
        let path = self.record_path(namespace, name);
        let _guard = self.write_lock.lock();

        let version = match self.read_record(&path, namespace, name) {
            Ok(existing) if existing.same_content(record) => {
                debug!(namespace, name, version = existing.meta.version, "record unchanged");
                return Ok(existing);
            }
            Ok(existing) => existing.meta.version + 1,
            Err(StoreError::NotFound { .. }) => 1,
            // an unreadable record is overwritten rather than wedging the store
            Err(StoreError::Corrupt(reason)) => {
                warn!(namespace, name, %reason, "replacing corrupt record");
                1
            }
            Err(e) => return Err(e),
        };

        let mut stored = record.clone();
        stored.meta.version = version;
        let bytes = codec::encode(&stored);
        self.write_atomic(&path, &bytes)?;

        debug!(namespace, name, version, size = bytes.len(), "record written");
        Ok(stored)
    }

    fn delete(&self, ctx: &Context, namespace: &str, name: &str) -> Result<(), StoreError> {
        ctx.check()?;
        validate_name(namespace)?;
        validate_name(name)?;

        let path = self.record_path(namespace, name);
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(namespace, name, "record deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::not_found(namespace, name))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, ctx: &Context, namespace: &str, name: &str) -> Result<Record, StoreError> {
        ctx.check()?;
        validate_name(namespace)?;
        validate_name(name)?;
        self.read_record(&self.record_path(namespace, name), namespace, name)
    }

    fn list(&self, ctx: &Context, namespace: &str) -> Result<Vec<Record>, StoreError> {
        ctx.check()?;
        validate_name(namespace)?;

        let entries = match fs::read_dir(self.namespace_dir(namespace)) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().map(|e| e == RECORD_EXTENSION).unwrap_or(false) {
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();
                match self.read_record(&path, namespace, &name) {
                    Ok(r) => records.push(r),
                    // deleted between read_dir and read
                    Err(StoreError::NotFound { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        records.sort_by(|a, b| a.meta.name.cmp(&b.meta.name));
        Ok(records)
    }
}
