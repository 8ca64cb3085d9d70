//! # Config - Shard Workspace Settings
//!
//! A single [`Config`] value carries every tunable used by the shell and the
//! sharding library: where records are stored, how shards are named, how
//! much data the planner packs into one shard and how many records
//! reclamation may delete.
//!
//! ## Environment
//!
//! ```text
//! SHARD_STORE_DIR          record directory              (default: "data/records")
//! SHARD_NAMESPACE          namespace of every shard      (default: "default")
//! SHARD_BASE_NAME          shard name prefix             (default: "blobs")
//! SHARD_CAPACITY           planner capacity in bytes     (default: 998576)
//! SHARD_MAX_RECORD_SIZE    hard encoded record limit     (default: 1048576)
//! SHARD_DELETE_LIMIT        max deletions per reclaim     (default: 1024, 0 = unbounded)
//! SHARD_REMOVE_UNSHARDED   delete a legacy `<base>` record (default: "false")
//! SHARD_SYNC               fsync every record write      (default: "true")
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Hard maximum size of one encoded record (1 MiB).
pub const DEFAULT_MAX_RECORD_SIZE: usize = 1024 * 1024;

/// Bytes reserved in every record for metadata and framing.
pub const METADATA_HEADROOM: usize = 50_000;

/// Default planner capacity: the record limit minus [`METADATA_HEADROOM`].
pub const DEFAULT_CAPACITY: usize = DEFAULT_MAX_RECORD_SIZE - METADATA_HEADROOM;

/// Default number of deletions a single reclamation pass may perform.
pub const DEFAULT_DELETE_LIMIT: usize = 1024;

/// Errors produced while loading or validating a [`Config`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: String, value: String },

    /// The settings are individually well formed but inconsistent.
    #[error("invalid configuration: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root directory of the record store.
    pub store_dir: PathBuf,
    /// Namespace the shards live in.
    pub namespace: String,
    /// Prefix of every shard name (`<base_name>-<index>`).
    pub base_name: String,
    /// Advisory per-shard packing target used by the planner.
    pub capacity: usize,
    /// Hard ceiling on an encoded record enforced by the store.
    pub max_record_size: usize,
    /// Deletions allowed per reclamation pass. `0` disables the bound.
    pub delete_limit: usize,
    /// Remove an unsharded record named exactly `base_name` after reclaiming.
    pub remove_unsharded: bool,
    /// fsync every record write.
    pub sync_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("data/records"),
            namespace: "default".to_string(),
            base_name: "blobs".to_string(),
            capacity: DEFAULT_CAPACITY,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
            delete_limit: DEFAULT_DELETE_LIMIT,
            remove_unsharded: false,
            sync_writes: true,
        }
    }
}

impl Config {
    /// Builds a config from the process environment, falling back to
    /// [`Config::default`] for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. `from_env` is this
    /// function over `std::env::var`; tests pass a map instead.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("SHARD_STORE_DIR") {
            cfg.store_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SHARD_NAMESPACE") {
            cfg.namespace = v;
        }
        if let Some(v) = lookup("SHARD_BASE_NAME") {
            cfg.base_name = v;
        }

        let max_record_size = parse_var(&lookup, "SHARD_MAX_RECORD_SIZE")?;
        if let Some(max) = max_record_size {
            cfg.max_record_size = max;
        }
        match parse_var(&lookup, "SHARD_CAPACITY")? {
            Some(capacity) => cfg.capacity = capacity,
            // keep the headroom relationship when only the ceiling moved
            None if max_record_size.is_some() => {
                cfg.capacity = cfg.max_record_size.saturating_sub(METADATA_HEADROOM).max(1);
            }
            None => {}
        }
        if let Some(v) = parse_var(&lookup, "SHARD_DELETE_LIMIT")? {
            cfg.delete_limit = v;
        }
        if let Some(v) = parse_var(&lookup, "SHARD_REMOVE_UNSHARDED")? {
            cfg.remove_unsharded = v;
        }
        if let Some(v) = parse_var(&lookup, "SHARD_SYNC")? {
            cfg.sync_writes = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Inconsistent("capacity must be positive".into()));
        }
        if self.capacity > self.max_record_size {
            return Err(ConfigError::Inconsistent(format!(
                "capacity {} exceeds max record size {}",
                self.capacity, self.max_record_size
            )));
        }
        if self.base_name.is_empty() {
            return Err(ConfigError::Inconsistent("base name must not be empty".into()));
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::Inconsistent("namespace must not be empty".into()));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_consistent() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.capacity, DEFAULT_MAX_RECORD_SIZE - METADATA_HEADROOM);
        assert!(!cfg.remove_unsharded);
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("SHARD_STORE_DIR", "/tmp/recs"),
            ("SHARD_NAMESPACE", "monitoring"),
            ("SHARD_BASE_NAME", "tls-assets"),
            ("SHARD_CAPACITY", "64"),
            ("SHARD_MAX_RECORD_SIZE", "4096"),
            ("SHARD_DELETE_LIMIT", "0"),
            ("SHARD_REMOVE_UNSHARDED", "true"),
            ("SHARD_SYNC", "false"),
        ]))
        .unwrap();

        assert_eq!(cfg.store_dir, PathBuf::from("/tmp/recs"));
        assert_eq!(cfg.namespace, "monitoring");
        assert_eq!(cfg.base_name, "tls-assets");
        assert_eq!(cfg.capacity, 64);
        assert_eq!(cfg.max_record_size, 4096);
        assert_eq!(cfg.delete_limit, 0);
        assert!(cfg.remove_unsharded);
        assert!(!cfg.sync_writes);
    }

    #[test]
    fn capacity_follows_lowered_ceiling() {
        let cfg =
            Config::from_lookup(lookup_from(&[("SHARD_MAX_RECORD_SIZE", "200000")])).unwrap();
        assert_eq!(cfg.capacity, 150_000);
    }

    #[test]
    fn unparsable_value_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("SHARD_CAPACITY", "lots")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "SHARD_CAPACITY".into(),
                value: "lots".into()
            }
        );
    }

    #[test]
    fn capacity_above_ceiling_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("SHARD_CAPACITY", "2048"),
            ("SHARD_MAX_RECORD_SIZE", "1024"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Inconsistent(_)));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let cfg = Config {
            capacity: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_names_are_rejected() {
        let cfg = Config {
            base_name: String::new(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            namespace: String::new(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }
}
