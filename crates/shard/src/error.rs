use store::StoreError;
use thiserror::Error;

use crate::Phase;

/// Errors returned by a sharding pass.
///
/// Every store failure is wrapped together with the shard it hit, so a
/// failed pass can be diagnosed from the error alone.
#[derive(Debug, Error)]
pub enum ShardError {
    /// The template cannot produce valid shard names.
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// The pass options are unusable with this template.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Creating or updating a shard failed; later shards were not written.
    #[error("failed to persist shard {name:?} (index {index}): {source}")]
    Persist {
        name: String,
        index: usize,
        source: StoreError,
    },

    /// Deleting a stale record failed with something other than NotFound.
    /// `index` is `None` for the unsharded legacy record.
    #[error("failed to delete {name:?}: {source}")]
    Reclaim {
        name: String,
        index: Option<usize>,
        source: StoreError,
    },

    /// Shards still existed after `limit` deletions starting at `start`.
    #[error("reclaiming {base:?} from index {start} exceeded the limit of {limit} deletions")]
    DeleteLimitExceeded {
        base: String,
        start: usize,
        limit: usize,
    },

    #[error("shard names are unavailable before a successful synchronization (phase: {phase})")]
    NotSynchronized { phase: Phase },
}

impl ShardError {
    /// Returns `true` if the caller's context aborted the pass.
    pub fn is_cancelled(&self) -> bool {
        match self {
            ShardError::Persist { source, .. } | ShardError::Reclaim { source, .. } => {
                source.is_cancelled()
            }
            _ => false,
        }
    }

    /// Name of the shard (or legacy record) the pass failed on, if any.
    pub fn shard_name(&self) -> Option<&str> {
        match self {
            ShardError::Persist { name, .. } | ShardError::Reclaim { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Underlying store error, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            ShardError::Persist { source, .. } | ShardError::Reclaim { source, .. } => Some(source),
            _ => None,
        }
    }
}
