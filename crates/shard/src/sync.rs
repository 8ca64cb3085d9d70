//! Shard synchronizer: upserts planned shards in index order, fail-fast.

use record::Record;
use store::{Context, RecordStore};
use tracing::{debug, warn};

use crate::plan::Shard;
use crate::ShardError;

/// Creates or updates every shard, lowest index first.
///
/// Stops at the first failure and reports the failing shard; shards after it
/// are not written. Returns the records as stored (with their versions).
pub fn synchronize<S>(ctx: &Context, store: &S, shards: &[Shard]) -> Result<Vec<Record>, ShardError>
where
    S: RecordStore + ?Sized,
{
    let mut stored = Vec::with_capacity(shards.len());

    for shard in shards {
        match store.create_or_update(ctx, shard.record()) {
            Ok(r) => {
                debug!(
                    shard = shard.name(),
                    index = shard.index(),
                    entries = shard.len(),
                    approx_size = shard.approx_size(),
                    version = r.meta.version,
                    "shard persisted"
                );
                stored.push(r);
            }
            Err(source) => {
                warn!(shard = shard.name(), index = shard.index(), error = %source, "shard persist failed");
                return Err(ShardError::Persist {
                    name: shard.name().to_string(),
                    index: shard.index(),
                    source,
                });
            }
        }
    }

    Ok(stored)
}
