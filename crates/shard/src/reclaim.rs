//! Shard reclaimer.
//!
//! The store has no "list by prefix" primitive the reclaimer relies on, so
//! stale shards are found by probing: delete `<base>-<n>`, `<base>-<n+1>`,
//! ... until the store answers NotFound. This depends on shard indices
//! being contiguous and on nothing else writing into the name range during
//! the pass.
//!
//! ```text
//! previous generation:  base-0 base-1 base-2
//! new generation:       base-0
//! reclaim:              del base-1 ok, del base-2 ok, del base-3 NotFound -> done
//! ```

use store::{Context, RecordStore};
use tracing::{debug, warn};

use crate::naming::shard_name;
use crate::ShardError;

/// Deletes shards of `base` from index `new_count` upward until the first
/// NotFound. Returns the number of shards deleted.
///
/// At most `delete_limit` deletions are made (`0` = unbounded). Once the
/// limit is reached the next index is only inspected: if a record is still
/// there the pass fails with [`ShardError::DeleteLimitExceeded`] and nothing
/// beyond the bound is touched.
pub fn reclaim<S>(
    ctx: &Context,
    store: &S,
    namespace: &str,
    base: &str,
    new_count: usize,
    delete_limit: usize,
) -> Result<usize, ShardError>
where
    S: RecordStore + ?Sized,
{
    let mut deleted = 0usize;
    let mut index = new_count;

    loop {
        let name = shard_name(base, index);

        if delete_limit != 0 && deleted == delete_limit {
            return match store.get(ctx, namespace, &name) {
                Err(e) if e.is_not_found() => Ok(deleted),
                Ok(_) => {
                    warn!(base, start = new_count, limit = delete_limit, "reclaim delete limit exceeded");
                    Err(ShardError::DeleteLimitExceeded {
                        base: base.to_string(),
                        start: new_count,
                        limit: delete_limit,
                    })
                }
                Err(source) => Err(ShardError::Reclaim {
                    name,
                    index: Some(index),
                    source,
                }),
            };
        }

        match store.delete(ctx, namespace, &name) {
            Ok(()) => {
                debug!(shard = %name, index, "stale shard deleted");
                deleted += 1;
            }
            Err(e) if e.is_not_found() => return Ok(deleted),
            Err(source) => {
                warn!(shard = %name, index, error = %source, "stale shard delete failed");
                return Err(ShardError::Reclaim {
                    name,
                    index: Some(index),
                    source,
                });
            }
        }

        index += 1;
    }
}

/// Deletes the unsharded record named exactly `base`, left behind by
/// writers that predate sharding. Returns `true` if one was removed.
pub fn remove_unsharded<S>(
    ctx: &Context,
    store: &S,
    namespace: &str,
    base: &str,
) -> Result<bool, ShardError>
where
    S: RecordStore + ?Sized,
{
    match store.delete(ctx, namespace, base) {
        Ok(()) => {
            debug!(name = base, "unsharded record deleted");
            Ok(true)
        }
        Err(e) if e.is_not_found() => Ok(false),
        Err(source) => Err(ShardError::Reclaim {
            name: base.to_string(),
            index: None,
            source,
        }),
    }
}
