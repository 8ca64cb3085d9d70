//! Shard naming scheme.
//!
//! `shard_name("tls-assets", 3) == "tls-assets-3"`. Planner, synchronizer,
//! reclaimer and [`crate::ShardedCollection::shard_names`] all go through
//! this module; reclamation finds stale shards only because every
//! component derives names identically.

/// Name of the shard at `index` for the given base name.
pub fn shard_name(base: &str, index: usize) -> String {
    format!("{base}-{index}")
}

/// Inverse of [`shard_name`].
///
/// Returns `None` unless `name` is exactly `base`, a dash and a canonical
/// decimal index (no sign, no leading zeros).
pub fn parse_shard_index(base: &str, name: &str) -> Option<usize> {
    let digits = name.strip_prefix(base)?.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

/// Returns `true` if `name` has the shape `<x>-<index>` and so lies inside
/// the shard-name range of some other base `x`.
pub fn is_shard_shaped(name: &str) -> bool {
    match name.rsplit_once('-') {
        Some((prefix, _)) if !prefix.is_empty() => parse_shard_index(prefix, name).is_some(),
        _ => false,
    }
}
