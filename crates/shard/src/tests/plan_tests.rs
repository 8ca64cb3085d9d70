use super::helpers::{blobs, template, BASE, NS};
use crate::*;

// --------------------- Worked examples ---------------------

#[test]
fn small_then_oversized_blob_splits_in_two() {
    // a = 1 + 8 = 9 fits; b = 1 + 13 = 14 overflows the non-empty shard 0
    // and lands alone in shard 1 even though it exceeds capacity
    let shards = plan(&blobs(&[("a", 8), ("b", 13)]), &template(), 10);

    assert_eq!(shards.len(), 2);
    assert_eq!(shards[0].record().data.keys().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(shards[1].record().data.keys().collect::<Vec<_>>(), vec!["b"]);
    assert_eq!(shards[0].approx_size(), 9);
    assert_eq!(shards[1].approx_size(), 14);
}

#[test]
fn empty_blob_map_yields_one_empty_shard() {
    let shards = plan(&blobs(&[]), &template(), 10);

    assert_eq!(shards.len(), 1);
    assert!(shards[0].is_empty());
    assert_eq!(shards[0].name(), "base-0");
    assert_eq!(shards[0].approx_size(), 0);
}

// --------------------- Packing rules ---------------------

#[test]
fn exact_fit_stays_in_the_same_shard() {
    // 1 + 4 = 5 each, 5 + 5 == capacity
    let shards = plan(&blobs(&[("a", 4), ("b", 4), ("c", 4)]), &template(), 10);

    assert_eq!(shards.len(), 2);
    assert_eq!(shards[0].len(), 2);
    assert_eq!(shards[0].approx_size(), 10);
    assert_eq!(shards[1].len(), 1);
}

#[test]
fn oversized_first_blob_does_not_leave_an_empty_shard() {
    let shards = plan(&blobs(&[("a", 50), ("b", 1)]), &template(), 10);

    assert_eq!(shards.len(), 2);
    assert_eq!(shards[0].len(), 1);
    assert!(shards[0].record().data.contains_key("a"));
    assert!(shards.iter().all(|s| !s.is_empty()));
}

#[test]
fn oversized_blob_in_the_middle_is_isolated() {
    let shards = plan(
        &blobs(&[("a", 2), ("big", 50), ("c", 2)]),
        &template(),
        10,
    );

    let keys: Vec<Vec<&String>> = shards
        .iter()
        .map(|s| s.record().data.keys().collect())
        .collect();
    assert_eq!(keys, vec![vec!["a"], vec!["big"], vec!["c"]]);
}

#[test]
fn keys_are_packed_in_ascending_order() {
    // every blob is 1 + 4 = 5, two per shard
    let shards = plan(
        &blobs(&[("d", 4), ("b", 4), ("a", 4), ("c", 4)]),
        &template(),
        10,
    );

    let keys: Vec<Vec<&String>> = shards
        .iter()
        .map(|s| s.record().data.keys().collect())
        .collect();
    assert_eq!(keys, vec![vec!["a", "b"], vec!["c", "d"]]);
}

#[test]
fn key_length_counts_toward_size() {
    // "longkey" = 7 + 3 = 10 fills a shard on its own
    let shards = plan(&blobs(&[("longkey", 3), ("z", 0)]), &template(), 10);
    assert_eq!(shards.len(), 2);
    assert_eq!(entry_size("longkey", &[0u8; 3]), 10);
}

#[test]
fn everything_fits_in_one_shard_under_default_capacity() {
    let shards = plan(
        &blobs(&[("a", 1000), ("b", 1000), ("c", 1000)]),
        &template(),
        DEFAULT_CAPACITY,
    );
    assert_eq!(shards.len(), 1);
    assert_eq!(shards[0].len(), 3);
}

// --------------------- Template handling ---------------------

#[test]
fn shards_inherit_template_metadata() {
    let tpl = template();
    let shards = plan(&blobs(&[("a", 8), ("b", 8)]), &tpl, 10);

    for (i, s) in shards.iter().enumerate() {
        assert_eq!(s.index(), i);
        assert_eq!(s.name(), shard_name(BASE, i));
        assert_eq!(s.record().meta.namespace, NS);
        assert_eq!(s.record().meta.labels, tpl.meta.labels);
        assert_eq!(s.record().meta.owner_references, tpl.meta.owner_references);
        assert_eq!(s.record().meta.version, 0);
    }
}

#[test]
fn template_data_and_version_are_not_copied() {
    let mut tpl = template();
    tpl.meta.version = 42;
    tpl.data.insert("stale".into(), b"from-template".to_vec());
    let before = tpl.clone();

    let shards = plan(&blobs(&[("a", 1)]), &tpl, 10);

    assert_eq!(shards[0].record().data.len(), 1);
    assert!(!shards[0].record().data.contains_key("stale"));
    assert_eq!(shards[0].record().meta.version, 0);
    // the template itself is untouched
    assert_eq!(tpl, before);
}

#[test]
fn into_record_hands_out_the_shard_payload() {
    let shards = plan(&blobs(&[("a", 3)]), &template(), 10);
    let r = shards.into_iter().next().unwrap().into_record();
    assert_eq!(r.meta.name, "base-0");
    assert_eq!(r.data["a"], vec![b'x'; 3]);
}
