use super::conformance::{self, record};
use crate::*;

const LIMIT: usize = 4096;

fn store() -> MemoryStore {
    MemoryStore::new(LIMIT)
}

#[test]
fn create_assigns_first_version() {
    conformance::create_assigns_first_version(&store());
}

#[test]
fn unchanged_update_keeps_version() {
    conformance::unchanged_update_keeps_version(&store());
}

#[test]
fn delete_reports_not_found() {
    conformance::delete_reports_not_found(&store());
}

#[test]
fn list_is_ordered_and_namespaced() {
    conformance::list_is_ordered_and_namespaced(&store());
}

#[test]
fn oversized_record_is_rejected() {
    conformance::oversized_record_is_rejected(&store(), LIMIT);
}

#[test]
fn invalid_names_are_rejected() {
    conformance::invalid_names_are_rejected(&store());
}

#[test]
fn cancelled_context_blocks_io() {
    conformance::cancelled_context_blocks_io(&store());
}

#[test]
fn names_lists_one_namespace() {
    let s = store();
    let ctx = Context::background();
    s.create_or_update(&ctx, &record("b", &[])).unwrap();
    s.create_or_update(&ctx, &record("a", &[])).unwrap();
    s.create_or_update(&ctx, &::record::Record::new("nt", "x")).unwrap();

    assert_eq!(s.names("ns"), vec!["a", "b"]);
    assert_eq!(s.names("nt"), vec!["x"]);
    assert_eq!(s.len(), 3);
}

#[test]
fn works_through_shared_handles() {
    let s = std::sync::Arc::new(store());
    let boxed: Box<dyn RecordStore> = Box::new(std::sync::Arc::clone(&s));
    let ctx = Context::background();

    boxed.create_or_update(&ctx, &record("a", &[])).unwrap();
    assert_eq!(s.names("ns"), vec!["a"]);
}

#[test]
fn context_clones_share_cancellation() {
    let ctx = Context::background();
    let child = ctx.with_timeout(std::time::Duration::from_secs(60));
    assert!(child.check().is_ok());

    ctx.cancel();
    assert!(child.is_cancelled());
    assert!(matches!(child.check(), Err(StoreError::Cancelled)));
}
