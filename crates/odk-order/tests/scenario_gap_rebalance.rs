//! Anti-collision behavior once bisection runs out of float precision.

use odk_order::{reconcile, PositionStore};
use odk_schemas::Issue;

fn batch(ids: &[u64]) -> Vec<Issue> {
    ids.iter().map(|&id| Issue::with_id(id)).collect()
}

#[test]
fn scenario_exhausted_gap_rebalances_and_still_assigns() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = PositionStore::load(dir.path().join("issues.json")).unwrap();

    // Adjacent representable keys: no midpoint exists strictly between them.
    store.set(1, 1.0);
    store.set(2, 1.0 + f64::EPSILON);
    store.persist().unwrap();

    let outcome = reconcile(&mut store, batch(&[1, 2, 3])).unwrap();
    assert!(outcome.rebalanced, "collision policy must fire");
    assert_eq!(outcome.newly_assigned, 1);

    // All three keys are distinct and the pre-existing order survived.
    let k1 = store.get(1).unwrap();
    let k2 = store.get(2).unwrap();
    let k3 = store.get(3).unwrap();
    assert!(k1 < k2, "prior relative order preserved across the rebalance");
    assert_ne!(k3, k1);
    assert_ne!(k3, k2);

    // The returned batch is ordered by the post-rebalance keys.
    let mut keys: Vec<f64> = outcome
        .issues
        .iter()
        .map(|i| i.sort_position.unwrap())
        .collect();
    let sorted = {
        let mut s = keys.clone();
        s.sort_by(f64::total_cmp);
        s
    };
    assert_eq!(keys, sorted);
    keys.dedup();
    assert_eq!(keys.len(), 3);
}

#[test]
fn scenario_single_entry_store_never_duplicates_its_only_key() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = PositionStore::load(dir.path().join("issues.json")).unwrap();

    // max == min: the naive midpoint would collide with the existing key.
    store.set(7, 42.0);
    store.persist().unwrap();

    let outcome = reconcile(&mut store, batch(&[7, 8])).unwrap();
    assert_eq!(outcome.newly_assigned, 1);
    assert_eq!(store.get(7), Some(42.0), "existing entry untouched");
    let k8 = store.get(8).unwrap();
    assert_ne!(k8, 42.0);
}
