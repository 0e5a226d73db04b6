//! Batch reconciliation: merge stored ordering keys into a fetched batch,
//! assigning fresh keys to identities the store has never seen.
//!
//! One call == one reconciliation pass. The caller is responsible for
//! holding whatever lock makes the pass atomic against other writers.

use std::cmp::Ordering;

use tracing::warn;

use odk_schemas::Issue;

use crate::assign::{first_position, BatchAssigner, GapExhausted, LOWER_SENTINEL};
use crate::store::PositionStore;

/// What one reconciliation pass did, plus the ordered batch.
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// The batch with `sort_position` populated, ascending.
    pub issues: Vec<Issue>,
    /// Identities that received a key this pass.
    pub newly_assigned: usize,
    /// Whether the anti-collision rebalance fired.
    pub rebalanced: bool,
}

/// Attach keys to every record in fetch order; unseen identities draw from
/// the pass's [`BatchAssigner`]. Returns how many assignments were made.
fn run_pass(store: &mut PositionStore, batch: &mut [Issue]) -> Result<usize, GapExhausted> {
    let mut assigner = BatchAssigner::new(store.extremes());
    let mut assigned = 0usize;
    for issue in batch.iter_mut() {
        match store.get(issue.id) {
            Some(key) => issue.sort_position = Some(key),
            None => {
                let key = assigner.next_key()?;
                issue.sort_position = Some(key);
                store.set(issue.id, key);
                assigned += 1;
            }
        }
    }
    Ok(assigned)
}

/// Reconcile a fetched batch against the store.
///
/// Reads the extremes once, assigns keys to unseen identities in fetch
/// order, persists when anything changed, and returns the batch
/// stable-sorted ascending by key. Re-running on a fully-assigned batch
/// mutates nothing and persists nothing.
///
/// An exhausted bisection gap triggers one store rebalance and a restart of
/// the pass (restarting re-attaches the respaced keys, keeping attached and
/// stored values in step); a second exhaustion propagates.
pub fn reconcile(
    store: &mut PositionStore,
    mut batch: Vec<Issue>,
) -> Result<ReconcileOutcome, GapExhausted> {
    let mut rebalanced = false;
    let newly_assigned = match run_pass(store, &mut batch) {
        Ok(n) => n,
        Err(GapExhausted) => {
            store.rebalance();
            rebalanced = true;
            run_pass(store, &mut batch)?
        }
    };

    if newly_assigned > 0 || rebalanced {
        if let Err(err) = store.persist() {
            warn!(%err, "position snapshot persist failed; in-memory mapping stays authoritative");
        }
    }

    batch.sort_by(|a, b| {
        a.sort_position
            .partial_cmp(&b.sort_position)
            .unwrap_or(Ordering::Equal)
    });

    Ok(ReconcileOutcome {
        issues: batch,
        newly_assigned,
        rebalanced,
    })
}

/// First-position key for a single newly-opened identity, with the
/// anti-collision fallback applied. Does not write the entry; the caller
/// sets and persists it.
pub fn first_position_key(store: &mut PositionStore) -> Result<f64, GapExhausted> {
    if store.is_empty() {
        // The formula over the sentinel pair collapses onto the lower bound,
        // which is safe while nothing else is stored.
        return Ok(LOWER_SENTINEL);
    }
    match first_position(store.extremes().min) {
        Ok(key) => Ok(key),
        Err(GapExhausted) => {
            store.rebalance();
            first_position(store.extremes().min)
        }
    }
}
