//! Translation of inbound tracker webhook actions into a change event plus
//! the store mutation that goes with it. Pure decision table; the transport
//! layer applies the mutation and emits the event.

use odk_schemas::EventKind;

/// What the store should do for a translated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMutation {
    /// Leave the mapping untouched.
    NoChange,
    /// Drop the identity's entry (and persist).
    Remove,
    /// Assign a first-position key so the record sorts before everything
    /// previously known (set + persist).
    AssignFirst,
}

/// Action table. `None` means the action is unrecognized: no mutation, no
/// event, caller logs it.
pub fn translate(action: &str) -> Option<(EventKind, StoreMutation)> {
    match action {
        "closed" => Some((EventKind::Removed, StoreMutation::Remove)),
        "edited" => Some((EventKind::Updated, StoreMutation::NoChange)),
        "opened" | "reopened" => Some((EventKind::Created, StoreMutation::AssignFirst)),
        _ => None,
    }
}
