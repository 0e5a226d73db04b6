//! Persisted identity → ordering-key mapping.
//!
//! The store is the sole source of truth for ordering. In memory it is a
//! `BTreeMap` (deterministic iteration); on disk it is one JSON object
//! mapping the stringified identity to its key, rewritten in full on every
//! persist. Durability is best-effort: a failed persist leaves the in-memory
//! mapping authoritative until the next successful write or restart.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::assign::{LOWER_SENTINEL, UPPER_SENTINEL};

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Failures of snapshot load/persist.
#[derive(Debug)]
pub enum StoreError {
    /// Snapshot file could not be read or written.
    Io(String),
    /// Snapshot contents could not be encoded or decoded.
    Codec(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(msg) => write!(f, "snapshot io error: {msg}"),
            StoreError::Codec(msg) => write!(f, "snapshot codec error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Extremes
// ---------------------------------------------------------------------------

/// Max/min over all stored keys, or the sentinel pair when the store is
/// empty, so bisection always starts from a finite interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremes {
    pub max: f64,
    pub min: f64,
}

// ---------------------------------------------------------------------------
// PositionStore
// ---------------------------------------------------------------------------

/// Identity → ordering-key mapping backed by a single snapshot file.
#[derive(Debug)]
pub struct PositionStore {
    path: PathBuf,
    entries: BTreeMap<u64, f64>,
}

impl PositionStore {
    /// Read the snapshot at `path` if present, else start empty. Called once
    /// at process start.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Codec(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Io(format!("{}: {e}", path.display()))),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<f64> {
        self.entries.get(&id).copied()
    }

    /// In-memory mutation only; persistence is a separate, explicit step.
    pub fn set(&mut self, id: u64, key: f64) {
        self.entries.insert(id, key);
    }

    /// Delete the entry if present. Returns whether anything was removed.
    pub fn remove(&mut self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Serialize the full mapping and overwrite the snapshot file.
    pub fn persist(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.entries)
            .map_err(|e| StoreError::Codec(e.to_string()))?;
        fs::write(&self.path, raw)
            .map_err(|e| StoreError::Io(format!("{}: {e}", self.path.display())))
    }

    pub fn extremes(&self) -> Extremes {
        let mut values = self.entries.values();
        let Some(&first) = values.next() else {
            return Extremes {
                max: UPPER_SENTINEL,
                min: LOWER_SENTINEL,
            };
        };
        let (max, min) = values.fold((first, first), |(mx, mn), &k| (mx.max(k), mn.min(k)));
        Extremes { max, min }
    }

    /// Respace all entries evenly across the sentinel interval, preserving
    /// their ascending order (ties broken by identity). The anti-collision
    /// escape hatch for an exhausted bisection gap; absolute key values are
    /// implementation detail, only relative order is visible outside.
    pub fn rebalance(&mut self) {
        let n = self.entries.len();
        if n == 0 {
            return;
        }
        let mut ordered: Vec<(u64, f64)> = self.entries.iter().map(|(&id, &k)| (id, k)).collect();
        ordered.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let step = (UPPER_SENTINEL - LOWER_SENTINEL) / (n as f64 + 1.0);
        for (i, (id, _)) in ordered.into_iter().enumerate() {
            self.entries.insert(id, LOWER_SENTINEL + step * (i as f64 + 1.0));
        }
    }
}
