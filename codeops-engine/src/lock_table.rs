//! Per-resource exclusive locks with fail-fast contention
//!
//! The table maps a canonical resource key (a resolved file path) to the
//! operation currently holding it. Acquisition never waits: a held key yields
//! `concurrent_access` immediately and the caller decides whether to retry.
//! The table-level mutex only guards map insert/remove and is never held
//! across an `.await` or a subprocess run.

use crate::error::{OperationError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug)]
struct LockEntry {
    token: u64,
    operation_id: Uuid,
    acquired_at: Instant,
}

#[derive(Debug, Default)]
struct LockTableInner {
    entries: Mutex<HashMap<PathBuf, LockEntry>>,
    next_token: AtomicU64,
    total_acquisitions: AtomicU64,
    total_contentions: AtomicU64,
}

/// Snapshot of a currently held lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHolder {
    pub resource_key: PathBuf,
    pub operation_id: Uuid,
    pub held_for: Duration,
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockStats {
    pub active: usize,
    pub total_acquisitions: u64,
    pub total_contentions: u64,
}

/// Registry of per-resource locks. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct LockTable {
    inner: Arc<LockTableInner>,
}

impl LockTableInner {
    // Every critical section leaves the map consistent, so a panic elsewhere
    // while holding the guard cannot corrupt it.
    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, LockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take exclusive ownership of `resource_key` without waiting
    pub fn acquire(&self, resource_key: &Path, operation_id: Uuid) -> Result<LockHandle> {
        let mut entries = self.inner.entries();

        if let Some(holder) = entries.get(resource_key) {
            let held_for = holder.acquired_at.elapsed();
            let holder_id = holder.operation_id;
            drop(entries);

            self.inner.total_contentions.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                resource_key = %resource_key.display(),
                %operation_id,
                holder = %holder_id,
                held_for_ms = held_for.as_millis() as u64,
                "Resource busy, rejecting operation"
            );
            return Err(OperationError::ConcurrentAccess(format!(
                "Another operation is already in progress on {}; retry later",
                resource_key.display()
            )));
        }

        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            resource_key.to_path_buf(),
            LockEntry {
                token,
                operation_id,
                acquired_at: Instant::now(),
            },
        );
        drop(entries);

        self.inner.total_acquisitions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            resource_key = %resource_key.display(),
            %operation_id,
            "Acquired resource lock"
        );

        Ok(LockHandle {
            table: Arc::clone(&self.inner),
            resource_key: resource_key.to_path_buf(),
            token,
            released: false,
        })
    }

    /// Release a handle explicitly. Equivalent to dropping it.
    pub fn release(&self, mut handle: LockHandle) {
        handle.release_inner();
    }

    pub fn is_locked(&self, resource_key: &Path) -> bool {
        self.inner.entries().contains_key(resource_key)
    }

    /// Currently held locks, oldest first
    pub fn holders(&self) -> Vec<LockHolder> {
        let entries = self.inner.entries();
        let mut holders: Vec<_> = entries
            .iter()
            .map(|(key, entry)| LockHolder {
                resource_key: key.clone(),
                operation_id: entry.operation_id,
                held_for: entry.acquired_at.elapsed(),
            })
            .collect();
        holders.sort_by(|a, b| b.held_for.cmp(&a.held_for));
        holders
    }

    pub fn stats(&self) -> LockStats {
        LockStats {
            active: self.inner.entries().len(),
            total_acquisitions: self.inner.total_acquisitions.load(Ordering::Relaxed),
            total_contentions: self.inner.total_contentions.load(Ordering::Relaxed),
        }
    }
}

/// Ownership of one resource key. Released exactly once, on drop at the latest.
#[derive(Debug)]
pub struct LockHandle {
    table: Arc<LockTableInner>,
    resource_key: PathBuf,
    token: u64,
    released: bool,
}

impl LockHandle {
    pub fn resource_key(&self) -> &Path {
        &self.resource_key
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut entries = self.table.entries();
        // Only remove the entry if it is still ours
        if entries
            .get(&self.resource_key)
            .is_some_and(|entry| entry.token == self.token)
        {
            entries.remove(&self.resource_key);
            drop(entries);
            tracing::debug!(
                resource_key = %self.resource_key.display(),
                "Released resource lock"
            );
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}
