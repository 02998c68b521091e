//! Lazy, single-flight cache of loaded backends

use crate::error::{FreshnessError, Result};
use crate::models::loader::{BackendHandle, BackendLoader};
use crate::types::health::BackendHealth;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use tracing::{info, warn};

enum SlotState {
    Empty,
    Loading,
    Loaded(BackendHandle),
    Degraded(FreshnessError),
}

/// Per-backend load state plus a condition variable for waiters
struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Empty),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SlotState>> {
        self.state
            .lock()
            .map_err(|e| FreshnessError::Internal(format!("Lock error: {}", e)))
    }
}

/// Marks the slot degraded if the loader unwinds before finishing.
struct LoadGuard<'a> {
    slot: &'a Slot,
    finished: bool,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = match self.slot.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        *state = SlotState::Degraded(FreshnessError::Internal("backend loader panicked".to_string()));
        self.slot.ready.notify_all();
    }
}

/// Cache of backend handles owned by the service.
///
/// Concurrent first callers for the same backend share one load. Successful
/// loads are kept until [`ModelRegistry::shutdown`]; failed loads are recorded
/// as degraded and retried on the next call.
pub struct ModelRegistry {
    loader: Arc<dyn BackendLoader>,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
    load_attempts: AtomicU64,
}

impl ModelRegistry {
    pub fn new(loader: Arc<dyn BackendLoader>) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
            load_attempts: AtomicU64::new(0),
        }
    }

    fn slot(&self, backend_id: &str) -> Result<Arc<Slot>> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| FreshnessError::Internal(format!("Lock error: {}", e)))?;
        Ok(slots
            .entry(backend_id.to_string())
            .or_insert_with(|| Arc::new(Slot::new()))
            .clone())
    }

    /// Return the loaded backend, loading it first if needed.
    ///
    /// Blocks while another caller is loading the same backend and then
    /// returns that caller's outcome.
    pub fn get_or_load(&self, backend_id: &str) -> Result<BackendHandle> {
        let slot = self.slot(backend_id)?;
        let mut state = slot.lock()?;
        let mut waited = false;

        loop {
            let in_flight = match &*state {
                SlotState::Loaded(handle) => return Ok(handle.clone()),
                SlotState::Degraded(err) if waited => return Err(err.clone()),
                SlotState::Loading => true,
                SlotState::Empty | SlotState::Degraded(_) => false,
            };
            if !in_flight {
                break;
            }
            waited = true;
            state = slot
                .ready
                .wait(state)
                .map_err(|e| FreshnessError::Internal(format!("Lock error: {}", e)))?;
        }

        *state = SlotState::Loading;
        drop(state);

        let mut guard = LoadGuard {
            slot: &slot,
            finished: false,
        };
        let attempt = self.load_attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let outcome = self.loader.load(backend_id);

        let mut state = slot.lock()?;
        *state = match &outcome {
            Ok(handle) => {
                info!(backend = %backend_id, attempt = attempt, "Backend ready");
                SlotState::Loaded(handle.clone())
            }
            Err(e) => {
                warn!(backend = %backend_id, attempt = attempt, error = %e, "Backend degraded");
                SlotState::Degraded(e.clone())
            }
        };
        guard.finished = true;
        slot.ready.notify_all();

        outcome
    }

    /// Health of a backend, attempting a load if it is not loaded yet.
    pub fn health(&self, backend_id: &str) -> BackendHealth {
        match self.get_or_load(backend_id) {
            Ok(_) => BackendHealth::Loaded,
            Err(e) => BackendHealth::Degraded(degradation_reason(&e)),
        }
    }

    /// Last known health without triggering a load.
    pub fn cached_health(&self, backend_id: &str) -> Option<BackendHealth> {
        let slot = self.slots.lock().ok()?.get(backend_id)?.clone();
        let state = slot.state.lock().ok()?;
        match &*state {
            SlotState::Loaded(_) => Some(BackendHealth::Loaded),
            SlotState::Degraded(e) => Some(BackendHealth::Degraded(degradation_reason(e))),
            SlotState::Empty | SlotState::Loading => None,
        }
    }

    /// Number of loader invocations so far
    pub fn load_attempts(&self) -> u64 {
        self.load_attempts.load(Ordering::Relaxed)
    }

    /// Ids of currently loaded backends
    pub fn loaded_backends(&self) -> Vec<String> {
        let slots = match self.slots.lock() {
            Ok(slots) => slots,
            Err(_) => return Vec::new(),
        };
        let mut ids: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| {
                slot.state
                    .lock()
                    .map(|s| matches!(*s, SlotState::Loaded(_)))
                    .unwrap_or(false)
            })
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Drop every cached backend. Returns how many loaded handles were released.
    ///
    /// Loads still in flight finish for their current waiters; later calls
    /// load again.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<Arc<Slot>> = match self.slots.lock() {
            Ok(mut slots) => slots.drain().map(|(_, slot)| slot).collect(),
            Err(_) => return 0,
        };

        let released = drained
            .iter()
            .filter(|slot| {
                slot.state
                    .lock()
                    .map(|s| matches!(*s, SlotState::Loaded(_)))
                    .unwrap_or(false)
            })
            .count();

        info!(released = released, "Model registry shut down");
        released
    }
}

fn degradation_reason(err: &FreshnessError) -> String {
    match err {
        FreshnessError::ModelUnavailable { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}
