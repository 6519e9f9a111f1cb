//! Process-wide state holder.
//!
//! The engine owns no state by necessity; every core function takes an
//! [`EngineState`] snapshot and returns a new one. This module is the
//! convenience single cell for hosts that have no other place to keep the
//! snapshot, and the re-entry point step callbacks use for
//! cross-operation invalidation.
//!
//! Lifecycle: created empty, populated by registration and transitions,
//! cleared explicitly by the host (between tests, on app teardown). The
//! cell's own mutex is the only synchronization provided; hosts running
//! concurrent threads of control must synchronize access externally.

use std::sync::Mutex;

use lazy_static::lazy_static;

use crate::types::EngineState;

lazy_static! {
    static ref MANAGER_STATE: Mutex<EngineState> = Mutex::new(EngineState::new());
}

/// A clone of the current process-wide snapshot.
pub fn manager_state() -> EngineState {
    MANAGER_STATE.lock().unwrap().clone()
}

/// Replace the process-wide snapshot, returning the stored value.
pub fn set_manager_state(state: EngineState) -> EngineState {
    let mut cell = MANAGER_STATE.lock().unwrap();
    *cell = state;
    cell.clone()
}

/// Reset the process-wide snapshot to empty.
pub fn clear_manager_state() {
    *MANAGER_STATE.lock().unwrap() = EngineState::new();
}
