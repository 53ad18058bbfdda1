//! Type aliases for commonly used shared types.
//!
//! The motion worker owns the machine and writes the state; monitor threads
//! read clones of it. These aliases name the wrappers used for that sharing.
//!
//! ```rust,ignore
//! use weldkit_core::types::*;
//!
//! let state = shared_machine_state(MachineState::default());
//! let snapshot = state.read().clone();
//! ```

use crate::data::MachineState;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Uses `parking_lot::Mutex` for better performance than `std::sync::Mutex`.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// A thread-safe reader-writer lock wrapper for read-heavy workloads.
pub type ThreadSafeRw<T> = Arc<RwLock<T>>;

/// Machine state shared between the worker and monitor threads.
pub type SharedMachineState = ThreadSafeRw<MachineState>;

/// Create a new `ThreadSafe<T>` from a value.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}

/// Create a new `ThreadSafeRw<T>` from a value.
#[inline]
pub fn thread_safe_rw<T>(value: T) -> ThreadSafeRw<T> {
    Arc::new(RwLock::new(value))
}

/// Wrap a machine state for sharing.
#[inline]
pub fn shared_machine_state(state: MachineState) -> SharedMachineState {
    thread_safe_rw(state)
}
