//! Lock helpers shared by the request and context types.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `m`, ignoring poison. A layer that panicked while holding a guard
/// leaves the slot in whatever state it wrote last, which is still readable.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
