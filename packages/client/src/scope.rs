//! Hook slots for binding cells to a long-lived component.
//!
//! A component calls [`Scope::begin_render`] at the top of every render and
//! then requests its cells in a fixed order; the n-th request of each render
//! receives the value created by the n-th request of the first render.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
pub struct Scope {
    slots: Mutex<Vec<Box<dyn Any + Send + Sync>>>,
    cursor: AtomicUsize,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("Scope").field("slots", &slots).finish()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind the slot cursor.
    pub fn begin_render(&self) {
        self.cursor.store(0, Ordering::Relaxed);
    }

    /// The value in the next slot, created with `init` the first time that
    /// slot is reached (or when the slot holds a value of another type).
    pub fn memo<T, F>(&self, init: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slots.get(index).and_then(|slot| slot.downcast_ref::<T>()) {
            return existing.clone();
        }
        let value = init();
        let boxed: Box<dyn Any + Send + Sync> = Box::new(value.clone());
        if index < slots.len() {
            slots[index] = boxed;
        } else {
            slots.push(boxed);
        }
        value
    }

    /// Drop every slot; the next render starts from scratch.
    pub fn unmount(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.begin_render();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn slots_survive_rerender() {
        let scope = Scope::new();
        let a = scope.memo(|| Arc::new(1));
        let b = scope.memo(|| Arc::new("b"));

        scope.begin_render();
        let a2 = scope.memo(|| Arc::new(2));
        let b2 = scope.memo(|| Arc::new("other"));
        assert!(Arc::ptr_eq(&a, &a2));
        assert!(Arc::ptr_eq(&b, &b2));
    }

    #[test]
    fn unmount_clears() {
        let scope = Scope::new();
        let a = scope.memo(|| Arc::new(1));
        scope.unmount();
        let a2 = scope.memo(|| Arc::new(1));
        assert!(!Arc::ptr_eq(&a, &a2));
    }
}
