//! Static execution zones (spec.md §5, "Static zones"): per-zone singleton
//! values keyed by a caller-chosen zone identifier, one active zone per
//! thread at a time, with disposal hooks run when a zone is torn down.

use std::any::{Any, TypeId};
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::ids::ZoneId;

thread_local! {
    static CURRENT_ZONE: Cell<Option<ZoneId>> = const { Cell::new(None) };
}

/// Restores the previously active zone on drop, including across a panic
/// unwind, so a zone never leaks past the callback that entered it.
struct ZoneGuard {
    previous: Option<ZoneId>,
}

impl Drop for ZoneGuard {
    fn drop(&mut self) {
        CURRENT_ZONE.with(|c| c.set(self.previous));
    }
}

/// Enters `id` for the duration of `f`, restoring the prior zone (or none)
/// on return or unwind.
pub fn enter<R>(id: ZoneId, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT_ZONE.with(|c| c.replace(Some(id)));
    let _guard = ZoneGuard { previous };
    f()
}

/// The zone active on the calling thread, if any.
pub fn current() -> Option<ZoneId> {
    CURRENT_ZONE.with(|c| c.get())
}

/// Holds per-zone singleton values and disposal finalizers. One instance is
/// typically shared per application domain.
#[derive(Default)]
pub struct ZoneRegistry {
    singletons: Mutex<HashMap<(ZoneId, TypeId), Arc<dyn Any + Send + Sync>>>,
    finalizers: Mutex<HashMap<ZoneId, Vec<Box<dyn FnOnce() + Send>>>>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the zone-scoped singleton of type `T`, constructing it with
    /// `f` on first access within this zone.
    pub fn get_or_insert_with<T: Any + Send + Sync>(
        &self,
        zone: ZoneId,
        f: impl FnOnce() -> T,
    ) -> Arc<T> {
        let key = (zone, TypeId::of::<T>());
        let mut map = self.singletons.lock().expect("zone registry poisoned");
        if let Some(existing) = map.get(&key) {
            return existing
                .clone()
                .downcast::<T>()
                .expect("zone singleton type mismatch");
        }
        let value: Arc<dyn Any + Send + Sync> = Arc::new(f());
        map.insert(key, value.clone());
        value.downcast::<T>().expect("zone singleton type mismatch")
    }

    /// Registers a finalizer fired when `zone` is disposed via
    /// [`ZoneRegistry::dispose`].
    pub fn on_dispose(&self, zone: ZoneId, hook: impl FnOnce() + Send + 'static) {
        self.finalizers
            .lock()
            .expect("zone registry poisoned")
            .entry(zone)
            .or_default()
            .push(Box::new(hook));
    }

    /// Tears down a zone: fires its finalizers (in registration order) then
    /// drops every singleton created within it.
    pub fn dispose(&self, zone: ZoneId) {
        let hooks = self
            .finalizers
            .lock()
            .expect("zone registry poisoned")
            .remove(&zone);
        if let Some(hooks) = hooks {
            for hook in hooks {
                hook();
            }
        }
        self.singletons
            .lock()
            .expect("zone registry poisoned")
            .retain(|(z, _), _| *z != zone);
    }
}
