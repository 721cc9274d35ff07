//! One-shot per-class initializer (spec.md §5, "Lazy per-class
//! initialization"). Concurrent first-access observers serialize on a
//! per-class lock; exactly one initializer runs; further accesses observe
//! the completed state. An initializer that calls back into the value under
//! construction follows one of three policies fixed at construction time.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

thread_local! {
    static ACTIVE: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// What happens when an initializer observes its own value under
/// construction (spec.md §5: "either (a) throws, (b) observes a default
/// value, or (c) recurses").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReentrancyPolicy {
    Throw,
    Default,
    Recurse,
}

#[derive(Debug, thiserror::Error)]
#[error("class initializer re-entered under the Throw policy")]
pub struct ReentrantInit;

enum State<T> {
    NotStarted,
    InProgress,
    Done(Arc<T>),
}

/// A one-shot, reentrancy-aware lazy value. One instance per class in the
/// domain-global symbol table.
pub struct LazyClassInit<T> {
    id: usize,
    policy: ReentrancyPolicy,
    default_value: Option<Arc<T>>,
    state: Mutex<State<T>>,
    cond: Condvar,
}

impl<T> LazyClassInit<T> {
    pub fn new(policy: ReentrancyPolicy) -> Self {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(1);
        LazyClassInit {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            policy,
            default_value: None,
            state: Mutex::new(State::NotStarted),
            cond: Condvar::new(),
        }
    }

    /// Required when `policy == Default`; the value observed by a reentrant
    /// accessor.
    pub fn with_default(policy: ReentrancyPolicy, default_value: T) -> Self {
        let mut s = Self::new(policy);
        s.default_value = Some(Arc::new(default_value));
        s
    }

    /// Returns the completed value, running `init` exactly once across all
    /// threads unless this call is itself a reentrant call from within
    /// `init` on the same thread.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> Result<Arc<T>, ReentrantInit> {
        let reentrant = ACTIVE.with(|set| set.borrow().contains(&self.id));
        if reentrant {
            return match self.policy {
                ReentrancyPolicy::Throw => Err(ReentrantInit),
                ReentrancyPolicy::Default => {
                    Ok(self.default_value.clone().expect(
                        "LazyClassInit constructed with Default policy but no default_value",
                    ))
                }
                ReentrancyPolicy::Recurse => Ok(Arc::new(init())),
            };
        }

        let mut guard = self.state.lock().expect("lazy class init lock poisoned");
        loop {
            match &*guard {
                State::Done(v) => return Ok(v.clone()),
                State::InProgress => {
                    guard = self.cond.wait(guard).expect("lazy class init lock poisoned");
                }
                State::NotStarted => {
                    *guard = State::InProgress;
                    drop(guard);
                    ACTIVE.with(|set| set.borrow_mut().insert(self.id));
                    let value = Arc::new(init());
                    ACTIVE.with(|set| set.borrow_mut().remove(&self.id));
                    let mut guard2 = self.state.lock().expect("lazy class init lock poisoned");
                    *guard2 = State::Done(value.clone());
                    self.cond.notify_all();
                    return Ok(value);
                }
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(
            &*self.state.lock().expect("lazy class init lock poisoned"),
            State::Done(_)
        )
    }
}
