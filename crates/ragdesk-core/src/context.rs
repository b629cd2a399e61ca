//! Request-scoped context variables that survive thread recycling.
//!
//! Worker pools (the Tokio blocking pool, pre-spawned server threads) reuse
//! the same OS thread for many unrelated requests and never clear its
//! thread-local storage in between. A plain thread-local "current request id"
//! would therefore leak from one request into the next one that happens to
//! land on the same thread.
//!
//! [`RecyclableContextVar`] makes staleness explicit instead of relying on
//! teardown. Each thread carries a recycle counter that the request lifecycle
//! hook advances with [`bump`] once per request. Every variable records the
//! counter value under which it last received a legitimate write; once the
//! counter moves past that record, the stored value reads as absent even
//! though the raw slot still holds it.
//!
//! # Lifecycle
//!
//! ```text
//!   request A on thread T           request B on thread T
//!   ─────────────────────           ─────────────────────
//!   bump()        recycles=0        bump()        recycles=1
//!   set("a")      updates=1         get()  ──▶    Err(LookupError)
//!   get() ──▶ "a"                   set("b")      updates=2
//!                                   get() ──▶ "b"
//! ```
//!
//! # Example
//!
//! ```rust
//! use ragdesk_core::context::{self, RecyclableContextVar};
//!
//! let request_id: RecyclableContextVar<String> = RecyclableContextVar::named("request_id");
//!
//! context::bump();
//! request_id.set("req-42".to_string());
//! assert_eq!(request_id.get().unwrap(), "req-42");
//!
//! // Next request on the same thread.
//! context::bump();
//! assert!(request_id.get().is_err());
//! assert_eq!(request_id.get_or(String::new()), "");
//! ```
//!
//! # Discipline
//!
//! [`bump`] must run exactly once per logical request, before any variable is
//! read or written for that request, on every code path. All state is private
//! to the calling thread: nothing here locks, blocks, or synchronizes across
//! threads.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

thread_local! {
    /// Per-thread recycle counter. `None` until first touched.
    static THREAD_RECYCLES: Cell<Option<u64>> = const { Cell::new(None) };

    /// Backing storage for every [`ContextSlot`] on this thread.
    static SLOTS: RefCell<HashMap<SlotKey, Box<dyn Any>>> = RefCell::new(HashMap::new());
}

/// Advance the calling thread's recycle counter.
///
/// On a thread whose counter has never been touched this initializes it to
/// `0` without incrementing; afterwards each call adds one. There is no reset.
pub fn bump() {
    THREAD_RECYCLES.with(|counter| {
        let next = match counter.get() {
            Some(n) => n.saturating_add(1),
            None => 0,
        };
        counter.set(Some(next));
    });
}

/// Current value of the calling thread's recycle counter.
///
/// The counter is created lazily at `0` on first access, so a variable
/// written before the first [`bump`] on a fresh thread is still invalidated
/// by that first bump.
pub fn thread_recycles() -> u64 {
    THREAD_RECYCLES.with(|counter| {
        let n = counter.get().unwrap_or(0);
        counter.set(Some(n));
        n
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Raw slots
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SlotKey(u64);

impl SlotKey {
    fn next() -> Self {
        static NEXT_KEY: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// A named, thread-local storage location holding at most one `T`.
///
/// The slot itself is a process-wide handle; the value behind it is private
/// to each thread. Nothing clears a slot when its thread is reused, which is
/// exactly the hazard [`RecyclableContextVar`] guards against.
pub struct ContextSlot<T> {
    key: SlotKey,
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Clone + 'static> ContextSlot<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: SlotKey::next(),
            name: name.into(),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The calling thread's value, if one was ever stored.
    pub fn get(&self) -> Option<T> {
        SLOTS.with(|slots| {
            slots
                .borrow()
                .get(&self.key)
                .and_then(|value| value.downcast_ref::<T>())
                .cloned()
        })
    }

    /// Store `value` for the calling thread, replacing any previous value.
    pub fn set(&self, value: T) {
        // Drop the replaced value outside the borrow.
        let _previous = SLOTS.with(|slots| slots.borrow_mut().insert(self.key, Box::new(value)));
    }
}

impl<T> fmt::Debug for ContextSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextSlot")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Recyclable wrapper
// ═══════════════════════════════════════════════════════════════════════

/// Raised by [`RecyclableContextVar::get`] when the variable holds no value
/// that is valid for the current request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("context variable '{name}' has no value for the current request")]
pub struct LookupError {
    name: String,
}

impl LookupError {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// Name of the variable that was read.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A thread-local value that expires when its thread is recycled.
///
/// Wraps a payload [`ContextSlot`] and an update counter slot named
/// `<name>_updates`. A value written with [`set`](Self::set) stays visible
/// until the next [`bump`] on the same thread that is not followed by
/// another write.
///
/// Construct once at startup (typically in a `LazyLock` static) and share
/// freely: the handle is `Send + Sync`, the values are per thread.
pub struct RecyclableContextVar<T> {
    value: ContextSlot<T>,
    updates: ContextSlot<u64>,
}

impl<T: Clone + 'static> RecyclableContextVar<T> {
    /// Wrap an existing payload slot.
    pub fn new(value: ContextSlot<T>) -> Self {
        let updates = ContextSlot::new(format!("{}_updates", value.name()));
        Self { value, updates }
    }

    /// Create the payload slot and wrap it.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(ContextSlot::new(name))
    }

    pub fn name(&self) -> &str {
        self.value.name()
    }

    /// Catch the update counter up with the recycle counter.
    ///
    /// Returns the recycle counter and the update counter as read *before*
    /// catching up. The payload slot is left untouched.
    fn synchronize(&self) -> (u64, u64) {
        let recycles = thread_recycles();
        let updates = self.updates.get().unwrap_or(0);
        if recycles > updates {
            self.updates.set(recycles);
        }
        (recycles, updates)
    }

    /// The value written during the current request.
    ///
    /// Fails with [`LookupError`] when nothing was written since the thread
    /// was last recycled. Reading never invalidates a value a later read
    /// would return.
    pub fn get(&self) -> Result<T, LookupError> {
        let (recycles, updates) = self.synchronize();
        if recycles < updates {
            self.value.get().ok_or_else(|| LookupError::new(self.name()))
        } else {
            Err(LookupError::new(self.name()))
        }
    }

    /// Like [`get`](Self::get), returning `default` when stale.
    pub fn get_or(&self, default: T) -> T {
        self.get().unwrap_or(default)
    }

    /// Like [`get`](Self::get), computing a fallback when stale.
    pub fn get_or_else(&self, fallback: impl FnOnce() -> T) -> T {
        self.get().unwrap_or_else(|_| fallback())
    }

    /// Store `value` for the remainder of the current request.
    pub fn set(&self, value: T) {
        self.synchronize();
        let recycles = thread_recycles();
        let updates = self.updates.get().unwrap_or(0);
        if updates == recycles {
            self.updates.set(updates + 1);
        }
        self.value.set(value);
    }
}

impl<T> fmt::Debug for RecyclableContextVar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecyclableContextVar")
            .field("name", &self.value.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    /// Run `f` on a brand-new thread, i.e. an untouched execution context.
    fn in_fresh_context<R: Send + 'static>(f: impl FnOnce() -> R + Send + 'static) -> R {
        thread::spawn(f).join().unwrap()
    }

    #[test]
    fn first_bump_initializes_to_zero() {
        in_fresh_context(|| {
            bump();
            assert_eq!(thread_recycles(), 0);
            bump();
            assert_eq!(thread_recycles(), 1);
            bump();
            assert_eq!(thread_recycles(), 2);
        });
    }

    #[test]
    fn unset_counter_reads_as_zero() {
        in_fresh_context(|| {
            assert_eq!(thread_recycles(), 0);
        });
    }

    #[test]
    fn same_request_visibility() {
        in_fresh_context(|| {
            let var = RecyclableContextVar::named("request_id");
            bump();
            var.set("v".to_string());
            assert_eq!(var.get().unwrap(), "v");
        });
    }

    #[test]
    fn no_cross_request_leakage() {
        in_fresh_context(|| {
            let var = RecyclableContextVar::named("request_id");
            bump();
            var.set("v1".to_string());
            bump();
            let err = var.get().unwrap_err();
            assert_eq!(err.name(), "request_id");
            assert_eq!(var.get_or("fallback".to_string()), "fallback");
        });
    }

    #[test]
    fn write_without_bump_on_fresh_context() {
        in_fresh_context(|| {
            let var = RecyclableContextVar::named("request_id");
            var.set("v".to_string());
            assert_eq!(var.get().unwrap(), "v");
        });
    }

    #[test]
    fn repeated_reads_agree() {
        in_fresh_context(|| {
            let var = RecyclableContextVar::named("n");
            bump();
            var.set(7u32);
            for _ in 0..5 {
                assert_eq!(var.get(), Ok(7));
            }

            bump();
            for _ in 0..5 {
                assert!(var.get().is_err());
            }
        });
    }

    #[test]
    fn stale_after_many_recycles() {
        in_fresh_context(|| {
            let var = RecyclableContextVar::named("n");
            var.set(1u32);
            bump();
            bump();
            bump();
            assert!(var.get().is_err());
        });
    }

    #[test]
    fn default_on_never_written() {
        in_fresh_context(|| {
            let var: RecyclableContextVar<String> = RecyclableContextVar::named("n");
            assert_eq!(var.get_or("d".to_string()), "d");
            assert_eq!(var.get_or_else(|| "lazy".to_string()), "lazy");
        });
    }

    #[test]
    fn walkthrough_from_fresh_context() {
        in_fresh_context(|| {
            let var = RecyclableContextVar::named("request_id");
            var.set("req-42".to_string());
            assert_eq!(var.updates.get(), Some(1));
            assert_eq!(thread_recycles(), 0);

            assert_eq!(var.get().unwrap(), "req-42");

            bump();
            assert_eq!(thread_recycles(), 1);
            assert!(var.get().is_err());
        });
    }

    #[test]
    fn rewrite_after_recycle_is_visible() {
        in_fresh_context(|| {
            let var = RecyclableContextVar::named("request_id");
            bump();
            var.set("a".to_string());
            bump();
            assert!(var.get().is_err());
            var.set("b".to_string());
            assert_eq!(var.get().unwrap(), "b");
            var.set("c".to_string());
            assert_eq!(var.get().unwrap(), "c");
        });
    }

    #[test]
    fn raw_slot_keeps_stale_bytes() {
        in_fresh_context(|| {
            let var = RecyclableContextVar::named("request_id");
            bump();
            var.set("old".to_string());
            bump();
            assert!(var.get().is_err());
            // The physical slot is never cleared; only the wrapper hides it.
            assert_eq!(var.value.get().as_deref(), Some("old"));
        });
    }

    #[test]
    fn variables_are_independent() {
        in_fresh_context(|| {
            let a = RecyclableContextVar::named("a");
            let b = RecyclableContextVar::named("b");
            bump();
            a.set(1u8);
            assert_eq!(a.get(), Ok(1));
            assert!(b.get().is_err());

            bump();
            b.set(2u8);
            assert!(a.get().is_err());
            assert_eq!(b.get(), Ok(2));
        });
    }

    #[test]
    fn threads_are_isolated() {
        let var = std::sync::Arc::new(RecyclableContextVar::named("request_id"));
        bump();
        var.set("main".to_string());

        let other = var.clone();
        let seen = thread::spawn(move || {
            bump();
            let before = other.get().ok();
            other.set("worker".to_string());
            (before, other.get().ok())
        })
        .join()
        .unwrap();

        assert_eq!(seen, (None, Some("worker".to_string())));
        assert_eq!(var.get().unwrap(), "main");
    }

    #[test]
    fn recycled_worker_never_sees_previous_request() {
        // One long-lived worker thread serving a queue of unrelated requests.
        let (tx, rx) = mpsc::channel::<Option<&'static str>>();
        let (out_tx, out_rx) = mpsc::channel::<Option<String>>();

        let worker = thread::spawn(move || {
            let var: RecyclableContextVar<String> = RecyclableContextVar::named("request_id");
            for job in rx {
                bump();
                let seen_on_entry = var.get().ok();
                out_tx.send(seen_on_entry).unwrap();
                if let Some(id) = job {
                    var.set(id.to_string());
                }
            }
        });

        for job in [Some("r1"), None, Some("r3"), Some("r4"), None] {
            tx.send(job).unwrap();
        }
        drop(tx);
        worker.join().unwrap();

        let seen: Vec<Option<String>> = out_rx.iter().collect();
        assert_eq!(seen, vec![None; 5]);
    }

    #[test]
    fn debug_shows_name() {
        let var: RecyclableContextVar<u8> = RecyclableContextVar::named("tenant");
        assert!(format!("{:?}", var).contains("tenant"));
    }
}
