//! Serialization of observer callbacks.
//!
//! Every callback of a socket runs while its [`Gate`] is held, so callbacks
//! never overlap and `stop` can wait for the one in flight. A thread that is
//! already inside a callback, of any socket, never waits on another socket's
//! gate: its `stop` is handed over to the thread holding that gate, which
//! delivers the notification when it leaves. Two callbacks stopping each
//! other's socket can therefore not deadlock.

use std::cell::Cell;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

thread_local! {
    // Gates owned by this thread, over all sockets
    static HELD: Cell<usize> = const { Cell::new(0) };
}

#[derive(Debug, Default)]
struct State {
    owner: Option<ThreadId>,
    pending_stop: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Gate {
    state: Mutex<State>,
    released: Condvar,
}

/// Outcome of entering a gate.
#[derive(Debug)]
pub(crate) enum Entry<'a> {
    /// This thread now holds the gate
    Owned(Guard<'a>),
    /// This thread was already holding it, a callback calling back in
    Reentrant,
    /// Another thread holds it and will deliver the stop notification
    Deferred,
}

/// Ownership of a [`Gate`]. Dropping it releases the gate and forgets any
/// pending stop; use [`Guard::release`] on the normal path.
#[derive(Debug)]
pub(crate) struct Guard<'a> {
    gate: &'a Gate,
}

fn in_callback() -> bool {
    HELD.with(|held| held.get() > 0)
}

impl Gate {
    pub fn new() -> Self {
        Gate::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Hold the gate, waiting for the current owner if there is one.
    pub fn enter(&self) -> Entry<'_> {
        self.acquire(None)
    }

    /// Like [`Gate::enter`], but never waits when this thread already holds
    /// some gate. In that case `Deferred` is returned and, if `notify` is
    /// set, the owner is asked to deliver the stop notification on release.
    pub fn enter_or_defer(&self, notify: bool) -> Entry<'_> {
        self.acquire(Some(notify))
    }

    fn acquire(&self, defer: Option<bool>) -> Entry<'_> {
        let me = thread::current().id();
        let mut state = self.lock();
        loop {
            match state.owner {
                Some(owner) if owner == me => return Entry::Reentrant,
                Some(_) => {
                    if let Some(notify) = defer {
                        if in_callback() {
                            state.pending_stop |= notify;
                            return Entry::Deferred;
                        }
                    }
                    state = self
                        .released
                        .wait(state)
                        .unwrap_or_else(|e| e.into_inner());
                }
                None => {
                    state.owner = Some(me);
                    HELD.with(|held| held.set(held.get() + 1));
                    return Entry::Owned(Guard { gate: self });
                }
            }
        }
    }
}

impl<'a> Guard<'a> {
    /// Release the gate, unless a deferred stop is waiting. Then the guard is
    /// handed back: deliver the notification and release again.
    pub fn release(self) -> Result<(), Guard<'a>> {
        {
            let mut state = self.gate.lock();
            if state.pending_stop {
                state.pending_stop = false;
                return Err(self);
            }
            state.owner = None;
        }
        self.gate.released.notify_all();
        HELD.with(|held| held.set(held.get() - 1));
        std::mem::forget(self);
        Ok(())
    }
}

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        {
            let mut state = self.gate.lock();
            state.owner = None;
            state.pending_stop = false;
        }
        self.gate.released.notify_all();
        HELD.with(|held| held.set(held.get() - 1));
    }
}
