use core::fmt;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};

static EVENT_ID: AtomicUsize = AtomicUsize::new(0);

/// One-shot signal that any number of clones can await.
///
/// Once `set`, every clone resolves immediately, now and in the future. Each
/// clone registers its own waker, and drops it when the clone goes away, so a
/// `select!` that abandons an `Event` leaves nothing behind.
pub struct Event {
    state: Arc<Mutex<State>>,
    waker_id: usize,
}

struct State {
    value: bool,
    wakers: HashMap<usize, Waker>,
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("value", &self.value)
            .field("wakers", &self.wakers.len())
            .finish()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("waker_id", &self.waker_id)
            .field("state", &*self.lock())
            .finish()
    }
}

impl Default for Event {
    fn default() -> Self {
        Event::new()
    }
}

impl Event {
    pub fn new() -> Self {
        Event {
            waker_id: EVENT_ID.fetch_add(1, Ordering::SeqCst),
            state: Arc::new(Mutex::new(State {
                value: false,
                wakers: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Wakers never panic while the lock is held
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set(&self) {
        let mut state = self.lock();
        state.value = true;

        // Wakers are single use, drop them as they are woken
        for (_, waker) in state.wakers.drain() {
            waker.wake();
        }
    }

    pub fn is_set(&self) -> bool {
        self.lock().value
    }
}

impl Clone for Event {
    fn clone(&self) -> Self {
        Event {
            waker_id: EVENT_ID.fetch_add(1, Ordering::SeqCst),
            state: self.state.clone(),
        }
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        let waker_id = self.waker_id;
        self.lock().wakers.remove(&waker_id);
    }
}

impl Future for Event {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let waker_id = self.waker_id;
        let mut state = self.lock();
        if state.value {
            Poll::Ready(true)
        } else {
            state.wakers.insert(waker_id, cx.waker().clone());
            Poll::Pending
        }
    }
}
