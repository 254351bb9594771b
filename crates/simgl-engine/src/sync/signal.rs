use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use log::debug;

use crate::error::{RenderError, Result};

type Subscriber<T> = Box<dyn FnOnce(&T) + Send>;

enum State<T> {
    Pending { subscribers: Vec<Subscriber<T>>, wakers: Vec<Waker> },
    Fired(T),
}

impl<T> State<T> {
    fn pending() -> Self {
        Self::Pending { subscribers: Vec::new(), wakers: Vec::new() }
    }
}

/// One-shot notification carrying a payload.
///
/// Fires at most once per [`reset`](Signal::reset). Subscribers registered
/// after firing are never called; [`wait`](Signal::wait) still resolves.
pub struct Signal<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state) }
    }
}

impl<T: Clone + Send + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Signal<T> {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(State::pending())) }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fires the signal. Subscribers run on the calling thread, outside the
    /// lock.
    pub fn activate(&self, payload: T) -> Result<()> {
        let (subscribers, wakers) = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, State::Fired(payload.clone())) {
                State::Pending { subscribers, wakers } => (subscribers, wakers),
                fired @ State::Fired(_) => {
                    *state = fired;
                    return Err(RenderError::SignalAlreadyActivated);
                }
            }
        };

        debug!("signal fired: {} subscriber(s), {} waiter(s)", subscribers.len(), wakers.len());
        for subscriber in subscribers {
            subscriber(&payload);
        }
        for waker in wakers {
            waker.wake();
        }
        Ok(())
    }

    /// Registers `f` for the next activation. Ignored if already fired.
    pub fn subscribe(&self, f: impl FnOnce(&T) + Send + 'static) {
        match &mut *self.lock() {
            State::Pending { subscribers, .. } => subscribers.push(Box::new(f)),
            State::Fired(_) => debug!("subscriber added after activation; not called"),
        }
    }

    pub fn is_activated(&self) -> bool {
        matches!(*self.lock(), State::Fired(_))
    }

    /// Resolves to the payload once fired.
    pub fn wait(&self) -> SignalFuture<T> {
        SignalFuture { state: Arc::clone(&self.state) }
    }

    /// Returns to the pending state, dropping queued subscribers. Pending
    /// waiters stay registered and resolve on the next activation.
    pub fn reset(&self) {
        let mut state = self.lock();
        let wakers = match &mut *state {
            State::Pending { wakers, .. } => std::mem::take(wakers),
            State::Fired(_) => Vec::new(),
        };
        *state = State::Pending { subscribers: Vec::new(), wakers };
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fired = self
            .state
            .lock()
            .map(|s| matches!(*s, State::Fired(_)))
            .unwrap_or(false);
        f.debug_struct("Signal").field("fired", &fired).finish()
    }
}

/// Future returned by [`Signal::wait`].
pub struct SignalFuture<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T: Clone> Future for SignalFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *state {
            State::Fired(payload) => Poll::Ready(payload.clone()),
            State::Pending { wakers, .. } => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn subscribers_receive_payload_once() {
        let signal = Signal::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        signal.subscribe(move |v: &u32| {
            h.fetch_add(*v as usize, Ordering::SeqCst);
        });

        signal.activate(5).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn second_activation_is_rejected() {
        let signal = Signal::new();
        signal.activate(1).unwrap();
        assert_eq!(signal.activate(2), Err(RenderError::SignalAlreadyActivated));
        assert_eq!(pollster::block_on(signal.wait()), 1);
    }

    #[test]
    fn late_subscriber_is_not_called() {
        let signal = Signal::new();
        signal.activate(()).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        signal.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn wait_resolves_from_another_thread() {
        let signal = Signal::new();
        let remote = signal.clone();
        let handle = thread::spawn(move || remote.activate((640u32, 480u32)));

        assert_eq!(pollster::block_on(signal.wait()), (640, 480));
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn waiter_blocked_across_reset_sees_next_activation() {
        let signal = Signal::new();
        let remote = signal.clone();
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let waiter = thread::spawn(move || {
            let fut = remote.wait();
            started_tx.send(()).unwrap();
            pollster::block_on(fut)
        });
        started_rx.recv().unwrap();
        // give the waiter time to park on the pending state
        thread::sleep(std::time::Duration::from_millis(50));

        signal.reset();
        signal.activate(7u32).unwrap();
        assert_eq!(waiter.join().unwrap(), 7);
    }

    #[test]
    fn reset_allows_firing_again() {
        let signal = Signal::new();
        signal.activate(1).unwrap();
        signal.reset();
        assert!(!signal.is_activated());
        signal.activate(2).unwrap();
        assert_eq!(pollster::block_on(signal.wait()), 2);
    }
}
