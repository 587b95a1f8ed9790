use core::fmt;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use ripplet_core::Unsubscribe;

/// Failure emitted by a signal instead of a value.
///
/// Derived signals built with [`Signal::try_map`] report extractor failures
/// this way; bindings ignore failure emissions by policy.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct SignalError {
    message: String,
}

impl SignalError {
    /// Creates a failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// What a signal delivers on each emission.
pub type Emission<T> = Result<T, SignalError>;

type Listener<T> = Rc<dyn Fn(Emission<T>)>;

/// A read-only observable value.
///
/// Subscribing delivers the current value immediately, then every
/// subsequent emission. Derived signals composed with [`map`](Signal::map)
/// and [`try_map`](Signal::try_map) share the source's subscription
/// machinery; they hold no state of their own.
pub struct Signal<T> {
    current: Rc<dyn Fn() -> Emission<T>>,
    subscribe: Rc<dyn Fn(Listener<T>) -> Unsubscribe>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
            subscribe: self.subscribe.clone(),
        }
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Signal")
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// A signal that always holds `value` and never emits again after the
    /// immediate on-subscribe delivery.
    pub fn constant(value: T) -> Self {
        let current = value.clone();
        Self {
            current: Rc::new(move || Ok(current.clone())),
            subscribe: Rc::new(move |listener: Listener<T>| {
                listener(Ok(value.clone()));
                Unsubscribe::noop()
            }),
        }
    }

    /// The current value, or the current failure for a failed derivation.
    pub fn get(&self) -> Emission<T> {
        (self.current)()
    }

    /// Subscribes `listener`; it is invoked synchronously with the current
    /// value, then on every emission until the returned [`Unsubscribe`]
    /// runs.
    pub fn subscribe(&self, listener: impl Fn(Emission<T>) + 'static) -> Unsubscribe {
        (self.subscribe)(Rc::new(listener))
    }

    /// Derives a signal by applying `f` to every value.
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(T) -> U + 'static) -> Signal<U> {
        self.try_map(move |value| Ok(f(value)))
    }

    /// Derives a signal through a fallible extractor. Extraction failures
    /// become failure emissions on the derived signal.
    pub fn try_map<U: Clone + 'static>(
        &self,
        f: impl Fn(T) -> Emission<U> + 'static,
    ) -> Signal<U> {
        let f = Rc::new(f);
        let current = {
            let source = self.current.clone();
            let f = f.clone();
            Rc::new(move || source().and_then(|value| f(value)))
        };
        let subscribe = {
            let source = self.subscribe.clone();
            Rc::new(move |listener: Listener<U>| {
                let f = f.clone();
                source(Rc::new(move |emission: Emission<T>| {
                    listener(emission.and_then(|value| f(value)));
                }))
            })
        };
        Signal { current, subscribe }
    }
}

/// A mutable observable value: the write side of a [`Signal`].
///
/// Reentrant [`set`](MutableSignal::set) calls made from inside a listener
/// are queued and delivered after the current notification pass completes,
/// so emissions are serialized and a listener never observes itself being
/// re-entered.
pub struct MutableSignal<T> {
    inner: Rc<MutableInner<T>>,
}

struct MutableInner<T> {
    value: RefCell<T>,
    listeners: RefCell<Vec<(u64, Listener<T>)>>,
    next_listener: Cell<u64>,
    notifying: Cell<bool>,
    pending: RefCell<VecDeque<T>>,
}

impl<T> Clone for MutableSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for MutableSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableSignal")
            .field("value", &self.inner.value.borrow())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

impl<T: Clone + 'static> MutableSignal<T> {
    /// Creates a signal holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(MutableInner {
                value: RefCell::new(value),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
                notifying: Cell::new(false),
                pending: RefCell::new(VecDeque::new()),
            }),
        }
    }

    /// The current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Stores a new value and notifies every listener.
    ///
    /// A `set` issued while notification is in progress updates the stored
    /// value immediately but defers its emission until the in-flight pass
    /// finishes.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value.clone();
        if self.inner.notifying.get() {
            self.inner.pending.borrow_mut().push_back(value);
            return;
        }
        self.inner.notifying.set(true);
        self.notify(value);
        loop {
            let next = self.inner.pending.borrow_mut().pop_front();
            match next {
                Some(value) => self.notify(value),
                None => break,
            }
        }
        self.inner.notifying.set(false);
    }

    fn notify(&self, value: T) {
        let listeners: Vec<_> = self.inner.listeners.borrow().clone();
        for (_, listener) in listeners {
            listener(Ok(value.clone()));
        }
    }

    /// Subscribes `listener`; delivered the current value immediately, then
    /// every change.
    pub fn subscribe(&self, listener: impl Fn(Emission<T>) + 'static) -> Unsubscribe {
        let listener: Listener<T> = Rc::new(listener);
        listener(Ok(self.get()));
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, listener));
        let inner = Rc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.listeners.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }

    /// A read-only view of this signal.
    #[must_use]
    pub fn signal(&self) -> Signal<T> {
        let read = self.inner.clone();
        let this = self.clone();
        Signal {
            current: Rc::new(move || Ok(read.value.borrow().clone())),
            subscribe: Rc::new(move |listener: Listener<T>| {
                this.subscribe(move |emission| listener(emission))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<T: Clone + 'static>(signal: &Signal<T>) -> (Rc<RefCell<Vec<T>>>, Unsubscribe) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let sub = signal.subscribe(move |emission| {
            if let Ok(value) = emission {
                sink.borrow_mut().push(value);
            }
        });
        (seen, sub)
    }

    #[test]
    fn subscribe_delivers_current_then_changes() {
        let state = MutableSignal::new(1);
        let (seen, _sub) = collect(&state.signal());

        state.set(2);
        state.set(3);
        assert_eq!(*seen.borrow(), [1, 2, 3]);
        assert_eq!(state.get(), 3);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let state = MutableSignal::new(0);
        let (seen, sub) = collect(&state.signal());

        sub.run();
        sub.run();
        state.set(1);
        assert_eq!(*seen.borrow(), [0]);
    }

    #[test]
    fn map_transforms_every_emission() {
        let state = MutableSignal::new(2);
        let doubled = state.signal().map(|v| v * 2);
        let (seen, _sub) = collect(&doubled);

        state.set(5);
        assert_eq!(*seen.borrow(), [4, 10]);
        assert_eq!(doubled.get().unwrap(), 10);
    }

    #[test]
    fn try_map_failures_surface_as_failure_emissions() {
        let state = MutableSignal::new(4);
        let derived = state
            .signal()
            .try_map(|v| {
                if v % 2 == 0 {
                    Ok(v / 2)
                } else {
                    Err(SignalError::new("odd"))
                }
            });

        let successes = Rc::new(RefCell::new(Vec::new()));
        let failures = Rc::new(Cell::new(0u32));
        let ok_sink = successes.clone();
        let err_sink = failures.clone();
        let _sub = derived.subscribe(move |emission| match emission {
            Ok(value) => ok_sink.borrow_mut().push(value),
            Err(_) => err_sink.set(err_sink.get() + 1),
        });

        state.set(3);
        state.set(8);
        assert_eq!(*successes.borrow(), [2, 4]);
        assert_eq!(failures.get(), 1);
        assert!(derived.get().is_ok());
    }

    #[test]
    fn reentrant_set_is_serialized() {
        let state = MutableSignal::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));

        let reentrant = state.clone();
        let log = order.clone();
        let _sub = state.subscribe(move |emission| {
            let Ok(value) = emission else { return };
            log.borrow_mut().push(value);
            if value == 1 {
                // Must not nest inside the current notification pass.
                reentrant.set(2);
            }
        });

        state.set(1);
        assert_eq!(*order.borrow(), [0, 1, 2]);
        assert_eq!(state.get(), 2);
    }

    #[test]
    fn constant_emits_once() {
        let signal = Signal::constant(7);
        let (seen, _sub) = collect(&signal);
        assert_eq!(*seen.borrow(), [7]);
        assert_eq!(signal.get().unwrap(), 7);
    }
}
