use core::fmt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::{Element, Unsubscribe};

/// A form-like component holding one scalar value.
///
/// `Input` pairs an [`Element`] with an owned value and change listeners.
/// [`set_value`](Input::set_value) is inequality-guarded: writing the value
/// already held notifies nobody, which is what keeps bidirectional bindings
/// from looping (guard, not lock — the tree is single-threaded).
#[derive(Clone)]
pub struct Input<T> {
    inner: Rc<InputInner<T>>,
}

struct InputInner<T> {
    element: Element,
    value: RefCell<T>,
    listeners: RefCell<Vec<(u64, Rc<dyn Fn(T)>)>>,
    next_listener: Cell<u64>,
}

impl<T: Clone + PartialEq + 'static> Input<T> {
    /// Creates an input holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(InputInner {
                element: Element::panel(),
                value: RefCell::new(value),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    /// The element this input occupies in the component tree.
    #[must_use]
    pub fn element(&self) -> &Element {
        &self.inner.element
    }

    /// The currently displayed value.
    #[must_use]
    pub fn value(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Writes a new value, notifying change listeners only when it differs
    /// from the current one.
    pub fn set_value(&self, value: T) {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value.clone();
        }
        let listeners: Vec<_> = self.inner.listeners.borrow().clone();
        for (_, listener) in listeners {
            listener(value.clone());
        }
    }

    /// Subscribes to value changes. The listener is not invoked with the
    /// current value; only subsequent changes are delivered.
    pub fn on_change(&self, listener: impl Fn(T) + 'static) -> Unsubscribe {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        let inner = Rc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.listeners.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }
}

impl<T: fmt::Debug> fmt::Debug for Input<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Input")
            .field("value", &self.inner.value.borrow())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn set_value_notifies_only_on_change() {
        let input = Input::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = input.on_change(move |v| sink.borrow_mut().push(v));

        input.set_value(1);
        input.set_value(2);
        input.set_value(2);
        input.set_value(3);
        assert_eq!(*seen.borrow(), [2, 3]);
        assert_eq!(input.value(), 3);
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let input = Input::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let sub = input.on_change(move |v| sink.borrow_mut().push(v));

        input.set_value(1);
        sub.run();
        sub.run();
        input.set_value(2);
        assert_eq!(*seen.borrow(), [1]);
    }
}
