use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

/// An idempotent teardown action returned by subscription-style APIs.
///
/// Running an `Unsubscribe` twice is a no-op, so it is safe to use both as
/// an explicit cancellation and as a disposal hook without tracking which
/// path fired first.
#[derive(Clone, Default)]
pub struct Unsubscribe {
    action: Rc<RefCell<Option<Box<dyn FnOnce()>>>>,
}

impl Unsubscribe {
    /// Wraps a teardown action.
    pub fn new(action: impl FnOnce() + 'static) -> Self {
        Self {
            action: Rc::new(RefCell::new(Some(Box::new(action)))),
        }
    }

    /// An unsubscribe that does nothing, for subscriptions with no teardown.
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }

    /// Runs the teardown action if it has not run yet.
    pub fn run(&self) {
        if let Some(action) = self.action.borrow_mut().take() {
            action();
        }
    }

    /// Whether the teardown action has already run.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.action.borrow().is_none()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("done", &self.is_done())
            .finish()
    }
}
