use core::fmt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

/// A handle to one node of the component tree.
///
/// `Element` is a cheap clone (`Rc` interior); all clones refer to the same
/// node. The tree is single-threaded by design: one UI thread owns every
/// node, so interior mutability is `Cell`/`RefCell`, never locks.
///
/// Children are ordered. Disposal is recursive and idempotent, and runs any
/// hooks registered with [`on_dispose`](Element::on_dispose) before the
/// children are torn down, so a hook always observes the subtree it was
/// registered against.
#[derive(Clone)]
pub struct Element {
    inner: Rc<Inner>,
}

struct Inner {
    /// Transparent grouping container with no layout impact of its own.
    pass_through: bool,
    visible: Cell<bool>,
    disposed: Cell<bool>,
    children: RefCell<Vec<Element>>,
    dispose_hooks: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl Element {
    fn with_pass_through(pass_through: bool) -> Self {
        Self {
            inner: Rc::new(Inner {
                pass_through,
                visible: Cell::new(true),
                disposed: Cell::new(false),
                children: RefCell::new(Vec::new()),
                dispose_hooks: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Creates an ordinary container node.
    #[must_use]
    pub fn panel() -> Self {
        Self::with_pass_through(false)
    }

    /// Creates a transparent grouping container.
    ///
    /// Groups exist so that one semantic item can always occupy exactly one
    /// child slot of its parent, no matter how many nodes its factory
    /// produced. They have no layout impact of their own.
    #[must_use]
    pub fn group() -> Self {
        Self::with_pass_through(true)
    }

    /// Whether this node is a transparent grouping container.
    #[must_use]
    pub fn is_pass_through(&self) -> bool {
        self.inner.pass_through
    }

    /// Appends a child at the end of the child list.
    pub fn add(&self, child: Element) {
        self.inner.children.borrow_mut().push(child);
    }

    /// Inserts a child at `index`, clamped to the current child count.
    pub fn insert(&self, index: usize, child: Element) {
        let mut children = self.inner.children.borrow_mut();
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Detaches the child at `index` without disposing it.
    pub fn remove_at(&self, index: usize) -> Option<Element> {
        let mut children = self.inner.children.borrow_mut();
        if index < children.len() {
            Some(children.remove(index))
        } else {
            None
        }
    }

    /// Handles to all current children, in order.
    #[must_use]
    pub fn children(&self) -> Vec<Element> {
        self.inner.children.borrow().clone()
    }

    /// Number of children.
    #[must_use]
    pub fn children_len(&self) -> usize {
        self.inner.children.borrow().len()
    }

    /// Handle to the child at `index`, if any.
    #[must_use]
    pub fn child_at(&self, index: usize) -> Option<Element> {
        self.inner.children.borrow().get(index).cloned()
    }

    /// Registers a hook that runs once, on whichever disposal path destroys
    /// this node first.
    pub fn on_dispose(&self, hook: impl FnOnce() + 'static) {
        if self.is_disposed() {
            hook();
            return;
        }
        self.inner.dispose_hooks.borrow_mut().push(Box::new(hook));
    }

    /// Destroys this node and its whole subtree.
    ///
    /// The disposed flag is set before any hook runs, so a deferred render
    /// scheduled against this node can never fire afterwards. Calling
    /// `dispose` again is a no-op.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        trace!("disposing element");
        let hooks = std::mem::take(&mut *self.inner.dispose_hooks.borrow_mut());
        for hook in hooks {
            hook();
        }
        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in children {
            child.dispose();
        }
    }

    /// Disposes and detaches every child, leaving this node alive.
    pub fn dispose_children(&self) {
        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in children {
            child.dispose();
        }
    }

    /// Whether this node has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Makes the node visible.
    pub fn show(&self) {
        self.inner.visible.set(true);
    }

    /// Hides the node without detaching it from the tree.
    pub fn hide(&self) {
        self.inner.visible.set(false);
    }

    /// Whether the node is currently visible.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.inner.visible.get()
    }

    /// Whether two handles refer to the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("pass_through", &self.inner.pass_through)
            .field("visible", &self.inner.visible.get())
            .field("disposed", &self.inner.disposed.get())
            .field("children", &self.inner.children.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn children_keep_insertion_order() {
        let parent = Element::panel();
        let first = Element::panel();
        let second = Element::panel();
        parent.add(first.clone());
        parent.add(second.clone());
        parent.insert(1, Element::group());

        assert_eq!(parent.children_len(), 3);
        assert!(parent.child_at(0).is_some_and(|c| c.ptr_eq(&first)));
        assert!(parent.child_at(1).is_some_and(|c| c.is_pass_through()));
        assert!(parent.child_at(2).is_some_and(|c| c.ptr_eq(&second)));
    }

    #[test]
    fn remove_at_detaches_without_disposing() {
        let parent = Element::panel();
        let child = Element::panel();
        parent.add(child.clone());

        let removed = parent.remove_at(0).unwrap();
        assert!(removed.ptr_eq(&child));
        assert!(!removed.is_disposed());
        assert_eq!(parent.children_len(), 0);
        assert!(parent.remove_at(0).is_none());
    }

    #[test]
    fn dispose_is_recursive_and_idempotent() {
        let hook_count = Rc::new(Cell::new(0u32));
        let parent = Element::panel();
        let child = Element::panel();
        parent.add(child.clone());

        let counted = hook_count.clone();
        child.on_dispose(move || counted.set(counted.get() + 1));

        parent.dispose();
        parent.dispose();
        assert!(parent.is_disposed());
        assert!(child.is_disposed());
        assert_eq!(hook_count.get(), 1);
    }

    #[test]
    fn hook_on_already_disposed_node_runs_immediately() {
        let ran = Rc::new(Cell::new(false));
        let element = Element::panel();
        element.dispose();

        let flagged = ran.clone();
        element.on_dispose(move || flagged.set(true));
        assert!(ran.get());
    }

    #[test]
    fn dispose_children_leaves_parent_alive() {
        let parent = Element::panel();
        let child = Element::panel();
        parent.add(child.clone());

        parent.dispose_children();
        assert!(child.is_disposed());
        assert!(!parent.is_disposed());
        assert_eq!(parent.children_len(), 0);
    }

    #[test]
    fn visibility_toggles() {
        let element = Element::panel();
        assert!(element.is_visible());
        element.hide();
        assert!(!element.is_visible());
        element.show();
        assert!(element.is_visible());
    }
}
