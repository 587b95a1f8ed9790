use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ripplet_core::schedule;
use ripplet_core::{Element, Input, Unsubscribe};
use tracing::trace;

use crate::diff::{Delta, diff_by};
use crate::{MutableSignal, Signal};

/// Binds elements to signals.
///
/// Every binding registers its unsubscribe as a disposal hook on the bound
/// element, so the subscription is released on every disposal path. Failure
/// emissions never render and never tear anything down.
pub trait Bind {
    /// Binds this element to `signal`.
    ///
    /// With `run_immediately` false, the value delivered on subscribe is
    /// swallowed (skip-one); the factory runs only for later emissions.
    /// Each rendered emission optionally disposes the existing children
    /// (`remove_children`), then runs `factory` inside a deferred
    /// single-render batch: emissions arriving within one turn coalesce and
    /// only the latest value renders at the next flush.
    fn bind<S: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, S) + 'static,
    ) -> &Self;

    /// [`bind`](Bind::bind) through a substate extractor.
    fn bind_with<S: Clone + 'static, T: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        sub: impl Fn(S) -> T + 'static,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, T) + 'static,
    ) -> &Self {
        self.bind(&signal.map(sub), remove_children, run_immediately, factory)
    }

    /// Like [`bind`](Bind::bind), but the render batch runs synchronously
    /// inline with each emission: every emission renders, in order, with no
    /// coalescing. Both variants converge to the same final tree for the
    /// same emission sequence.
    fn bind_sync<S: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, S) + 'static,
    ) -> &Self;

    /// [`bind_sync`](Bind::bind_sync) through a substate extractor.
    fn bind_sync_with<S: Clone + 'static, T: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        sub: impl Fn(S) -> T + 'static,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, T) + 'static,
    ) -> &Self {
        self.bind_sync(&signal.map(sub), remove_children, run_immediately, factory)
    }

    /// Appends a transparent child panel bound to `signal` that is only
    /// populated while `condition` holds.
    ///
    /// While the condition is false the panel is hidden but its children
    /// are neither disposed nor rebuilt, so an expensive factory does not
    /// re-run when content is merely hidden. Each emission with the
    /// condition true rebuilds the children and shows the panel.
    fn insert_when<S: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        condition: impl Fn(&S) -> bool + 'static,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, S) + 'static,
    ) -> Element;

    /// [`insert_when`](Bind::insert_when) through a substate extractor.
    fn insert_when_with<S: Clone + 'static, T: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        sub: impl Fn(S) -> T + 'static,
        condition: impl Fn(&T) -> bool + 'static,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, T) + 'static,
    ) -> Element {
        self.insert_when(
            &signal.map(sub),
            condition,
            remove_children,
            run_immediately,
            factory,
        )
    }

    /// [`insert_when`](Bind::insert_when) specialized to a `Some` check;
    /// the factory receives the unwrapped value.
    fn insert_not_null<S: Clone + 'static>(
        &self,
        signal: &Signal<Option<S>>,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, S) + 'static,
    ) -> Element {
        self.insert_when(
            signal,
            Option::is_some,
            remove_children,
            run_immediately,
            move |element, state| {
                if let Some(value) = state {
                    factory(element, value);
                }
            },
        )
    }

    /// [`insert_not_null`](Bind::insert_not_null) through a substate
    /// extractor.
    fn insert_not_null_with<S: Clone + 'static, T: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        sub: impl Fn(S) -> Option<T> + 'static,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, T) + 'static,
    ) -> Element {
        self.insert_not_null(&signal.map(sub), remove_children, run_immediately, factory)
    }

    /// [`insert_when`](Bind::insert_when) with an always-true condition.
    fn insert<S: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, S) + 'static,
    ) -> Element {
        self.insert_when(signal, |_| true, remove_children, run_immediately, factory)
    }

    /// [`insert`](Bind::insert) through a substate extractor.
    fn insert_with<S: Clone + 'static, T: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        sub: impl Fn(S) -> T + 'static,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, T) + 'static,
    ) -> Element {
        self.insert(&signal.map(sub), remove_children, run_immediately, factory)
    }

    /// Binds this element to a list signal with incremental reconciliation
    /// and a caller-supplied item equality.
    ///
    /// Each emission is diffed against the archived previous sequence; the
    /// resulting edit script is processed in reverse index order so earlier
    /// positions stay valid while later ones mutate the live child list.
    /// An item whose factory produced zero or several nodes is wrapped in a
    /// transparent group, keeping one child slot per item. Disposing the
    /// element clears the archived state and releases the subscription.
    fn bind_each_by<S: Clone + 'static>(
        &self,
        signal: &Signal<Vec<S>>,
        equalizer: impl Fn(&S, &S) -> bool + 'static,
        factory: impl Fn(&Element, &S) + 'static,
    ) -> &Self;

    /// [`bind_each_by`](Bind::bind_each_by) with structural (`PartialEq`)
    /// item equality, the default. Items that render differently must
    /// compare unequal; supplying types whose `PartialEq` is coarser than
    /// their rendering is a caller error.
    fn bind_each<S: Clone + PartialEq + 'static>(
        &self,
        signal: &Signal<Vec<S>>,
        factory: impl Fn(&Element, &S) + 'static,
    ) -> &Self {
        self.bind_each_by(signal, S::eq, factory)
    }

    /// [`bind_each`](Bind::bind_each) through a substate extractor.
    fn bind_each_with<S: Clone + 'static, T: Clone + PartialEq + 'static>(
        &self,
        signal: &Signal<S>,
        sub: impl Fn(S) -> Vec<T> + 'static,
        factory: impl Fn(&Element, &T) + 'static,
    ) -> &Self {
        self.bind_each(&signal.map(sub), factory)
    }

    /// [`bind_each_by`](Bind::bind_each_by) through a substate extractor.
    fn bind_each_by_with<S: Clone + 'static, T: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        sub: impl Fn(S) -> Vec<T> + 'static,
        equalizer: impl Fn(&T, &T) -> bool + 'static,
        factory: impl Fn(&Element, &T) + 'static,
    ) -> &Self {
        self.bind_each_by(&signal.map(sub), equalizer, factory)
    }
}

impl Bind for Element {
    fn bind<S: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, S) + 'static,
    ) -> &Self {
        let skip = Cell::new(!run_immediately);
        let target = self.clone();
        let factory = Rc::new(factory);
        let key = schedule::next_render_key();
        let unsub = signal.subscribe(move |emission| {
            let Ok(value) = emission else { return };
            if skip.replace(false) {
                return;
            }
            let target = target.clone();
            let factory = factory.clone();
            schedule::schedule_render(key, move || {
                if target.is_disposed() {
                    return;
                }
                if remove_children {
                    target.dispose_children();
                }
                factory(&target, value);
            });
        });
        self.on_dispose(move || unsub.run());
        self
    }

    fn bind_sync<S: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, S) + 'static,
    ) -> &Self {
        let skip = Cell::new(!run_immediately);
        let target = self.clone();
        let unsub = signal.subscribe(move |emission| {
            let Ok(value) = emission else { return };
            if skip.replace(false) {
                return;
            }
            if target.is_disposed() {
                return;
            }
            if remove_children {
                target.dispose_children();
            }
            factory(&target, value);
        });
        self.on_dispose(move || unsub.run());
        self
    }

    fn insert_when<S: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        condition: impl Fn(&S) -> bool + 'static,
        remove_children: bool,
        run_immediately: bool,
        factory: impl Fn(&Element, S) + 'static,
    ) -> Element {
        let panel = Element::group();
        self.add(panel.clone());
        panel.bind(
            signal,
            false,
            run_immediately,
            move |element, state| {
                if condition(&state) {
                    if remove_children {
                        element.dispose_children();
                    }
                    factory(element, state);
                    element.show();
                } else {
                    element.hide();
                }
            },
        );
        panel
    }

    fn bind_each_by<S: Clone + 'static>(
        &self,
        signal: &Signal<Vec<S>>,
        equalizer: impl Fn(&S, &S) -> bool + 'static,
        factory: impl Fn(&Element, &S) + 'static,
    ) -> &Self {
        let archived: Rc<RefCell<Vec<S>>> = Rc::new(RefCell::new(Vec::new()));
        let target = self.clone();
        let state = archived.clone();
        let unsub = signal.subscribe(move |emission| {
            let Ok(new_items) = emission else { return };
            if target.is_disposed() {
                return;
            }
            let previous = state.borrow().clone();
            let deltas = diff_by(&previous, &new_items, &equalizer);
            trace!(deltas = deltas.len(), "reconciling bound list");
            for delta in deltas.iter().rev() {
                match delta {
                    Delta::Equal { .. } => {}
                    Delta::Delete { source, len } => remove_run(&target, *source, *len),
                    Delta::Insert { source, items, .. } => {
                        insert_items(&target, *source, items, &factory);
                    }
                    Delta::Change {
                        source,
                        len,
                        items,
                        ..
                    } => {
                        remove_run(&target, *source, *len);
                        insert_items(&target, *source, items, &factory);
                    }
                }
            }
            *state.borrow_mut() = new_items;
        });
        self.on_dispose(move || {
            archived.borrow_mut().clear();
            unsub.run();
        });
        self
    }
}

/// Removes and disposes `len` children starting at `position`.
fn remove_run(target: &Element, position: usize, len: usize) {
    for _ in 0..len {
        if let Some(child) = target.remove_at(position) {
            child.dispose();
        }
    }
}

/// Runs `factory` for each item, placing exactly one child per item at
/// `position` onwards.
fn insert_items<S>(
    target: &Element,
    position: usize,
    items: &[S],
    factory: &impl Fn(&Element, &S),
) {
    for (i, item) in items.iter().enumerate() {
        if position + i == target.children_len() {
            append_item(target, item, factory);
        } else {
            let child = build_item(target, item, factory);
            target.insert(position + i, child);
        }
    }
}

/// Runs `factory` appending to `target`; if it produced anything other
/// than exactly one child, the new children are regrouped into one
/// transparent group slot.
fn append_item<S>(target: &Element, item: &S, factory: &impl Fn(&Element, &S)) {
    let before = target.children_len();
    factory(target, item);
    if target.children_len() != before + 1 {
        let group = Element::group();
        while target.children_len() > before {
            match target.remove_at(before) {
                Some(child) => group.add(child),
                None => break,
            }
        }
        target.add(group);
    }
}

/// Runs `factory` appending to `target`, then detaches whatever it
/// produced as a single element (grouping when needed).
fn build_item<S>(target: &Element, item: &S, factory: &impl Fn(&Element, &S)) -> Element {
    let before = target.children_len();
    factory(target, item);
    if target.children_len() == before + 1 {
        return target.remove_at(before).unwrap_or_else(Element::group);
    }
    let group = Element::group();
    while target.children_len() > before {
        match target.remove_at(before) {
            Some(child) => group.add(child),
            None => break,
        }
    }
    group
}

/// Bidirectional value binding between a form component and a mutable
/// signal.
pub trait BindValue<T> {
    /// Links the component's value to `state` in both directions.
    ///
    /// Signal changes are pushed into the displayed value and component
    /// edits are pushed back into the signal. Both directions are guarded
    /// by inequality checks, not locks: a write triggered by the signal
    /// compares equal on the way back and the loop stops there.
    fn bind_to(&self, state: &MutableSignal<T>) -> &Self;
}

impl<T: Clone + PartialEq + 'static> BindValue<T> for Input<T> {
    fn bind_to(&self, state: &MutableSignal<T>) -> &Self {
        let input = self.clone();
        let from_state = state.subscribe(move |emission| {
            let Ok(value) = emission else { return };
            if input.element().is_disposed() {
                return;
            }
            if input.value() != value {
                input.set_value(value);
            }
        });
        let writeback = state.clone();
        let from_input = self.on_change(move |value| {
            if writeback.get() != value {
                writeback.set(value);
            }
        });
        let hooks: (Unsubscribe, Unsubscribe) = (from_state, from_input);
        self.element().on_dispose(move || {
            hooks.0.run();
            hooks.1.run();
        });
        self
    }
}
