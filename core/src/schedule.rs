//! Deferred render queue.
//!
//! Models the host event loop's microtask checkpoint: work scheduled during
//! a synchronous turn is coalesced and runs together when the turn ends.
//! Each binding schedules under its own [`RenderKey`]; scheduling again
//! under the same key before the flush replaces the pending job, so a burst
//! of emissions inside one turn renders only the latest value.
//!
//! The queue is thread-local because the component tree is single-threaded;
//! there is exactly one queue per UI thread. Hosts flush it at the end of
//! every turn, tests flush it explicitly with [`flush_renders`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Identity of one deferred-render slot. Allocate with [`next_render_key`].
pub type RenderKey = u64;

type Job = Box<dyn FnOnce()>;

#[derive(Default)]
struct Queue {
    order: Vec<RenderKey>,
    jobs: HashMap<RenderKey, Job>,
}

thread_local! {
    static QUEUE: RefCell<Queue> = RefCell::new(Queue::default());
    static NEXT_KEY: Cell<RenderKey> = const { Cell::new(0) };
    static FLUSHING: Cell<bool> = const { Cell::new(false) };
}

/// Allocates a fresh render key, unique within this thread.
#[must_use]
pub fn next_render_key() -> RenderKey {
    NEXT_KEY.with(|next| {
        let key = next.get();
        next.set(key + 1);
        key
    })
}

/// Schedules `job` to run at the next flush.
///
/// If a job is already pending under `key` it is replaced in place; the
/// slot keeps its original position in the flush order (last write wins).
pub fn schedule_render(key: RenderKey, job: impl FnOnce() + 'static) {
    QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        if queue.jobs.insert(key, Box::new(job)).is_none() {
            queue.order.push(key);
        }
    });
}

/// Number of distinct jobs currently pending.
#[must_use]
pub fn pending_renders() -> usize {
    QUEUE.with(|queue| queue.borrow().jobs.len())
}

/// Runs every pending job in first-scheduled order.
///
/// Jobs scheduled while the flush is running are picked up by the same
/// flush, matching microtask semantics. Reentrant calls return immediately;
/// the outermost flush drains everything.
pub fn flush_renders() {
    if FLUSHING.with(|flushing| flushing.replace(true)) {
        return;
    }
    loop {
        let batch = QUEUE.with(|queue| {
            let mut queue = queue.borrow_mut();
            let order = std::mem::take(&mut queue.order);
            order
                .into_iter()
                .filter_map(|key| queue.jobs.remove(&key))
                .collect::<Vec<_>>()
        });
        if batch.is_empty() {
            break;
        }
        for job in batch {
            job();
        }
    }
    FLUSHING.with(|flushing| flushing.set(false));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn flush_runs_in_scheduling_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        for label in ["a", "b", "c"] {
            let seen = seen.clone();
            schedule_render(next_render_key(), move || seen.borrow_mut().push(label));
        }
        flush_renders();
        assert_eq!(*seen.borrow(), ["a", "b", "c"]);
    }

    #[test]
    fn same_key_coalesces_to_latest_job() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let key = next_render_key();
        for value in [1, 2, 3] {
            let seen = seen.clone();
            schedule_render(key, move || seen.borrow_mut().push(value));
        }
        assert_eq!(pending_renders(), 1);
        flush_renders();
        assert_eq!(*seen.borrow(), [3]);
    }

    #[test]
    fn jobs_scheduled_during_flush_run_in_same_flush() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let inner = seen.clone();
        schedule_render(next_render_key(), move || {
            inner.borrow_mut().push("outer");
            let tail = inner.clone();
            schedule_render(next_render_key(), move || tail.borrow_mut().push("inner"));
        });
        flush_renders();
        assert_eq!(*seen.borrow(), ["outer", "inner"]);
    }
}
