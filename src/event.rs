//! Timed-event primitives owned by the simulation kernel.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;
use std::task::Waker;

/// Unique event identifier, assigned in insertion order.
///
/// Besides identifying an event, the id doubles as the deterministic
/// tie-break between events with equal due times: the event created
/// first is dispatched first.
pub type EventId = u64;

/// Shared state of a single timed event.
///
/// An event is created when an actor performs a timed wait and stays in the
/// kernel's priority queue until popped. Cancellation is lazy: an event marked
/// inactive remains queued and is skipped when it reaches the top.
pub(crate) struct EventState {
    id: EventId,
    time: f64,
    active: Cell<bool>,
    fired: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

impl EventState {
    pub(crate) fn new(id: EventId, time: f64, waker: Waker) -> Self {
        Self {
            id,
            time,
            active: Cell::new(true),
            fired: Cell::new(false),
            waker: RefCell::new(Some(waker)),
        }
    }

    pub(crate) fn id(&self) -> EventId {
        self.id
    }

    pub(crate) fn time(&self) -> f64 {
        self.time
    }

    /// Marks the event inactive so that the kernel skips it on pop.
    pub(crate) fn cancel(&self) {
        self.active.set(false);
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn has_fired(&self) -> bool {
        self.fired.get()
    }

    /// Refreshes the waker on re-poll so the kernel always wakes the task
    /// that currently awaits this event.
    pub(crate) fn set_waker(&self, waker: &Waker) {
        *self.waker.borrow_mut() = Some(waker.clone());
    }

    /// Called by the kernel after advancing the clock to this event's due
    /// time: marks the event fired and resumes the owning actor.
    pub(crate) fn fire(&self) {
        self.fired.set(true);
        if let Some(waker) = self.waker.borrow().as_ref() {
            waker.wake_by_ref();
        }
    }
}

/// Heap entry ordering events by (due time, id), earliest first.
pub(crate) struct QueuedEvent(pub(crate) Rc<EventState>);

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.0.id() == other.0.id()
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, the earliest event must win.
        other
            .0
            .time()
            .total_cmp(&self.0.time())
            .then_with(|| other.0.id().cmp(&self.0.id()))
    }
}
