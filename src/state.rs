//! Mutable simulation state shared between the kernel and actor contexts.

use std::collections::BinaryHeap;
use std::rc::Rc;
use std::task::Waker;

use rand::SeedableRng;
use rand_pcg::Pcg64;
use rustc_hash::FxHashMap;

use crate::actor::Id;
use crate::event::{EventId, EventState, QueuedEvent};

/// Tolerance used when checking remaining-time invariants.
///
/// Processor-sharing and SRPT policies repeatedly subtract elapsed time from
/// in-flight requests, so a completing request reaches zero only up to
/// accumulated floating-point drift. Any value below `-EPSILON` is treated as
/// a bug, not drift.
pub const EPSILON: f64 = 1e-6;

/// Clock, event queue, pending-unblock list and RNG of one simulation run.
///
/// The state is owned by [`Simulation`](crate::Simulation) and shared with
/// actor contexts through `Rc<RefCell<_>>`; the rendezvous protocol guarantees
/// that borrows never overlap because only one actor runs at a time.
pub struct SimulationState {
    clock: f64,
    events: BinaryHeap<QueuedEvent>,
    event_seq: EventId,
    blocked: Vec<Waker>,
    rng: Pcg64,
    names: FxHashMap<String, Id>,
    dispatched: u64,
}

impl SimulationState {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            clock: 0.0,
            events: BinaryHeap::new(),
            event_seq: 0,
            blocked: Vec::new(),
            rng: Pcg64::seed_from_u64(seed),
            names: FxHashMap::default(),
            dispatched: 0,
        }
    }

    /// Current simulated time.
    pub fn time(&self) -> f64 {
        self.clock
    }

    /// Number of dispatched events so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub(crate) fn register_name(&mut self, name: &str) -> Id {
        let id = self.names.len() as Id;
        if self.names.insert(name.to_owned(), id).is_some() {
            panic!("component name '{}' is already taken", name);
        }
        id
    }

    /// Creates a timed event due `delay` from now and queues it.
    pub(crate) fn schedule(&mut self, delay: f64, waker: Waker) -> Rc<EventState> {
        assert!(
            delay >= 0.0 && !delay.is_nan(),
            "wait duration must be non-negative, got {}",
            delay
        );
        let event = Rc::new(EventState::new(self.event_seq, self.clock + delay, waker));
        self.event_seq += 1;
        self.events.push(QueuedEvent(event.clone()));
        event
    }

    /// Pops the earliest still-active event, discarding cancelled ones.
    pub(crate) fn pop_event(&mut self) -> Option<Rc<EventState>> {
        while let Some(QueuedEvent(event)) = self.events.pop() {
            if event.is_active() {
                self.dispatched += 1;
                return Some(event);
            }
        }
        None
    }

    pub(crate) fn advance(&mut self, time: f64) {
        assert!(
            time >= self.clock,
            "clock went backwards: {} -> {}",
            self.clock,
            time
        );
        self.clock = time;
    }

    /// Parks an actor blocked on an empty queue until the next retry round.
    pub(crate) fn block(&mut self, waker: Waker) {
        self.blocked.push(waker);
    }

    pub(crate) fn take_blocked(&mut self) -> Vec<Waker> {
        std::mem::take(&mut self.blocked)
    }

    pub(crate) fn rng(&mut self) -> &mut Pcg64 {
        &mut self.rng
    }
}
