//! The simulation kernel: registration, rendezvous main loop, halt.

use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;

use crate::actor::Actor;
use crate::context::SimulationContext;
use crate::state::SimulationState;
use crate::stats::RequestDrain;

/// One simulation run: owns the clock, the event queue and the executor all
/// actors are spawned on.
///
/// The kernel serializes actor execution with a cooperative handshake: an
/// actor free-runs until it suspends on a timed wait or an empty-queue read,
/// and the kernel resumes exactly one suspension at a time, so only one actor
/// is ever live and no shared structure needs locking. A `Simulation` is an
/// owned value, not a process-wide singleton; independent runs (parameter
/// sweeps, tests) simply construct their own.
pub struct Simulation {
    state: Rc<RefCell<SimulationState>>,
    pool: LocalPool,
    spawner: LocalSpawner,
    drains: Vec<Rc<dyn RequestDrain>>,
    actor_count: usize,
}

impl Simulation {
    /// Creates a simulation whose random stream is fully determined by
    /// `seed`.
    pub fn new(seed: u64) -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            state: Rc::new(RefCell::new(SimulationState::new(seed))),
            pool,
            spawner,
            drains: Vec::new(),
            actor_count: 0,
        }
    }

    /// Creates a named context for one component. Names must be unique
    /// within the simulation.
    pub fn create_context(&mut self, name: &str) -> SimulationContext {
        let id = self.state.borrow_mut().register_name(name);
        SimulationContext::new(id, name, self.state.clone())
    }

    /// Registers an actor and spawns its run loop on the kernel's executor.
    pub fn add_actor(&mut self, actor: Box<dyn Actor>) {
        self.actor_count += 1;
        self.spawner
            .spawn_local(actor.run())
            .expect("failed to spawn actor");
    }

    /// Registers a drain to be reported on halt.
    pub fn add_drain(&mut self, drain: Rc<dyn RequestDrain>) {
        self.drains.push(drain);
    }

    /// Current simulated time.
    pub fn time(&self) -> f64 {
        self.state.borrow().time()
    }

    /// Number of dispatched events so far.
    pub fn dispatched(&self) -> u64 {
        self.state.borrow().dispatched()
    }

    /// Runs the main loop until simulated time reaches `threshold`, then asks
    /// every registered drain to report.
    ///
    /// Each iteration first retries every queue-blocked actor, giving blocked
    /// readers precedence over the clock advance, then dispatches the
    /// earliest still-active timed event. Running out of events before the
    /// threshold denotes a malformed topology and is fatal.
    pub fn run(&mut self, threshold: f64) {
        // Startup barrier: every registered actor runs to its first
        // suspension before any event is dispatched.
        self.pool.run_until_stalled();
        log::debug!(
            "all {} actors reached their first suspension point",
            self.actor_count
        );
        while self.state.borrow().time() < threshold {
            let blocked = self.state.borrow_mut().take_blocked();
            if !blocked.is_empty() {
                for waker in blocked {
                    waker.wake();
                }
                self.pool.run_until_stalled();
            }
            let event = {
                let mut state = self.state.borrow_mut();
                let event = state.pop_event().unwrap_or_else(|| {
                    panic!(
                        "event queue drained at time {}: the topology cannot make progress",
                        state.time()
                    )
                });
                state.advance(event.time());
                event
            };
            event.fire();
            self.pool.run_until_stalled();
        }
        let now = self.time();
        log::debug!(
            "halting at time {} after {} events",
            now,
            self.state.borrow().dispatched()
        );
        for drain in &self.drains {
            drain.report(now);
        }
    }
}
