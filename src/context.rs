//! Accessing the simulation state from components.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::Rng;

use crate::actor::Id;
use crate::distributions::Sampler;
use crate::event::EventState;
use crate::state::SimulationState;

/// A component's handle to the simulation: clock access, timed waits and the
/// simulation-wide deterministic RNG.
///
/// Contexts are created via [`Simulation::create_context`](crate::Simulation::create_context)
/// and are typically stored inside the component (directly or within an
/// [`ActorIo`](crate::actor::ActorIo)).
pub struct SimulationContext {
    id: Id,
    name: String,
    state: Rc<RefCell<SimulationState>>,
}

impl SimulationContext {
    pub(crate) fn new(id: Id, name: &str, state: Rc<RefCell<SimulationState>>) -> Self {
        Self {
            id,
            name: name.to_owned(),
            state,
        }
    }

    /// Unique identifier of the owning component.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Name of the owning component.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current simulated time.
    pub fn time(&self) -> f64 {
        self.state.borrow().time()
    }

    /// Suspends the calling actor for `duration` units of simulated time.
    ///
    /// A plain wait always runs to completion once scheduled; negative
    /// durations are a fatal error.
    pub fn wait(&self, duration: f64) -> TimerFuture<'_> {
        TimerFuture {
            ctx: self,
            duration,
            event: None,
        }
    }

    /// Uniform random value in `[0, 1)` from the simulation-wide generator.
    pub fn rand(&self) -> f64 {
        self.state.borrow_mut().rng().gen()
    }

    /// Uniform random value in the given range from the simulation-wide
    /// generator.
    pub fn gen_range<T, R>(&self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.state.borrow_mut().rng().gen_range(range)
    }

    /// Draws the next variate from `dist` using the simulation-wide generator.
    pub fn sample(&self, dist: &dyn Sampler) -> f64 {
        let mut state = self.state.borrow_mut();
        dist.sample(state.rng())
    }

    pub(crate) fn schedule(&self, delay: f64, waker: Waker) -> Rc<EventState> {
        self.state.borrow_mut().schedule(delay, waker)
    }

    pub(crate) fn block(&self, waker: Waker) {
        self.state.borrow_mut().block(waker);
    }
}

/// Future returned by [`SimulationContext::wait`].
///
/// The first poll registers a timed event with the kernel and suspends the
/// actor; the poll after the kernel dispatches that event completes.
pub struct TimerFuture<'a> {
    ctx: &'a SimulationContext,
    duration: f64,
    event: Option<Rc<EventState>>,
}

impl Future for TimerFuture<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        match &this.event {
            Some(event) if event.has_fired() => Poll::Ready(()),
            Some(event) => {
                event.set_waker(cx.waker());
                Poll::Pending
            }
            None => {
                this.event = Some(this.ctx.schedule(this.duration, cx.waker().clone()));
                Poll::Pending
            }
        }
    }
}
