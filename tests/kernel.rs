//! Kernel behavior: the clock, timed waits, blocked-read retries, the
//! timed-read race and run determinism.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use common::{Feeder, IDLE};
use schedsim::topology::{self, TopologyKind};
use schedsim::{Actor, ActorIo, Fifo, Request, Simulation, SimulationContext};

/// Performs a fixed sequence of waits, recording the clock after each.
struct WaitScript {
    ctx: SimulationContext,
    waits: Vec<f64>,
    times: Rc<RefCell<Vec<f64>>>,
}

impl Actor for WaitScript {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let WaitScript { ctx, waits, times } = *self;
            for w in waits {
                ctx.wait(w).await;
                times.borrow_mut().push(ctx.time());
            }
            ctx.wait(IDLE).await;
        })
    }
}

/// Performs one timed read and records when it resumed and what it got.
struct TimedReader {
    io: ActorIo<Request>,
    timeout: Option<f64>,
    seen: Rc<RefCell<Vec<(f64, Option<f64>)>>>,
}

impl Actor for TimedReader {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let TimedReader { io, timeout, seen } = *self;
            let got = io.read_or_timeout(0, timeout).await;
            seen.borrow_mut()
                .push((io.ctx().time(), got.map(|r| r.service_time())));
            io.wait(IDLE).await;
        })
    }
}

#[test]
fn waits_accumulate_on_the_clock() {
    let mut sim = Simulation::new(1);
    let times = Rc::new(RefCell::new(Vec::new()));
    let ctx = sim.create_context("script");
    sim.add_actor(Box::new(WaitScript {
        ctx,
        waits: vec![3.0, 0.0, 2.0],
        times: times.clone(),
    }));
    sim.run(10.0);
    assert_eq!(*times.borrow(), vec![3.0, 3.0, 5.0]);
    assert!(sim.dispatched() >= 3);
}

#[test]
fn timed_read_expires_on_an_empty_queue() {
    let mut sim = Simulation::new(1);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let queue = Fifo::shared();
    let mut rio = ActorIo::new(sim.create_context("reader"));
    rio.add_in_queue(queue);
    sim.add_actor(Box::new(TimedReader {
        io: rio,
        timeout: Some(2.0),
        seen: seen.clone(),
    }));
    sim.run(5.0);
    assert_eq!(*seen.borrow(), vec![(2.0, None)]);
}

#[test]
fn arrival_wins_the_race_against_the_timeout() {
    let mut sim = Simulation::new(1);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let queue = Fifo::shared();

    let mut fio = ActorIo::new(sim.create_context("feeder"));
    fio.add_out_queue(queue.clone());
    sim.add_actor(Box::new(Feeder::new(fio, vec![(3.0, 7.0)])));

    let mut rio = ActorIo::new(sim.create_context("reader"));
    rio.add_in_queue(queue);
    sim.add_actor(Box::new(TimedReader {
        io: rio,
        timeout: Some(5.0),
        seen: seen.clone(),
    }));
    sim.run(10.0);
    // The reader resumed at the arrival, not at the cancelled timeout.
    assert_eq!(*seen.borrow(), vec![(3.0, Some(7.0))]);
}

#[test]
fn blocked_readers_resume_in_blocking_order() {
    let mut sim = Simulation::new(1);
    let seen_a = Rc::new(RefCell::new(Vec::new()));
    let seen_b = Rc::new(RefCell::new(Vec::new()));
    let queue = Fifo::shared();

    let mut aio = ActorIo::new(sim.create_context("reader-a"));
    aio.add_in_queue(queue.clone());
    sim.add_actor(Box::new(TimedReader {
        io: aio,
        timeout: None,
        seen: seen_a.clone(),
    }));
    let mut bio = ActorIo::new(sim.create_context("reader-b"));
    bio.add_in_queue(queue.clone());
    sim.add_actor(Box::new(TimedReader {
        io: bio,
        timeout: None,
        seen: seen_b.clone(),
    }));

    let mut fio = ActorIo::new(sim.create_context("feeder"));
    fio.add_out_queue(queue);
    sim.add_actor(Box::new(Feeder::new(fio, vec![(1.0, 1.0), (0.0, 2.0)])));

    sim.run(10.0);
    // Reader A blocked first and therefore got the first item.
    assert_eq!(*seen_a.borrow(), vec![(1.0, Some(1.0))]);
    assert_eq!(*seen_b.borrow(), vec![(1.0, Some(2.0))]);
}

/// Actor whose future completes after one wait, leaving nothing scheduled.
struct ShortLived {
    ctx: SimulationContext,
}

impl Actor for ShortLived {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            self.ctx.wait(1.0).await;
        })
    }
}

#[test]
#[should_panic(expected = "event queue drained")]
fn exhausted_event_queue_is_fatal() {
    let mut sim = Simulation::new(1);
    let ctx = sim.create_context("short");
    sim.add_actor(Box::new(ShortLived { ctx }));
    sim.run(10.0);
}

#[test]
#[should_panic(expected = "already taken")]
fn duplicate_component_names_are_rejected() {
    let mut sim = Simulation::new(1);
    let _a = sim.create_context("twin");
    let _b = sim.create_context("twin");
}

#[test]
fn identical_seeds_replay_identically() {
    let a = topology::run(TopologyKind::SingleQueue, &common::base_config());
    let b = topology::run(TopologyKind::SingleQueue, &common::base_config());
    let (sa, sb) = (&a.drains[0], &b.drains[0]);
    assert!(sa.count() > 0);
    assert_eq!(sa.count(), sb.count());
    assert_eq!(sa.mean(), sb.mean());
    assert_eq!(sa.percentile(0.99), sb.percentile(0.99));
    assert_eq!(a.end_time, b.end_time);
}
