//! Shared scaffolding: a scripted feeder actor, an idle parking actor and a
//! drain capturing raw completion records.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use schedsim::topology::{Config, CownSelect, PolicyKind, ServiceKind};
use schedsim::{Actor, ActorIo, Request, RequestDrain, SimulationContext};

/// Far-future wait keeping the event queue non-empty after a finite script
/// ends.
pub const IDLE: f64 = 1e12;

/// Emits a fixed script of `(delay, service_time)` pairs into output queue 0,
/// then parks.
pub struct Feeder {
    io: ActorIo<Request>,
    script: Vec<(f64, f64)>,
}

impl Feeder {
    pub fn new(io: ActorIo<Request>, script: Vec<(f64, f64)>) -> Self {
        Self { io, script }
    }
}

impl Actor for Feeder {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let Feeder { io, script } = *self;
            for (delay, service) in script {
                io.wait(delay).await;
                let req = Request::new(service, io.ctx().time());
                io.write(0, req);
            }
            io.wait(IDLE).await;
        })
    }
}

/// Actor that only parks on a far-future event; used when a test drives the
/// queues by hand but the kernel still needs pending events.
pub struct Idler {
    ctx: SimulationContext,
}

impl Idler {
    pub fn new(ctx: SimulationContext) -> Self {
        Self { ctx }
    }
}

impl Actor for Idler {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            self.ctx.wait(IDLE).await;
        })
    }
}

/// Drain keeping every completed request with its completion time, in
/// completion order.
#[derive(Default)]
pub struct Capture {
    records: RefCell<Vec<(Request, f64)>>,
}

impl Capture {
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// `(arrival, service_time, completion_time)` per completed request.
    pub fn records(&self) -> Vec<(f64, f64, f64)> {
        self.records
            .borrow()
            .iter()
            .map(|(req, now)| (req.arrival(), req.service_time(), *now))
            .collect()
    }

    /// The completed requests themselves, with their completion times.
    pub fn requests(&self) -> Vec<(Request, f64)> {
        self.records.borrow().clone()
    }
}

impl RequestDrain for Capture {
    fn terminate(&self, req: Request, now: f64) {
        self.records.borrow_mut().push((req, now));
    }

    fn report(&self, _now: f64) {}
}

/// A small synthetic workload every topology can run without special setup.
pub fn base_config() -> Config {
    Config {
        lambda: 0.01,
        mu: 0.02,
        service: ServiceKind::Exponential,
        policy: PolicyKind::Rtc,
        quantum: 0.5,
        ctx_cost: 0.0,
        workers: 1,
        cores: 2,
        buffer: 1,
        batch: 1,
        cowns: 4,
        cown_select: CownSelect::Uniform,
        fair: false,
        duration: 20_000.0,
        seed: 7,
        traces: Vec::new(),
    }
}
