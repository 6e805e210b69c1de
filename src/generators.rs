//! Workload generators feeding requests into the topology.

use std::error::Error;
use std::fs;
use std::path::Path;

use futures::future::LocalBoxFuture;

use crate::actor::{Actor, ActorIo};
use crate::distributions::Sampler;
use crate::log_trace;
use crate::request::{CownRef, Request};

/// How a generator spreads requests across its output queues.
#[derive(Debug, Clone, Copy)]
pub enum Placement {
    /// Cycle through the queues in index order.
    RoundRobin,
    /// Pick a queue uniformly at random per request.
    Random,
}

/// Open-loop generator: requests arrive per an interarrival sampler and carry
/// service demands drawn from a service sampler, independent of how the
/// processors keep up.
pub struct OpenLoopGenerator {
    io: ActorIo<Request>,
    interarrival: Box<dyn Sampler>,
    service: Box<dyn Sampler>,
    placement: Placement,
    qos: u8,
    prop_delay: f64,
    color_split: Option<f64>,
}

impl OpenLoopGenerator {
    /// Creates a generator writing to the queues already attached to `io`.
    pub fn new(
        io: ActorIo<Request>,
        interarrival: Box<dyn Sampler>,
        service: Box<dyn Sampler>,
        placement: Placement,
    ) -> Self {
        Self {
            io,
            interarrival,
            service,
            placement,
            qos: 0,
            prop_delay: 0.0,
            color_split: None,
        }
    }

    /// Tags every emitted request with a QoS class.
    pub fn with_qos(mut self, class: u8) -> Self {
        self.qos = class;
        self
    }

    /// Tags every emitted request with a propagation delay.
    pub fn with_prop_delay(mut self, delay: f64) -> Self {
        self.prop_delay = delay;
        self
    }

    /// Colors each emitted request: color 1 with probability `ratio`,
    /// color 0 otherwise. Consumed by the bounded two-stage pipeline.
    pub fn with_color_split(mut self, ratio: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&ratio),
            "color split ratio must be in [0, 1]"
        );
        self.color_split = Some(ratio);
        self
    }
}

impl Actor for OpenLoopGenerator {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let OpenLoopGenerator {
                io,
                interarrival,
                service,
                placement,
                qos,
                prop_delay,
                color_split,
            } = *self;
            let mut next_out = 0;
            loop {
                let demand = io.ctx().sample(&*service);
                let mut req = Request::new(demand, io.ctx().time())
                    .with_qos(qos)
                    .with_prop_delay(prop_delay);
                if let Some(ratio) = color_split {
                    let color = if io.ctx().rand() < ratio { 1 } else { 0 };
                    req = req.with_color(color);
                }
                let target = match placement {
                    Placement::RoundRobin => {
                        let i = next_out;
                        next_out = (next_out + 1) % io.out_queue_count();
                        i
                    }
                    Placement::Random => io.ctx().gen_range(0..io.out_queue_count()),
                };
                log_trace!(io.ctx(), "emit request (service {:.3}) -> queue {}", demand, target);
                io.write(target, req);
                let gap = io.ctx().sample(&*interarrival);
                io.wait(gap).await;
            }
        })
    }
}

/// Loads one newline-delimited integer trace file, one service-time sample
/// per line.
pub fn load_trace(path: &Path) -> Result<Vec<f64>, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read trace file {}: {}", path.display(), e))?;
    let mut samples = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: i64 = line.parse().map_err(|_| {
            format!(
                "malformed trace file {}: line {} is not an integer",
                path.display(),
                lineno + 1
            )
        })?;
        if value < 0 {
            return Err(format!(
                "malformed trace file {}: negative service time on line {}",
                path.display(),
                lineno + 1
            )
            .into());
        }
        samples.push(value as f64);
    }
    if samples.is_empty() {
        return Err(format!("trace file {} holds no samples", path.display()).into());
    }
    Ok(samples)
}

/// Playback generator replaying recorded service times, one trace per modeled
/// server. Each emission picks a random server and a random sample from its
/// trace and targets that server's queue; interarrival gaps come from a
/// sampler (typically exponential).
pub struct PlaybackGenerator {
    io: ActorIo<Request>,
    traces: Vec<Vec<f64>>,
    interarrival: Box<dyn Sampler>,
}

impl PlaybackGenerator {
    /// Creates a playback generator; output queue `i` receives the samples of
    /// `traces[i]`.
    pub fn new(io: ActorIo<Request>, traces: Vec<Vec<f64>>, interarrival: Box<dyn Sampler>) -> Self {
        assert!(!traces.is_empty(), "playback generator needs at least one trace");
        Self {
            io,
            traces,
            interarrival,
        }
    }
}

impl Actor for PlaybackGenerator {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let PlaybackGenerator {
                io,
                traces,
                interarrival,
            } = *self;
            loop {
                let server = io.ctx().gen_range(0..traces.len());
                let sample = io.ctx().gen_range(0..traces[server].len());
                let req = Request::new(traces[server][sample], io.ctx().time());
                io.write(server, req);
                let gap = io.ctx().sample(&*interarrival);
                io.wait(gap).await;
            }
        })
    }
}

/// Generator for cown scheduling: every request joins an affinity unit, and
/// the unit itself is what processors dequeue.
///
/// A request is appended to the selected cown's queue; if that cown is not
/// already sitting in some processor queue it is scheduled onto a random
/// output queue and its exclusivity flag is set.
pub struct CownGenerator {
    io: ActorIo<CownRef>,
    cowns: Vec<CownRef>,
    selector: Box<dyn Sampler>,
    interarrival: Box<dyn Sampler>,
    service: Box<dyn Sampler>,
}

impl CownGenerator {
    /// Creates a cown generator over the given affinity units. The selector
    /// yields a (possibly skewed) cown index per request.
    pub fn new(
        io: ActorIo<CownRef>,
        cowns: Vec<CownRef>,
        selector: Box<dyn Sampler>,
        interarrival: Box<dyn Sampler>,
        service: Box<dyn Sampler>,
    ) -> Self {
        assert!(!cowns.is_empty(), "cown generator needs at least one cown");
        Self {
            io,
            cowns,
            selector,
            interarrival,
            service,
        }
    }
}

impl Actor for CownGenerator {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let CownGenerator {
                io,
                cowns,
                selector,
                interarrival,
                service,
            } = *self;
            loop {
                let demand = io.ctx().sample(&*service);
                let req = Request::new(demand, io.ctx().time());
                let index = (io.ctx().sample(&*selector).max(0.0) as usize).min(cowns.len() - 1);
                let cown = &cowns[index];
                cown.borrow_mut().push(req);
                if !cown.borrow().is_scheduled() {
                    cown.borrow_mut().set_scheduled(true);
                    let target = io.ctx().gen_range(0..io.out_queue_count());
                    io.write(target, cown.clone());
                }
                let gap = io.ctx().sample(&*interarrival);
                io.wait(gap).await;
            }
        })
    }
}
