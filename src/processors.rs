//! Scheduling-policy processors.
//!
//! Every processor pulls requests from its input queues, consumes simulated
//! time through its context, and hands completed requests to the attached
//! drain. Preemptive policies (processor sharing, SRPT) are built on the
//! cancellable timed read: the next completion is scheduled as a timeout, and
//! an admission arriving first cancels it and triggers a recompute.

use futures::future::LocalBoxFuture;

use crate::actor::{Actor, ActorIo, ReadPolicy};
use crate::log_trace;
use crate::queue::{MinHeap, SimQueue};
use crate::request::{CownRef, Request};
use crate::state::EPSILON;

/// Steal-budget value that keeps an unfair work stealer from ever scanning
/// its peers.
const STEAL_SUPPRESSED: usize = 100;

/// Run-to-completion: serve one request fully, no preemption.
pub struct RtcProcessor {
    io: ActorIo<Request>,
    ctx_cost: f64,
}

impl RtcProcessor {
    /// Creates a run-to-completion processor with the given per-dispatch
    /// context-switch cost.
    pub fn new(io: ActorIo<Request>, ctx_cost: f64) -> Self {
        Self { io, ctx_cost }
    }
}

impl Actor for RtcProcessor {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let RtcProcessor { io, ctx_cost } = *self;
            loop {
                let req = io.read(0).await;
                io.wait(req.remaining() + ctx_cost).await;
                log_trace!(io.ctx(), "completed request after {:.3}", req.service_time());
                io.complete(req);
            }
        })
    }
}

/// Quantum time-slicing: a request exceeding the quantum is preempted and
/// re-enqueued at the tail of the processor's own queue.
pub struct TsProcessor {
    io: ActorIo<Request>,
    quantum: f64,
    ctx_cost: f64,
}

impl TsProcessor {
    /// Creates a time-sharing processor.
    pub fn new(io: ActorIo<Request>, quantum: f64, ctx_cost: f64) -> Self {
        assert!(quantum > 0.0, "time-slicing quantum must be positive");
        Self {
            io,
            quantum,
            ctx_cost,
        }
    }
}

impl Actor for TsProcessor {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let TsProcessor {
                io,
                quantum,
                ctx_cost,
            } = *self;
            loop {
                let mut req = io.read(0).await;
                if req.remaining() <= quantum {
                    io.wait(req.remaining() + ctx_cost).await;
                    io.complete(req);
                } else {
                    io.wait(quantum + ctx_cost).await;
                    req.consume(quantum);
                    io.requeue(0, req);
                }
            }
        })
    }
}

/// Service-time multiplier in the two-stage colored pipeline: a request of
/// the stage's slow color takes twice its demand.
fn color_factor(req: &Request, slow_color: u8) -> f64 {
    if req.color() == slow_color {
        2.0
    } else {
        1.0
    }
}

/// First stage of the bounded pipeline: serves a request (color 1 is slow
/// here), then admits it downstream only while the out queue holds fewer
/// than `buffer` requests; on a full buffer the request is terminated
/// instead of forwarded.
pub struct BoundedProcessor {
    io: ActorIo<Request>,
    buffer: usize,
}

impl BoundedProcessor {
    /// Creates the admission stage with the given downstream buffer
    /// capacity.
    pub fn new(io: ActorIo<Request>, buffer: usize) -> Self {
        assert!(buffer > 0, "bounded buffer needs room for at least one request");
        Self { io, buffer }
    }
}

impl Actor for BoundedProcessor {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let BoundedProcessor { io, buffer } = *self;
            loop {
                let req = io.read(0).await;
                io.wait(color_factor(&req, 1) * req.remaining()).await;
                if io.out_queue_len(0) < buffer {
                    io.write(0, req);
                } else {
                    log_trace!(io.ctx(), "downstream buffer full, dropping request");
                    io.complete(req);
                }
            }
        })
    }
}

/// Second stage of the bounded pipeline: serves run-to-completion with the
/// inverse color bias (color 0 is slow here) and terminates every request.
pub struct ColoredProcessor {
    io: ActorIo<Request>,
}

impl ColoredProcessor {
    /// Creates the pipeline's terminal stage.
    pub fn new(io: ActorIo<Request>) -> Self {
        Self { io }
    }
}

impl Actor for ColoredProcessor {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let ColoredProcessor { io } = *self;
            loop {
                let req = io.read(0).await;
                io.wait(color_factor(&req, 0) * req.remaining()).await;
                io.complete(req);
            }
        })
    }
}

/// Capacity granted to each in-flight request when `active` of them share
/// `workers` workers.
fn capacity_factor(workers: usize, active: usize) -> f64 {
    if active <= workers {
        1.0
    } else {
        workers as f64 / active as f64
    }
}

/// Processor sharing: all in-flight requests progress simultaneously at a
/// capacity factor of `min(1, workers / active)`.
///
/// The factor stays fixed between recomputes; every admission or completion
/// first charges the elapsed interval at the old factor to every in-flight
/// request, then changes the active count. The next wake-up is the earliest
/// completion at the new factor, scheduled as a cancellable timeout so an
/// admission can trigger an early recompute.
pub struct PsProcessor {
    io: ActorIo<Request>,
    workers: usize,
}

impl PsProcessor {
    /// Creates a processor-sharing processor with a cap of `workers`
    /// concurrently progressing requests at full rate.
    pub fn new(io: ActorIo<Request>, workers: usize) -> Self {
        assert!(workers > 0, "processor sharing needs at least one worker");
        Self { io, workers }
    }
}

impl Actor for PsProcessor {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let PsProcessor { io, workers } = *self;
            let mut in_flight: Vec<Request> = Vec::new();
            let mut last_recompute = io.ctx().time();
            // Index of the request expected to complete when the timeout
            // fires; only meaningful while `next_wake` is set.
            let mut completing = 0usize;
            let mut next_wake: Option<f64> = None;
            loop {
                let arrived = io.read_or_timeout(0, next_wake).await;
                let factor = capacity_factor(workers, in_flight.len());
                let now = io.ctx().time();
                let progress = (now - last_recompute) * factor;
                last_recompute = now;
                for (i, req) in in_flight.iter_mut().enumerate() {
                    req.consume(progress);
                    assert!(
                        req.remaining() > -EPSILON || (next_wake.is_some() && i == completing),
                        "remaining time {} went negative under processor sharing",
                        req.remaining()
                    );
                }
                match arrived {
                    Some(req) => in_flight.push(req),
                    None => {
                        let done = in_flight.remove(completing);
                        assert!(
                            done.remaining().abs() <= EPSILON,
                            "request woke for completion with {} time left",
                            done.remaining()
                        );
                        io.complete(done);
                    }
                }
                next_wake = if in_flight.is_empty() {
                    None
                } else {
                    let factor = capacity_factor(workers, in_flight.len());
                    completing = min_remaining_index(&in_flight);
                    // Tolerated drift may leave the minimum slightly below
                    // zero; the wake-up itself must not.
                    Some((in_flight[completing].remaining() / factor).max(0.0))
                };
            }
        })
    }
}

fn min_remaining_index(reqs: &[Request]) -> usize {
    let mut best = 0;
    for (i, req) in reqs.iter().enumerate() {
        if req.remaining() < reqs[best].remaining() {
            best = i;
        }
    }
    best
}

/// Shortest remaining processing time with `slots` parallel workers and an
/// overflow min-heap ordered by remaining time.
///
/// Unlike processor sharing, occupied slots all progress at full rate. An
/// admission fills an empty slot if one exists; otherwise it evicts the slot
/// holding the largest remaining time exceeding the newcomer's, if any, and
/// the loser goes to the heap.
pub struct SrptProcessor {
    io: ActorIo<Request>,
    slots: usize,
}

impl SrptProcessor {
    /// Creates an SRPT processor with `slots` active slots.
    pub fn new(io: ActorIo<Request>, slots: usize) -> Self {
        assert!(slots > 0, "srpt needs at least one slot");
        Self { io, slots }
    }
}

impl Actor for SrptProcessor {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let SrptProcessor { io, slots } = *self;
            let mut active: Vec<Option<Request>> = (0..slots).map(|_| None).collect();
            let mut overflow: MinHeap<Request> = MinHeap::new(Request::remaining);
            let mut last_update = io.ctx().time();
            let mut completing = 0usize;
            let mut next_wake: Option<f64> = None;
            loop {
                let arrived = io.read_or_timeout(0, next_wake).await;
                let now = io.ctx().time();
                let elapsed = now - last_update;
                last_update = now;
                for (i, slot) in active.iter_mut().enumerate() {
                    if let Some(req) = slot {
                        req.consume(elapsed);
                        assert!(
                            req.remaining() > -EPSILON || (next_wake.is_some() && i == completing),
                            "remaining time {} went negative under srpt",
                            req.remaining()
                        );
                    }
                }
                match arrived {
                    Some(new_req) => {
                        if let Some(free) = active.iter().position(|s| s.is_none()) {
                            active[free] = Some(new_req);
                        } else {
                            let mut victim: Option<usize> = None;
                            let mut largest = new_req.remaining();
                            for (i, slot) in active.iter().enumerate() {
                                let rem = slot.as_ref().unwrap().remaining();
                                if rem > largest {
                                    largest = rem;
                                    victim = Some(i);
                                }
                            }
                            match victim {
                                Some(i) => {
                                    overflow.push(active[i].take().unwrap());
                                    active[i] = Some(new_req);
                                }
                                None => overflow.push(new_req),
                            }
                        }
                    }
                    None => {
                        let done = active[completing].take().unwrap();
                        assert!(
                            done.remaining().abs() <= EPSILON,
                            "request woke for completion with {} time left",
                            done.remaining()
                        );
                        io.complete(done);
                        if let Some(refill) = overflow.pop() {
                            active[completing] = Some(refill);
                        }
                    }
                }
                next_wake = None;
                for (i, slot) in active.iter().enumerate() {
                    if let Some(req) = slot {
                        if next_wake.map_or(true, |d| req.remaining() < d) {
                            next_wake = Some(req.remaining());
                            completing = i;
                        }
                    }
                }
                next_wake = next_wake.map(|d| d.max(0.0));
            }
        })
    }
}

/// Picks a steal victim: scans peer queues from a random start, skipping the
/// local queue 0, and takes the head of the first non-empty one.
fn try_steal<T: 'static>(io: &ActorIo<T>) -> Option<T> {
    let queues = io.in_queue_count();
    let base = io.ctx().gen_range(0..queues);
    for k in 0..queues {
        let index = (base + k) % queues;
        if index == 0 {
            continue;
        }
        if io.queue_len(index) > 0 {
            return io.try_read(index);
        }
    }
    None
}

/// Quantum-based work stealer: runs time slicing against its local queue and
/// periodically steals from peers.
///
/// The steal budget counts dispatches; when it hits zero the processor scans
/// its peers and resets the budget to `max(1, local queue length)`, so busier
/// locals steal less often. With the fairness flag off the budget is pinned
/// high and the processor never steals.
pub struct StealingProcessor {
    io: ActorIo<Request>,
    quantum: f64,
    fair: bool,
}

impl StealingProcessor {
    /// Creates a work-stealing processor; input queue 0 is its local queue,
    /// the rest are peers.
    pub fn new(io: ActorIo<Request>, quantum: f64, fair: bool) -> Self {
        assert!(quantum > 0.0, "time-slicing quantum must be positive");
        Self { io, quantum, fair }
    }
}

impl Actor for StealingProcessor {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let StealingProcessor { io, quantum, fair } = *self;
            let mut budget = 0usize;
            loop {
                let mut stolen = None;
                if budget == 0 {
                    stolen = try_steal(&io);
                    if stolen.is_some() {
                        log_trace!(io.ctx(), "stole a request from a peer queue");
                    }
                    budget = io.queue_len(0).max(1);
                }
                let mut req = match stolen {
                    Some(req) => req,
                    None => io.read_any(ReadPolicy::LocalFirst).await.0,
                };
                if req.remaining() <= quantum {
                    io.wait(req.remaining()).await;
                    io.complete(req);
                } else {
                    io.wait(quantum).await;
                    req.consume(quantum);
                    io.requeue(0, req);
                }
                if fair {
                    budget = budget.saturating_sub(1);
                } else {
                    budget = STEAL_SUPPRESSED;
                }
            }
        })
    }
}

/// Cown-batched processor: dequeues affinity units and serves up to `batch`
/// of their queued requests run-to-completion back to back.
///
/// If the cown still holds work after the batch it goes back to the local
/// queue; otherwise its exclusivity flag is cleared so the generator may
/// schedule it again. Stealing works exactly as in [`StealingProcessor`].
pub struct CownProcessor {
    io: ActorIo<CownRef>,
    batch: usize,
    fair: bool,
}

impl CownProcessor {
    /// Creates a cown-batched processor; input queue 0 is its local queue,
    /// the rest are peers.
    pub fn new(io: ActorIo<CownRef>, batch: usize, fair: bool) -> Self {
        assert!(batch > 0, "cown batch count must be positive");
        Self { io, batch, fair }
    }
}

impl Actor for CownProcessor {
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            let CownProcessor { io, batch, fair } = *self;
            let mut budget = 0usize;
            loop {
                let mut stolen = None;
                if budget == 0 {
                    stolen = try_steal(&io);
                    budget = io.queue_len(0).max(1);
                }
                let cown = match stolen {
                    Some(cown) => cown,
                    None => io.read_any(ReadPolicy::LocalFirst).await.0,
                };
                for _ in 0..batch {
                    let next = cown.borrow_mut().pop();
                    match next {
                        Some(req) => {
                            io.wait(req.remaining()).await;
                            io.complete(req);
                        }
                        None => break,
                    }
                }
                // The generator only re-schedules a cown whose flag is clear,
                // so a drained cown must drop the flag before new pushes race
                // in; one with leftover work keeps it and goes back locally.
                if cown.borrow().pending() == 0 {
                    cown.borrow_mut().set_scheduled(false);
                } else {
                    io.requeue(0, cown.clone());
                }
                if fair {
                    budget = budget.saturating_sub(1);
                } else {
                    budget = STEAL_SUPPRESSED;
                }
            }
        })
    }
}
