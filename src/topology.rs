//! Topology assembly: which generator feeds which queues into which
//! processors.

use std::rc::Rc;

use crate::actor::ActorIo;
use crate::distributions::{
    Bimodal, Deterministic, Exponential, LogNormal, Sampler, UniformIndex, Zipf,
};
use crate::generators::{CownGenerator, OpenLoopGenerator, Placement, PlaybackGenerator};
use crate::processors::{
    BoundedProcessor, ColoredProcessor, CownProcessor, PsProcessor, RtcProcessor, SrptProcessor,
    StealingProcessor, TsProcessor,
};
use crate::queue::{Fifo, QueueRef};
use crate::request::{Cown, CownRef, Request};
use crate::simulation::Simulation;
use crate::stats::StatsCollector;

/// Scheduling policy selector for the queue-fed topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Run to completion.
    Rtc,
    /// Quantum time slicing.
    Ts,
    /// Processor sharing.
    Ps,
    /// Shortest remaining processing time.
    Srpt,
}

/// Service-time distribution selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// Fixed service time `1 / mu`.
    Deterministic,
    /// Exponential service time with rate `mu`.
    Exponential,
    /// Log-normal service time (heavy tail).
    LogNormal,
    /// Bimodal service time: 90% short, 10% long, mean `1 / mu`.
    Bimodal,
}

/// Cown selector distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CownSelect {
    /// Uniform cown choice.
    Uniform,
    /// Zipf-skewed cown choice.
    Zipf,
}

/// Topology selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyKind {
    /// One shared FIFO feeding the processors.
    SingleQueue,
    /// One FIFO per processor.
    MultiQueue,
    /// Two-stage colored pipeline with a bounded inter-stage buffer.
    Bounded,
    /// Per-core local queues with stealing between peers.
    WorkStealing,
    /// Cown-batched processors with stealing between peers.
    Cown,
}

/// Parameters of one run, assembled by the CLI.
#[derive(Clone)]
pub struct Config {
    /// Arrival rate of the open-loop generator.
    pub lambda: f64,
    /// Service rate.
    pub mu: f64,
    /// Service-time distribution.
    pub service: ServiceKind,
    /// Scheduling policy for the queue-fed topologies.
    pub policy: PolicyKind,
    /// Time-slicing quantum.
    pub quantum: f64,
    /// Context-switch cost charged per dispatch.
    pub ctx_cost: f64,
    /// Worker/slot cap for processor sharing and SRPT.
    pub workers: usize,
    /// Number of processor actors (and of local queues where applicable).
    pub cores: usize,
    /// Capacity of the bounded topology's inter-stage buffer.
    pub buffer: usize,
    /// Requests served per cown dispatch.
    pub batch: usize,
    /// Number of cowns.
    pub cowns: usize,
    /// Cown selector distribution.
    pub cown_select: CownSelect,
    /// Steal-fairness flag: unfair processors never steal.
    pub fair: bool,
    /// Simulated-time threshold at which the run halts.
    pub duration: f64,
    /// RNG seed; runs are deterministic given the seed.
    pub seed: u64,
    /// Playback traces, one per modeled server; empty for synthetic load.
    pub traces: Vec<Vec<f64>>,
}

/// Result of one assembled-and-executed run.
pub struct RunOutcome {
    /// The drains registered by the topology, already reported.
    pub drains: Vec<Rc<StatsCollector>>,
    /// Simulated time at which the run halted.
    pub end_time: f64,
}

fn service_sampler(cfg: &Config) -> Box<dyn Sampler> {
    match cfg.service {
        ServiceKind::Deterministic => Box::new(Deterministic::new(1.0 / cfg.mu)),
        ServiceKind::Exponential => Box::new(Exponential::new(cfg.mu)),
        // mu = 1, sigma = 2.41 gives a mean near 50 time units.
        ServiceKind::LogNormal => Box::new(LogNormal::new(1.0, 2.41)),
        ServiceKind::Bimodal => Box::new(Bimodal::new(0.5 / cfg.mu, 5.5 / cfg.mu, 0.9)),
    }
}

fn add_policy_actors(
    sim: &mut Simulation,
    cfg: &Config,
    queues: &[QueueRef<Request>],
    stats: &Rc<StatsCollector>,
) {
    match cfg.policy {
        PolicyKind::Rtc | PolicyKind::Ts => {
            // One actor per core; cores may share a queue (single-queue
            // topology) or own one each.
            for core in 0..cfg.cores {
                let queue = queues[core % queues.len()].clone();
                let mut io = ActorIo::new(sim.create_context(&format!("proc-{}", core)));
                io.add_in_queue(queue);
                io.set_drain(stats.clone());
                match cfg.policy {
                    PolicyKind::Rtc => {
                        sim.add_actor(Box::new(RtcProcessor::new(io, cfg.ctx_cost)))
                    }
                    _ => sim.add_actor(Box::new(TsProcessor::new(io, cfg.quantum, cfg.ctx_cost))),
                }
            }
        }
        PolicyKind::Ps | PolicyKind::Srpt => {
            // One preemptive actor per queue; its parallelism lives in the
            // worker/slot cap.
            for (i, queue) in queues.iter().enumerate() {
                let mut io = ActorIo::new(sim.create_context(&format!("proc-{}", i)));
                io.add_in_queue(queue.clone());
                io.set_drain(stats.clone());
                match cfg.policy {
                    PolicyKind::Ps => sim.add_actor(Box::new(PsProcessor::new(io, cfg.workers))),
                    _ => sim.add_actor(Box::new(SrptProcessor::new(io, cfg.workers))),
                }
            }
        }
    }
}

fn single_queue(cfg: &Config) -> RunOutcome {
    let mut sim = Simulation::new(cfg.seed);
    let stats = Rc::new(StatsCollector::new("single-queue"));
    sim.add_drain(stats.clone());

    let queue = Fifo::shared();
    let mut gio = ActorIo::new(sim.create_context("generator"));
    gio.add_out_queue(queue.clone());
    sim.add_actor(Box::new(OpenLoopGenerator::new(
        gio,
        Box::new(Exponential::new(cfg.lambda)),
        service_sampler(cfg),
        Placement::RoundRobin,
    )));

    add_policy_actors(&mut sim, cfg, &[queue], &stats);
    sim.run(cfg.duration);
    RunOutcome {
        drains: vec![stats],
        end_time: sim.time(),
    }
}

fn multi_queue(cfg: &Config) -> RunOutcome {
    let mut sim = Simulation::new(cfg.seed);
    let stats = Rc::new(StatsCollector::new("multi-queue"));
    sim.add_drain(stats.clone());

    let servers = if cfg.traces.is_empty() {
        cfg.cores
    } else {
        cfg.traces.len()
    };
    let queues: Vec<QueueRef<Request>> = (0..servers).map(|_| Fifo::shared()).collect();

    let mut gio = ActorIo::new(sim.create_context("generator"));
    for queue in &queues {
        gio.add_out_queue(queue.clone());
    }
    if cfg.traces.is_empty() {
        sim.add_actor(Box::new(OpenLoopGenerator::new(
            gio,
            Box::new(Exponential::new(cfg.lambda)),
            service_sampler(cfg),
            Placement::RoundRobin,
        )));
    } else {
        sim.add_actor(Box::new(PlaybackGenerator::new(
            gio,
            cfg.traces.clone(),
            Box::new(Exponential::new(cfg.lambda)),
        )));
    }

    let cfg_for_actors = Config {
        cores: servers,
        ..cfg.clone()
    };
    add_policy_actors(&mut sim, &cfg_for_actors, &queues, &stats);
    sim.run(cfg.duration);
    RunOutcome {
        drains: vec![stats],
        end_time: sim.time(),
    }
}

fn bounded(cfg: &Config) -> RunOutcome {
    let mut sim = Simulation::new(cfg.seed);
    let stats = Rc::new(StatsCollector::new("bounded"));
    sim.add_drain(stats.clone());

    let ingress = Fifo::shared();
    let staged = Fifo::shared();

    // Half the requests are color 1 (slow in the first stage), half color 0
    // (slow in the second).
    let mut gio = ActorIo::new(sim.create_context("generator"));
    gio.add_out_queue(ingress.clone());
    sim.add_actor(Box::new(
        OpenLoopGenerator::new(
            gio,
            Box::new(Exponential::new(cfg.lambda)),
            service_sampler(cfg),
            Placement::RoundRobin,
        )
        .with_color_split(0.5),
    ));

    let mut fio = ActorIo::new(sim.create_context("stage-0"));
    fio.add_in_queue(ingress);
    fio.add_out_queue(staged.clone());
    fio.set_drain(stats.clone());
    sim.add_actor(Box::new(BoundedProcessor::new(fio, cfg.buffer)));

    let mut sio = ActorIo::new(sim.create_context("stage-1"));
    sio.add_in_queue(staged);
    sio.set_drain(stats.clone());
    sim.add_actor(Box::new(ColoredProcessor::new(sio)));

    sim.run(cfg.duration);
    RunOutcome {
        drains: vec![stats],
        end_time: sim.time(),
    }
}

fn work_stealing(cfg: &Config) -> RunOutcome {
    let mut sim = Simulation::new(cfg.seed);
    let stats = Rc::new(StatsCollector::new("work-stealing"));
    sim.add_drain(stats.clone());

    let queues: Vec<QueueRef<Request>> = (0..cfg.cores).map(|_| Fifo::shared()).collect();

    let mut gio = ActorIo::new(sim.create_context("generator"));
    for queue in &queues {
        gio.add_out_queue(queue.clone());
    }
    sim.add_actor(Box::new(OpenLoopGenerator::new(
        gio,
        Box::new(Exponential::new(cfg.lambda)),
        service_sampler(cfg),
        Placement::Random,
    )));

    for core in 0..cfg.cores {
        let mut io = ActorIo::new(sim.create_context(&format!("proc-{}", core)));
        io.add_in_queue(queues[core].clone());
        for (peer, queue) in queues.iter().enumerate() {
            if peer != core {
                io.add_in_queue(queue.clone());
            }
        }
        io.set_drain(stats.clone());
        sim.add_actor(Box::new(StealingProcessor::new(io, cfg.quantum, cfg.fair)));
    }
    sim.run(cfg.duration);
    RunOutcome {
        drains: vec![stats],
        end_time: sim.time(),
    }
}

fn cown(cfg: &Config) -> RunOutcome {
    let mut sim = Simulation::new(cfg.seed);
    let stats = Rc::new(StatsCollector::new("cown"));
    sim.add_drain(stats.clone());

    let queues: Vec<QueueRef<CownRef>> = (0..cfg.cores).map(|_| Fifo::shared()).collect();
    let cowns: Vec<CownRef> = (0..cfg.cowns).map(|_| Cown::new()).collect();

    let selector: Box<dyn Sampler> = match cfg.cown_select {
        CownSelect::Uniform => Box::new(UniformIndex::new(cfg.cowns)),
        CownSelect::Zipf => Box::new(Zipf::new(cfg.cowns as u64, 2.0)),
    };
    let mut gio = ActorIo::new(sim.create_context("generator"));
    for queue in &queues {
        gio.add_out_queue(queue.clone());
    }
    sim.add_actor(Box::new(CownGenerator::new(
        gio,
        cowns,
        selector,
        Box::new(Exponential::new(cfg.lambda)),
        service_sampler(cfg),
    )));

    for core in 0..cfg.cores {
        let mut io = ActorIo::new(sim.create_context(&format!("proc-{}", core)));
        io.add_in_queue(queues[core].clone());
        for (peer, queue) in queues.iter().enumerate() {
            if peer != core {
                io.add_in_queue(queue.clone());
            }
        }
        io.set_drain(stats.clone());
        sim.add_actor(Box::new(CownProcessor::new(io, cfg.batch, cfg.fair)));
    }
    sim.run(cfg.duration);
    RunOutcome {
        drains: vec![stats],
        end_time: sim.time(),
    }
}

/// Assembles and executes the selected topology.
pub fn run(kind: TopologyKind, cfg: &Config) -> RunOutcome {
    match kind {
        TopologyKind::SingleQueue => single_queue(cfg),
        TopologyKind::MultiQueue => multi_queue(cfg),
        TopologyKind::Bounded => bounded(cfg),
        TopologyKind::WorkStealing => work_stealing(cfg),
        TopologyKind::Cown => cown(cfg),
    }
}
