//! Schedsim is a discrete-event simulator for comparing processor and task
//! scheduling policies (run-to-completion, quantum time-slicing, processor
//! sharing, shortest-remaining-time, work-stealing and cown-batched
//! scheduling) under stochastic arrival and service-time workloads, without
//! running any real work.
//!
//! ## Basic Concepts
//!
//! **Actor.** An actor is an independently-sequenced unit of simulated
//! behavior: a generator producing [`Request`]s or a processor embodying one
//! scheduling policy. Actors are written as plain sequential loops
//! (`async` functions under the hood) that interleave queue operations with
//! simulated-time waits; they never see wall-clock time or real parallelism.
//!
//! **Kernel.** The [`Simulation`] owns the logical clock and a priority queue
//! of timed events. It serializes all actors with a cooperative rendezvous:
//! an actor free-runs until it suspends on a timed wait or on reading an
//! empty queue, and the kernel resumes exactly one suspension at a time in
//! due-time order, so only one actor is ever live and no shared structure
//! needs locking. Events with equal due times dispatch in creation order, and
//! the random stream is seeded, so a run is fully deterministic.
//!
//! **Queues and drains.** Actors interact only through shared queues
//! ([`Fifo`] or the keyed [`MinHeap`]) and hand completed requests to a
//! [`RequestDrain`], which records sojourn times into a bucketed
//! [`Histogram`] and reports mean, deviation and percentiles when the run
//! halts.
//!
//! ## Example
//!
//! A deterministic single-queue workload served run-to-completion:
//!
//! ```rust
//! use std::rc::Rc;
//! use schedsim::{
//!     ActorIo, Deterministic, Fifo, OpenLoopGenerator, Placement, RtcProcessor, Simulation,
//!     StatsCollector,
//! };
//!
//! let mut sim = Simulation::new(123);
//! let stats = Rc::new(StatsCollector::new("example"));
//! sim.add_drain(stats.clone());
//!
//! // One shared FIFO between the generator and the processor.
//! let queue = Fifo::shared();
//!
//! // A request of service time 5 arrives every 10 time units.
//! let mut gio = ActorIo::new(sim.create_context("generator"));
//! gio.add_out_queue(queue.clone());
//! sim.add_actor(Box::new(OpenLoopGenerator::new(
//!     gio,
//!     Box::new(Deterministic::new(10.0)),
//!     Box::new(Deterministic::new(5.0)),
//!     Placement::RoundRobin,
//! )));
//!
//! let mut pio = ActorIo::new(sim.create_context("processor"));
//! pio.add_in_queue(queue.clone());
//! pio.set_drain(stats.clone());
//! sim.add_actor(Box::new(RtcProcessor::new(pio, 0.0)));
//!
//! sim.run(100.0);
//! assert_eq!(stats.count(), 10);
//! assert!((stats.mean() - 5.0).abs() < 1e-9);
//! ```
//!
//! ## Topologies
//!
//! The [`topology`] module assembles the standard experiment layouts (single
//! shared queue, queue per core, bounded two-stage pipeline, work stealing,
//! cown batching) from a
//! [`Config`](topology::Config); the `schedsim` binary exposes them behind
//! command-line flags, including lambda sweeps that execute one independent
//! `Simulation` per arrival rate.

#![warn(missing_docs)]

pub mod actor;
pub mod context;
pub mod distributions;
pub mod event;
pub mod generators;
pub mod log;
pub mod processors;
pub mod queue;
pub mod request;
pub mod simulation;
pub mod state;
pub mod stats;
pub mod topology;

pub use colored;

pub use actor::{Actor, ActorIo, Id, ReadPolicy};
pub use context::SimulationContext;
pub use distributions::{
    Bimodal, Deterministic, Exponential, LogNormal, Sampler, UniformIndex, Zipf,
};
pub use generators::{
    load_trace, CownGenerator, OpenLoopGenerator, Placement, PlaybackGenerator,
};
pub use processors::{
    BoundedProcessor, ColoredProcessor, CownProcessor, PsProcessor, RtcProcessor, SrptProcessor,
    StealingProcessor, TsProcessor,
};
pub use queue::{Fifo, MinHeap, QueueRef, SimQueue};
pub use request::{Cown, CownRef, Request};
pub use simulation::Simulation;
pub use state::EPSILON;
pub use stats::{DrainSummary, Histogram, RequestDrain, StatsCollector};
