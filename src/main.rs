//! Command-line front end: flag parsing, lambda sweeps and report output.

use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use colored::Colorize;

use schedsim::generators::load_trace;
use schedsim::stats::DrainSummary;
use schedsim::topology::{self, Config, CownSelect, PolicyKind, ServiceKind, TopologyKind};

#[derive(Debug, Clone, Copy, clap::ArgEnum)]
enum TopologyArg {
    SingleQueue,
    MultiQueue,
    Bounded,
    WorkStealing,
    Cown,
}

impl From<TopologyArg> for TopologyKind {
    fn from(arg: TopologyArg) -> Self {
        match arg {
            TopologyArg::SingleQueue => TopologyKind::SingleQueue,
            TopologyArg::MultiQueue => TopologyKind::MultiQueue,
            TopologyArg::Bounded => TopologyKind::Bounded,
            TopologyArg::WorkStealing => TopologyKind::WorkStealing,
            TopologyArg::Cown => TopologyKind::Cown,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ArgEnum)]
enum PolicyArg {
    Rtc,
    Ts,
    Ps,
    Srpt,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Rtc => PolicyKind::Rtc,
            PolicyArg::Ts => PolicyKind::Ts,
            PolicyArg::Ps => PolicyKind::Ps,
            PolicyArg::Srpt => PolicyKind::Srpt,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ArgEnum)]
enum ServiceArg {
    #[clap(name = "d")]
    Deterministic,
    #[clap(name = "m")]
    Exponential,
    #[clap(name = "lg")]
    LogNormal,
    #[clap(name = "b")]
    Bimodal,
}

impl From<ServiceArg> for ServiceKind {
    fn from(arg: ServiceArg) -> Self {
        match arg {
            ServiceArg::Deterministic => ServiceKind::Deterministic,
            ServiceArg::Exponential => ServiceKind::Exponential,
            ServiceArg::LogNormal => ServiceKind::LogNormal,
            ServiceArg::Bimodal => ServiceKind::Bimodal,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ArgEnum)]
enum CownSelectArg {
    Uniform,
    Zipf,
}

impl From<CownSelectArg> for CownSelect {
    fn from(arg: CownSelectArg) -> Self {
        match arg {
            CownSelectArg::Uniform => CownSelect::Uniform,
            CownSelectArg::Zipf => CownSelect::Zipf,
        }
    }
}

/// Discrete-event simulator for processor scheduling policies.
#[derive(Parser, Debug)]
#[clap(name = "schedsim", version, about)]
struct Args {
    /// Topology to assemble.
    #[clap(long, arg_enum, default_value = "single-queue")]
    topology: TopologyArg,

    /// Scheduling policy (single-queue and multi-queue topologies).
    #[clap(long, arg_enum, default_value = "rtc")]
    policy: PolicyArg,

    /// Poisson arrival rate, either a single value or a `start:end:step`
    /// sweep executing one independent run per step.
    #[clap(long, default_value = "0.005")]
    lambda: String,

    /// Service rate.
    #[clap(long, default_value_t = 0.02)]
    mu: f64,

    /// Service-time distribution: m (exponential), d (deterministic),
    /// lg (log-normal) or b (bimodal).
    #[clap(long, arg_enum, default_value = "m")]
    service: ServiceArg,

    /// Quantum for the time-slicing policies.
    #[clap(long, default_value_t = 0.5)]
    quantum: f64,

    /// Context-switch cost charged per dispatch.
    #[clap(long, default_value_t = 0.0)]
    ctx_cost: f64,

    /// Worker/slot cap for processor sharing and SRPT.
    #[clap(long, default_value_t = 1)]
    workers: usize,

    /// Number of processor actors.
    #[clap(long, default_value_t = 2)]
    cores: usize,

    /// Capacity of the bounded topology's inter-stage buffer.
    #[clap(long, default_value_t = 1)]
    buffer_size: usize,

    /// Requests served per cown dispatch.
    #[clap(long, default_value_t = 1)]
    batch: usize,

    /// Number of cowns.
    #[clap(long, default_value_t = 16)]
    cowns: usize,

    /// Cown selector distribution.
    #[clap(long, arg_enum, default_value = "uniform")]
    cown_select: CownSelectArg,

    /// Let work stealers actually steal (fair budget accounting).
    #[clap(long)]
    fair: bool,

    /// Simulated-time threshold at which a run halts.
    #[clap(long, default_value_t = 1_000_000.0)]
    duration: f64,

    /// RNG seed; runs are deterministic given the seed.
    #[clap(long, default_value_t = 42)]
    seed: u64,

    /// Service-time trace file, one per modeled server (enables the playback
    /// generator on the multi-queue topology).
    #[clap(long)]
    trace: Vec<PathBuf>,

    /// Additionally emit each run's summary as JSON.
    #[clap(long)]
    json: bool,
}

/// Parses a lambda argument: a single value or a `start:end:step` sweep.
fn parse_lambda(arg: &str) -> Result<Vec<f64>, Box<dyn Error>> {
    let parts: Vec<&str> = arg.split(':').collect();
    match parts.as_slice() {
        [single] => Ok(vec![single
            .parse()
            .map_err(|_| format!("invalid lambda '{}'", single))?]),
        [start, end, step] => {
            let start: f64 = start.parse().map_err(|_| format!("invalid sweep start '{}'", start))?;
            let end: f64 = end.parse().map_err(|_| format!("invalid sweep end '{}'", end))?;
            let step: f64 = step.parse().map_err(|_| format!("invalid sweep step '{}'", step))?;
            if step <= 0.0 || end < start {
                return Err("lambda sweep must have positive step and end >= start".into());
            }
            let mut values = Vec::new();
            let mut current = start;
            while current <= end {
                values.push(current);
                current += step;
            }
            Ok(values)
        }
        _ => Err(format!("invalid lambda argument '{}': expected VALUE or START:END:STEP", arg).into()),
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let lambdas = parse_lambda(&args.lambda)?;
    let traces = args
        .trace
        .iter()
        .map(|path| load_trace(path))
        .collect::<Result<Vec<_>, _>>()?;
    if !traces.is_empty() && !matches!(args.topology, TopologyArg::MultiQueue) {
        return Err("trace playback requires the multi-queue topology".into());
    }

    for lambda in lambdas {
        let cfg = Config {
            lambda,
            mu: args.mu,
            service: args.service.into(),
            policy: args.policy.into(),
            quantum: args.quantum,
            ctx_cost: args.ctx_cost,
            workers: args.workers,
            cores: args.cores,
            buffer: args.buffer_size,
            batch: args.batch,
            cowns: args.cowns,
            cown_select: args.cown_select.into(),
            fair: args.fair,
            duration: args.duration,
            seed: args.seed,
            traces: traces.clone(),
        };
        println!(
            "{} lambda = {}, mu = {}, rho = {:.3}",
            "run".bold(),
            lambda,
            args.mu,
            lambda / args.mu
        );
        let outcome = topology::run(args.topology.into(), &cfg);
        if args.json {
            let summaries: Vec<DrainSummary> = outcome
                .drains
                .iter()
                .map(|drain| drain.summary(outcome.end_time))
                .collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("{} {}", "error:".red().bold(), err);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::parse_lambda;

    #[test]
    fn single_lambda() {
        assert_eq!(parse_lambda("0.25").unwrap(), vec![0.25]);
    }

    #[test]
    fn lambda_sweep() {
        let values = parse_lambda("0.1:0.3:0.1").unwrap();
        assert_eq!(values.len(), 3);
        assert!((values[0] - 0.1).abs() < 1e-9);
        assert!((values[2] - 0.3).abs() < 1e-9);
    }

    #[test]
    fn malformed_lambda_is_rejected() {
        assert!(parse_lambda("a:b").is_err());
        assert!(parse_lambda("0.1:0.0:0.1").is_err());
    }
}
