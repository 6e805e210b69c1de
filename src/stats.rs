//! Latency recording and percentile estimation.

use std::cell::RefCell;

use colored::Colorize;
use serde::Serialize;

use crate::request::Request;

const DEFAULT_BUCKET_WIDTH: f64 = 10.0;
const DEFAULT_BUCKET_COUNT: usize = 100_000;

const REPORTED_PERCENTILES: [f64; 4] = [0.5, 0.9, 0.95, 0.99];

/// The collaborator recording completed requests' outcomes.
///
/// Multiple independent drains may coexist in one simulation, e.g. one per
/// QoS class or one per processor.
pub trait RequestDrain {
    /// Records a request completed at time `now`. The request is destroyed.
    fn terminate(&self, req: Request, now: f64);
    /// Prints a summary; called by the kernel once the run halts at `now`.
    fn report(&self, now: f64);
}

/// Fixed-geometry bucketed recorder with running moments.
///
/// Samples beyond the last bucket clamp into it; negative samples are a bug
/// and panic.
pub struct Histogram {
    width: f64,
    buckets: Vec<u64>,
    count: u64,
    sum: f64,
    sum_squares: f64,
    min_bucket: usize,
    max_bucket: usize,
}

impl Histogram {
    /// Creates a histogram of `count` buckets, each `width` wide.
    pub fn new(width: f64, count: usize) -> Self {
        assert!(width > 0.0 && count > 0, "invalid histogram geometry");
        Self {
            width,
            buckets: vec![0; count],
            count: 0,
            sum: 0.0,
            sum_squares: 0.0,
            min_bucket: count - 1,
            max_bucket: 0,
        }
    }

    /// Records one sample.
    pub fn add_sample(&mut self, sample: f64) {
        assert!(
            sample >= 0.0,
            "negative sample {} recorded into histogram",
            sample
        );
        let index = ((sample / self.width) as usize).min(self.buckets.len() - 1);
        self.buckets[index] += 1;
        self.min_bucket = self.min_bucket.min(index);
        self.max_bucket = self.max_bucket.max(index);
        self.count += 1;
        self.sum += sample;
        self.sum_squares += sample * sample;
    }

    /// Number of recorded samples.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of the recorded samples; 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    /// Standard deviation of the recorded samples; 0 when empty.
    pub fn stddev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self.sum_squares / self.count as f64 - mean * mean;
        variance.max(0.0).sqrt()
    }

    /// Estimates quantile `q` in `[0, 1)` by linear interpolation within the
    /// bucket where the cumulative count first exceeds the target.
    ///
    /// The estimate assumes at most one requested quantile boundary falls
    /// inside any single bucket.
    pub fn percentile(&self, q: f64) -> f64 {
        assert!((0.0..1.0).contains(&q), "quantile {} out of range", q);
        if self.count == 0 {
            return 0.0;
        }
        let target = q * self.count as f64;
        let mut cumulative = 0u64;
        for index in self.min_bucket..=self.max_bucket {
            let in_bucket = self.buckets[index];
            if in_bucket == 0 {
                continue;
            }
            if cumulative as f64 + in_bucket as f64 > target {
                let below = self.width * index as f64;
                return below + self.width * (target - cumulative as f64) / in_bucket as f64;
            }
            cumulative += in_bucket;
        }
        self.width * (self.max_bucket + 1) as f64
    }
}

/// Machine-readable mirror of one drain's console report.
#[derive(Debug, Clone, Serialize)]
pub struct DrainSummary {
    /// Drain name.
    pub name: String,
    /// Number of completed requests.
    pub count: u64,
    /// Mean sojourn time.
    pub mean: f64,
    /// Sojourn time standard deviation.
    pub stddev: f64,
    /// Median sojourn time.
    pub p50: f64,
    /// 90th percentile sojourn time.
    pub p90: f64,
    /// 95th percentile sojourn time.
    pub p95: f64,
    /// 99th percentile sojourn time.
    pub p99: f64,
    /// Completed requests per unit of simulated time.
    pub throughput: f64,
}

/// Histogram-backed drain recording sojourn times of completed requests.
pub struct StatsCollector {
    name: String,
    hist: RefCell<Histogram>,
}

impl StatsCollector {
    /// Creates a collector with the default histogram geometry.
    pub fn new(name: &str) -> Self {
        Self::with_histogram(name, Histogram::new(DEFAULT_BUCKET_WIDTH, DEFAULT_BUCKET_COUNT))
    }

    /// Creates a collector recording into the given histogram.
    pub fn with_histogram(name: &str, hist: Histogram) -> Self {
        Self {
            name: name.to_owned(),
            hist: RefCell::new(hist),
        }
    }

    /// Drain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of completed requests.
    pub fn count(&self) -> u64 {
        self.hist.borrow().count()
    }

    /// Mean sojourn time.
    pub fn mean(&self) -> f64 {
        self.hist.borrow().mean()
    }

    /// Sojourn time standard deviation.
    pub fn stddev(&self) -> f64 {
        self.hist.borrow().stddev()
    }

    /// Sojourn time quantile estimate.
    pub fn percentile(&self, q: f64) -> f64 {
        self.hist.borrow().percentile(q)
    }

    /// Completed requests per unit of simulated time up to `now`.
    pub fn throughput(&self, now: f64) -> f64 {
        if now <= 0.0 {
            return 0.0;
        }
        self.count() as f64 / now
    }

    /// Builds the serializable summary as of time `now`.
    pub fn summary(&self, now: f64) -> DrainSummary {
        DrainSummary {
            name: self.name.clone(),
            count: self.count(),
            mean: self.mean(),
            stddev: self.stddev(),
            p50: self.percentile(0.5),
            p90: self.percentile(0.9),
            p95: self.percentile(0.95),
            p99: self.percentile(0.99),
            throughput: self.throughput(now),
        }
    }
}

impl RequestDrain for StatsCollector {
    fn terminate(&self, req: Request, now: f64) {
        self.hist.borrow_mut().add_sample(req.sojourn(now));
    }

    fn report(&self, now: f64) {
        let hist = self.hist.borrow();
        println!("{} {}", "drain".bold(), self.name.green());
        println!("count\tavg\tstddev\tp50\tp90\tp95\tp99\treqs/time_unit");
        print!("{}\t{:.3}\t{:.3}", hist.count(), hist.mean(), hist.stddev());
        for q in REPORTED_PERCENTILES {
            print!("\t{:.3}", hist.percentile(q));
        }
        println!("\t{:.5}", self.throughput(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_samples_have_zero_spread() {
        let mut hist = Histogram::new(10.0, 1000);
        for _ in 0..50 {
            hist.add_sample(42.0);
        }
        assert_eq!(hist.count(), 50);
        assert!((hist.mean() - 42.0).abs() < 1e-9);
        assert!(hist.stddev().abs() < 1e-9);
        // All mass sits in bucket 4, so every quantile interpolates inside it.
        for q in [0.5, 0.9, 0.95, 0.99] {
            let expected = 40.0 + 10.0 * q;
            assert!((hist.percentile(q) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn overflow_clamps_into_last_bucket() {
        let mut hist = Histogram::new(1.0, 10);
        hist.add_sample(1e9);
        assert_eq!(hist.count(), 1);
        assert!(hist.percentile(0.5) <= 10.0);
    }

    #[test]
    #[should_panic(expected = "negative sample")]
    fn negative_sample_is_fatal() {
        let mut hist = Histogram::new(1.0, 10);
        hist.add_sample(-0.5);
    }

    #[test]
    fn percentiles_across_buckets() {
        let mut hist = Histogram::new(1.0, 100);
        // 10 samples in bucket 0, 90 in bucket 5.
        for _ in 0..10 {
            hist.add_sample(0.5);
        }
        for _ in 0..90 {
            hist.add_sample(5.5);
        }
        // p50: target 50, first 10 below, interpolate 40/90 into bucket 5.
        let expected = 5.0 + (50.0 - 10.0) / 90.0;
        assert!((hist.percentile(0.5) - expected).abs() < 1e-9);
    }
}
