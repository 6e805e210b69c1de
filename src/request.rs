//! Units of simulated work.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A unit of simulated work.
///
/// A request records its arrival time and carries a mutable remaining service
/// time which processors consume. Exactly one actor holds a given request at
/// any instant; requests move between actors by value through queues and are
/// destroyed when handed to a drain.
#[derive(Debug, Clone)]
pub struct Request {
    arrival: f64,
    service: f64,
    remaining: f64,
    prop_delay: f64,
    qos: u8,
    color: u8,
    deadline: Option<f64>,
}

impl Request {
    /// Creates a request arriving `now` with the given service demand.
    pub fn new(service_time: f64, now: f64) -> Self {
        Self {
            arrival: now,
            service: service_time,
            remaining: service_time,
            prop_delay: 0.0,
            qos: 0,
            color: 0,
            deadline: None,
        }
    }

    /// Tags the request with a propagation delay added to its sojourn time.
    pub fn with_prop_delay(mut self, delay: f64) -> Self {
        self.prop_delay = delay;
        self
    }

    /// Tags the request with a QoS class.
    pub fn with_qos(mut self, class: u8) -> Self {
        self.qos = class;
        self
    }

    /// Tags the request with a color.
    pub fn with_color(mut self, color: u8) -> Self {
        self.color = color;
        self
    }

    /// Tags the request with an absolute deadline.
    pub fn with_deadline(mut self, deadline: f64) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Arrival time.
    pub fn arrival(&self) -> f64 {
        self.arrival
    }

    /// The immutable initial service demand.
    pub fn service_time(&self) -> f64 {
        self.service
    }

    /// Remaining service demand.
    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// Consumes `elapsed` units of service.
    pub fn consume(&mut self, elapsed: f64) {
        self.remaining -= elapsed;
    }

    /// QoS class tag.
    pub fn qos(&self) -> u8 {
        self.qos
    }

    /// Color tag.
    pub fn color(&self) -> u8 {
        self.color
    }

    /// Deadline tag, if set.
    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Time spent in the system up to `now`, including propagation delay.
    pub fn sojourn(&self, now: f64) -> f64 {
        now - self.arrival + self.prop_delay
    }
}

/// An affinity-grouped batch of requests scheduled as one exclusive unit.
///
/// Generators append requests to a cown's queue; the exclusivity flag
/// guarantees the cown sits in at most one processor queue at a time.
pub struct Cown {
    queue: VecDeque<Request>,
    scheduled: bool,
}

/// Shared cown handle, visible to both its generator and the processors.
pub type CownRef = Rc<RefCell<Cown>>;

impl Cown {
    /// Creates an empty, unscheduled cown behind a shared handle.
    pub fn new() -> CownRef {
        Rc::new(RefCell::new(Self {
            queue: VecDeque::new(),
            scheduled: false,
        }))
    }

    /// Appends a request to the cown's queue.
    pub fn push(&mut self, req: Request) {
        self.queue.push_back(req);
    }

    /// Removes the oldest queued request.
    pub fn pop(&mut self) -> Option<Request> {
        self.queue.pop_front()
    }

    /// Number of queued requests.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether the cown currently sits in some processor queue.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Sets the exclusivity flag.
    pub fn set_scheduled(&mut self, scheduled: bool) {
        self.scheduled = scheduled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_survive_the_builder_chain() {
        let req = Request::new(4.0, 10.0)
            .with_qos(1)
            .with_color(1)
            .with_prop_delay(0.5)
            .with_deadline(17.0);
        assert_eq!(req.qos(), 1);
        assert_eq!(req.color(), 1);
        assert_eq!(req.deadline(), Some(17.0));
        assert_eq!(req.sojourn(14.0), 4.5);
    }

    #[test]
    fn deadline_checks_against_completion_time() {
        let req = Request::new(4.0, 0.0).with_deadline(6.0);
        let met = |now: f64| req.deadline().map_or(true, |d| now <= d);
        assert!(met(5.0));
        assert!(!met(7.0));
        assert!(Request::new(4.0, 0.0).deadline().is_none());
    }

    #[test]
    fn consume_tracks_remaining_service() {
        let mut req = Request::new(4.0, 0.0);
        req.consume(1.5);
        assert!((req.remaining() - 2.5).abs() < 1e-9);
        assert_eq!(req.service_time(), 4.0);
    }
}
