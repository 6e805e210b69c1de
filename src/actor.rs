//! The actor capability set shared by generators and processors.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;

use crate::context::{SimulationContext, TimerFuture};
use crate::event::EventState;
use crate::queue::QueueRef;
use crate::request::Request;
use crate::stats::RequestDrain;

/// Unique component identifier.
pub type Id = u32;

/// An independently-sequenced unit of simulated behavior.
///
/// Registering an actor spawns its `run` future on the kernel's executor;
/// from then on the actor free-runs between suspension points (`wait` and the
/// queue reads), each of which hands control back to the kernel.
pub trait Actor {
    /// Consumes the actor and returns its main loop.
    fn run(self: Box<Self>) -> LocalBoxFuture<'static, ()>;
}

/// Selection policy for [`ActorIo::read_any`] across multiple input queues.
#[derive(Debug, Clone)]
pub enum ReadPolicy {
    /// First non-empty queue in index order.
    Priority,
    /// Uniform random choice among non-empty queues.
    Random,
    /// Queue 0 if non-empty, otherwise uniform random among the rest.
    LocalFirst,
    /// Weighted approximate round robin between two or three queues; the
    /// weights are per-queue dispatch shares.
    WeightedRr(Vec<u32>),
}

/// Queue wiring and drain hookup of one actor.
///
/// `T` is the item type flowing through the attached queues: [`Request`] for
/// ordinary actors, [`CownRef`](crate::request::CownRef) for cown-batched
/// ones. Indexing a queue that was never attached denotes a malformed
/// topology and panics.
pub struct ActorIo<T> {
    ctx: SimulationContext,
    in_queues: Vec<QueueRef<T>>,
    out_queues: Vec<QueueRef<T>>,
    drain: Option<Rc<dyn RequestDrain>>,
    rr_cursor: std::cell::Cell<u64>,
}

impl<T: 'static> ActorIo<T> {
    /// Creates an unwired io bundle for the given context.
    pub fn new(ctx: SimulationContext) -> Self {
        Self {
            ctx,
            in_queues: Vec::new(),
            out_queues: Vec::new(),
            drain: None,
            rr_cursor: std::cell::Cell::new(0),
        }
    }

    /// Attaches the next input queue.
    pub fn add_in_queue(&mut self, queue: QueueRef<T>) {
        self.in_queues.push(queue);
    }

    /// Attaches the next output queue.
    pub fn add_out_queue(&mut self, queue: QueueRef<T>) {
        self.out_queues.push(queue);
    }

    /// Attaches the drain receiving completed requests.
    pub fn set_drain(&mut self, drain: Rc<dyn RequestDrain>) {
        self.drain = Some(drain);
    }

    /// The actor's simulation context.
    pub fn ctx(&self) -> &SimulationContext {
        &self.ctx
    }

    /// Suspends the actor for `duration` units of simulated time.
    pub fn wait(&self, duration: f64) -> TimerFuture<'_> {
        self.ctx.wait(duration)
    }

    /// Number of attached input queues.
    pub fn in_queue_count(&self) -> usize {
        self.in_queues.len()
    }

    /// Number of attached output queues.
    pub fn out_queue_count(&self) -> usize {
        self.out_queues.len()
    }

    /// Length of input queue `index`.
    pub fn queue_len(&self, index: usize) -> usize {
        self.in_queue(index).borrow().len()
    }

    /// Length of output queue `index`, e.g. for admission decisions against
    /// a bounded downstream buffer.
    pub fn out_queue_len(&self, index: usize) -> usize {
        self.out_queue(index).borrow().len()
    }

    /// Dequeues from input queue `index` without blocking.
    pub fn try_read(&self, index: usize) -> Option<T> {
        self.in_queue(index).borrow_mut().pop()
    }

    /// Dequeues from input queue `index`, suspending while it is empty.
    ///
    /// Blocked readers are retried by the kernel before every clock advance,
    /// in blocking order, so FIFO fairness between readers is preserved.
    pub fn read(&self, index: usize) -> ReadFuture<'_, T> {
        ReadFuture { io: self, index }
    }

    /// As [`read`](Self::read), but gives up `timeout` units of simulated
    /// time after the call if nothing arrives (`None` is returned then).
    ///
    /// An arrival strictly before the timeout dispatch wins the race and
    /// cancels the timeout event, so the actor resumes without having
    /// advanced time for it. `timeout == None` blocks indefinitely. This is
    /// the cancellable-wait primitive preemptive policies are built on.
    pub fn read_or_timeout(&self, index: usize, timeout: Option<f64>) -> ReadTimeoutFuture<'_, T> {
        ReadTimeoutFuture {
            io: self,
            index,
            timeout,
            event: None,
        }
    }

    /// Dequeues from any input queue according to `policy`, suspending while
    /// all of them are empty. Returns the item and the queue index it came
    /// from.
    pub fn read_any(&self, policy: ReadPolicy) -> ReadAnyFuture<'_, T> {
        ReadAnyFuture { io: self, policy }
    }

    /// Enqueues to output queue `index` without blocking.
    pub fn write(&self, index: usize, item: T) {
        self.out_queue(index).borrow_mut().push(item);
    }

    /// Enqueues to the actor's own input queue `index`, e.g. a time-sliced
    /// request going back to the tail.
    pub fn requeue(&self, index: usize, item: T) {
        self.in_queue(index).borrow_mut().push(item);
    }

    /// Hands a completed request to the attached drain.
    pub fn complete(&self, req: Request) {
        let drain = self
            .drain
            .as_ref()
            .unwrap_or_else(|| panic!("actor '{}' has no drain attached", self.ctx.name()));
        drain.terminate(req, self.ctx.time());
    }

    fn in_queue(&self, index: usize) -> &QueueRef<T> {
        self.in_queues
            .get(index)
            .unwrap_or_else(|| panic!("actor '{}' has no input queue {}", self.ctx.name(), index))
    }

    fn out_queue(&self, index: usize) -> &QueueRef<T> {
        self.out_queues
            .get(index)
            .unwrap_or_else(|| panic!("actor '{}' has no output queue {}", self.ctx.name(), index))
    }

    /// Applies a read policy across the input queues. `None` when all queues
    /// are empty.
    fn select(&self, policy: &ReadPolicy) -> Option<(T, usize)> {
        let non_empty: Vec<usize> = (0..self.in_queues.len())
            .filter(|&i| self.in_queues[i].borrow().len() > 0)
            .collect();
        if non_empty.is_empty() {
            return None;
        }
        let pick = match policy {
            ReadPolicy::Priority => non_empty[0],
            ReadPolicy::Random => non_empty[self.ctx.gen_range(0..non_empty.len())],
            ReadPolicy::LocalFirst => {
                if self.in_queues[0].borrow().len() > 0 {
                    0
                } else {
                    non_empty[self.ctx.gen_range(0..non_empty.len())]
                }
            }
            ReadPolicy::WeightedRr(weights) => {
                assert_eq!(
                    weights.len(),
                    self.in_queues.len(),
                    "weighted round robin needs one weight per input queue"
                );
                let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
                assert!(total > 0, "weighted round robin weights must not all be zero");
                let slot = self.rr_cursor.get() % total;
                self.rr_cursor.set(self.rr_cursor.get() + 1);
                let mut cum = 0u64;
                let mut scheduled = weights.len() - 1;
                for (i, &w) in weights.iter().enumerate() {
                    cum += u64::from(w);
                    if slot < cum {
                        scheduled = i;
                        break;
                    }
                }
                // The scheduled queue may be empty; fall to the next
                // non-empty one in cyclic order.
                (0..weights.len())
                    .map(|k| (scheduled + k) % weights.len())
                    .find(|i| non_empty.contains(i))
                    .unwrap()
            }
        };
        let item = self.in_queues[pick].borrow_mut().pop().unwrap();
        Some((item, pick))
    }
}

/// Future returned by [`ActorIo::read`].
pub struct ReadFuture<'a, T> {
    io: &'a ActorIo<T>,
    index: usize,
}

impl<T: 'static> Future for ReadFuture<'_, T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();
        match this.io.try_read(this.index) {
            Some(item) => Poll::Ready(item),
            None => {
                this.io.ctx.block(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

/// Future returned by [`ActorIo::read_or_timeout`].
pub struct ReadTimeoutFuture<'a, T> {
    io: &'a ActorIo<T>,
    index: usize,
    timeout: Option<f64>,
    event: Option<Rc<EventState>>,
}

impl<T: 'static> Future for ReadTimeoutFuture<'_, T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        if let Some(event) = &this.event {
            if event.has_fired() {
                return Poll::Ready(None);
            }
        }
        if let Some(item) = this.io.try_read(this.index) {
            if let Some(event) = &this.event {
                event.cancel();
            }
            return Poll::Ready(Some(item));
        }
        match (&this.event, this.timeout) {
            (Some(event), _) => event.set_waker(cx.waker()),
            (None, Some(timeout)) => {
                this.event = Some(this.io.ctx.schedule(timeout, cx.waker().clone()));
            }
            (None, None) => {}
        }
        this.io.ctx.block(cx.waker().clone());
        Poll::Pending
    }
}

/// Future returned by [`ActorIo::read_any`].
pub struct ReadAnyFuture<'a, T> {
    io: &'a ActorIo<T>,
    policy: ReadPolicy,
}

impl<T: 'static> Future for ReadAnyFuture<'_, T> {
    type Output = (T, usize);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<(T, usize)> {
        let this = self.get_mut();
        match this.io.select(&this.policy) {
            Some(found) => Poll::Ready(found),
            None => {
                this.io.ctx.block(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{Fifo, SimQueue};
    use crate::request::Request;
    use crate::simulation::Simulation;

    fn io_with_two_queues(items0: &[f64], items1: &[f64]) -> ActorIo<Request> {
        let mut sim = Simulation::new(1);
        let mut io = ActorIo::new(sim.create_context("test"));
        let q0 = Fifo::shared();
        let q1 = Fifo::shared();
        for &s in items0 {
            q0.borrow_mut().push(Request::new(s, 0.0));
        }
        for &s in items1 {
            q1.borrow_mut().push(Request::new(s, 0.0));
        }
        io.add_in_queue(q0);
        io.add_in_queue(q1);
        io
    }

    #[test]
    fn priority_takes_the_lowest_non_empty_index() {
        let io = io_with_two_queues(&[1.0], &[2.0]);
        let (req, index) = io.select(&ReadPolicy::Priority).unwrap();
        assert_eq!((req.service_time(), index), (1.0, 0));
        let (req, index) = io.select(&ReadPolicy::Priority).unwrap();
        assert_eq!((req.service_time(), index), (2.0, 1));
        assert!(io.select(&ReadPolicy::Priority).is_none());
    }

    #[test]
    fn local_first_prefers_queue_zero() {
        let io = io_with_two_queues(&[1.0], &[2.0]);
        let (_, index) = io.select(&ReadPolicy::LocalFirst).unwrap();
        assert_eq!(index, 0);
        let empty_local = io_with_two_queues(&[], &[2.0]);
        let (_, index) = empty_local.select(&ReadPolicy::LocalFirst).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn weighted_rr_follows_the_weights() {
        let io = io_with_two_queues(&[1.0; 4], &[2.0; 2]);
        let policy = ReadPolicy::WeightedRr(vec![2, 1]);
        let picks: Vec<usize> = (0..6).map(|_| io.select(&policy).unwrap().1).collect();
        assert_eq!(picks, vec![0, 0, 1, 0, 0, 1]);
    }

    #[test]
    fn weighted_rr_falls_to_the_next_non_empty_queue() {
        let io = io_with_two_queues(&[], &[2.0, 2.0]);
        let policy = ReadPolicy::WeightedRr(vec![3, 1]);
        assert_eq!(io.select(&policy).unwrap().1, 1);
        assert_eq!(io.select(&policy).unwrap().1, 1);
        assert!(io.select(&policy).is_none());
    }
}
