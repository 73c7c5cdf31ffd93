//! Pluggable notion of time.
//!
//! The teacher's `Runtime`/`RuntimeChannel` traits (`thread_runtime.rs`)
//! exist to let a processor be generic over which async executor drives
//! its timers. Nothing here needs to swap executors — `tokio` is assumed
//! throughout — but §4.9 and §8 of the spec require a *clock* that tests
//! can advance by hand ("advance the test clock by 2 seconds"), so the
//! abstraction is narrowed to just that.

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt as _;

/// A source of `Instant`s and delays, pluggable so tests can run without
/// real wall-clock waits.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current time according to this clock.
    fn now(&self) -> Instant;

    /// Resolves once `duration` has elapsed on this clock.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;

    /// A stream that ticks every `period`, starting one period from now
    /// (the first, immediate tick of `tokio::time::interval` is skipped so
    /// a freshly constructed processor does not fire before any data has
    /// had a chance to arrive).
    fn interval(&self, period: Duration) -> BoxStream<'static, ()>;
}

/// The real clock: thin wrapper over `tokio::time`.
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }

    fn interval(&self, period: Duration) -> BoxStream<'static, ()> {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let stream = IntervalStream::new(interval).map(|_| ()).skip(1);
        Box::pin(stream)
    }
}

struct Waiter {
    deadline: Instant,
    seq: u64,
    notify: tokio::sync::oneshot::Sender<()>,
}

impl PartialEq for Waiter {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}
impl Eq for Waiter {}
impl PartialOrd for Waiter {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Waiter {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse so `BinaryHeap` (a max-heap) pops the earliest deadline first.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct TestClockState {
    now: Instant,
    waiters: BinaryHeap<Waiter>,
    next_seq: u64,
}

/// A manually advanced virtual clock for deterministic tests.
///
/// `now()` starts at construction time and only moves forward when
/// `advance` is called. Anything sleeping on this clock resolves as soon
/// as `advance` crosses its deadline, regardless of real wall-clock time.
#[derive(Clone)]
pub struct TestClock {
    state: Arc<Mutex<TestClockState>>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    pub fn new() -> Self {
        TestClock {
            state: Arc::new(Mutex::new(TestClockState {
                now: Instant::now(),
                waiters: BinaryHeap::new(),
                next_seq: 0,
            })),
        }
    }

    /// Moves the clock forward, waking any sleeper whose deadline has
    /// been crossed, in deadline order.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.now += duration;
        let now = state.now;
        while let Some(top) = state.waiters.peek() {
            if top.deadline > now {
                break;
            }
            let waiter = state.waiters.pop().unwrap();
            let _ = waiter.notify.send(());
        }
    }

    fn register(&self, deadline: Instant) -> tokio::sync::oneshot::Receiver<()> {
        let mut state = self.state.lock().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        if deadline <= state.now {
            let _ = tx.send(());
        } else {
            let seq = state.next_seq;
            state.next_seq += 1;
            state.waiters.push(Waiter {
                deadline,
                seq,
                notify: tx,
            });
        }
        rx
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.state.lock().unwrap().now
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        let deadline = self.now() + duration;
        let rx = self.register(deadline);
        Box::pin(async move {
            let _ = rx.await;
        })
    }

    fn interval(&self, period: Duration) -> BoxStream<'static, ()> {
        let clock = self.clone();
        let stream = futures_util::stream::unfold(clock.now() + period, move |deadline| {
            let clock = clock.clone();
            async move {
                let rx = clock.register(deadline);
                let _ = rx.await;
                Some(((), deadline + period))
            }
        });
        Box::pin(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clock_sleep_resolves_on_advance() {
        let clock = TestClock::new();
        let clock2 = clock.clone();
        let handle = tokio::spawn(async move {
            clock2.sleep(Duration::from_secs(2)).await;
        });

        tokio::task::yield_now().await;
        clock.advance(Duration::from_secs(1));
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        clock.advance(Duration::from_secs(1));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_clock_interval_ticks_in_order() {
        let clock = TestClock::new();
        let mut interval = clock.interval(Duration::from_secs(1));
        let clock2 = clock.clone();
        let handle = tokio::spawn(async move {
            use futures_util::StreamExt as _;
            interval.next().await;
            interval.next().await;
        });
        tokio::task::yield_now().await;
        clock2.advance(Duration::from_secs(1));
        tokio::task::yield_now().await;
        clock2.advance(Duration::from_secs(1));
        handle.await.unwrap();
    }
}
