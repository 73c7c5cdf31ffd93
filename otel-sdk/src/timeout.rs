//! Bounds any async operation to a deadline with cancellation (spec.md §4.9).

use crate::clock::Clock;
use futures_util::future::{self, Either};
use std::fmt;
use std::time::Duration;

/// The operation did not complete before `duration` elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed;

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation timed out")
    }
}

impl std::error::Error for Elapsed {}

/// Races `operation` against a sleep of `duration` on `clock`. On timeout
/// the operation future is dropped (cancelling it) and `Err(Elapsed)` is
/// reported; the operation is never left running after this returns.
pub async fn with_timeout<C, F>(duration: Duration, clock: &C, operation: F) -> Result<F::Output, Elapsed>
where
    C: Clock,
    F: std::future::Future,
{
    let sleep = clock.sleep(duration);
    futures_util::pin_mut!(operation);
    futures_util::pin_mut!(sleep);
    match future::select(operation, sleep).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right((_, _)) => Err(Elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{SystemClock, TestClock};

    #[tokio::test]
    async fn completes_before_deadline() {
        let result = with_timeout(Duration::from_secs(10), &SystemClock, async { 42 }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn times_out_on_test_clock() {
        let clock = TestClock::new();
        let op_clock = clock.clone();
        let timeout_clock = clock.clone();
        let op = async move {
            op_clock.sleep(Duration::from_secs(5)).await;
            42
        };
        let handle =
            tokio::spawn(async move { with_timeout(Duration::from_secs(1), &timeout_clock, op).await });

        tokio::task::yield_now().await;
        clock.advance(Duration::from_secs(1));
        let result = handle.await.unwrap();
        assert_eq!(result, Err(Elapsed));
    }
}
