//! Bounded-attempt exponential backoff with jitter, honoring `Retry-After`
//! and the OTLP retryable status codes (spec.md §4.7).

use rand::Rng;
use std::time::Duration;

/// What the per-response decision function says to do with one attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    DoNotRetry,
    RetryWithBackoff,
    RetryWithSpecificBackoff(Duration),
}

/// What [`RetryPolicy::next`] tells the caller to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    DoNotRetry,
    RetryAfter(Duration),
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: f64,
    attempt: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration, jitter: f64) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay,
            max_delay,
            jitter,
            attempt: 0,
        }
    }

    /// Runs one step of the decision algorithm (spec.md §4.7). The caller
    /// supplies `decision` for the attempt just observed; `next` advances
    /// the attempt counter, caps it against `max_attempts`, and computes
    /// the concrete backoff.
    pub fn next(&mut self, decision: Decision) -> Outcome {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return Outcome::DoNotRetry;
        }
        match decision {
            Decision::DoNotRetry => Outcome::DoNotRetry,
            Decision::RetryWithSpecificBackoff(d) => Outcome::RetryAfter(d),
            Decision::RetryWithBackoff => Outcome::RetryAfter(self.backoff()),
        }
    }

    fn backoff(&self) -> Duration {
        let exponential = self.base_delay.as_secs_f64() * 2f64.powi(self.attempt as i32 - 1);
        let capped = exponential.min(self.max_delay.as_secs_f64());
        let jitter_sample = if self.jitter > 0.0 {
            rand::rng().random_range(-1.0..=1.0)
        } else {
            0.0
        };
        let delay = (capped + capped * self.jitter * jitter_sample).max(0.0);
        Duration::from_secs_f64(delay)
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// OTLP's specialization of the per-response decision function
/// (spec.md §4.7, §8 scenario 6): retryable statuses are
/// `{429, 502, 503, 504}`; everything else never retries.
pub fn otlp_decision(status: u16, retry_after: Option<&str>) -> Decision {
    const RETRYABLE: [u16; 4] = [429, 502, 503, 504];
    if !RETRYABLE.contains(&status) {
        return Decision::DoNotRetry;
    }
    match retry_after.and_then(parse_retry_after) {
        Some(d) => Decision::RetryWithSpecificBackoff(d),
        None => Decision::RetryWithBackoff,
    }
}

/// Parses a `Retry-After` header value. The spec only requires the
/// integer-seconds form; the HTTP-date form is accepted too since a
/// compliant server MAY send either.
fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let when = httpdate::parse_http_date(value.trim()).ok()?;
    let now = std::time::SystemTime::now();
    when.duration_since(now).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_status_without_header_backs_off_exponentially() {
        let mut policy = RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(10), 0.0);
        assert_eq!(
            policy.next(otlp_decision(503, None)),
            Outcome::RetryAfter(Duration::from_secs(1))
        );
        assert_eq!(
            policy.next(otlp_decision(503, None)),
            Outcome::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(
            policy.next(otlp_decision(503, None)),
            Outcome::RetryAfter(Duration::from_secs(4))
        );
    }

    #[test]
    fn retry_after_header_is_honored_verbatim() {
        let mut policy = RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(10), 0.0);
        assert_eq!(
            policy.next(otlp_decision(429, Some("42"))),
            Outcome::RetryAfter(Duration::from_secs(42))
        );
    }

    #[test]
    fn non_retryable_status_never_retries() {
        let mut policy = RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(10), 0.0);
        assert_eq!(policy.next(otlp_decision(400, None)), Outcome::DoNotRetry);
        assert_eq!(policy.next(otlp_decision(200, None)), Outcome::DoNotRetry);
    }

    #[test]
    fn attempts_cap_is_enforced() {
        let mut policy = RetryPolicy::new(2, Duration::from_secs(1), Duration::from_secs(10), 0.0);
        assert_eq!(
            policy.next(otlp_decision(503, None)),
            Outcome::RetryAfter(Duration::from_secs(1))
        );
        // attempt counter now == max_attempts: do not retry, even though
        // the decision function alone would say to.
        assert_eq!(policy.next(otlp_decision(503, None)), Outcome::DoNotRetry);
    }

    #[test]
    fn delay_is_capped_at_max_delay() {
        let mut policy = RetryPolicy::new(10, Duration::from_secs(1), Duration::from_secs(3), 0.0);
        for _ in 0..3 {
            policy.next(otlp_decision(503, None));
        }
        assert_eq!(
            policy.next(otlp_decision(503, None)),
            Outcome::RetryAfter(Duration::from_secs(3))
        );
    }
}
