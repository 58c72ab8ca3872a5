//! Tests for `RetryPolicy`.

use super::RetryPolicy;
use std::time::Duration;

mod defaults {
    use super::*;

    #[test]
    fn new_creates_policy_with_defaults() {
        let policy = RetryPolicy::new();

        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert!((policy.multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(policy.jitter_percent, 20);
    }

    #[test]
    fn default_trait_matches_new() {
        assert_eq!(RetryPolicy::new(), RetryPolicy::default());
    }
}

mod builder {
    use super::*;

    #[test]
    fn builder_chains_correctly() {
        let policy = RetryPolicy::new()
            .with_max_attempts(5)
            .with_initial_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(10))
            .with_multiplier(3.0)
            .with_jitter_percent(0);

        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
        assert!((policy.multiplier - 3.0).abs() < f64::EPSILON);
        assert_eq!(policy.jitter_percent, 0);
    }

    #[test]
    #[should_panic(expected = "max_attempts must be at least 1")]
    fn zero_max_attempts_panics() {
        let _ = RetryPolicy::new().with_max_attempts(0);
    }

    #[test]
    #[should_panic(expected = "multiplier must be at least 1.0")]
    fn shrinking_multiplier_panics() {
        let _ = RetryPolicy::new().with_multiplier(0.5);
    }

    #[test]
    fn unit_multiplier_gives_constant_backoff() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_secs(1))
            .with_multiplier(1.0)
            .with_jitter_percent(0);

        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(1));
    }

    #[test]
    #[should_panic(expected = "jitter_percent must be at most 100")]
    fn excessive_jitter_panics() {
        let _ = RetryPolicy::new().with_jitter_percent(101);
    }
}

mod backoff {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new()
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(30))
            .with_multiplier(2.0)
    }

    #[test]
    fn base_grows_exponentially() {
        let policy = policy();

        assert_eq!(policy.base_backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.base_backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.base_backoff_for(3), Duration::from_secs(4));
        assert_eq!(policy.base_backoff_for(4), Duration::from_secs(8));
    }

    #[test]
    fn base_is_capped_and_non_decreasing() {
        let policy = policy();
        let mut previous = Duration::ZERO;

        for attempts in 1..50 {
            let delay = policy.base_backoff_for(attempts);
            assert!(delay >= previous, "attempt {attempts} decreased");
            assert!(delay <= policy.max_delay);
            previous = delay;
        }
        assert_eq!(previous, Duration::from_secs(30));
    }

    #[test]
    fn huge_attempt_count_saturates_at_cap() {
        assert_eq!(policy().base_backoff_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn jitter_stays_within_twenty_percent() {
        let policy = policy();

        for _ in 0..200 {
            let delay = policy.backoff_for(2);
            assert!(delay >= Duration::from_millis(1600), "{delay:?} too short");
            assert!(delay <= Duration::from_millis(2400), "{delay:?} too long");
        }
    }

    #[test]
    fn jitter_never_exceeds_cap() {
        let policy = policy();

        for _ in 0..200 {
            assert!(policy.backoff_for(10) <= Duration::from_secs(30));
        }
    }

    #[test]
    fn zero_jitter_is_deterministic() {
        let policy = policy().with_jitter_percent(0);

        assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
    }
}

mod rate_limit_delay {
    use super::*;

    #[test]
    fn never_shorter_than_server_delay() {
        let policy = RetryPolicy::new();
        let retry_after = Duration::from_secs(2);

        for _ in 0..200 {
            let delay = policy.rate_limit_delay(retry_after);
            assert!(delay >= retry_after);
            assert!(delay <= Duration::from_millis(2400));
        }
    }

    #[test]
    fn not_capped_by_max_delay() {
        let policy = RetryPolicy::new()
            .with_max_delay(Duration::from_secs(1))
            .with_jitter_percent(0);

        assert_eq!(
            policy.rate_limit_delay(Duration::from_secs(60)),
            Duration::from_secs(60)
        );
    }
}

mod should_retry {
    use super::*;

    #[test]
    fn allows_attempts_below_ceiling() {
        let policy = RetryPolicy::new().with_max_attempts(3);

        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn single_attempt_never_retries() {
        assert!(!RetryPolicy::new().with_max_attempts(1).should_retry(1));
    }
}
