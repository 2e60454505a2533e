//! Fallback driver: ordered search over the strategy catalog.
//!
//! Strategies run strictly one after another, each with a fresh time limit.
//! The first accepted attempt ends the search. No strategy is retried, and
//! every attempt's result is kept, because the useful failure signal is
//! often in an early, conventional attempt rather than the last one.

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::InvocationSpec;
use crate::runner::{AttemptResult, ProcessRunner};

/// The search result: the accepted attempt (if any) and the full history.
#[derive(Debug, Clone)]
pub struct DriveOutcome {
    /// Winning strategy's spec and result.
    pub winner: Option<(InvocationSpec, AttemptResult)>,
    /// Every attempt in order, including the winner.
    pub attempts: Vec<AttemptResult>,
}

impl DriveOutcome {
    /// Whether any attempt exited zero, accepted or not.
    pub fn any_exit_zero(&self) -> bool {
        self.attempts.iter().any(|a| a.succeeded)
    }

    /// Last attempt that exited zero.
    pub fn last_exit_zero(&self) -> Option<&AttemptResult> {
        self.attempts.iter().rev().find(|a| a.succeeded)
    }
}

/// Drives a [`ProcessRunner`] over an ordered list of invocations.
#[derive(Clone)]
pub struct FallbackDriver {
    runner: Arc<dyn ProcessRunner>,
    attempt_timeout: Duration,
}

impl FallbackDriver {
    pub fn new(runner: Arc<dyn ProcessRunner>, attempt_timeout: Duration) -> Self {
        Self {
            runner,
            attempt_timeout,
        }
    }

    /// Stop at the first attempt that exits zero.
    pub async fn execute(&self, specs: &[InvocationSpec]) -> DriveOutcome {
        self.execute_until(specs, |_, _| true).await
    }

    /// Stop at the first attempt that exits zero and passes `accept`.
    ///
    /// `accept` is only consulted for exit-zero attempts; it lets the caller
    /// demand evidence such as a produced artifact.
    pub async fn execute_until<F>(&self, specs: &[InvocationSpec], accept: F) -> DriveOutcome
    where
        F: Fn(&InvocationSpec, &AttemptResult) -> bool,
    {
        let mut attempts = Vec::with_capacity(specs.len());

        for (index, spec) in specs.iter().enumerate() {
            tracing::info!(
                strategy = %spec.name,
                attempt = index + 1,
                of = specs.len(),
                "Trying strategy"
            );

            let result = self.runner.run(spec, self.attempt_timeout).await;
            attempts.push(result.clone());

            if !result.succeeded {
                tracing::warn!(
                    strategy = %spec.name,
                    outcome = %result.describe(),
                    "Strategy failed"
                );
                continue;
            }

            if accept(spec, &result) {
                tracing::info!(
                    strategy = %spec.name,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "Strategy succeeded"
                );
                return DriveOutcome {
                    winner: Some((spec.clone(), result)),
                    attempts,
                };
            }

            tracing::warn!(
                strategy = %spec.name,
                "Strategy exited zero but was not accepted, continuing"
            );
        }

        tracing::warn!(attempts = attempts.len(), "No strategy succeeded");
        DriveOutcome {
            winner: None,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Exits zero for strategies in `succeed`, non-zero otherwise, and
    /// records the order of calls and the time limit each received.
    struct ScriptedRunner {
        succeed: Vec<String>,
        calls: Mutex<Vec<(String, Duration)>>,
    }

    impl ScriptedRunner {
        fn new(succeed: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                succeed: succeed.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn run(&self, spec: &InvocationSpec, limit: Duration) -> AttemptResult {
            self.calls.lock().unwrap().push((spec.name.clone(), limit));
            let code = if self.succeed.contains(&spec.name) { 0 } else { 1 };
            AttemptResult::completed(
                spec,
                Some(code),
                String::new(),
                format!("stderr of {}", spec.name),
                Duration::from_millis(5),
            )
        }
    }

    fn specs(n: usize) -> Vec<InvocationSpec> {
        (1..=n)
            .map(|i| InvocationSpec {
                name: format!("s{i}"),
                program: "tool".into(),
                args: vec![],
                working_dir: PathBuf::from("/"),
                env: BTreeMap::new(),
                output: PathBuf::from("/out.mp4"),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_stops_at_kth_success() {
        for k in 1..=4 {
            let name = format!("s{k}");
            let runner = ScriptedRunner::new(&[name.as_str()]);
            let driver = FallbackDriver::new(runner.clone(), Duration::from_secs(60));

            let outcome = driver.execute(&specs(4)).await;

            assert_eq!(outcome.attempts.len(), k);
            assert_eq!(runner.calls().len(), k);
            let (spec, result) = outcome.winner.unwrap();
            assert_eq!(spec.name, name);
            assert!(result.succeeded);
            assert_eq!(outcome.attempts.last().unwrap().strategy, name);
        }
    }

    #[tokio::test]
    async fn test_all_failing_runs_every_strategy_once() {
        let runner = ScriptedRunner::new(&[]);
        let driver = FallbackDriver::new(runner.clone(), Duration::from_secs(60));

        let outcome = driver.execute(&specs(3)).await;

        assert!(outcome.winner.is_none());
        assert_eq!(outcome.attempts.len(), 3);
        assert_eq!(runner.calls(), vec!["s1", "s2", "s3"]);
        assert!(outcome.attempts.iter().all(|a| a.stderr.starts_with("stderr of")));
        assert!(!outcome.any_exit_zero());
    }

    #[tokio::test]
    async fn test_each_attempt_gets_full_timeout() {
        let runner = ScriptedRunner::new(&[]);
        let driver = FallbackDriver::new(runner.clone(), Duration::from_secs(42));

        driver.execute(&specs(3)).await;

        let limits: Vec<_> = runner.calls.lock().unwrap().iter().map(|(_, d)| *d).collect();
        assert_eq!(limits, vec![Duration::from_secs(42); 3]);
    }

    #[tokio::test]
    async fn test_rejected_success_continues_search() {
        let runner = ScriptedRunner::new(&["s1", "s3"]);
        let driver = FallbackDriver::new(runner.clone(), Duration::from_secs(60));

        let outcome = driver
            .execute_until(&specs(4), |spec, _| spec.name != "s1")
            .await;

        assert_eq!(outcome.winner.unwrap().0.name, "s3");
        assert_eq!(outcome.attempts.len(), 3);
        assert_eq!(runner.calls(), vec!["s1", "s2", "s3"]);
    }

    #[tokio::test]
    async fn test_rejected_successes_reported_without_winner() {
        let runner = ScriptedRunner::new(&["s2"]);
        let driver = FallbackDriver::new(runner, Duration::from_secs(60));

        let outcome = driver.execute_until(&specs(3), |_, _| false).await;

        assert!(outcome.winner.is_none());
        assert_eq!(outcome.attempts.len(), 3);
        assert!(outcome.any_exit_zero());
        assert_eq!(outcome.last_exit_zero().unwrap().strategy, "s2");
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let driver = FallbackDriver::new(ScriptedRunner::new(&[]), Duration::from_secs(1));
        let outcome = driver.execute(&[]).await;
        assert!(outcome.winner.is_none());
        assert!(outcome.attempts.is_empty());
    }
}
