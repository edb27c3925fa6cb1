//! Sequential suite orchestration and result aggregation.
//!
//! A [`Suite`] runs its checks once each, in order, never concurrently. A check
//! that records failures does not stop the ones after it; only an error
//! returned from `run` (a rejected precondition) aborts the remaining checks.
//! Results are collected into a [`SuiteReport`] that lives for the duration of
//! the process only.

use super::{ButtonsTest, HardwareTest, LedTest, Outcome};
use crate::color::{paint, ConsoleStyles};
use crate::config::HarnessConfig;
use crate::device::DeviceSession;
use crate::error::AppResult;
use crate::operator::Operator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Results of one executed check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    /// Check name.
    pub name: String,
    /// Value returned by `run`.
    pub verdict: bool,
    /// Outcomes that passed.
    pub passed: Vec<Outcome>,
    /// Outcomes that failed.
    pub failed: Vec<Outcome>,
    /// Wall-clock time spent in `run`.
    pub duration: Duration,
}

/// Aggregated results of a suite run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// One record per executed check, in execution order.
    pub records: Vec<TestRecord>,
}

impl SuiteReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            records: Vec::new(),
        }
    }

    /// Passed outcomes across all checks.
    pub fn passed_count(&self) -> usize {
        self.records.iter().map(|r| r.passed.len()).sum()
    }

    /// Failed outcomes across all checks.
    pub fn failed_count(&self) -> usize {
        self.records.iter().map(|r| r.failed.len()).sum()
    }

    /// Every failed outcome, in execution order. Duplicate names stay distinct.
    pub fn all_failures(&self) -> Vec<&Outcome> {
        self.records.iter().flat_map(|r| r.failed.iter()).collect()
    }

    /// True if no check recorded a failure.
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Human-readable summary line.
    pub fn summary_line(&self) -> String {
        if self.all_passed() {
            "All tests passed".to_string()
        } else {
            format!(
                "{} tests passed, {} tests failed",
                self.passed_count(),
                self.failed_count()
            )
        }
    }

    /// Report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// How a suite run ended.
#[derive(Debug, Clone)]
pub enum SuiteOutcome {
    /// Every check ran.
    Completed(SuiteReport),
    /// The operator interrupted the run; holds the checks that finished.
    Interrupted(SuiteReport),
}

impl SuiteOutcome {
    /// Results gathered before the run ended.
    pub fn report(&self) -> &SuiteReport {
        match self {
            SuiteOutcome::Completed(report) | SuiteOutcome::Interrupted(report) => report,
        }
    }

    /// True only for a completed run with no failures.
    pub fn all_passed(&self) -> bool {
        matches!(self, SuiteOutcome::Completed(report) if report.all_passed())
    }
}

/// Ordered list of checks run once each.
pub struct Suite {
    tests: Vec<Box<dyn HardwareTest>>,
    operator: Arc<dyn Operator>,
}

impl Suite {
    /// Empty suite reporting to `operator`.
    pub fn new(operator: Arc<dyn Operator>) -> Self {
        Self {
            tests: Vec::new(),
            operator,
        }
    }

    /// The factory suite: LED palette, then buttons.
    pub fn factory(
        session: Arc<dyn DeviceSession>,
        operator: Arc<dyn Operator>,
        config: &HarnessConfig,
    ) -> Self {
        Self::new(Arc::clone(&operator))
            .with_test(LedTest::new(Arc::clone(&session), Arc::clone(&operator), config))
            .with_test(ButtonsTest::new(session, operator, config))
    }

    /// Append a check.
    pub fn with_test(mut self, test: impl HardwareTest + 'static) -> Self {
        self.tests.push(Box::new(test));
        self
    }

    /// Number of checks.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// True if the suite has no checks.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Run every check in order and print the summary.
    pub async fn run(&mut self) -> AppResult<SuiteReport> {
        let mut report = SuiteReport::new();
        self.run_into(&mut report).await?;
        self.finish(&report);
        Ok(report)
    }

    /// Like [`Suite::run`], but stop early once `shutdown` resolves.
    ///
    /// The in-flight check is dropped and then told to release what it holds,
    /// so no event callback runs once this returns.
    pub async fn run_until<F>(&mut self, shutdown: F) -> AppResult<SuiteOutcome>
    where
        F: Future<Output = ()>,
    {
        let operator = Arc::clone(&self.operator);
        let mut report = SuiteReport::new();
        let interrupted = tokio::select! {
            result = self.run_into(&mut report) => {
                result?;
                false
            }
            () = shutdown => true,
        };

        if interrupted {
            warn!(completed = report.records.len(), "Suite interrupted by operator");
            // Records are pushed as checks finish, so this is the one in flight.
            if let Some(test) = self.tests.get_mut(report.records.len()) {
                test.interrupt().await;
            }
            let styles = ConsoleStyles::default();
            operator.say(&paint("\nCtrl-C detected, exiting.", styles.interrupt));
            return Ok(SuiteOutcome::Interrupted(report));
        }
        self.finish(&report);
        Ok(SuiteOutcome::Completed(report))
    }

    async fn run_into(&mut self, report: &mut SuiteReport) -> AppResult<()> {
        self.operator.say("\nStarting hardware tests");

        for test in self.tests.iter_mut() {
            let start_msg = format!("Running test {}", test.name());
            let rule = "=".repeat(start_msg.len());
            self.operator.say("");
            self.operator.say(&rule);
            self.operator.say(&start_msg);
            self.operator.say(&rule);
            info!(test = %test.name(), "Running test");

            let started = Instant::now();
            let verdict = test.run().await?;
            let ledger = test.ledger();
            info!(
                test = %test.name(),
                verdict,
                passed = ledger.passed().len(),
                failed = ledger.failed().len(),
                "Test finished"
            );

            report.records.push(TestRecord {
                name: test.name().to_string(),
                verdict,
                passed: ledger.passed().to_vec(),
                failed: ledger.failed().to_vec(),
                duration: started.elapsed(),
            });
        }
        Ok(())
    }

    fn finish(&self, report: &SuiteReport) {
        self.operator.say(&format!("\n{}", report.summary_line()));
        match report.to_json() {
            Ok(json) => info!(report = %json, "Suite complete"),
            Err(err) => warn!(error = %err, "Failed to serialize suite report"),
        }
    }
}

/// Run the factory suite against `session`.
///
/// Returns `true` when every check passed.
pub async fn run_factory_tests(
    session: Arc<dyn DeviceSession>,
    operator: Arc<dyn Operator>,
    config: &HarnessConfig,
) -> AppResult<bool> {
    let report = Suite::factory(session, operator, config).run().await?;
    Ok(report.all_passed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedConfig;
    use crate::device::mock::MockDevice;
    use crate::device::{Status, TestKind};
    use crate::error::HarnessError;
    use crate::operator::ScriptedOperator;
    use crate::testing::TestBase;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Check that records a fixed list of outcomes.
    struct StubTest {
        base: TestBase,
        checks: Vec<(&'static str, bool)>,
        runs: Arc<AtomicUsize>,
    }

    impl StubTest {
        fn new(
            name: &str,
            checks: Vec<(&'static str, bool)>,
            device: &Arc<MockDevice>,
            operator: &Arc<ScriptedOperator>,
            runs: &Arc<AtomicUsize>,
        ) -> Self {
            Self {
                base: TestBase::new(
                    name,
                    Arc::clone(device) as Arc<dyn DeviceSession>,
                    Arc::clone(operator) as Arc<dyn Operator>,
                    LedConfig::default(),
                ),
                checks,
                runs: Arc::clone(runs),
            }
        }
    }

    #[async_trait]
    impl HardwareTest for StubTest {
        fn base(&self) -> &TestBase {
            &self.base
        }

        async fn run(&mut self) -> AppResult<bool> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            for (check, passes) in self.checks.clone() {
                if passes {
                    self.base.pass_test(check).await;
                } else {
                    self.base.fail_test(check).await;
                }
            }
            Ok(self.base.verdict())
        }
    }

    /// Check that is rejected by the device.
    struct RejectedTest {
        base: TestBase,
    }

    #[async_trait]
    impl HardwareTest for RejectedTest {
        fn base(&self) -> &TestBase {
            &self.base
        }

        async fn run(&mut self) -> AppResult<bool> {
            Err(HarnessError::test_mode(
                "RejectedTest",
                "StartTest",
                TestKind::Ltr559Prox,
                Status::FailedPrecondition,
            ))
        }
    }

    /// Check that never finishes.
    struct HangingTest {
        base: TestBase,
        interrupts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HardwareTest for HangingTest {
        fn base(&self) -> &TestBase {
            &self.base
        }

        async fn run(&mut self) -> AppResult<bool> {
            std::future::pending::<()>().await;
            Ok(true)
        }

        async fn interrupt(&mut self) {
            self.interrupts.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fixtures() -> (Arc<MockDevice>, Arc<ScriptedOperator>, Arc<AtomicUsize>) {
        (
            Arc::new(MockDevice::new()),
            Arc::new(ScriptedOperator::default()),
            Arc::new(AtomicUsize::new(0)),
        )
    }

    fn bare_base(
        name: &str,
        device: &Arc<MockDevice>,
        operator: &Arc<ScriptedOperator>,
    ) -> TestBase {
        TestBase::new(
            name,
            Arc::clone(device) as Arc<dyn DeviceSession>,
            Arc::clone(operator) as Arc<dyn Operator>,
            LedConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_in_middle_test_does_not_stop_suite() {
        let (device, operator, runs) = fixtures();
        let mut suite = Suite::new(Arc::clone(&operator) as Arc<dyn Operator>)
            .with_test(StubTest::new("First", vec![("one", true)], &device, &operator, &runs))
            .with_test(StubTest::new(
                "Second",
                vec![("two_a", true), ("two_b", false)],
                &device,
                &operator,
                &runs,
            ))
            .with_test(StubTest::new("Third", vec![("three", true)], &device, &operator, &runs));

        let report = suite.run().await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert!(!report.all_passed());
        let failures: Vec<&str> = report.all_failures().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(failures, vec!["two_b"]);
        assert_eq!(report.passed_count(), 3);
        assert_eq!(
            report.records.iter().map(|r| r.verdict).collect::<Vec<_>>(),
            vec![true, false, true]
        );
        assert_eq!(operator.transcript().last().unwrap(), "\n3 tests passed, 1 tests failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_banner_and_all_passed_summary() {
        let (device, operator, runs) = fixtures();
        let mut suite = Suite::new(Arc::clone(&operator) as Arc<dyn Operator>)
            .with_test(StubTest::new(
                "LedTest",
                vec![("led_red", true)],
                &device,
                &operator,
                &runs,
            ));

        let report = suite.run().await.unwrap();
        assert!(report.all_passed());

        let transcript = operator.transcript();
        assert!(transcript.contains(&"Running test LedTest".to_string()));
        assert!(transcript.contains(&"====================".to_string()));
        assert_eq!(transcript.last().unwrap(), "\nAll tests passed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_names_across_tests_stay_distinct() {
        let (device, operator, runs) = fixtures();
        let mut suite = Suite::new(Arc::clone(&operator) as Arc<dyn Operator>)
            .with_test(StubTest::new("A", vec![("check", false)], &device, &operator, &runs))
            .with_test(StubTest::new("B", vec![("check", false)], &device, &operator, &runs));

        let report = suite.run().await.unwrap();
        assert_eq!(report.failed_count(), 2);
        assert!(report.to_json().unwrap().contains("\"check\""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_precondition_failure_aborts_suite() {
        let (device, operator, runs) = fixtures();
        let mut suite = Suite::new(Arc::clone(&operator) as Arc<dyn Operator>)
            .with_test(StubTest::new("First", vec![("one", true)], &device, &operator, &runs))
            .with_test(RejectedTest {
                base: bare_base("RejectedTest", &device, &operator),
            })
            .with_test(StubTest::new("Third", vec![("three", true)], &device, &operator, &runs));

        let err = suite.run().await.unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_keeps_completed_results() {
        let (device, operator, runs) = fixtures();
        let interrupts = Arc::new(AtomicUsize::new(0));
        let mut suite = Suite::new(Arc::clone(&operator) as Arc<dyn Operator>)
            .with_test(StubTest::new("First", vec![("one", true)], &device, &operator, &runs))
            .with_test(HangingTest {
                base: bare_base("HangingTest", &device, &operator),
                interrupts: Arc::clone(&interrupts),
            })
            .with_test(StubTest::new("Third", vec![("three", true)], &device, &operator, &runs));

        let outcome = suite
            .run_until(tokio::time::sleep(Duration::from_secs(30)))
            .await
            .unwrap();

        assert!(matches!(outcome, SuiteOutcome::Interrupted(_)));
        assert!(!outcome.all_passed());
        assert_eq!(outcome.report().records.len(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(interrupts.load(Ordering::SeqCst), 1);
        assert_eq!(operator.transcript().last().unwrap(), "\nCtrl-C detected, exiting.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_completes_without_shutdown() {
        let (device, operator, runs) = fixtures();
        let mut suite = Suite::new(Arc::clone(&operator) as Arc<dyn Operator>)
            .with_test(StubTest::new("Only", vec![("one", true)], &device, &operator, &runs));

        let outcome = suite.run_until(std::future::pending()).await.unwrap();
        assert!(matches!(outcome, SuiteOutcome::Completed(_)));
        assert!(outcome.all_passed());
    }
}
