//! Hardware checks and the suite that runs them.
//!
//! Every check implements [`HardwareTest`]: a single `run` entry point plus
//! access to the [`TestBase`] it is built on. `TestBase` carries what all
//! checks share: the device session, the operator console, the LED settings,
//! and the [`ResultLedger`] the check records its outcomes into.
//!
//! - [`notification`]: single-slot latch bridging device events into test logic
//! - [`ledger`]: per-test pass/fail outcomes
//! - [`buttons`]: press/release state machine over the device event stream
//! - [`led`]: palette walk confirmed by the operator
//! - [`suite`]: sequential orchestration and aggregation
//!
//! The verdict returned by `run` is `true` exactly when the test's ledger holds
//! no failed outcome.

use crate::color::{paint, Color, ConsoleStyles};
use crate::config::LedConfig;
use crate::device::{DeviceSession, Status};
use crate::error::AppResult;
use crate::operator::{parse_yes_no, Operator};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub mod buttons;
pub mod ledger;
pub mod led;
pub mod notification;
pub mod suite;

pub use buttons::ButtonsTest;
pub use led::LedTest;
pub use ledger::{Outcome, ResultLedger, Verdict};
pub use notification::Notification;
pub use suite::{run_factory_tests, Suite, SuiteOutcome, SuiteReport, TestRecord};

/// A hardware check.
#[async_trait]
pub trait HardwareTest: Send {
    /// Shared scaffolding of this check.
    fn base(&self) -> &TestBase;

    /// Runs the check and returns its verdict.
    ///
    /// Per-check failures are recorded in the ledger; only failures that make
    /// the whole check meaningless are returned as errors.
    async fn run(&mut self) -> AppResult<bool>;

    /// Release what an interrupted `run` still holds.
    ///
    /// Called by the suite after it dropped an in-flight `run`.
    async fn interrupt(&mut self) {}

    /// Display name of the check.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// Outcomes recorded so far.
    fn ledger(&self) -> &ResultLedger {
        self.base().ledger()
    }
}

/// Helpers shared by every check.
pub struct TestBase {
    name: String,
    session: Arc<dyn DeviceSession>,
    operator: Arc<dyn Operator>,
    led: LedConfig,
    ledger: ResultLedger,
}

impl TestBase {
    /// Create the scaffolding for a check called `name`.
    pub fn new(
        name: impl Into<String>,
        session: Arc<dyn DeviceSession>,
        operator: Arc<dyn Operator>,
        led: LedConfig,
    ) -> Self {
        Self {
            name: name.into(),
            session,
            operator,
            led,
            ledger: ResultLedger::new(),
        }
    }

    /// Name of the check.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device the check runs against.
    pub fn session(&self) -> &dyn DeviceSession {
        self.session.as_ref()
    }

    /// Operator console.
    pub fn operator(&self) -> &dyn Operator {
        self.operator.as_ref()
    }

    /// Outcomes recorded so far.
    pub fn ledger(&self) -> &ResultLedger {
        &self.ledger
    }

    /// True when no outcome failed.
    pub fn verdict(&self) -> bool {
        self.ledger.is_clean()
    }

    /// Show an instruction to the operator.
    pub fn prompt(&self, message: &str) {
        self.operator.prompt(message);
    }

    /// Ask a yes/no question. Anything but an explicit "no" counts as yes.
    pub async fn prompt_yn(&self, message: &str) -> AppResult<bool> {
        let prompt = paint(">>>", ConsoleStyles::default().prompt);
        let question = format!("{prompt} {message} [Y/n] ");
        let answer = self.operator.ask(&question).await?;
        Ok(parse_yes_no(&answer))
    }

    /// Record `check` as passed and flash the LED green.
    pub async fn pass_test(&mut self, check: &str) {
        self.ledger.record(Outcome::new(check, Verdict::Pass));
        info!(test = %self.name, check, "Check passed");
        self.report(Verdict::Pass, check);
        self.blink_led(&Color::rgb(0, 255, 0)).await;
    }

    /// Record `check` as failed and flash the LED red.
    pub async fn fail_test(&mut self, check: &str) {
        self.ledger.record(Outcome::new(check, Verdict::Fail));
        warn!(test = %self.name, check, "Check failed");
        self.report(Verdict::Fail, check);
        self.blink_led(&Color::rgb(255, 0, 0)).await;
    }

    fn report(&self, verdict: Verdict, check: &str) {
        let styles = ConsoleStyles::default();
        let style = match verdict {
            Verdict::Pass => styles.pass,
            Verdict::Fail => styles.fail,
        };
        self.operator
            .say(&format!("{} {check}", paint(verdict.marker(), style)));
    }

    /// Set the LED to `color` at the configured brightness.
    pub async fn set_led(&self, color: &Color) -> Status {
        self.session.set_rgb(color.hex(), self.led.brightness).await
    }

    /// Turn the LED off.
    pub async fn unset_led(&self) -> Status {
        self.session.set_off().await
    }

    /// Off, short pause, `color`, short pause, off.
    ///
    /// Operator feedback only: statuses are logged, never acted on.
    pub async fn blink_led(&self, color: &Color) {
        let delay = Duration::from_millis(self.led.blink_ms);
        let statuses = [
            self.unset_led().await,
            {
                tokio::time::sleep(delay).await;
                self.set_led(color).await
            },
            {
                tokio::time::sleep(delay).await;
                self.unset_led().await
            },
        ];
        if let Some(status) = statuses.iter().find(|status| !status.is_ok()) {
            debug!(test = %self.name, %status, "LED blink rejected by device");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{DeviceCall, MockDevice};
    use crate::operator::ScriptedOperator;

    fn base(device: Arc<MockDevice>, operator: Arc<ScriptedOperator>) -> TestBase {
        TestBase::new("ScratchTest", device, operator, LedConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_pass_and_fail_record_and_blink() {
        let device = Arc::new(MockDevice::new());
        let operator = Arc::new(ScriptedOperator::default());
        let mut base = base(Arc::clone(&device), Arc::clone(&operator));

        base.pass_test("first").await;
        assert!(base.verdict());
        base.fail_test("second").await;
        assert!(!base.verdict());

        assert_eq!(base.ledger().passed_names(), vec!["first"]);
        assert_eq!(base.ledger().failed_names(), vec!["second"]);
        assert_eq!(operator.transcript(), vec!["PASS: first", "FAIL: second"]);

        let off = DeviceCall::SetRgb {
            hex: 0,
            brightness: 0,
        };
        assert_eq!(
            device.calls().await,
            vec![
                off,
                DeviceCall::SetRgb {
                    hex: 0x00FF00,
                    brightness: 255
                },
                off,
                off,
                DeviceCall::SetRgb {
                    hex: 0xFF0000,
                    brightness: 255
                },
                off,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_blink_tolerates_rejected_led_calls() {
        let device = Arc::new(MockDevice::new().with_set_rgb_status(Status::Unavailable));
        let operator = Arc::new(ScriptedOperator::default());
        let mut base = base(device, operator);

        base.fail_test("no_led").await;
        assert_eq!(base.ledger().failed_names(), vec!["no_led"]);
    }

    #[tokio::test]
    async fn test_prompt_yn_defaults_to_yes() {
        let device = Arc::new(MockDevice::new());
        let operator = Arc::new(ScriptedOperator::with_answers(["", "n", "Y"]));
        let base = base(device, Arc::clone(&operator));

        assert!(base.prompt_yn("Is the LED white?").await.unwrap());
        assert!(!base.prompt_yn("Is the LED red?").await.unwrap());
        assert!(base.prompt_yn("Is the LED green?").await.unwrap());
        assert_eq!(operator.transcript()[0], ">>> Is the LED white? [Y/n] ");
    }

    #[tokio::test]
    async fn test_set_led_returns_device_status_unmodified() {
        let device = Arc::new(MockDevice::new().with_set_rgb_status(Status::ResourceExhausted));
        let base = base(device, Arc::new(ScriptedOperator::default()));

        assert_eq!(base.set_led(&Color::BLUE).await, Status::ResourceExhausted);
        assert_eq!(base.unset_led().await, Status::ResourceExhausted);
    }
}
