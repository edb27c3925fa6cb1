//! Front-panel button check.
//!
//! Walks the buttons in order and, for each one, waits for the device to
//! publish a press followed by a release. Both edges arrive on the same event
//! field (`button_<x>_pressed`), `true` for the press and `false` for the
//! release. The check arms a [`ButtonWatch`] for the current button and the
//! subscription callback advances it edge by edge, so a press and release that
//! arrive back to back are both counted.
//!
//! Each wait has its own timeout. A button that times out is recorded as failed
//! and the sequence moves on to the next button.

use super::notification::Notification;
use super::{HardwareTest, TestBase};
use crate::config::HarnessConfig;
use crate::device::subscription::{subscribe, Subscription};
use crate::device::{Button, DeviceEvent, DeviceSession, Status, TestKind};
use crate::error::{AppResult, HarnessError};
use crate::operator::Operator;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Name of the check as shown in the suite banner.
pub const TEST_NAME: &str = "ButtonsTest";

/// The event a pending wait is looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedEvent {
    /// Event field to inspect.
    pub field: String,
    /// Value the field must carry.
    pub value: bool,
}

impl ExpectedEvent {
    /// Expectation for `button` in `phase`.
    pub fn new(button: Button, phase: Phase) -> Self {
        Self {
            field: button.event_field(),
            value: phase == Phase::AwaitingPress,
        }
    }

    /// True if `event` carries the expected field with the expected value.
    pub fn matches(&self, event: &DeviceEvent) -> bool {
        event.field(&self.field) == Some(self.value)
    }
}

/// Sub-state of a single button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the field to report `true`.
    AwaitingPress,
    /// Waiting for the field to report `false`.
    AwaitingRelease,
}

/// What a transition produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Still on the same button.
    Continue,
    /// The button saw both edges.
    Passed(Button),
    /// A wait on the button timed out.
    Failed(Button),
}

/// Press/release state machine over an ordered list of buttons.
#[derive(Debug, Clone)]
pub struct ButtonSequence {
    buttons: Vec<Button>,
    index: usize,
    phase: Phase,
}

impl ButtonSequence {
    /// Start at the first button's press.
    pub fn new(buttons: impl Into<Vec<Button>>) -> Self {
        Self {
            buttons: buttons.into(),
            index: 0,
            phase: Phase::AwaitingPress,
        }
    }

    /// Button and phase being waited for, or `None` once finished.
    pub fn current(&self) -> Option<(Button, Phase)> {
        self.buttons
            .get(self.index)
            .map(|button| (*button, self.phase))
    }

    /// True once every button has been processed.
    pub fn is_finished(&self) -> bool {
        self.index >= self.buttons.len()
    }

    /// The awaited event arrived.
    pub fn on_matched(&mut self) -> Step {
        let Some((button, phase)) = self.current() else {
            return Step::Continue;
        };
        match phase {
            Phase::AwaitingPress => {
                self.phase = Phase::AwaitingRelease;
                Step::Continue
            }
            Phase::AwaitingRelease => {
                self.next_button();
                Step::Passed(button)
            }
        }
    }

    /// The wait timed out: abandon the button.
    pub fn on_timeout(&mut self) -> Step {
        let Some((button, _)) = self.current() else {
            return Step::Continue;
        };
        self.next_button();
        Step::Failed(button)
    }

    fn next_button(&mut self) {
        self.index += 1;
        self.phase = Phase::AwaitingPress;
    }
}

/// Progress of the button being watched.
///
/// Armed by the test, advanced by the subscription task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonWatch {
    button: Button,
    awaiting: Option<Phase>,
}

impl ButtonWatch {
    /// Watch `button`, starting at its press.
    pub fn new(button: Button) -> Self {
        Self {
            button,
            awaiting: Some(Phase::AwaitingPress),
        }
    }

    /// Button being watched.
    pub fn button(&self) -> Button {
        self.button
    }

    /// The edge still awaited, or `None` once the button was released.
    pub fn expected(&self) -> Option<ExpectedEvent> {
        self.awaiting
            .map(|phase| ExpectedEvent::new(self.button, phase))
    }

    /// Record `event` if it is the next awaited edge.
    pub fn advance(&mut self, event: &DeviceEvent) -> bool {
        let Some(expected) = self.expected() else {
            return false;
        };
        if !expected.matches(event) {
            return false;
        }
        self.awaiting = match self.awaiting {
            Some(Phase::AwaitingPress) => Some(Phase::AwaitingRelease),
            _ => None,
        };
        true
    }

    /// True once the edge awaited in `phase` has been seen.
    pub fn has_seen(&self, phase: Phase) -> bool {
        match self.awaiting {
            None => true,
            Some(Phase::AwaitingRelease) => phase == Phase::AwaitingPress,
            Some(Phase::AwaitingPress) => false,
        }
    }
}

/// A wait that saw no matching event in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeout(pub Duration);

impl fmt::Display for WaitTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No device response detected within {:?}s",
            self.0.as_secs_f64()
        )
    }
}

/// Offer a device event to the watched button, if any.
///
/// Runs on the subscription task. Events with a non-OK stream status and
/// events arriving while nothing is armed are dropped.
pub fn offer_event(
    notification: &Notification<ButtonWatch>,
    status: Status,
    event: &DeviceEvent,
) -> bool {
    if !status.is_ok() {
        debug!(%status, "Ignoring event with error status");
        return false;
    }
    let advanced = notification.update_if(|watch| watch.advance(event));
    if advanced {
        trace!(?event, "Event advanced button watch");
    }
    advanced
}

/// Checks every front-panel button for a press and a release.
pub struct ButtonsTest {
    base: TestBase,
    buttons: Vec<Button>,
    timeout: Duration,
    notification: Arc<Notification<ButtonWatch>>,
    subscription: Option<Subscription>,
}

impl ButtonsTest {
    /// Build the check with the configured timeout.
    pub fn new(
        session: Arc<dyn DeviceSession>,
        operator: Arc<dyn Operator>,
        config: &HarnessConfig,
    ) -> Self {
        Self {
            base: TestBase::new(TEST_NAME, session, operator, config.led.clone()),
            buttons: Button::ALL.to_vec(),
            timeout: config.buttons.timeout(),
            notification: Arc::new(Notification::new()),
            subscription: None,
        }
    }

    /// Override the per-wait timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run_sequence(&mut self) -> AppResult<()> {
        let status = self.base.session().start_test(TestKind::Buttons).await;
        if !status.is_ok() {
            return Err(HarnessError::test_mode(
                TEST_NAME,
                "StartTest",
                TestKind::Buttons,
                status,
            ));
        }

        let mut sequence = ButtonSequence::new(self.buttons.clone());
        while let Some((button, phase)) = sequence.current() {
            if phase == Phase::AwaitingPress {
                self.notification.arm(ButtonWatch::new(button));
                self.base.prompt(&format!("Press {}", button.name()));
            }

            let step = if self.wait_for(button, phase).await {
                sequence.on_matched()
            } else {
                sequence.on_timeout()
            };

            match step {
                Step::Continue => {}
                Step::Passed(button) => {
                    self.notification.disarm();
                    self.base.pass_test(&check_name(button)).await;
                }
                Step::Failed(button) => {
                    self.notification.disarm();
                    let timeout = WaitTimeout(self.timeout);
                    let check = format!("{}: {timeout}", check_name(button));
                    self.base.fail_test(&check).await;
                }
            }
        }

        let status = self.base.session().end_test(TestKind::Buttons).await;
        if !status.is_ok() {
            return Err(HarnessError::test_mode(
                TEST_NAME,
                "EndTest",
                TestKind::Buttons,
                status,
            ));
        }
        Ok(())
    }

    async fn wait_for(&self, button: Button, phase: Phase) -> bool {
        debug!(button = %button.name(), ?phase, "Waiting for button event");
        self.notification
            .wait_until(self.timeout, |watch| watch.has_seen(phase))
            .await
    }

    /// Disarm and stop event delivery.
    async fn release(&mut self) {
        self.notification.disarm();
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel().await;
        }
    }
}

#[async_trait]
impl HardwareTest for ButtonsTest {
    fn base(&self) -> &TestBase {
        &self.base
    }

    async fn run(&mut self) -> AppResult<bool> {
        let notification = Arc::clone(&self.notification);
        let subscription = subscribe(self.base.session(), move |status, event| {
            offer_event(&notification, status, event);
        })
        .await?;
        self.subscription = Some(subscription);

        let result = self.run_sequence().await;
        self.release().await;
        result?;

        info!(
            passed = self.base.ledger().passed().len(),
            failed = self.base.ledger().failed().len(),
            "Button sequence complete"
        );
        Ok(self.base.verdict())
    }

    async fn interrupt(&mut self) {
        self.release().await;
    }
}

fn check_name(button: Button) -> String {
    button.name().to_lowercase().replace(' ', "_")
}
