//! Mock Device Session
//!
//! Provides a simulated board for testing without physical hardware.
//!
//! `MockDevice` records every remote call it receives, keeps track of the LED
//! state, lets callers inject events into its event stream and can be told to
//! reject specific calls. In *simulated* mode it also plays the part of an
//! operator pressing each button in turn once the button test mode starts,
//! which is what `factory-harness --simulate` runs against.
//!
//! # Example
//!
//! ```rust,ignore
//! let device = MockDevice::new();
//! let injector = device.injector();
//! injector.send(DeviceEvent::button(Button::A, true));
//! assert!(device.start_test(TestKind::Buttons).await.is_ok());
//! ```

use super::{Button, DeviceEvent, DeviceInfo, DeviceSession, EventStream, Status, TestKind};
use crate::error::{AppResult, HarnessError};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

/// Flash ID reported by the mock board.
pub const MOCK_FLASH_ID: u64 = 0xE660_5838_2B5F_2A2F;

/// A remote call observed by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCall {
    /// `GetDeviceInfo`
    DeviceInfo,
    /// `SetRgb`
    SetRgb {
        /// Requested color.
        hex: u32,
        /// Requested brightness.
        brightness: u8,
    },
    /// `StartTest`
    StartTest(TestKind),
    /// `EndTest`
    EndTest(TestKind),
    /// `Subscribe`
    Subscribe,
}

/// Which call a configured status applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CallKind {
    DeviceInfo,
    SetRgb,
    StartTest,
    EndTest,
}

/// Timing of the simulated operator's button presses.
#[derive(Debug, Clone, Copy)]
pub struct PressTiming {
    /// Delay before each press.
    pub before_press: Duration,
    /// How long each button is held down.
    pub hold: Duration,
}

impl Default for PressTiming {
    fn default() -> Self {
        Self {
            before_press: Duration::from_millis(400),
            hold: Duration::from_millis(150),
        }
    }
}

#[derive(Default)]
struct MockState {
    calls: Vec<DeviceCall>,
    statuses: HashMap<CallKind, Status>,
    led: (u32, u8),
    active_tests: Vec<TestKind>,
    presser: Option<JoinHandle<()>>,
}

/// Cloneable handle that pushes events into a mock device's event stream.
#[derive(Debug, Clone)]
pub struct EventInjector {
    tx: mpsc::UnboundedSender<(Status, DeviceEvent)>,
}

impl EventInjector {
    /// Publish an event with an OK status. Returns false once nobody listens.
    pub fn send(&self, event: DeviceEvent) -> bool {
        self.send_with_status(Status::Ok, event)
    }

    /// Publish an event with an explicit stream status.
    pub fn send_with_status(&self, status: Status, event: DeviceEvent) -> bool {
        self.tx.send((status, event)).is_ok()
    }

    /// Publish a full press-then-release of `button`, holding it for `hold`.
    pub async fn press(&self, button: Button, hold: Duration) {
        debug!(button = %button.name(), "Simulated press");
        self.send(DeviceEvent::button(button, true));
        sleep(hold).await;
        self.send(DeviceEvent::button(button, false));
    }
}

/// Simulated board implementing [`DeviceSession`].
pub struct MockDevice {
    state: Arc<RwLock<MockState>>,
    injector: EventInjector,
    events: Mutex<Option<mpsc::UnboundedReceiver<(Status, DeviceEvent)>>>,
    simulated_presses: Option<PressTiming>,
}

impl MockDevice {
    /// Create a mock that accepts every call and publishes only injected events.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(RwLock::new(MockState::default())),
            injector: EventInjector { tx },
            events: Mutex::new(Some(rx)),
            simulated_presses: None,
        }
    }

    /// Create a mock that presses every button once the button test starts.
    pub fn simulated(timing: PressTiming) -> Self {
        Self {
            simulated_presses: Some(timing),
            ..Self::new()
        }
    }

    /// Make `StartTest` return `status`.
    pub fn with_start_test_status(self, status: Status) -> Self {
        self.with_status(CallKind::StartTest, status)
    }

    /// Make `EndTest` return `status`.
    pub fn with_end_test_status(self, status: Status) -> Self {
        self.with_status(CallKind::EndTest, status)
    }

    /// Make `SetRgb` return `status`.
    pub fn with_set_rgb_status(self, status: Status) -> Self {
        self.with_status(CallKind::SetRgb, status)
    }

    /// Make `GetDeviceInfo` fail with `status`.
    pub fn with_device_info_status(self, status: Status) -> Self {
        self.with_status(CallKind::DeviceInfo, status)
    }

    fn with_status(self, call: CallKind, status: Status) -> Self {
        // Builders run before the mock is shared, so the lock is uncontended.
        if let Ok(mut state) = self.state.try_write() {
            state.statuses.insert(call, status);
        }
        self
    }

    /// Handle for publishing events.
    pub fn injector(&self) -> EventInjector {
        self.injector.clone()
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<DeviceCall> {
        self.state.read().await.calls.clone()
    }

    /// Current LED color and brightness.
    pub async fn led(&self) -> (u32, u8) {
        self.state.read().await.led
    }

    /// Test modes currently entered.
    pub async fn active_tests(&self) -> Vec<TestKind> {
        self.state.read().await.active_tests.clone()
    }

    async fn record(&self, call: DeviceCall, kind: Option<CallKind>) -> Status {
        let mut state = self.state.write().await;
        state.calls.push(call);
        kind.and_then(|kind| state.statuses.get(&kind).copied())
            .unwrap_or(Status::Ok)
    }

    fn spawn_presser(&self, timing: PressTiming) -> JoinHandle<()> {
        let injector = self.injector();
        tokio::spawn(async move {
            for button in Button::ALL {
                sleep(timing.before_press).await;
                injector.press(button, timing.hold).await;
            }
        })
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceSession for MockDevice {
    async fn device_info(&self) -> Result<DeviceInfo, Status> {
        let status = self
            .record(DeviceCall::DeviceInfo, Some(CallKind::DeviceInfo))
            .await;
        if status.is_ok() {
            Ok(DeviceInfo {
                flash_id: MOCK_FLASH_ID,
            })
        } else {
            Err(status)
        }
    }

    async fn set_rgb(&self, hex: u32, brightness: u8) -> Status {
        let status = self
            .record(DeviceCall::SetRgb { hex, brightness }, Some(CallKind::SetRgb))
            .await;
        if status.is_ok() {
            self.state.write().await.led = (hex, brightness);
        }
        status
    }

    async fn start_test(&self, kind: TestKind) -> Status {
        let status = self
            .record(DeviceCall::StartTest(kind), Some(CallKind::StartTest))
            .await;
        if !status.is_ok() {
            return status;
        }

        let presser = match (kind, self.simulated_presses) {
            (TestKind::Buttons, Some(timing)) => Some(self.spawn_presser(timing)),
            _ => None,
        };
        let mut state = self.state.write().await;
        state.active_tests.push(kind);
        if let Some(presser) = presser {
            if let Some(previous) = state.presser.replace(presser) {
                previous.abort();
            }
        }
        status
    }

    async fn end_test(&self, kind: TestKind) -> Status {
        let status = self
            .record(DeviceCall::EndTest(kind), Some(CallKind::EndTest))
            .await;
        if !status.is_ok() {
            return status;
        }

        let mut state = self.state.write().await;
        state.active_tests.retain(|active| *active != kind);
        if kind == TestKind::Buttons {
            if let Some(presser) = state.presser.take() {
                presser.abort();
            }
        }
        status
    }

    async fn subscribe_events(&self) -> AppResult<EventStream> {
        self.record(DeviceCall::Subscribe, None).await;
        let rx = self.events.lock().await.take().ok_or_else(|| {
            HarnessError::Subscription("mock event stream already taken".to_string())
        })?;
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
