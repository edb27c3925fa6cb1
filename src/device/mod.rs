//! Device session interface.
//!
//! The harness never owns the transport to the unit under test. It talks to a
//! [`DeviceSession`], a capability trait implemented by whatever connection the
//! runner opened (or by [`mock::MockDevice`] in tests and simulation). The
//! session exposes the handful of remote calls the checks need plus a
//! long-lived stream of [`DeviceEvent`]s.
//!
//! Remote calls report their result as a [`Status`] and the core hands those
//! back to the caller unmodified; deciding whether a non-OK status matters is
//! the job of the individual test.

use crate::error::AppResult;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod mock;
pub mod subscription;

pub use subscription::Subscription;

/// Status code returned by every remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// The call succeeded.
    Ok,
    /// The operation was cancelled.
    Cancelled,
    /// Unknown error.
    Unknown,
    /// The request carried an invalid argument.
    InvalidArgument,
    /// The deadline expired before the call completed.
    DeadlineExceeded,
    /// A requested entity was not found.
    NotFound,
    /// The entity already exists.
    AlreadyExists,
    /// The caller lacks permission.
    PermissionDenied,
    /// A resource has been exhausted.
    ResourceExhausted,
    /// The device is not in a state that allows the call.
    FailedPrecondition,
    /// The operation was aborted.
    Aborted,
    /// An argument was out of range.
    OutOfRange,
    /// The call is not implemented by the firmware.
    Unimplemented,
    /// Internal firmware error.
    Internal,
    /// The device is unreachable.
    Unavailable,
    /// Unrecoverable data loss.
    DataLoss,
    /// The request lacked valid credentials.
    Unauthenticated,
}

impl Status {
    /// True if the remote operation succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Canonical upper-case name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Cancelled => "CANCELLED",
            Status::Unknown => "UNKNOWN",
            Status::InvalidArgument => "INVALID_ARGUMENT",
            Status::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Status::NotFound => "NOT_FOUND",
            Status::AlreadyExists => "ALREADY_EXISTS",
            Status::PermissionDenied => "PERMISSION_DENIED",
            Status::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Status::FailedPrecondition => "FAILED_PRECONDITION",
            Status::Aborted => "ABORTED",
            Status::OutOfRange => "OUT_OF_RANGE",
            Status::Unimplemented => "UNIMPLEMENTED",
            Status::Internal => "INTERNAL",
            Status::Unavailable => "UNAVAILABLE",
            Status::DataLoss => "DATA_LOSS",
            Status::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device-side test modes that can be entered with `start_test`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestKind {
    /// Button presses are published as events.
    Buttons,
    /// LTR559 proximity sensor sampling.
    Ltr559Prox,
    /// LTR559 ambient light sampling.
    Ltr559Light,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TestKind::Buttons => "BUTTONS",
            TestKind::Ltr559Prox => "LTR559_PROX",
            TestKind::Ltr559Light => "LTR559_LIGHT",
        })
    }
}

/// The four front-panel buttons, in the order they are tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    /// Button A
    A,
    /// Button B
    B,
    /// Button X
    X,
    /// Button Y
    Y,
}

impl Button {
    /// Every button, in test order.
    pub const ALL: [Button; 4] = [Button::A, Button::B, Button::X, Button::Y];

    /// Upper-case letter printed on the board.
    pub fn letter(&self) -> char {
        match self {
            Button::A => 'A',
            Button::B => 'B',
            Button::X => 'X',
            Button::Y => 'Y',
        }
    }

    /// Display name, e.g. `Button A`.
    pub fn name(&self) -> String {
        format!("Button {}", self.letter())
    }

    /// Event field carrying this button's state.
    ///
    /// The same field reports both edges: `true` on press, `false` on release.
    pub fn event_field(&self) -> String {
        format!("button_{}_pressed", self.letter().to_ascii_lowercase())
    }
}

/// Identity of the connected board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Unique ID burned into the board's flash chip.
    pub flash_id: u64,
}

/// An asynchronous notification published by the device.
///
/// Carries zero or more named optional boolean fields. A field that is absent
/// is distinct from one that is present with the value `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    fields: BTreeMap<String, bool>,
}

impl DeviceEvent {
    /// Create an event with no fields set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field.
    pub fn with_field(mut self, name: impl Into<String>, value: bool) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Event reporting a single button edge.
    pub fn button(button: Button, pressed: bool) -> Self {
        Self::new().with_field(button.event_field(), pressed)
    }

    /// True if the field is present, whatever its value.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Value of the field, or `None` when absent.
    pub fn field(&self, name: &str) -> Option<bool> {
        self.fields.get(name).copied()
    }
}

/// Lazy, unbounded, non-restartable sequence of device notifications.
pub type EventStream = BoxStream<'static, (Status, DeviceEvent)>;

/// Live connection to the unit under test.
///
/// Owned by the runner for the lifetime of the suite; tests only borrow it to
/// issue calls.
#[async_trait]
pub trait DeviceSession: Send + Sync {
    /// Read the board identity.
    async fn device_info(&self) -> Result<DeviceInfo, Status>;

    /// Set the RGB LED to `hex` (`0xRRGGBB`) at `brightness`.
    async fn set_rgb(&self, hex: u32, brightness: u8) -> Status;

    /// Turn the RGB LED off.
    async fn set_off(&self) -> Status {
        self.set_rgb(0, 0).await
    }

    /// Put the device into a test mode.
    async fn start_test(&self, kind: TestKind) -> Status;

    /// Leave a test mode.
    async fn end_test(&self, kind: TestKind) -> Status;

    /// Open the device's event stream.
    ///
    /// Each call opens a new server-side subscription; the returned stream
    /// cannot be restarted once it ends.
    async fn subscribe_events(&self) -> AppResult<EventStream>;
}
