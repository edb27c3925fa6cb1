//! RGB LED check: cycle through a fixed palette and let the operator confirm
//! each color by eye.

use super::{HardwareTest, TestBase};
use crate::color::Color;
use crate::config::HarnessConfig;
use crate::device::DeviceSession;
use crate::error::{AppResult, HarnessError};
use crate::operator::Operator;
use async_trait::async_trait;
use std::sync::Arc;

/// Name of the check as shown in the suite banner.
pub const TEST_NAME: &str = "LedTest";

/// Colors shown to the operator, in order.
pub const PALETTE: [Color; 5] = [
    Color::WHITE,
    Color::RED,
    Color::GREEN,
    Color::BLUE,
    Color::OFF,
];

/// Walks the LED through [`PALETTE`].
pub struct LedTest {
    base: TestBase,
}

impl LedTest {
    /// Build the check.
    pub fn new(
        session: Arc<dyn DeviceSession>,
        operator: Arc<dyn Operator>,
        config: &HarnessConfig,
    ) -> Self {
        Self {
            base: TestBase::new(TEST_NAME, session, operator, config.led.clone()),
        }
    }

    async fn ensure_off(&self, command: &str) -> AppResult<()> {
        let status = self.base.unset_led().await;
        if status.is_ok() {
            Ok(())
        } else {
            Err(HarnessError::Precondition {
                test: TEST_NAME.to_string(),
                command: command.to_string(),
                status,
            })
        }
    }

    async fn test_color(&mut self, color: &Color) -> AppResult<()> {
        let check = format!("led_{}", color.name);
        self.base.unset_led().await;
        self.base.set_led(color).await;

        let confirmed = self
            .base
            .prompt_yn(&format!("Is the LED {}?", color.formatted_name()))
            .await?;
        if confirmed {
            self.base.pass_test(&check).await;
        } else {
            self.base.fail_test(&check).await;
        }
        Ok(())
    }
}

#[async_trait]
impl HardwareTest for LedTest {
    fn base(&self) -> &TestBase {
        &self.base
    }

    async fn run(&mut self) -> AppResult<bool> {
        self.ensure_off("SetRgb(off) before palette").await?;
        for color in &PALETTE {
            self.test_color(color).await?;
        }
        self.ensure_off("SetRgb(off) after palette").await?;
        Ok(self.base.verdict())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{DeviceCall, MockDevice};
    use crate::device::Status;
    use crate::operator::ScriptedOperator;

    fn led_test(device: Arc<MockDevice>, operator: Arc<ScriptedOperator>) -> LedTest {
        LedTest::new(device, operator, &HarnessConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_answers_pass_every_color() {
        let device = Arc::new(MockDevice::new());
        let operator = Arc::new(ScriptedOperator::default());
        let mut test = led_test(Arc::clone(&device), Arc::clone(&operator));

        assert!(test.run().await.unwrap());
        assert_eq!(
            test.ledger().passed_names(),
            vec!["led_white", "led_red", "led_green", "led_blue", "led_off"]
        );
        assert_eq!(device.led().await, (0, 0));
        assert!(operator
            .transcript()
            .contains(&">>> Is the LED red? [Y/n] ".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_answer_fails_color() {
        let device = Arc::new(MockDevice::new());
        let operator = Arc::new(ScriptedOperator::with_answers(["", "n"]));
        let mut test = led_test(device, Arc::clone(&operator));

        assert!(!test.run().await.unwrap());
        assert_eq!(test.ledger().failed_names(), vec!["led_red"]);
        assert_eq!(test.ledger().passed().len(), 4);
        assert!(operator.transcript().contains(&"FAIL: led_red".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_color_is_set_before_question() {
        let device = Arc::new(MockDevice::new());
        let mut test = led_test(Arc::clone(&device), Arc::new(ScriptedOperator::default()));
        test.run().await.unwrap();

        let calls = device.calls().await;
        let off = DeviceCall::SetRgb {
            hex: 0,
            brightness: 0,
        };
        assert_eq!(calls[0], off);
        assert_eq!(calls[1], off);
        assert_eq!(
            calls[2],
            DeviceCall::SetRgb {
                hex: 0xFFFFFF,
                brightness: 255
            }
        );
        assert_eq!(calls.last(), Some(&off));
    }

    #[tokio::test]
    async fn test_led_rejected_before_palette_is_fatal() {
        let device = Arc::new(MockDevice::new().with_set_rgb_status(Status::Unavailable));
        let mut test = led_test(device, Arc::new(ScriptedOperator::default()));

        let err = test.run().await.unwrap_err();
        assert!(err.is_precondition());
        assert!(test.ledger().is_empty());
    }
}
