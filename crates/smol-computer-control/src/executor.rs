//! Action execution with a fixed-delay retry policy.
//!
//! Retries repeat the same primitive call blindly; the UI is not observed
//! again between attempts. A failure that outlives every attempt is logged
//! and reported back, never raised.

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ControlError;
use crate::locator::{ElementLocator, DEFAULT_MAX_SCROLL_ATTEMPTS};
use crate::types::Action;
use crate::Device;

/// Default gesture length for swipes.
pub const DEFAULT_SWIPE_DURATION_MS: u64 = 300;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included. Zero means the
    /// action is never attempted.
    pub max_retries: u32,
    /// Fixed pause between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryConfig {
    /// Set custom max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// What happened to one action under [`ActionExecutor::execute_with_retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub attempts: u32,
    pub succeeded: bool,
    pub last_error: Option<String>,
}

pub struct ActionExecutor {
    device: Device,
    locator: ElementLocator,
    swipe_duration_ms: u64,
    max_scroll_attempts: u32,
}

impl ActionExecutor {
    pub fn new(device: Device) -> Self {
        Self {
            locator: ElementLocator::new(device.clone()),
            device,
            swipe_duration_ms: DEFAULT_SWIPE_DURATION_MS,
            max_scroll_attempts: DEFAULT_MAX_SCROLL_ATTEMPTS,
        }
    }

    pub fn with_swipe_duration_ms(mut self, swipe_duration_ms: u64) -> Self {
        self.swipe_duration_ms = swipe_duration_ms;
        self
    }

    /// Scroll budget and settle delay used by text-targeted taps.
    pub fn with_scroll_search(mut self, max_attempts: u32, settle_delay: Duration) -> Self {
        self.max_scroll_attempts = max_attempts;
        self.locator = ElementLocator::new(self.device.clone()).with_settle_delay(settle_delay);
        self
    }

    pub fn locator(&self) -> &ElementLocator {
        &self.locator
    }

    /// Dispatch one action to its primitive.
    pub async fn execute(&self, action: &Action) -> Result<(), ControlError> {
        let input = self.device.input.as_ref();

        match action {
            Action::Tap { x, y } => input.tap(*x, *y),
            Action::TapText { text } => {
                let node = self
                    .locator
                    .locate_clickable_with_scroll(text, self.max_scroll_attempts)
                    .await
                    .ok_or_else(|| ControlError::TargetNotFound(text.clone()))?;
                input.click(node.handle)
            }
            Action::Input { text } => {
                let field = self
                    .device
                    .ui
                    .focused_input()
                    .ok_or(ControlError::NoFocusedInput)?;
                input.set_text(field, text)
            }
            Action::ScrollForward => {
                if !input.scroll_forward() {
                    debug!("Scroll forward: already at the end");
                }
                Ok(())
            }
            Action::ScrollBackward => {
                if !input.scroll_backward() {
                    debug!("Scroll backward: already at the start");
                }
                Ok(())
            }
            Action::Swipe {
                start_x,
                start_y,
                end_x,
                end_y,
            } => input.swipe(
                *start_x,
                *start_y,
                *end_x,
                *end_y,
                self.swipe_duration_ms,
            ),
            // Handled by the agent loop; there is nothing to inject.
            Action::Finish => Ok(()),
        }
    }

    /// Execute `action`, retrying failures after a fixed delay.
    ///
    /// Makes at most `config.max_retries` attempts and stops at the first
    /// success. A budget of zero abandons the action without touching the UI.
    pub async fn execute_with_retry(&self, action: &Action, config: &RetryConfig) -> ExecutionReport {
        let max_attempts = config.max_retries;
        if max_attempts == 0 {
            warn!("Abandoning {}: retry budget is zero", action);
            return ExecutionReport {
                attempts: 0,
                succeeded: false,
                last_error: Some("retry budget is zero".to_string()),
            };
        }
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.execute(action).await {
                Ok(()) => {
                    if attempts > 1 {
                        debug!("{} succeeded after {} attempts", action, attempts);
                    }
                    return ExecutionReport {
                        attempts,
                        succeeded: true,
                        last_error: None,
                    };
                }
                Err(e) => {
                    if attempts >= max_attempts {
                        warn!(
                            "Abandoning {} after {} attempts: {}",
                            action, attempts, e
                        );
                        return ExecutionReport {
                            attempts,
                            succeeded: false,
                            last_error: Some(e.to_string()),
                        };
                    }

                    debug!(
                        "{} failed ({}), retrying in {:?} ({}/{})",
                        action, e, config.delay, attempts, max_attempts
                    );
                    tokio::time::sleep(config.delay).await;
                }
            }
        }
    }
}
