//! Element search with bounded scrolling.

use std::time::Duration;
use tracing::debug;

use crate::tree::{capture_node, UiNode};
use crate::Device;

/// Scroll attempts per direction when none is given.
pub const DEFAULT_MAX_SCROLL_ATTEMPTS: u32 = 10;

/// Pause after each scroll so the host can finish laying out.
pub const SCROLL_SETTLE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy)]
enum ScrollDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Match {
    Any,
    Clickable,
}

pub struct ElementLocator {
    device: Device,
    settle_delay: Duration,
}

impl ElementLocator {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            settle_delay: SCROLL_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// First visible node whose text, or failing that content description,
    /// equals `target`, as reported by a live provider query.
    pub fn locate(&self, target: &str) -> Option<UiNode> {
        self.first_match(target, Match::Any)
    }

    /// Like [`locate`](Self::locate), but skips matches that do not accept
    /// clicks, so a label sharing its text with a button never wins.
    pub fn locate_clickable(&self, target: &str) -> Option<UiNode> {
        self.first_match(target, Match::Clickable)
    }

    fn first_match(&self, target: &str, wanted: Match) -> Option<UiNode> {
        let ui = self.device.ui.as_ref();

        for handle in ui.find_by_text(target) {
            let attrs = match ui.attributes(handle) {
                Ok(attrs) => attrs,
                Err(e) => {
                    debug!("Ignoring candidate {}: {}", handle, e);
                    continue;
                }
            };

            let matches = attrs.text.as_deref() == Some(target)
                || attrs.description.as_deref() == Some(target);
            if !(attrs.visible && matches) {
                continue;
            }
            if wanted == Match::Clickable && !attrs.clickable {
                continue;
            }

            match capture_node(ui, handle) {
                Ok(node) => return Some(node),
                Err(e) => debug!("Candidate {} vanished during capture: {}", handle, e),
            }
        }

        None
    }

    /// Search for `target`, scrolling forward and then backward.
    ///
    /// Each direction gets its own budget of `max_attempts` scrolls and ends
    /// early when the host reports nothing left to scroll, so at most
    /// `2 * max_attempts` scroll calls are issued.
    pub async fn locate_with_scroll(&self, target: &str, max_attempts: u32) -> Option<UiNode> {
        self.search(target, Match::Any, max_attempts).await
    }

    /// Scrolling search that only accepts clickable matches.
    pub async fn locate_clickable_with_scroll(
        &self,
        target: &str,
        max_attempts: u32,
    ) -> Option<UiNode> {
        self.search(target, Match::Clickable, max_attempts).await
    }

    async fn search(&self, target: &str, wanted: Match, max_attempts: u32) -> Option<UiNode> {
        for direction in [ScrollDirection::Forward, ScrollDirection::Backward] {
            if let Some(node) = self.scan(target, wanted, direction, max_attempts).await {
                return Some(node);
            }
        }

        debug!(
            "'{}' not found after scrolling both directions ({} attempts each)",
            target, max_attempts
        );
        None
    }

    async fn scan(
        &self,
        target: &str,
        wanted: Match,
        direction: ScrollDirection,
        max_attempts: u32,
    ) -> Option<UiNode> {
        let mut attempts = 0;
        while attempts < max_attempts {
            if let Some(node) = self.first_match(target, wanted) {
                return Some(node);
            }

            let scrolled = match direction {
                ScrollDirection::Forward => self.device.input.scroll_forward(),
                ScrollDirection::Backward => self.device.input.scroll_backward(),
            };
            if !scrolled {
                debug!("No more content to scroll {:?}", direction);
                break;
            }

            tokio::time::sleep(self.settle_delay).await;
            attempts += 1;
        }
        None
    }
}
