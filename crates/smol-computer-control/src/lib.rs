//! Host UI capabilities for the SmolAgent loop.
//!
//! The host platform exposes two capabilities: a [`UiProvider`] that answers
//! questions about the on-screen element tree, and an [`InputInjector`] that
//! replays synthetic gestures. Everything above them (tree capture, element
//! search, action execution) is platform independent and lives here.

pub mod error;
pub mod executor;
pub mod locator;
pub mod simulated;
pub mod tree;
pub mod types;

pub use error::ControlError;
pub use executor::{ActionExecutor, ExecutionReport, RetryConfig};
pub use locator::{ElementLocator, DEFAULT_MAX_SCROLL_ATTEMPTS, SCROLL_SETTLE_DELAY};
pub use simulated::{InputEvent, SimulatedDevice, SimulatedNode};
pub use tree::{capture, UiNode, UiSnapshot};
pub use types::{Action, ActionBatch, NodeAttributes, NodeHandle};

use async_trait::async_trait;
use std::sync::Arc;

/// Read access to the host's element hierarchy.
///
/// Handles are only meaningful to the provider that issued them and may go
/// stale once the host re-renders.
pub trait UiProvider: Send + Sync {
    /// Root of the active window, or `None` when nothing is on screen.
    fn root(&self) -> Option<NodeHandle>;

    /// Children in provider-reported order.
    fn children(&self, node: NodeHandle) -> Result<Vec<NodeHandle>, ControlError>;

    fn attributes(&self, node: NodeHandle) -> Result<NodeAttributes, ControlError>;

    /// Candidate nodes for a text query. Matching may be looser than exact;
    /// callers filter the result.
    fn find_by_text(&self, text: &str) -> Vec<NodeHandle>;

    /// The input field that currently holds focus, if any.
    fn focused_input(&self) -> Option<NodeHandle>;
}

/// Synthetic input primitives.
pub trait InputInjector: Send + Sync {
    fn tap(&self, x: f32, y: f32) -> Result<(), ControlError>;

    fn swipe(&self, x0: f32, y0: f32, x1: f32, y1: f32, duration_ms: u64)
        -> Result<(), ControlError>;

    fn set_text(&self, node: NodeHandle, text: &str) -> Result<(), ControlError>;

    /// Node-level click, used for text-targeted taps.
    fn click(&self, node: NodeHandle) -> Result<(), ControlError>;

    /// Returns `false` when there was no more content to scroll into.
    fn scroll_forward(&self) -> bool;

    /// Returns `false` when there was no more content to scroll into.
    fn scroll_backward(&self) -> bool;
}

#[async_trait]
pub trait ScreenCapture: Send + Sync {
    /// Current screen as a base64 encoded image, `None` if no frame is ready.
    async fn capture_base64(&self) -> Option<String>;
}

/// The capability pair the agent loop is constructed with.
#[derive(Clone)]
pub struct Device {
    pub ui: Arc<dyn UiProvider>,
    pub input: Arc<dyn InputInjector>,
}

impl Device {
    pub fn new(ui: Arc<dyn UiProvider>, input: Arc<dyn InputInjector>) -> Self {
        Self { ui, input }
    }

    /// Build a pair from one host object that implements both capabilities.
    pub fn from_host<T>(host: Arc<T>) -> Self
    where
        T: UiProvider + InputInjector + 'static,
    {
        Self {
            ui: host.clone(),
            input: host,
        }
    }
}
