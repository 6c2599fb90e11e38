use thiserror::Error;

use crate::types::NodeHandle;

#[derive(Debug, Error)]
pub enum ControlError {
    /// The UI provider has no active root window.
    #[error("no active window")]
    NoActiveWindow,

    #[error("node {0} is no longer part of the tree")]
    StaleNode(NodeHandle),

    #[error("no input field has focus")]
    NoFocusedInput,

    #[error("no visible element with text '{0}'")]
    TargetNotFound(String),

    /// A gesture or input primitive was rejected by the host.
    #[error("input injection failed: {0}")]
    Injection(String),

    #[error("invalid screen fixture: {0}")]
    Fixture(String),
}
