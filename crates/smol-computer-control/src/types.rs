use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to a node owned by a [`crate::UiProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeHandle(pub u64);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Attributes the provider reports for a single node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    /// Fully qualified type name, e.g. `android.widget.Button`.
    pub class_name: String,
    pub text: Option<String>,
    pub description: Option<String>,
    pub visible: bool,
    pub clickable: bool,
}

/// One step requested by the planner.
///
/// Coordinates are passed through to the injector as-is; bounds checking is
/// the host's business.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Tap { x: f32, y: f32 },
    /// Click the first visible element whose text matches, scrolling to it
    /// if necessary.
    TapText { text: String },
    Input { text: String },
    ScrollForward,
    ScrollBackward,
    Swipe {
        start_x: f32,
        start_y: f32,
        end_x: f32,
        end_y: f32,
    },
    Finish,
}

/// Actions planned for one loop iteration, executed in order.
pub type ActionBatch = Vec<Action>;

impl Action {
    /// Wire tag of this action kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Tap { .. } => "TAP",
            Action::TapText { .. } => "TAP_TEXT",
            Action::Input { .. } => "INPUT",
            Action::ScrollForward => "SCROLL_FORWARD",
            Action::ScrollBackward => "SCROLL_BACKWARD",
            Action::Swipe { .. } => "SWIPE",
            Action::Finish => "FINISH",
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, Action::Finish)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Tap { x, y } => write!(f, "TAP ({:.0}, {:.0})", x, y),
            Action::TapText { text } => write!(f, "TAP_TEXT '{}'", text),
            // Typed text may be sensitive; only its length goes into logs.
            Action::Input { text } => write!(f, "INPUT ({} chars)", text.chars().count()),
            Action::Swipe {
                start_x,
                start_y,
                end_x,
                end_y,
            } => write!(
                f,
                "SWIPE ({:.0}, {:.0}) -> ({:.0}, {:.0})",
                start_x, start_y, end_x, end_y
            ),
            other => f.write_str(other.kind()),
        }
    }
}
