use serde::Deserialize;
use smol_computer_control::{Action, ActionBatch};

use crate::PlannerError;

#[derive(Debug, Deserialize)]
struct PlannerResponse {
    actions: Vec<WireAction>,
}

/// One entry of the `actions` array. Missing coordinates default to zero.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    x: Option<f32>,
    #[serde(default)]
    y: Option<f32>,
    #[serde(default)]
    start_x: Option<f32>,
    #[serde(default)]
    start_y: Option<f32>,
    #[serde(default)]
    end_x: Option<f32>,
    #[serde(default)]
    end_y: Option<f32>,
    #[serde(default)]
    text: Option<String>,
}

impl TryFrom<WireAction> for Action {
    type Error = PlannerError;

    fn try_from(wire: WireAction) -> Result<Self, Self::Error> {
        let coord = |value: Option<f32>| value.unwrap_or(0.0);

        let action = match wire.kind.as_str() {
            "TAP" => Action::Tap {
                x: coord(wire.x),
                y: coord(wire.y),
            },
            "TAP_TEXT" => match wire.text {
                Some(text) if !text.is_empty() => Action::TapText { text },
                _ => return Err(PlannerError::Parse("TAP_TEXT without text".to_string())),
            },
            "INPUT" => Action::Input {
                text: wire.text.unwrap_or_default(),
            },
            "SCROLL_FORWARD" => Action::ScrollForward,
            "SCROLL_BACKWARD" => Action::ScrollBackward,
            "SWIPE" => Action::Swipe {
                start_x: coord(wire.start_x),
                start_y: coord(wire.start_y),
                end_x: coord(wire.end_x),
                end_y: coord(wire.end_y),
            },
            "FINISH" => Action::Finish,
            other => return Err(PlannerError::UnknownActionType(other.to_string())),
        };
        Ok(action)
    }
}

/// Parse a planner response body.
///
/// All or nothing: one malformed or unknown entry rejects the whole batch.
pub fn parse_actions(body: &str) -> Result<ActionBatch, PlannerError> {
    let response: PlannerResponse =
        serde_json::from_str(body).map_err(|e| PlannerError::Parse(e.to_string()))?;

    response
        .actions
        .into_iter()
        .map(Action::try_from)
        .collect()
}
