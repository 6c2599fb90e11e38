use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner request failed: {0}")]
    Transport(reqwest::Error),

    #[error("planner returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unparsable planner response: {0}")]
    Parse(String),

    #[error("unknown action type '{0}'")]
    UnknownActionType(String),
}

impl From<reqwest::Error> for PlannerError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL is a stored credential.
        Self::Transport(e.without_url())
    }
}
