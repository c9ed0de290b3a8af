use graphdesk_core::GraphError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    /// Wiring bug: the caller used a name nobody registered.
    #[error("Action is not registered: {0}")]
    Unregistered(String),
    #[error("Action {action} expects {expected} arguments")]
    InvalidArgs {
        action: String,
        expected: &'static str,
    },
    #[error("No drag in progress")]
    NoDrag,
    #[error("Zoom must be positive and finite, got {0}")]
    InvalidZoom(f32),
    #[error(transparent)]
    Graph(#[from] GraphError),
}
