use thiserror::Error;

/// Returned when a textual blend mode (e.g. from an expression file) is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown parameter blend mode: {0:?}")]
pub struct ParseBlendModeError(pub String);
