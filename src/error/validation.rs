use thiserror::Error;

/// A materialized record that failed its backing type's validation during insert.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {model}({stub}) stub: {}", .messages.join(", "))]
pub struct ValidationError {
    /// Model name the stub belongs to
    pub model: String,
    /// Stub name
    pub stub: String,
    /// Messages reported by the validation hook
    pub messages: Vec<String>,
}
