use thiserror::Error;

/// A stub reference that cannot be resolved to a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The referenced model was never declared.
    #[error("No '{model}' model found when calling {model}({stub})")]
    MissingModel { model: String, stub: String },

    /// The model exists but has no stub with that name.
    #[error("No '{stub}' stub found in the '{model}' model when calling {model}({stub})")]
    MissingStub { model: String, stub: String },

    /// No stub is registered under the global key.
    #[error("No stub registered under global key '{0}'")]
    MissingGlobalKey(String),

    /// The referenced record has no attribute with the projected name.
    #[error("No '{attribute}' attribute on {model}({stub})")]
    MissingAttribute {
        model: String,
        stub: String,
        attribute: String,
    },

    /// Materializing the stub requires materializing itself.
    #[error("Cyclic stub reference through {model}({stub})")]
    Cycle { model: String, stub: String },
}
