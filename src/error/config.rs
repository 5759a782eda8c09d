use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable is set but cannot be parsed.
    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidEnvVar {
        /// Name of the offending variable
        name: String,
        /// The value that failed to parse
        value: String,
    },

    /// No model name could be derived from the backing type.
    ///
    /// Raised when a backing type has an empty or non-identifier name and no explicit
    /// model name was given.
    #[error("Cannot derive a model name from backing type '{0}'; pass an explicit name")]
    UnknownBackingType(String),

    /// `time(...)` was called with a date or time that does not exist.
    #[error("Invalid stubbed time: {0}")]
    InvalidTime(String),

    /// No definition is registered under the name.
    #[error("No definition named '{0}' is registered")]
    UnknownDefinition(String),

    /// A stub or accessor names a model that was never declared.
    #[error("No model named '{0}' is declared")]
    UnknownModel(String),

    /// A nested override targets an attribute whose template value is not a stub.
    #[error("Nested overrides for '{key}' on {model}({stub}) require a stub-valued attribute")]
    NestedOverride {
        /// Model owning the stub
        model: String,
        /// Stub being materialized
        stub: String,
        /// Attribute the nested overrides were given for
        key: String,
    },

    /// An id marker was given under a key other than `id`.
    #[error("Id marker under '{key}' on {model}({stub}); it is only valid under 'id'")]
    MisplacedIdMarker {
        /// Model owning the stub
        model: String,
        /// Stub being materialized
        stub: String,
        /// Attribute holding the marker
        key: String,
    },

    /// An element of a to-many association asks for an attribute projection.
    #[error("To-many attribute '{key}' on {model}({stub}) cannot project attributes")]
    ProjectionInMany {
        model: String,
        stub: String,
        key: String,
    },

    /// A lifecycle hook was called in the wrong state.
    #[error("Cannot {action} a test scope in the {state} state")]
    ScopeState {
        /// The attempted transition
        action: &'static str,
        /// The scope's current state
        state: &'static str,
    },
}
