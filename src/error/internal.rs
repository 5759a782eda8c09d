use thiserror::Error;

/// Internal issues with the engine indicating unexpected behavior & possible bugs
#[derive(Error, Debug)]
pub enum InternalError {
    /// Two different effective attribute sets produced the same fingerprint.
    ///
    /// Structurally impossible for a collision-free digest; reported rather than resolved.
    #[error("Fingerprint {fingerprint} collides: cached '{cached}' but requested '{requested}'")]
    CacheConsistency {
        /// Hex digest shared by both attribute sets
        fingerprint: String,
        /// Canonical attributes of the cached record
        cached: String,
        /// Canonical attributes of the requested record
        requested: String,
    },

    /// Attributes or a record row could not be converted to JSON.
    #[error("Failed to serialize stub attributes: {0}")]
    Serialize(#[from] serde_json::Error),
}
