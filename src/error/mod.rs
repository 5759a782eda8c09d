//! Error types for stub declaration, materialization and insertion.
//!
//! `StubError` is the top-level error type returned by every fallible operation in the crate.
//! It wraps the domain-specific errors defined in the submodules so callers can either match
//! on the specific failure or propagate everything with `?`. Nothing in this crate retries or
//! swallows an error; the host test lifecycle decides how a failure is reported.

pub mod config;
pub mod internal;
pub mod resolution;
pub mod validation;

use thiserror::Error;

use crate::error::{
    config::ConfigError, internal::InternalError, resolution::ResolutionError,
    validation::ValidationError,
};

/// Top-level model stubbing error type.
#[derive(Error, Debug)]
pub enum StubError {
    /// Conflicting or missing declaration options, surfaced at declaration time.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A referenced model, stub or attribute does not exist at materialization time.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A materialized record failed validation while being inserted.
    ///
    /// Fatal to the enclosing bulk insert; the transaction is rolled back.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Internal invariant violation indicating a bug in the engine.
    #[error(transparent)]
    Internal(#[from] InternalError),

    /// Database operation error from SeaORM.
    #[error(transparent)]
    DbErr(#[from] sea_orm::DbErr),
}
