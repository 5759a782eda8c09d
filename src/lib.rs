//! Model Stubbing
//!
//! Declarative test fixtures for SeaORM-backed test suites. Tests declare named stubs
//! (attribute templates) for their models, and the engine materializes them into records
//! with stable identities, resolved associations and a stubbed current time. Stubs can also
//! be bulk-inserted into a database before each group of tests.
//!
//! # Overview
//!
//! - **Definition**: ordered models plus a stubbed current time, declared through
//!   [`Definition::model`] and [`ModelScope`](definition::ModelScope)
//! - **Model / Stub**: the stubs of one backing type, each inheriting from the model's
//!   default stub
//! - **Registry**: named definitions, the record cache and stable ids
//! - **TestScope**: `setup` / `teardown` hooks and the record accessors used inside tests
//!
//! # Usage
//!
//! ```rust,ignore
//! use model_stubbing::{attrs, Backing, ModelOptions, Registry, TestScope};
//!
//! let mut registry = Registry::new();
//! registry.define("blog", |d| {
//!     d.time(2007, 6, 1)?;
//!     d.model(Backing::of(entity::prelude::User), ModelOptions::default(), |m| {
//!         m.default_stub(attrs! { "name" => "bob", "admin" => false })?;
//!         m.stub("admin", attrs! { "admin" => true })?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//!
//! let mut scope = TestScope::bind(&registry, "blog")?.with_database(db);
//! scope.setup().await?;
//! let admin = scope.get("users", "admin", &attrs! {})?;
//! scope.teardown().await?;
//! ```

pub mod attribute;
pub mod backing;
pub mod config;
pub mod definition;
pub mod error;
pub mod expand;
pub mod model;
pub mod naming;
pub mod record;
pub mod registry;
pub mod scope;
pub mod store;
pub mod stub;
pub mod value;

#[cfg(test)]
mod test;

pub use attribute::{Attribute, Attributes, IdRequest, StubRef};
pub use backing::Backing;
pub use config::Config;
pub use definition::{Definition, StubOptions};
pub use error::StubError;
pub use model::{Model, ModelOptions};
pub use record::Record;
pub use registry::Registry;
pub use scope::TestScope;
pub use stub::Stub;
pub use value::Value;
