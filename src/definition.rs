//! Definitions: ordered models, their stubs and a stubbed current time.
//!
//! Models are owned in declaration order and stubs are owned by their model. Everything else
//! refers to them by name: the flattened global-key view maps keys to `(model, stub)` pairs
//! and stub references are resolved when a record is materialized, so a stub may refer to
//! stubs declared after it. [`Definition::dup`] is therefore a deep copy, with its own
//! identity so its records are cached apart from the original's.

use std::{
    cell::OnceCell,
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use sea_orm::{DbErr, TransactionSession, TransactionTrait};

use crate::{
    attribute::{Attributes, StubRef},
    backing::Backing,
    error::{config::ConfigError, StubError},
    expand::Materializer,
    model::{Model, ModelOptions},
    naming::{self, DEFAULT_STUB},
    registry::Registry,
    store::Store,
    stub::Stub,
};

/// Insert behavior of a definition's models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubOptions {
    /// Check records with the backing type's validator before writing them.
    pub validate: bool,
    /// Bulk insert at test setup.
    pub insert: bool,
    /// Write through the backing type's full save path, which always validates.
    pub callbacks: bool,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            validate: true,
            insert: true,
            callbacks: false,
        }
    }
}

/// Location of a stub in the flattened global-key view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubKey {
    pub model: String,
    pub stub: String,
}

impl StubKey {
    fn new(model: &str, stub: &str) -> Self {
        Self {
            model: model.to_string(),
            stub: stub.to_string(),
        }
    }
}

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

fn next_identity() -> u64 {
    NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
pub struct Definition {
    /// Per-instance key of the records materialized from this definition. Copies get their
    /// own, so they never share cached records or ids with their origin.
    identity: u64,
    name: Option<String>,
    current_time: Option<DateTime<Utc>>,
    /// Wall-clock time, read once when no time is stubbed.
    fallback: OnceCell<DateTime<Utc>>,
    models: IndexMap<String, Model>,
    stubs: IndexMap<String, StubKey>,
    options: StubOptions,
}

impl Default for Definition {
    fn default() -> Self {
        Self {
            identity: next_identity(),
            name: None,
            current_time: None,
            fallback: OnceCell::new(),
            models: IndexMap::new(),
            stubs: IndexMap::new(),
            options: StubOptions::default(),
        }
    }
}

impl Clone for Definition {
    fn clone(&self) -> Self {
        Self {
            identity: next_identity(),
            name: self.name.clone(),
            current_time: self.current_time,
            fallback: self.fallback.clone(),
            models: self.models.clone(),
            stubs: self.stubs.clone(),
            options: self.options.clone(),
        }
    }
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: StubOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn identity(&self) -> u64 {
        self.identity
    }

    pub(crate) fn rename(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    pub fn options(&self) -> &StubOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut StubOptions {
        &mut self.options
    }

    /// Stubs the current time to midnight UTC of the given date.
    pub fn time(&mut self, year: i32, month: u32, day: u32) -> Result<(), StubError> {
        self.time_hms(year, month, day, 0, 0, 0)
    }

    /// Stubs the current time to the given UTC date and time.
    ///
    /// # Returns
    /// - `Ok(())` - The time was stubbed
    /// - `Err(StubError::Config)` - The date or time does not exist
    pub fn time_hms(
        &mut self,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Result<(), StubError> {
        let time = Utc
            .with_ymd_and_hms(year, month, day, hour, minute, second)
            .single()
            .ok_or_else(|| {
                ConfigError::InvalidTime(format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                ))
            })?;

        self.set_current_time(time);
        Ok(())
    }

    pub fn set_current_time(&mut self, time: DateTime<Utc>) {
        self.current_time = Some(time);
    }

    /// The stubbed time, if one was declared.
    pub fn stubbed_time(&self) -> Option<DateTime<Utc>> {
        self.current_time
    }

    /// The stubbed time, or the wall-clock time this was first asked for.
    pub fn current_time(&self) -> DateTime<Utc> {
        self.current_time
            .unwrap_or_else(|| *self.fallback.get_or_init(Utc::now))
    }

    /// Declares a model for `backing`, or updates the one already declared under its name,
    /// then runs `declare` to add its stubs.
    ///
    /// The model name is `options.name` or the backing type name underscored and pluralized.
    /// A redeclared model keeps its stubs and position; its backing type is replaced and the
    /// insert options set in `options` are applied.
    ///
    /// # Arguments
    /// - `backing` - Backing type of the model's records
    /// - `options` - Naming and insert options
    /// - `declare` - Declaration block adding stubs through a [`ModelScope`]
    ///
    /// # Returns
    /// - `Ok(&Model)` - The declared model
    /// - `Err(StubError::Config)` - No model name could be derived from the backing type
    pub fn model<F>(
        &mut self,
        backing: Backing,
        options: ModelOptions,
        declare: F,
    ) -> Result<&Model, StubError>
    where
        F: FnOnce(&mut ModelScope<'_>) -> Result<(), StubError>,
    {
        let name = match &options.name {
            Some(name) => name.clone(),
            None => naming::model_name(backing.name())
                .ok_or_else(|| ConfigError::UnknownBackingType(backing.name().to_string()))?,
        };

        match self.models.get_mut(&name) {
            Some(model) => model.redeclare(backing, &options),
            None => {
                let plural = options.plural.clone().unwrap_or_else(|| name.clone());
                let singular = options
                    .singular
                    .clone()
                    .unwrap_or_else(|| naming::singularize(&name));
                let model = Model::new(name.clone(), plural, singular, backing, options);
                self.models.insert(name.clone(), model);
            }
        }

        let mut scope = ModelScope {
            definition: self,
            model: name.clone(),
        };
        declare(&mut scope)?;

        self.models
            .get(&name)
            .ok_or_else(|| ConfigError::UnknownModel(name).into())
    }

    /// Declares stub `name` of `model` and registers it under its global key.
    ///
    /// Declaring a named stub before the default one creates an empty default stub first.
    /// Redeclaring a stub replaces it in place.
    ///
    /// # Returns
    /// - `Ok(StubRef)` - Reference to the declared stub
    /// - `Err(StubError::Config)` - `model` was never declared
    pub fn add_stub(
        &mut self,
        model: &str,
        name: &str,
        attributes: Attributes,
    ) -> Result<StubRef, StubError> {
        let owner = self
            .models
            .get_mut(model)
            .ok_or_else(|| ConfigError::UnknownModel(model.to_string()))?;

        if name != DEFAULT_STUB && owner.default().is_none() {
            let default = Stub::new(owner, DEFAULT_STUB, Attributes::new());
            self.stubs
                .insert(default.global_key().to_string(), StubKey::new(model, DEFAULT_STUB));
            owner.put_stub(default);
        }

        let stub = Stub::new(owner, name, attributes);
        self.stubs
            .insert(stub.global_key().to_string(), StubKey::new(model, name));
        owner.put_stub(stub);

        Ok(StubRef::new(model, name))
    }

    /// Models in declaration order.
    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    pub fn model_named(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Global key → stub location, in declaration order.
    pub fn stubs(&self) -> &IndexMap<String, StubKey> {
        &self.stubs
    }

    /// The stub registered under a global key such as `admin_user`.
    pub fn stub(&self, global_key: &str) -> Option<&Stub> {
        let key = self.stubs.get(global_key)?;
        self.models.get(&key.model)?.stub(&key.stub)
    }

    /// A materializer for this definition's stubs, caching into `registry`.
    pub fn materializer<'a>(&'a self, registry: &'a Registry) -> Materializer<'a> {
        Materializer::new(self, registry)
    }

    /// Deep copy sharing no state with this definition.
    pub fn dup(&self) -> Self {
        self.clone()
    }

    /// Inserts every model inside one transaction on `db`.
    ///
    /// The transaction is committed when every stub was written, and rolled back when any
    /// model fails; the failure is returned either way.
    ///
    /// # Arguments
    /// - `registry` - Registry the inserted records are materialized into
    /// - `db` - Connection to open the transaction on
    ///
    /// # Returns
    /// - `Ok(())` - Every model was purged and inserted
    /// - `Err(StubError)` - A stub failed to materialize, validate or write
    pub async fn insert<C: TransactionTrait>(
        &self,
        registry: &Registry,
        db: &C,
    ) -> Result<(), StubError> {
        let txn = db.begin().await?;

        match self.insert_into(registry, &txn).await {
            Ok(()) => {
                txn.commit().await?;
                tracing::info!(
                    "Inserted {} models of definition {}",
                    self.models.len(),
                    self.name.as_deref().unwrap_or("<unnamed>")
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!("Rolling back stub insert: {}", e);
                Err(insert_failure(e, txn.rollback().await))
            }
        }
    }

    /// Purges and inserts every model, in declaration order, into `store`.
    pub async fn insert_into<S: Store>(&self, registry: &Registry, store: &S) -> Result<(), StubError> {
        let mx = self.materializer(registry);
        for model in self.models.values() {
            model.insert(&mx, &self.options, store).await?;
        }

        Ok(())
    }

    /// Deletes every row of every bulk-inserted model, in reverse declaration order.
    pub async fn purge<S: Store>(&self, store: &S) -> Result<(), StubError> {
        for model in self.models.values().rev() {
            if model.options().resolve(&self.options).insert {
                model.purge(store).await?;
            }
        }

        Ok(())
    }
}

/// The error a failed bulk insert reports. A failed rollback is logged, never returned in
/// place of the insert error.
fn insert_failure(error: StubError, rollback: Result<(), DbErr>) -> StubError {
    if let Err(rollback) = rollback {
        tracing::error!("Failed to roll back stub insert: {}", rollback);
    }
    error
}

/// Definitions are equal when they declare the same models and stubs in the same order,
/// with the same stubbed time and options.
impl PartialEq for Definition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.current_time == other.current_time
            && self.options == other.options
            && self.models.len() == other.models.len()
            && self
                .models
                .values()
                .zip(other.models.values())
                .all(|(a, b)| a == b && a.stubs().eq(b.stubs()))
            && self.stubs.iter().eq(other.stubs.iter())
    }
}

/// Declaration block for one model's stubs.
pub struct ModelScope<'a> {
    definition: &'a mut Definition,
    model: String,
}

impl ModelScope<'_> {
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Declares a stub inheriting the default stub's attributes.
    pub fn stub(&mut self, name: &str, attributes: Attributes) -> Result<StubRef, StubError> {
        self.definition.add_stub(&self.model, name, attributes)
    }

    pub fn default_stub(&mut self, attributes: Attributes) -> Result<StubRef, StubError> {
        self.stub(DEFAULT_STUB, attributes)
    }

    /// The definition's current time, for time-relative attributes.
    pub fn current_time(&self) -> DateTime<Utc> {
        self.definition.current_time()
    }

    /// Reference to `stub` of `model`. Resolved when materialized, so it may name a stub
    /// that is declared later.
    pub fn stub_ref(&self, model: &str, stub: &str) -> StubRef {
        StubRef::new(model, stub)
    }

    /// Reference to the stub registered under a global key.
    pub fn all_stubs(&self, global_key: &str) -> StubRef {
        StubRef::global(global_key)
    }
}
