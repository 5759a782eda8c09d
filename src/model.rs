//! Models: the stubs of one backing type.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    attribute::Attributes,
    backing::Backing,
    definition::StubOptions,
    error::{resolution::ResolutionError, StubError},
    expand::Materializer,
    naming::DEFAULT_STUB,
    record::Record,
    store::Store,
    stub::Stub,
};

/// Per-model declaration options.
///
/// Unset insert options fall back to the definition's [`StubOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOptions {
    pub name: Option<String>,
    pub plural: Option<String>,
    pub singular: Option<String>,
    pub validate: Option<bool>,
    pub callbacks: Option<bool>,
    pub insert: Option<bool>,
}

impl ModelOptions {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = Some(plural.into());
        self
    }

    pub fn singular(mut self, singular: impl Into<String>) -> Self {
        self.singular = Some(singular.into());
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn callbacks(mut self, callbacks: bool) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    pub fn insert(mut self, insert: bool) -> Self {
        self.insert = Some(insert);
        self
    }

    /// Effective insert options given the definition's.
    pub fn resolve(&self, defaults: &StubOptions) -> StubOptions {
        StubOptions {
            validate: self.validate.unwrap_or(defaults.validate),
            callbacks: self.callbacks.unwrap_or(defaults.callbacks),
            insert: self.insert.unwrap_or(defaults.insert),
        }
    }

    /// Applies the insert options set in `other` over these.
    pub(crate) fn update(&mut self, other: &ModelOptions) {
        self.validate = other.validate.or(self.validate);
        self.callbacks = other.callbacks.or(self.callbacks);
        self.insert = other.insert.or(self.insert);
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    plural: String,
    singular: String,
    backing: Backing,
    stubs: IndexMap<String, Stub>,
    options: ModelOptions,
}

impl Model {
    pub(crate) fn new(
        name: String,
        plural: String,
        singular: String,
        backing: Backing,
        options: ModelOptions,
    ) -> Self {
        Self {
            name,
            plural,
            singular,
            backing,
            stubs: IndexMap::new(),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accessor name for materialized records, such as `users`.
    pub fn plural(&self) -> &str {
        &self.plural
    }

    /// Accessor name for new records and the base of global keys, such as `user`.
    pub fn singular(&self) -> &str {
        &self.singular
    }

    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn default(&self) -> Option<&Stub> {
        self.stubs.get(DEFAULT_STUB)
    }

    pub fn stub(&self, name: &str) -> Option<&Stub> {
        self.stubs.get(name)
    }

    /// Stubs in declaration order.
    pub fn stubs(&self) -> impl Iterator<Item = &Stub> {
        self.stubs.values()
    }

    pub fn stub_names(&self) -> impl Iterator<Item = &str> {
        self.stubs.keys().map(String::as_str)
    }

    pub(crate) fn put_stub(&mut self, stub: Stub) {
        self.stubs.insert(stub.name().to_string(), stub);
    }

    pub(crate) fn redeclare(&mut self, backing: Backing, options: &ModelOptions) {
        self.backing = backing;
        self.options.update(options);
    }

    /// Materializes the stub named `key`.
    ///
    /// # Returns
    /// - `Ok(Rc<Record>)` - The materialized record
    /// - `Err(StubError::Resolution)` - This model has no stub named `key`, or resolving it failed
    pub fn retrieve_record(
        &self,
        mx: &Materializer,
        key: &str,
        overrides: &Attributes,
    ) -> Result<Rc<Record>, StubError> {
        let stub = self.stub(key).ok_or_else(|| ResolutionError::MissingStub {
            model: self.name.clone(),
            stub: key.to_string(),
        })?;

        stub.record(mx, overrides)
    }

    /// Empties this model's table, then inserts every stub in declaration order. Does nothing
    /// when the resolved `insert` option is off.
    ///
    /// # Arguments
    /// - `mx` - Materializer for the owning definition
    /// - `defaults` - The definition's options, overridden by this model's
    /// - `store` - Storage to write to, usually the bulk-insert transaction
    ///
    /// # Returns
    /// - `Ok(())` - Every stub was inserted
    /// - `Err(StubError)` - The first stub that failed to materialize, validate or write
    pub async fn insert<S: Store>(
        &self,
        mx: &Materializer<'_>,
        defaults: &StubOptions,
        store: &S,
    ) -> Result<(), StubError> {
        let options = self.options.resolve(defaults);
        if !options.insert {
            tracing::debug!("Skipping insert of {}", self.name);
            return Ok(());
        }

        self.purge(store).await?;

        tracing::debug!("Inserting {} stubs of {}", self.stubs.len(), self.name);
        for stub in self.stubs.values() {
            stub.insert(mx, &options, store, &Attributes::new()).await?;
        }

        Ok(())
    }

    /// Deletes every row of this model's table.
    pub async fn purge<S: Store>(&self, store: &S) -> Result<(), StubError> {
        tracing::debug!("Purging {} from {}", self.name, self.backing.table_name());
        store.delete_all(self.backing.table_name()).await
    }
}

/// Models are equal when they share a name and backing type.
impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.backing == other.backing
    }
}
