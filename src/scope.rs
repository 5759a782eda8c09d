//! Test scopes: the per-test lifecycle around a definition.
//!
//! A [`TestScope`] binds a definition to a group of tests. `setup` runs before each test:
//! it drops cached records, hands the stubbed time to the clock override, bulk-inserts the
//! definition the first time around and opens the transaction the test runs in.
//! `teardown` drops cached records again and rolls that transaction back. Records are
//! reached through an accessor table keyed by each model's plural and singular names.

use std::{collections::HashMap, fmt, rc::Rc};

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::{
    attribute::{Attribute, Attributes, IdRequest, StubRef, ID},
    definition::Definition,
    error::{config::ConfigError, StubError},
    model::Model,
    record::Record,
    registry::Registry,
    store::Detached,
};

type Clock = Box<dyn Fn(DateTime<Utc>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// Attached to a definition, no test running yet.
    Bound,
    /// Inside a test.
    Active,
    /// Between tests.
    TornDown,
    /// Finished; inserted rows purged.
    Discarded,
}

impl ScopeState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Bound => "bound",
            Self::Active => "active",
            Self::TornDown => "torn down",
            Self::Discarded => "discarded",
        }
    }
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct TestScope<'r> {
    registry: &'r Registry,
    definition: &'r Definition,
    /// Plural and singular accessor names → model name.
    accessors: HashMap<String, String>,
    database: Option<DatabaseConnection>,
    clock: Option<Clock>,
    transaction: Option<DatabaseTransaction>,
    inserted: bool,
    state: ScopeState,
}

impl<'r> TestScope<'r> {
    /// Binds the definition registered as `name`.
    ///
    /// # Returns
    /// - `Ok(TestScope)` - Scope in the `Bound` state
    /// - `Err(StubError::Config)` - No definition is registered under `name`
    pub fn bind(registry: &'r Registry, name: &str) -> Result<Self, StubError> {
        let definition = registry
            .definition(name)
            .ok_or_else(|| ConfigError::UnknownDefinition(name.to_string()))?;

        Ok(Self::attach(registry, definition))
    }

    /// Binds a definition that is not registered by name.
    pub fn attach(registry: &'r Registry, definition: &'r Definition) -> Self {
        let mut accessors = HashMap::new();
        for model in definition.models() {
            accessors.insert(model.plural().to_string(), model.name().to_string());
            accessors.insert(model.singular().to_string(), model.name().to_string());
        }

        tracing::debug!(
            "Bound test scope to {} models of definition {}",
            definition.models().count(),
            definition.name().unwrap_or("<unnamed>")
        );

        Self {
            registry,
            definition,
            accessors,
            database: None,
            clock: None,
            transaction: None,
            inserted: false,
            state: ScopeState::Bound,
        }
    }

    /// Inserts stubs into `db` at setup and runs each test in a transaction on it.
    ///
    /// Without a database the scope works purely in memory.
    pub fn with_database(mut self, db: DatabaseConnection) -> Self {
        self.database = Some(db);
        self
    }

    /// Installs the clock override called with the stubbed time at every setup.
    pub fn with_clock(mut self, clock: impl Fn(DateTime<Utc>) + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub fn definition(&self) -> &'r Definition {
        self.definition
    }

    /// Whether the definition has been bulk-inserted by this scope.
    pub fn is_inserted(&self) -> bool {
        self.inserted
    }

    /// The transaction the current test runs in.
    pub fn transaction(&self) -> Option<&DatabaseTransaction> {
        self.transaction.as_ref()
    }

    /// Prepares the scope for a test.
    ///
    /// # Returns
    /// - `Ok(())` - The scope is `Active`
    /// - `Err(StubError::Config)` - A test is already running or the scope is finished
    /// - `Err(StubError)` - Bulk insert failed; its transaction was rolled back
    pub async fn setup(&mut self) -> Result<(), StubError> {
        self.expect(&[ScopeState::Bound, ScopeState::TornDown], "set up")?;

        self.registry.clear_records();

        if let (Some(clock), Some(time)) = (&self.clock, self.definition.stubbed_time()) {
            clock(time);
        }

        if let Some(db) = &self.database {
            if self.definition.options().insert && !self.inserted {
                self.definition.insert(self.registry, db).await?;
                self.inserted = true;
            }

            self.transaction = Some(db.begin().await?);
        }

        self.state = ScopeState::Active;
        tracing::debug!("Test scope set up");
        Ok(())
    }

    /// Ends the running test, rolling back everything it wrote.
    ///
    /// # Returns
    /// - `Ok(())` - The scope is `TornDown`
    /// - `Err(StubError::Config)` - No test is running
    /// - `Err(StubError::DbErr)` - The rollback failed
    pub async fn teardown(&mut self) -> Result<(), StubError> {
        self.expect(&[ScopeState::Active], "tear down")?;

        self.registry.clear_records();
        self.state = ScopeState::TornDown;

        if let Some(txn) = self.transaction.take() {
            txn.rollback().await?;
        }

        tracing::debug!("Test scope torn down");
        Ok(())
    }

    /// Ends the scope, tearing down a running test and purging what setup inserted.
    pub async fn finish(mut self) -> Result<(), StubError> {
        if self.state == ScopeState::Active {
            self.teardown().await?;
        }

        if let (true, Some(db)) = (self.inserted, &self.database) {
            self.definition.purge(db).await?;
        }

        self.state = ScopeState::Discarded;
        tracing::debug!("Test scope finished");
        Ok(())
    }

    /// Materializes stub `key` of the model with plural name `plural`.
    pub fn get(
        &self,
        plural: &str,
        key: &str,
        overrides: &Attributes,
    ) -> Result<Rc<Record>, StubError> {
        let model = self.accessor(plural)?;
        model.retrieve_record(&self.definition.materializer(self.registry), key, overrides)
    }

    /// Unsaved record of stub `key`, without an id.
    pub fn new_record(
        &self,
        singular: &str,
        key: &str,
        overrides: &Attributes,
    ) -> Result<Rc<Record>, StubError> {
        self.get(singular, key, &with_id_request(overrides, IdRequest::New))
    }

    /// Unsaved record of stub `key` with a fresh id.
    pub fn new_record_dup(
        &self,
        singular: &str,
        key: &str,
        overrides: &Attributes,
    ) -> Result<Rc<Record>, StubError> {
        self.get(singular, key, &with_id_request(overrides, IdRequest::Dup))
    }

    /// Saves a fresh copy of stub `key` through the backing type's save path.
    ///
    /// The row goes into the running test's transaction, or the database when no test is
    /// running, or nowhere without a database.
    ///
    /// # Returns
    /// - `Ok(Rc<Record>)` - The saved record, with a fresh id
    /// - `Err(StubError::Validation)` - The record is invalid; nothing was written
    pub async fn create(
        &self,
        singular: &str,
        key: &str,
        overrides: &Attributes,
    ) -> Result<Rc<Record>, StubError> {
        let model = self.accessor(singular)?;
        let record = self.new_record_dup(singular, key, overrides)?;
        let backing = model.backing();

        match (&self.transaction, &self.database) {
            (Some(txn), _) => backing.save(model.name(), key, &record, txn).await?,
            (None, Some(db)) => backing.save(model.name(), key, &record, db).await?,
            (None, None) => backing.save(model.name(), key, &record, &Detached).await?,
        }

        record.mark_saved();
        Ok(record)
    }

    /// Materializes the stub registered under a global key such as `admin_user`.
    pub fn stub(&self, global_key: &str) -> Result<Rc<Record>, StubError> {
        self.definition
            .materializer(self.registry)
            .resolve(&StubRef::global(global_key))
    }

    pub fn current_time(&self) -> DateTime<Utc> {
        self.definition.current_time()
    }

    fn accessor(&self, name: &str) -> Result<&'r Model, StubError> {
        self.accessors
            .get(name)
            .and_then(|model| self.definition.model_named(model))
            .ok_or_else(|| ConfigError::UnknownModel(name.to_string()).into())
    }

    fn expect(&self, states: &[ScopeState], action: &'static str) -> Result<(), ConfigError> {
        if states.contains(&self.state) {
            return Ok(());
        }

        Err(ConfigError::ScopeState {
            action,
            state: self.state.as_str(),
        })
    }
}

fn with_id_request(overrides: &Attributes, request: IdRequest) -> Attributes {
    let mut overrides = overrides.clone();
    overrides.insert(ID.to_string(), Attribute::Id(request));
    overrides
}
