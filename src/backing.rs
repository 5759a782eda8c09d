//! Backing record types.
//!
//! A [`Backing`] describes the host record type a model's stubs materialize into: its type
//! name, the table bulk inserts write to, which association keys map to which foreign-key
//! columns, and the validation and before-save hooks of its save path. Hooks are shared
//! between duplicated definitions; they are never mutated after declaration.

use std::{fmt, rc::Rc};

use convert_case::{Case, Casing};
use indexmap::IndexMap;
use sea_orm::EntityTrait;

use crate::{
    error::{validation::ValidationError, StubError},
    naming,
    record::{Record, Row},
    store::Store,
};

type Validator = Rc<dyn Fn(&Record) -> Vec<String>>;
type Callback = Rc<dyn Fn(&Record, &mut Row)>;

#[derive(Clone)]
pub struct Backing {
    name: String,
    table: String,
    associations: IndexMap<String, String>,
    validator: Option<Validator>,
    callbacks: Vec<Callback>,
}

impl Backing {
    /// Describes a backing type by name. The table defaults to the underscored,
    /// pluralized name (`BlogPost` → `blog_posts`).
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let table = naming::model_name(&name).unwrap_or_default();
        Self {
            name,
            table,
            associations: IndexMap::new(),
            validator: None,
            callbacks: Vec::new(),
        }
    }

    /// Describes a SeaORM entity, taking the table name from the entity.
    ///
    /// The type name is the entity's module in Pascal case, so `entity::user::Entity`
    /// becomes `User`.
    pub fn of<E: EntityTrait>(entity: E) -> Self {
        let path = std::any::type_name::<E>();
        let mut segments = path.rsplit("::");
        let last = segments.next().unwrap_or(path);
        let name = match segments.next() {
            Some(module) if last == "Entity" => module.to_case(Case::Pascal),
            _ => last.to_string(),
        };

        Self::new(name).table(entity.table_name())
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Maps the association stored under `key` to `column` instead of `{key}_id`.
    pub fn belongs_to(mut self, key: impl Into<String>, column: impl Into<String>) -> Self {
        self.associations.insert(key.into(), column.into());
        self
    }

    /// Installs the validation hook. It returns the record's error messages, empty when valid.
    pub fn validate(mut self, validator: impl Fn(&Record) -> Vec<String> + 'static) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }

    /// Adds a callback run on the full save path before the row is written.
    pub fn before_save(mut self, callback: impl Fn(&Record, &mut Row) + 'static) -> Self {
        self.callbacks.push(Rc::new(callback));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Foreign-key column for an association key, from declared metadata or `{key}_id`.
    pub fn association_column(&self, key: &str) -> String {
        self.associations
            .get(key)
            .cloned()
            .unwrap_or_else(|| format!("{key}_id"))
    }

    /// Validation messages for `record`; empty when valid or no validator is installed.
    pub fn errors(&self, record: &Record) -> Vec<String> {
        self.validator
            .as_ref()
            .map(|validator| validator(record))
            .unwrap_or_default()
    }

    /// Runs the full save path: validation, before-save callbacks, then the row write.
    ///
    /// # Arguments
    /// - `model` - Model name reported in validation errors
    /// - `stub` - Stub name reported in validation errors
    /// - `record` - Materialized record to save
    /// - `store` - Storage to write the row to
    ///
    /// # Returns
    /// - `Ok(())` - Row written
    /// - `Err(StubError::Validation)` - Validator reported errors; nothing was written
    /// - `Err(StubError::DbErr)` - Storage rejected the row
    pub async fn save<S: Store>(
        &self,
        model: &str,
        stub: &str,
        record: &Record,
        store: &S,
    ) -> Result<(), StubError> {
        self.check(model, stub, record)?;

        let mut row = record.row().clone();
        for callback in &self.callbacks {
            callback(record, &mut row);
        }

        store.insert_row(&self.table, &row).await
    }

    /// Fails with a `ValidationError` naming the model and stub when `record` is invalid.
    pub(crate) fn check(
        &self,
        model: &str,
        stub: &str,
        record: &Record,
    ) -> Result<(), ValidationError> {
        let messages = self.errors(record);
        if messages.is_empty() {
            return Ok(());
        }

        Err(ValidationError {
            model: model.to_string(),
            stub: stub.to_string(),
            messages,
        })
    }
}

/// Backing types are equal when they name the same type and table.
impl PartialEq for Backing {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.table == other.table
    }
}

impl fmt::Debug for Backing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backing")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("associations", &self.associations)
            .field("validates", &self.validator.is_some())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
