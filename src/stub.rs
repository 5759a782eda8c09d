//! Stub templates.
//!
//! A [`Stub`] is a named attribute template for one model. Every stub other than the default
//! one starts from the default stub's attributes; the merge happens once, when the stub is
//! declared, so later changes to the default leave existing siblings untouched.

use std::rc::Rc;

use crate::{
    attribute::{split_id_request, Attribute, Attributes, IdRequest, ID},
    definition::StubOptions,
    error::StubError,
    expand::{Expansion, Materializer},
    model::Model,
    naming::{self, DEFAULT_STUB},
    record::{Fields, Record},
    registry::Fingerprint,
    store::{self, Store},
    value::Value,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Stub {
    name: String,
    model: String,
    global_key: String,
    attributes: Attributes,
}

impl Stub {
    /// Creates a stub of `model`, inheriting the default stub's attributes unless this is
    /// the default stub.
    pub fn new(model: &Model, name: &str, declared: Attributes) -> Self {
        let attributes = match model.default() {
            Some(default) if name != DEFAULT_STUB => {
                let mut attributes = default.attributes.clone();
                attributes.extend(declared);
                attributes
            }
            _ => declared,
        };

        Self {
            name: name.to_string(),
            model: model.name().to_string(),
            global_key: naming::global_key(name, model.singular()),
            attributes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Definition-wide key, such as `user` or `admin_user`.
    pub fn global_key(&self) -> &str {
        &self.global_key
    }

    /// Effective attributes: the default stub's merged with this stub's own.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_STUB
    }

    /// Materializes this stub.
    ///
    /// Without overrides the record is cached and the same object is returned on every call
    /// until the registry's records are cleared. With overrides a fresh record is built each
    /// time, but equal overrides still map to the same id. An `id` marker in the overrides
    /// yields an unsaved record: [`IdRequest::New`](crate::attribute::IdRequest::New)
    /// without an id, [`IdRequest::Dup`](crate::attribute::IdRequest::Dup) with a fresh one.
    ///
    /// # Arguments
    /// - `mx` - Materializer for the definition this stub belongs to
    /// - `overrides` - Attributes to merge over the template, possibly empty
    ///
    /// # Returns
    /// - `Ok(Rc<Record>)` - The materialized record
    /// - `Err(StubError::Resolution)` - A referenced model, stub or attribute is missing
    /// - `Err(StubError::Config)` - Nested overrides target a non-stub attribute
    /// - `Err(StubError::Internal)` - The record cache holds a colliding fingerprint
    pub fn record(&self, mx: &Materializer, overrides: &Attributes) -> Result<Rc<Record>, StubError> {
        let backing = mx.model_of(self)?.backing();
        let merged = mx.merge(self, overrides)?;
        let (request, attributes) = split_id_request(&merged);

        let fingerprint = Fingerprint::of(
            mx.definition().identity(),
            backing.name(),
            &self.global_key,
            &attributes,
        )?;
        let cacheable = overrides.is_empty() && request.is_none();
        if cacheable {
            if let Some(record) = mx.registry().cached(&fingerprint)? {
                return Ok(record);
            }
        }

        let Expansion { fields, row } = mx.expand(self, &attributes)?;

        let explicit = attributes
            .get(ID)
            .and_then(Attribute::as_value)
            .and_then(Value::as_int);
        let id = match request {
            Some(IdRequest::New) => None,
            Some(IdRequest::Dup) => Some(mx.registry().next_id(backing.name())),
            None => Some(explicit.unwrap_or_else(|| {
                mx.registry().stable_id(&fingerprint, backing.name())
            })),
        };

        let record = Rc::new(Record::new(
            backing.name(),
            backing.table_name(),
            &self.global_key,
            id,
            request.is_some(),
            fields,
            row,
        ));

        if cacheable {
            mx.registry().cache(&fingerprint, Rc::clone(&record));
        }

        Ok(record)
    }

    /// Materializes this stub as a saved record and writes it to `store`.
    ///
    /// With `callbacks` the backing type's full save path runs, which always validates. With
    /// `validate` alone the record is checked and then written directly. Otherwise the row
    /// is written unconditionally.
    ///
    /// # Arguments
    /// - `mx` - Materializer for the definition this stub belongs to
    /// - `options` - Resolved insert options of the owning model
    /// - `store` - Storage to write the row to
    /// - `overrides` - Attributes to merge over the template; any `id` marker is ignored
    ///
    /// # Returns
    /// - `Ok(Rc<Record>)` - The record that was written
    /// - `Err(StubError::Validation)` - The record is invalid; nothing was written
    /// - `Err(StubError::DbErr)` - Storage rejected the row
    pub async fn insert<S: Store>(
        &self,
        mx: &Materializer<'_>,
        options: &StubOptions,
        store: &S,
        overrides: &Attributes,
    ) -> Result<Rc<Record>, StubError> {
        let (_, overrides) = split_id_request(overrides);
        let record = self.record(mx, &overrides)?;
        let backing = mx.model_of(self)?.backing();

        tracing::debug!(
            "Inserting {}({}) into {}: {}",
            self.model,
            self.name,
            backing.table_name(),
            store::describe(record.row())
        );

        if options.callbacks {
            backing.save(&self.model, &self.name, &record, store).await?;
        } else {
            if options.validate {
                backing.check(&self.model, &self.name, &record)?;
            }
            store.insert_row(backing.table_name(), record.row()).await?;
        }

        Ok(record)
    }

    /// Template merged with `overrides`, with stub references resolved to their records.
    ///
    /// Read-only: nothing is cached for the stub itself.
    pub fn with(&self, mx: &Materializer, overrides: &Attributes) -> Result<Fields, StubError> {
        let merged = mx.merge(self, overrides)?;
        let (_, attributes) = split_id_request(&merged);
        Ok(mx.expand(self, &attributes)?.fields)
    }

    /// Resolved template restricted to `keys`, in template order.
    pub fn only(&self, mx: &Materializer, keys: &[&str]) -> Result<Fields, StubError> {
        let attributes: Attributes = self
            .attributes
            .iter()
            .filter(|(key, _)| keys.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(mx.expand(self, &attributes)?.fields)
    }

    /// Resolved template without `keys`.
    pub fn except(&self, mx: &Materializer, keys: &[&str]) -> Result<Fields, StubError> {
        let attributes: Attributes = self
            .attributes
            .iter()
            .filter(|(key, _)| !keys.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(mx.expand(self, &attributes)?.fields)
    }

    /// Copy of this stub owned by `model`.
    ///
    /// The global key is recomputed from `model`, so the copy only equals this stub when
    /// `model` has the same name and singular form.
    pub fn dup_into(&self, model: &Model) -> Self {
        Self {
            name: self.name.clone(),
            model: model.name().to_string(),
            global_key: naming::global_key(&self.name, model.singular()),
            attributes: self.attributes.clone(),
        }
    }
}
