//! Attribute expansion.
//!
//! A [`Materializer`] pairs a definition with the registry whose caches it materializes into.
//! It merges overrides into stub templates, resolves stub references to records and flattens
//! the result into the fields and insertable row of a new record.

use std::{cell::RefCell, rc::Rc};

use crate::{
    attribute::{Attribute, Attributes, StubRef, StubTarget},
    definition::Definition,
    error::{config::ConfigError, resolution::ResolutionError, StubError},
    model::Model,
    record::{Field, Fields, Record, Row},
    registry::Registry,
    stub::Stub,
    value::Value,
};

/// Resolved attributes of one stub: in-memory fields plus the flat insertable row.
#[derive(Debug, Default)]
pub struct Expansion {
    pub fields: Fields,
    pub row: Row,
}

pub struct Materializer<'a> {
    definition: &'a Definition,
    registry: &'a Registry,
    /// (model, stub) pairs currently being expanded, innermost last.
    stack: RefCell<Vec<(String, String)>>,
}

impl<'a> Materializer<'a> {
    pub fn new(definition: &'a Definition, registry: &'a Registry) -> Self {
        Self {
            definition,
            registry,
            stack: RefCell::new(Vec::new()),
        }
    }

    pub fn definition(&self) -> &'a Definition {
        self.definition
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Finds the stub a reference points at.
    pub fn lookup(&self, target: &StubTarget) -> Result<&'a Stub, ResolutionError> {
        match target {
            StubTarget::Named { model, stub } => self
                .definition
                .model_named(model)
                .ok_or_else(|| ResolutionError::MissingModel {
                    model: model.clone(),
                    stub: stub.clone(),
                })?
                .stub(stub)
                .ok_or_else(|| ResolutionError::MissingStub {
                    model: model.clone(),
                    stub: stub.clone(),
                }),
            StubTarget::Global(key) => self
                .definition
                .stub(key)
                .ok_or_else(|| ResolutionError::MissingGlobalKey(key.clone())),
        }
    }

    /// The model owning `stub` in this materializer's definition.
    pub fn model_of(&self, stub: &Stub) -> Result<&'a Model, ResolutionError> {
        self.definition
            .model_named(stub.model())
            .ok_or_else(|| ResolutionError::MissingModel {
                model: stub.model().to_string(),
                stub: stub.name().to_string(),
            })
    }

    /// Materializes the record a reference points at, with the overrides it carries.
    ///
    /// Attribute projections are not applied here; see [`Materializer::expand`].
    pub fn resolve(&self, reference: &StubRef) -> Result<Rc<Record>, StubError> {
        self.lookup(&reference.target)?
            .record(self, &reference.overrides)
    }

    /// Merges `overrides` over the effective template of `stub`.
    ///
    /// Template keys keep their position and new keys are appended. Nested overrides on a
    /// stub-valued key become overrides carried by that reference.
    ///
    /// # Returns
    /// - `Ok(Attributes)` - Merged attributes
    /// - `Err(StubError::Config)` - Nested overrides target a key that is not stub-valued
    pub fn merge(&self, stub: &Stub, overrides: &Attributes) -> Result<Attributes, StubError> {
        let mut merged = stub.attributes().clone();

        for (key, value) in overrides {
            let value = match value {
                Attribute::Nested(nested) => match merged.get(key) {
                    Some(Attribute::Stub(reference)) => {
                        Attribute::Stub(reference.clone().with(nested.clone()))
                    }
                    _ => return Err(nested_override(stub, key).into()),
                },
                other => other.clone(),
            };
            merged.insert(key.clone(), value);
        }

        Ok(merged)
    }

    /// Resolves merged attributes of `stub` into fields and an insertable row.
    ///
    /// # Returns
    /// - `Ok(Expansion)` - Resolved fields and row, without an `id` column
    /// - `Err(StubError::Resolution)` - A reference is missing or `stub` refers to itself
    /// - `Err(StubError::Config)` - A nested override was left without a stub to apply to, an id
    ///   marker sits under another key, or a to-many element projects an attribute
    pub fn expand(&self, stub: &Stub, attributes: &Attributes) -> Result<Expansion, StubError> {
        self.enter(stub)?;
        let expansion = self.expand_attributes(stub, attributes);
        self.stack.borrow_mut().pop();
        expansion
    }

    fn enter(&self, stub: &Stub) -> Result<(), ResolutionError> {
        let mut stack = self.stack.borrow_mut();
        let cyclic = stack
            .iter()
            .any(|(model, name)| model == stub.model() && name == stub.name());
        if cyclic {
            return Err(ResolutionError::Cycle {
                model: stub.model().to_string(),
                stub: stub.name().to_string(),
            });
        }

        stack.push((stub.model().to_string(), stub.name().to_string()));
        Ok(())
    }

    fn expand_attributes(
        &self,
        stub: &Stub,
        attributes: &Attributes,
    ) -> Result<Expansion, StubError> {
        let backing = self.model_of(stub)?.backing();
        let mut expansion = Expansion::default();

        for (key, attribute) in attributes {
            match attribute {
                Attribute::Value(value) => {
                    expansion.fields.insert(key.clone(), Field::Value(value.clone()));
                    expansion.row.insert(key.clone(), value.clone());
                }
                Attribute::Stub(reference) => {
                    let target = self.lookup(&reference.target)?;
                    let record = target.record(self, &reference.overrides)?;

                    match &reference.attribute {
                        None => {
                            let id = record.id().map_or(Value::Null, Value::Int);
                            expansion.row.insert(backing.association_column(key), id);
                            expansion.fields.insert(key.clone(), Field::One(record));
                        }
                        Some(attribute) => {
                            let field = record.get(attribute).cloned().ok_or_else(|| {
                                ResolutionError::MissingAttribute {
                                    model: target.model().to_string(),
                                    stub: target.name().to_string(),
                                    attribute: attribute.clone(),
                                }
                            })?;
                            if let Field::Value(value) = &field {
                                expansion.row.insert(key.clone(), value.clone());
                            }
                            expansion.fields.insert(key.clone(), field);
                        }
                    }
                }
                Attribute::Many(references) => {
                    if references.iter().any(|r| r.attribute.is_some()) {
                        return Err(ConfigError::ProjectionInMany {
                            model: stub.model().to_string(),
                            stub: stub.name().to_string(),
                            key: key.clone(),
                        }
                        .into());
                    }
                    let records = references
                        .iter()
                        .map(|reference| self.resolve(reference))
                        .collect::<Result<Vec<_>, _>>()?;
                    expansion.fields.insert(key.clone(), Field::Many(records));
                }
                Attribute::Nested(_) => return Err(nested_override(stub, key).into()),
                // Markers under the id key are split off before expansion.
                Attribute::Id(_) => {
                    return Err(ConfigError::MisplacedIdMarker {
                        model: stub.model().to_string(),
                        stub: stub.name().to_string(),
                        key: key.clone(),
                    }
                    .into())
                }
            }
        }

        Ok(expansion)
    }
}

fn nested_override(stub: &Stub, key: &str) -> ConfigError {
    ConfigError::NestedOverride {
        model: stub.model().to_string(),
        stub: stub.name().to_string(),
        key: key.to_string(),
    }
}
