//! Stub attribute templates and stub references.
//!
//! A stub's attributes are an ordered map from attribute name to [`Attribute`]. Besides plain
//! scalars an attribute can point at another stub, at an ordered list of stubs, or (in
//! overrides only) carry nested overrides for a stub-valued attribute. References are by name
//! and resolved lazily, so a stub may refer to stubs that are declared later.

use indexmap::IndexMap;
use serde::Serialize;

use crate::value::Value;

/// Ordered attribute name → template value mapping.
pub type Attributes = IndexMap<String, Attribute>;

/// Attribute name used for record identifiers and id markers.
pub const ID: &str = "id";

/// Builds an [`Attributes`] map, converting each value with `Attribute::from`.
///
/// ```rust,ignore
/// let attrs = attrs! { "name" => "bob", "admin" => false };
/// ```
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::attribute::Attributes::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut attributes = $crate::attribute::Attributes::new();
        $(
            attributes.insert(
                ::std::string::String::from($key),
                $crate::attribute::Attribute::from($value),
            );
        )+
        attributes
    }};
}

/// A single template value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Scalar copied onto every materialized record.
    Value(Value),
    /// Association to the record another stub materializes to.
    Stub(StubRef),
    /// Ordered to-many association.
    Many(Vec<StubRef>),
    /// Overrides for the stub an attribute already refers to.
    Nested(Attributes),
    /// Identifier marker, only meaningful under the `id` key of overrides.
    Id(IdRequest),
}

impl Attribute {
    /// Nested overrides for a stub-valued attribute.
    pub fn nested(overrides: Attributes) -> Self {
        Self::Nested(overrides)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_stub(&self) -> Option<&StubRef> {
        match self {
            Self::Stub(stub) => Some(stub),
            _ => None,
        }
    }
}

macro_rules! scalar_attribute {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Attribute {
                fn from(value: $ty) -> Self {
                    Self::Value(value.into())
                }
            }
        )+
    };
}

scalar_attribute!(
    Value,
    bool,
    i32,
    i64,
    f64,
    &str,
    String,
    chrono::DateTime<chrono::Utc>,
    serde_json::Value,
);

impl<T: Into<Value>> From<Option<T>> for Attribute {
    fn from(value: Option<T>) -> Self {
        Self::Value(value.into())
    }
}

impl From<StubRef> for Attribute {
    fn from(stub: StubRef) -> Self {
        Self::Stub(stub)
    }
}

impl From<Vec<StubRef>> for Attribute {
    fn from(stubs: Vec<StubRef>) -> Self {
        Self::Many(stubs)
    }
}

impl From<IdRequest> for Attribute {
    fn from(request: IdRequest) -> Self {
        Self::Id(request)
    }
}

/// How a record's identifier is assigned when it is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdRequest {
    /// Unsaved record without an id; never cached.
    New,
    /// Unsaved record with a fresh id from the backing type's sequence; never cached.
    Dup,
}

/// What a [`StubRef`] points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StubTarget {
    /// A stub by model name and stub name.
    Named { model: String, stub: String },
    /// A stub by its definition-wide global key, such as `admin_user`.
    Global(String),
}

/// A lazily resolved reference to another stub.
///
/// Optionally carries overrides to materialize the target with, and an attribute to project
/// from the materialized record instead of the record itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StubRef {
    pub target: StubTarget,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub overrides: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl StubRef {
    /// References `stub` of `model`.
    pub fn new(model: impl Into<String>, stub: impl Into<String>) -> Self {
        Self::to(StubTarget::Named {
            model: model.into(),
            stub: stub.into(),
        })
    }

    /// References a stub by its global key.
    pub fn global(key: impl Into<String>) -> Self {
        Self::to(StubTarget::Global(key.into()))
    }

    fn to(target: StubTarget) -> Self {
        Self {
            target,
            overrides: Attributes::new(),
            attribute: None,
        }
    }

    /// Materializes the target with `overrides` merged over any already carried.
    pub fn with(mut self, overrides: Attributes) -> Self {
        self.overrides.extend(overrides);
        self
    }

    /// Resolves to one attribute of the target record rather than the record.
    pub fn attr(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

/// Splits the `id` marker off `overrides`, returning it with the remaining overrides.
pub fn split_id_request(overrides: &Attributes) -> (Option<IdRequest>, Attributes) {
    let mut rest = overrides.clone();
    let request = match rest.get(ID) {
        Some(Attribute::Id(request)) => Some(*request),
        _ => None,
    };
    if request.is_some() {
        rest.shift_remove(ID);
    }
    (request, rest)
}
