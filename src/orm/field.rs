//! Column descriptors.

use std::fmt;
use std::sync::Arc;

use super::value::Value;

/// Where an unset field gets its value from when a record is written.
#[derive(Clone)]
pub enum FieldDefault {
    None,
    Value(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl FieldDefault {
    /// Produces the default, invoking the factory if there is one.
    pub fn resolve(&self) -> Option<Value> {
        match self {
            Self::None       => None,
            Self::Value(v)   => Some(v.clone()),
            Self::Factory(f) => Some(f()),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None       => f.write_str("None"),
            Self::Value(v)   => f.debug_tuple("Value").field(v).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Describes how one record field maps onto a table column.
///
/// Built with one of the typed constructors and refined with the chaining
/// methods; the schema builder fills in the name from the declared field.
///
/// ```rust
/// use blogweb::orm::Field;
///
/// let id = Field::string().ddl("varchar(50)").primary_key();
/// let title = Field::string();
/// let admin = Field::boolean();
/// let created_at = Field::float().default_with(|| 0.5);
/// ```
#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    column_type: String,
    primary_key: bool,
    hidden: bool,
    default: FieldDefault,
}

impl Field {
    pub fn new(column_type: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            column_type: column_type.into(),
            primary_key: false,
            hidden: false,
            default: FieldDefault::None,
        }
    }

    /// A `varchar(100)` column. Use [`Field::ddl`] for another width.
    pub fn string() -> Self {
        Self::new("varchar(100)")
    }

    /// A `boolean` column defaulting to `false`.
    pub fn boolean() -> Self {
        Self::new("boolean").default_value(false)
    }

    /// An `int` column defaulting to `0`.
    pub fn integer() -> Self {
        Self::new("int").default_value(0i64)
    }

    /// A `float` column defaulting to `0.0`.
    pub fn float() -> Self {
        Self::new("float").default_value(0.0)
    }

    /// A `text` column with no default.
    pub fn text() -> Self {
        Self::new("text")
    }

    /// Replaces the column type, e.g. `varchar(50)`.
    pub fn ddl(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = column_type.into();
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Stored like any other column but left out when the record is serialized.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    /// Default computed on every write, e.g. a fresh id or the current time.
    pub fn default_with<F, V>(mut self, factory: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.default = FieldDefault::Factory(Arc::new(move || factory().into()));
        self
    }

    pub(crate) fn named(mut self, name: &str) -> Self {
        if self.name.is_empty() {
            self.name = name.to_owned();
        }
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn column_type(&self) -> &str { &self.column_type }
    pub fn is_primary_key(&self) -> bool { self.primary_key }
    pub fn is_hidden(&self) -> bool { self.hidden }
    pub fn default(&self) -> &FieldDefault { &self.default }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Field, {}:{}>", self.column_type, self.name)
    }
}
