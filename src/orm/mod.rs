//! A small ORM: column descriptors, per-model schemas with precomputed
//! statements, records with CRUD operations and the pooled database handle
//! they run against.

mod db;
mod field;
mod macros;
mod model;
mod schema;
mod value;

pub use db::Database;
pub use field::{Field, FieldDefault};
pub use model::{Find, Limit, Model, OrmError, TOTAL_KEY};
pub use schema::{Schema, SchemaBuilder, SchemaError};
pub use value::{ColumnValue, Row, Value};
