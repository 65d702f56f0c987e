//! Records and their CRUD operations.
//!
//! A record type is a plain struct whose fields are all `Option<T>`: `None`
//! means "not set yet", and is replaced by the column default when the record
//! is written. The [`model!`](crate::model) macro generates the struct, its
//! [`Schema`] and the by-name field access that [`Model`] builds on.

use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use super::db::Database;
use super::schema::{Schema, escape};
use super::value::{Row, Value};

/// Reserved column alias that [`Model::find_total`] reads its result from.
pub const TOTAL_KEY: &str = "__num__";

#[derive(Debug, Error)]
pub enum OrmError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid limit value `{0}`")]
    InvalidLimit(String),

    #[error("model `{model}` has no field `{field}`")]
    UnknownField { model: &'static str, field: String },

    #[error("field `{model}.{field}` expects {expected}, got {found}")]
    Conversion {
        model: &'static str,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// How many rows [`Model::find_all`] returns.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Limit {
    /// `limit ?`; a count of zero means no limit clause at all.
    Count(u64),
    /// `limit ?, ?`
    Window { offset: u64, count: u64 },
}

/// One value is a count, two are `offset, count`; anything else is invalid.
impl TryFrom<&[u64]> for Limit {
    type Error = OrmError;

    fn try_from(values: &[u64]) -> Result<Self, Self::Error> {
        match *values {
            [count] => Ok(Self::Count(count)),
            [offset, count] => Ok(Self::Window { offset, count }),
            _ => Err(OrmError::InvalidLimit(format!("{values:?}"))),
        }
    }
}

/// Parses `"5"` or `"10,5"`.
impl FromStr for Limit {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| OrmError::InvalidLimit(s.to_owned()))?;
        Self::try_from(values.as_slice()).map_err(|_| OrmError::InvalidLimit(s.to_owned()))
    }
}

/// Options for [`Model::find_all`].
///
/// ```rust
/// use blogweb::orm::{Find, Limit};
///
/// let find = Find::new()
///     .filter("`customer_id`=?")
///     .bind("0001")
///     .order_by("`created_at` desc")
///     .limit(Limit::Window { offset: 10, count: 5 });
/// ```
#[derive(Clone, Debug, Default)]
pub struct Find {
    filter: Option<String>,
    args: Vec<Value>,
    order_by: Option<String>,
    limit: Option<Limit>,
}

impl Find {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw `where` clause, with `?` for each bound argument.
    pub fn filter(mut self, clause: &str) -> Self {
        self.filter = Some(clause.to_owned());
        self
    }

    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn order_by(mut self, order: &str) -> Self {
        self.order_by = Some(order.to_owned());
        self
    }

    pub fn limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Appends the clauses to the schema's select and collects the arguments.
    pub fn to_sql(&self, schema: &Schema) -> (String, Vec<Value>) {
        let mut sql = schema.select().to_owned();
        let mut args = self.args.clone();
        if let Some(filter) = &self.filter {
            sql.push_str(" where ");
            sql.push_str(filter);
        }
        if let Some(order) = &self.order_by {
            sql.push_str(" order by ");
            sql.push_str(order);
        }
        match self.limit {
            Some(Limit::Count(0)) | None => {}
            Some(Limit::Count(count)) => {
                sql.push_str(" limit ?");
                args.push(count.into());
            }
            Some(Limit::Window { offset, count }) => {
                sql.push_str(" limit ?, ?");
                args.push(offset.into());
                args.push(count.into());
            }
        }
        (sql, args)
    }
}

/// A schema-backed record type.
///
/// Implemented by [`model!`](crate::model); the CRUD methods are provided.
/// Row-count mismatches on writes are logged, not raised: the affected-row
/// count is returned for callers that want to be strict.
#[async_trait]
pub trait Model: Default + Send + Sync + Sized + 'static {
    fn schema() -> &'static Schema;

    /// The field's current value, `None` when unset.
    fn value(&self, field: &str) -> Option<Value>;

    fn set_value(&mut self, field: &str, value: Value) -> Result<(), OrmError>;

    /// Builds a record from a row. Columns the schema does not know are ignored.
    fn from_row(row: Row) -> Result<Self, OrmError> {
        let schema = Self::schema();
        let mut record = Self::default();
        for (column, value) in row {
            if schema.field(&column).is_some() {
                record.set_value(&column, value)?;
            }
        }
        Ok(record)
    }

    /// The field's value, falling back to (and storing) its declared default.
    fn value_or_default(&mut self, field: &str) -> Result<Value, OrmError> {
        if let Some(value) = self.value(field) {
            return Ok(value);
        }
        let schema = Self::schema();
        let Some(descriptor) = schema.field(field) else {
            return Err(OrmError::UnknownField { model: schema.model(), field: field.to_owned() });
        };
        match descriptor.default().resolve() {
            Some(value) => {
                debug!("using default value for {field}: {value}");
                self.set_value(field, value.clone())?;
                Ok(value)
            }
            None => Ok(Value::Null),
        }
    }

    async fn find_all(db: &Database, find: Find) -> Result<Vec<Self>, OrmError> {
        let (sql, args) = find.to_sql(Self::schema());
        let rows = db.select(&sql, &args, None).await?;
        rows.into_iter().map(Self::from_row).collect()
    }

    /// Runs `select <expression> from <table> [where ...]` and returns the
    /// single scalar, or `None` when no row comes back.
    async fn find_total(
        db: &Database,
        expression: &str,
        filter: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>, OrmError> {
        let schema = Self::schema();
        let mut sql = format!("select {expression} as {} from {}", escape(TOTAL_KEY), escape(schema.table()));
        if let Some(filter) = filter {
            sql.push_str(" where ");
            sql.push_str(filter);
        }
        let mut rows = db.select(&sql, args, Some(1)).await?;
        Ok(rows.pop().and_then(|mut row| row.remove(TOTAL_KEY)))
    }

    async fn save(&mut self, db: &Database) -> Result<u64, OrmError> {
        let schema = Self::schema();
        let mut args = schema.fields().iter()
            .map(|f| self.value_or_default(f))
            .collect::<Result<Vec<_>, _>>()?;
        args.push(self.value_or_default(schema.primary_key())?);

        let rows = db.execute(schema.insert(), &args, true).await?;
        if rows != 1 {
            warn!("failed to insert record: affected rows: {rows}");
        }
        Ok(rows)
    }

    async fn modify(&mut self, db: &Database) -> Result<u64, OrmError> {
        let schema = Self::schema();
        let mut args = schema.fields().iter()
            .map(|f| self.value_or_default(f))
            .collect::<Result<Vec<_>, _>>()?;
        args.push(self.value(schema.primary_key()).unwrap_or(Value::Null));

        let rows = db.execute(schema.update(), &args, true).await?;
        if rows != 1 {
            warn!("failed to update record by primary key: affected rows: {rows}");
        }
        Ok(rows)
    }

    async fn remove(&self, db: &Database) -> Result<u64, OrmError> {
        let schema = Self::schema();
        let args = [self.value(schema.primary_key()).unwrap_or(Value::Null)];

        let rows = db.execute(schema.delete(), &args, true).await?;
        if rows != 1 {
            warn!("failed to remove record by primary key: affected rows: {rows}");
        }
        Ok(rows)
    }
}
