//! Per-model table schema and precomputed SQL.
//!
//! A [`Schema`] is built exactly once per record type, the first time the
//! model is used, and never changes afterwards. All statements use `?`
//! placeholders and backtick-quoted identifiers.
//!
//! ```rust
//! use blogweb::orm::{Field, Schema};
//!
//! let schema = Schema::builder("User")
//!     .table("users")
//!     .field("id", Field::string().ddl("varchar(50)").primary_key())
//!     .field("name", Field::string().ddl("varchar(50)"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.select(), "select `id`, `name` from `users`");
//! assert_eq!(schema.delete(), "delete from `users` where `id`=?");
//! ```

use thiserror::Error;

use super::field::Field;

/// Why a record type cannot be mapped onto a table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("primary key not found for model `{model}`")]
    MissingPrimaryKey { model: String },

    #[error("duplicate primary key for field `{field}` in model `{model}`")]
    DuplicatePrimaryKey { model: String, field: String },

    #[error("field `{field}` declared twice in model `{model}`")]
    DuplicateField { model: String, field: String },
}

/// Table name, field mappings and the four CRUD statements of one model.
#[derive(Debug)]
pub struct Schema {
    model: String,
    table: String,
    mappings: Vec<Field>,
    primary_key: String,
    fields: Vec<String>,
    select: String,
    insert: String,
    update: String,
    delete: String,
}

impl Schema {
    pub fn builder(model: &str) -> SchemaBuilder {
        SchemaBuilder { model: model.to_owned(), table: None, fields: Vec::new() }
    }

    pub fn model(&self) -> &str { &self.model }
    pub fn table(&self) -> &str { &self.table }
    pub fn primary_key(&self) -> &str { &self.primary_key }

    /// Non-key field names, in declaration order.
    pub fn fields(&self) -> &[String] { &self.fields }

    /// Every field, primary key included, in declaration order.
    pub fn mappings(&self) -> &[Field] { &self.mappings }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.mappings.iter().find(|f| f.name() == name)
    }

    pub fn select(&self) -> &str { &self.select }
    pub fn insert(&self) -> &str { &self.insert }
    pub fn update(&self) -> &str { &self.update }
    pub fn delete(&self) -> &str { &self.delete }

    /// `create table if not exists` for this model, built from the column types.
    pub fn create_table(&self) -> String {
        let mut columns: Vec<String> = self.mappings.iter()
            .map(|f| {
                let not_null = if f.is_primary_key() { " not null" } else { "" };
                format!("{} {}{not_null}", escape(f.name()), f.column_type())
            })
            .collect();
        columns.push(format!("primary key ({})", escape(&self.primary_key)));
        format!("create table if not exists {} ({})", escape(&self.table), columns.join(", "))
    }
}

/// Collects field declarations; [`build`](SchemaBuilder::build) validates
/// them and renders the statements.
pub struct SchemaBuilder {
    model: String,
    table: Option<String>,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    /// Overrides the table name, which otherwise is the model name.
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_owned());
        self
    }

    pub fn field(mut self, name: &str, field: Field) -> Self {
        self.fields.push(field.named(name));
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let table = self.table.unwrap_or_else(|| self.model.clone());
        tracing::info!(model = %self.model, table = %table, "found model");

        let mut primary_key: Option<String> = None;
        let mut fields = Vec::new();
        for (i, field) in self.fields.iter().enumerate() {
            tracing::debug!("  found mapping: {} ==> {field}", field.name());
            if self.fields[..i].iter().any(|f| f.name() == field.name()) {
                return Err(SchemaError::DuplicateField {
                    model: self.model,
                    field: field.name().to_owned(),
                });
            }
            if field.is_primary_key() {
                if primary_key.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        model: self.model,
                        field: field.name().to_owned(),
                    });
                }
                primary_key = Some(field.name().to_owned());
            } else {
                fields.push(field.name().to_owned());
            }
        }
        let Some(primary_key) = primary_key else {
            return Err(SchemaError::MissingPrimaryKey { model: self.model });
        };

        let escaped: Vec<String> = fields.iter().map(|f| escape(f)).collect();
        let pk = escape(&primary_key);
        let tbl = escape(&table);

        let select = {
            let mut columns = vec![pk.clone()];
            columns.extend(escaped.iter().cloned());
            format!("select {} from {tbl}", columns.join(", "))
        };
        let insert = {
            let mut columns = escaped.clone();
            columns.push(pk.clone());
            format!(
                "insert into {tbl} ({}) values ({})",
                columns.join(", "),
                placeholders(columns.len()),
            )
        };
        let update = {
            let assignments = if escaped.is_empty() {
                // Nothing but the key: a no-op assignment keeps one argument.
                format!("{pk}={pk}")
            } else {
                escaped.iter().map(|c| format!("{c}=?")).collect::<Vec<_>>().join(", ")
            };
            format!("update {tbl} set {assignments} where {pk}=?")
        };
        let delete = format!("delete from {tbl} where {pk}=?");

        Ok(Schema {
            model: self.model,
            table,
            mappings: self.fields,
            primary_key,
            fields,
            select,
            insert,
            update,
            delete,
        })
    }
}

/// Backtick-quotes an identifier, doubling embedded backticks.
pub(crate) fn escape(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog() -> Schema {
        Schema::builder("Blog")
            .table("blog")
            .field("id", Field::string().ddl("varchar(50)").primary_key())
            .field("name", Field::string().ddl("varchar(50)"))
            .field("content", Field::text())
            .field("created_at", Field::float())
            .build()
            .unwrap()
    }

    #[test]
    fn statements_put_the_key_where_the_callers_expect_it() {
        let s = blog();
        assert_eq!(s.select(), "select `id`, `name`, `content`, `created_at` from `blog`");
        assert_eq!(
            s.insert(),
            "insert into `blog` (`name`, `content`, `created_at`, `id`) values (?, ?, ?, ?)",
        );
        assert_eq!(
            s.update(),
            "update `blog` set `name`=?, `content`=?, `created_at`=? where `id`=?",
        );
        assert_eq!(s.delete(), "delete from `blog` where `id`=?");
    }

    #[test]
    fn non_key_fields_keep_declaration_order() {
        let s = Schema::builder("Comment")
            .field("content", Field::text())
            .field("id", Field::string().ddl("varchar(50)").primary_key())
            .field("blog_id", Field::string().ddl("varchar(50)"))
            .build()
            .unwrap();
        assert_eq!(s.primary_key(), "id");
        assert_eq!(s.fields(), ["content", "blog_id"]);
    }

    #[test]
    fn table_defaults_to_model_name() {
        let s = Schema::builder("Tag")
            .field("id", Field::integer().primary_key())
            .build()
            .unwrap();
        assert_eq!(s.table(), "Tag");
        assert_eq!(s.select(), "select `id` from `Tag`");
        assert_eq!(s.insert(), "insert into `Tag` (`id`) values (?)");
        assert_eq!(s.update(), "update `Tag` set `id`=`id` where `id`=?");
    }

    #[test]
    fn missing_primary_key_is_rejected() {
        let err = Schema::builder("Orphan")
            .field("name", Field::string().ddl("varchar(50)"))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::MissingPrimaryKey { model: "Orphan".into() });
    }

    #[test]
    fn second_primary_key_is_rejected() {
        let err = Schema::builder("Twice")
            .field("id", Field::string().ddl("varchar(50)").primary_key())
            .field("uid", Field::integer().primary_key())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicatePrimaryKey { model: "Twice".into(), field: "uid".into() },
        );
    }

    #[test]
    fn repeated_field_is_rejected() {
        let err = Schema::builder("Dup")
            .field("id", Field::integer().primary_key())
            .field("name", Field::text())
            .field("name", Field::text())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }

    #[test]
    fn identifiers_are_escaped() {
        assert_eq!(escape("weird`name"), "`weird``name`");
    }

    #[test]
    fn create_table_uses_declared_column_types() {
        assert_eq!(
            blog().create_table(),
            "create table if not exists `blog` (`id` varchar(50) not null, \
             `name` varchar(50), `content` text, `created_at` float, primary key (`id`))",
        );
    }
}
