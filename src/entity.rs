//! The blog's records: customers, their blogs and comments.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::orm::{Database, Field, Model, OrmError};

/// A new primary key: the current time in milliseconds, zero-padded to 15
/// digits, a random UUID in hex and `000`. Keys sort by creation time.
pub fn next_id() -> String {
    format!("{:015}{}000", Utc::now().timestamp_millis(), Uuid::new_v4().simple())
}

/// Seconds since the epoch, with fractions.
pub fn now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

crate::model! {
    /// A registered user.
    pub struct Customer in "customers" {
        id: String = Field::string().ddl("varchar(50)").primary_key().default_with(next_id),
        email: String = Field::string().ddl("varchar(50)"),
        password: String = Field::string().ddl("varchar(50)").hidden(),
        admin: bool = Field::boolean(),
        name: String = Field::string().ddl("varchar(50)"),
        image: String = Field::string().ddl("varchar(500)"),
        created_at: f64 = Field::float().default_with(now),
    }
}

crate::model! {
    pub struct Blog in "blog" {
        id: String = Field::string().ddl("varchar(50)").primary_key().default_with(next_id),
        customer_id: String = Field::string().ddl("varchar(50)"),
        customer_name: String = Field::string().ddl("varchar(50)"),
        customer_image: String = Field::string().ddl("varchar(500)"),
        name: String = Field::string().ddl("varchar(50)"),
        summary: String = Field::string().ddl("varchar(300)"),
        content: String = Field::text(),
        created_at: f64 = Field::float().default_with(now),
    }
}

crate::model! {
    pub struct Comment in "comment" {
        id: String = Field::string().ddl("varchar(50)").primary_key().default_with(next_id),
        blog_id: String = Field::string().ddl("varchar(50)"),
        customer_id: String = Field::string().ddl("varchar(50)"),
        customer_name: String = Field::string().ddl("varchar(50)"),
        customer_image: String = Field::string().ddl("varchar(500)"),
        content: String = Field::text(),
        created_at: f64 = Field::float().default_with(now),
    }
}

/// Creates the three tables when they do not exist yet.
pub async fn create_tables(db: &Database) -> Result<(), OrmError> {
    for schema in [Customer::schema(), Blog::schema(), Comment::schema()] {
        db.execute(&schema.create_table(), &[], true).await?;
        info!("table `{}` ready", schema.table());
    }
    Ok(())
}
