#![allow(dead_code)]

use blogweb::config::DatabaseConfig;
use blogweb::entity::{self, Blog, Customer};
use blogweb::orm::{Database, Model};
use tempfile::TempDir;

/// A fresh SQLite database with the blog tables, kept alive by `dir`.
pub async fn database(dir: &TempDir) -> Database {
    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", dir.path().join("blog.db").display()),
        max_connections: 4,
        min_connections: 0,
        acquire_timeout_secs: None,
    };
    let db = Database::connect(&config).await.expect("connect");
    entity::create_tables(&db).await.expect("create tables");
    db
}

pub async fn customer(db: &Database, name: &str) -> Customer {
    let mut customer = Customer {
        email: Some(format!("{}@example.com", name.to_lowercase())),
        password: Some("secret".into()),
        name: Some(name.into()),
        image: Some("about:blank".into()),
        ..Customer::default()
    };
    assert_eq!(customer.save(db).await.unwrap(), 1);
    customer
}

pub async fn blog(db: &Database, author: &Customer, name: &str) -> Blog {
    let mut blog = Blog {
        customer_id: author.id.clone(),
        customer_name: author.name.clone(),
        customer_image: author.image.clone(),
        name: Some(name.into()),
        summary: Some(format!("about {name}")),
        content: Some(format!("{name} body")),
        ..Blog::default()
    };
    assert_eq!(blog.save(db).await.unwrap(), 1);
    blog
}
