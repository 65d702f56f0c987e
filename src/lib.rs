//! # blogweb
//!
//! A small async blog: a micro-ORM over a pooled SQL database, a router that
//! binds query strings, bodies and path variables onto declared handler
//! parameters, and a response layer that turns loosely typed handler results
//! into JSON, HTML, redirects or rendered templates.
//!
//! - Records are declared with [`model!`] and get `find_all`, `find_total`,
//!   `save`, `modify` and `remove` from [`orm::Model`]
//! - Routes are explicit [`Route`] values registered on a [`Router`]
//! - Handlers return a [`Reply`] or fail with a [`HandlerError`]
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use blogweb::orm::{Database, Find, Model};
//! use blogweb::{Args, Config, HandlerError, Param, Reply, Route, Router, Server, entity::Blog};
//!
//! async fn blogs(args: Args) -> Result<Reply, HandlerError> {
//!     let db: &Database = args.state()?;
//!     let blogs = Blog::find_all(db, Find::new().order_by("`created_at` desc")).await?;
//!     Ok(serde_json::json!({ "blogs": blogs }).into())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), blogweb::Error> {
//!     let config = Config::load("config")?;
//!     let db = Database::connect(&config.database).await?;
//!     let app = Router::new()
//!         .with_state(db.clone())
//!         .add(Route::get("/api/blogs", blogs).params([Param::optional("page")]))?;
//!     Server::bind(config.server.addr()).serve(app).await
//! }
//! ```

mod adapter;
mod api;
mod error;
mod handler;
mod reply;
mod request;
mod response;
mod route;
mod router;
mod server;
mod static_files;

pub mod config;
pub mod entity;
pub mod handlers;
pub mod middleware;
pub mod orm;
pub mod telemetry;
pub mod templates;

#[doc(hidden)]
pub use serde;

pub use adapter::{Args, BindError, Param, Signature, SignatureError};
pub use api::{ApiError, HandlerError};
pub use config::Config;
pub use error::Error;
pub use handler::{Handler, HandlerResult};
pub use reply::{REDIRECT_PREFIX, Reply, TEMPLATE_KEY};
pub use request::Request;
pub use response::{ContentType, Response, ResponseBuilder};
pub use route::Route;
pub use router::Router;
pub use server::Server;
pub use templates::Templates;
