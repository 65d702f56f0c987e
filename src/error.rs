//! Unified error type.

use thiserror::Error;

use crate::adapter::SignatureError;
use crate::orm::OrmError;

/// The error type returned by blogweb's startup and serving operations.
///
/// Request-level failures (404, 400, a failed query inside a handler) are
/// expressed as HTTP responses, not as `Error`s. This type surfaces
/// infrastructure failures: loading configuration, reaching the database,
/// registering a route or binding a port.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("orm: {0}")]
    Orm(#[from] OrmError),

    #[error("configuration: {0}")]
    Config(#[from] figment::Error),

    #[error("handler `{handler}`: {source}")]
    Signature {
        handler: &'static str,
        #[source]
        source: SignatureError,
    },

    #[error("invalid route `{path}`: {source}")]
    Route {
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}
