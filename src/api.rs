//! Errors a handler can return.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::orm::OrmError;

/// An error meant for the API client.
///
/// Returned from a handler it becomes a `200` JSON object with `error`, `data`
/// and `message` keys, which the front-end scripts inspect.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[error("{error}: {message}")]
pub struct ApiError {
    pub error: String,
    pub data: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, data: impl Into<String>, message: impl Into<String>) -> Self {
        Self { error: error.into(), data: data.into(), message: message.into() }
    }

    /// Input value is invalid; `field` names the offending input.
    pub fn invalid_value(field: &str, message: impl Into<String>) -> Self {
        Self::new("value:invalid", field, message)
    }

    pub fn not_found(data: &str, message: impl Into<String>) -> Self {
        Self::new("value:notfound", data, message)
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::new("permission:forbidden", "permission", message)
    }

    pub(crate) fn into_payload(self) -> Map<String, JsonValue> {
        let mut payload = Map::new();
        payload.insert("error".into(), self.error.into());
        payload.insert("data".into(), self.data.into());
        payload.insert("message".into(), self.message.into());
        payload
    }
}

/// Everything a handler may fail with.
///
/// [`ApiError`] is reported to the client; the rest are logged and answered
/// with `500`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Orm(#[from] OrmError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no application state of type `{0}`")]
    MissingState(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_all_three_keys() {
        let payload = ApiError::not_found("blog", "blog 7 not found").into_payload();
        assert_eq!(payload["error"], "value:notfound");
        assert_eq!(payload["data"], "blog");
        assert_eq!(payload["message"], "blog 7 not found");
    }
}
