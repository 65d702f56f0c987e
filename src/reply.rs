//! The loosely typed values a handler may return.

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::response::Response;

/// Key in a [`Reply::Map`] naming the template to render it with.
pub const TEMPLATE_KEY: &str = "__template__";

/// Prefix of a [`Reply::Text`] that should become a redirect.
pub const REDIRECT_PREFIX: &str = "redirect:";

/// A handler result before it is turned into a [`Response`].
///
/// See [`middleware::response`](crate::middleware::response) for how each
/// variant is rendered.
#[derive(Debug)]
pub enum Reply {
    /// Sent as is.
    Response(Response),
    /// `application/octet-stream`.
    Bytes(Bytes),
    /// HTML, or a `302` when it starts with `redirect:`.
    Text(String),
    /// JSON, or a rendered template when it holds `__template__`.
    Map(Map<String, JsonValue>),
    /// Bare status code.
    Status(u16),
    /// Status code with a plain-text body.
    StatusMessage(u16, String),
    /// Anything else, sent as its text form.
    Other(String),
}

impl Reply {
    pub fn redirect(location: &str) -> Self {
        Self::Text(format!("{REDIRECT_PREFIX}{location}"))
    }

    /// A map rendered with `template`. A context that is not an object is
    /// exposed to the template as `data`.
    pub fn render(template: &str, context: impl Serialize) -> Result<Self, serde_json::Error> {
        let mut map = match serde_json::to_value(context)? {
            JsonValue::Object(map) => map,
            other => Map::from_iter([("data".to_owned(), other)]),
        };
        map.insert(TEMPLATE_KEY.to_owned(), template.into());
        Ok(Self::Map(map))
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self { Self::Response(response) }
}

impl From<Bytes> for Reply {
    fn from(bytes: Bytes) -> Self { Self::Bytes(bytes) }
}

impl From<Vec<u8>> for Reply {
    fn from(bytes: Vec<u8>) -> Self { Self::Bytes(bytes.into()) }
}

impl From<String> for Reply {
    fn from(text: String) -> Self { Self::Text(text) }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self { Self::Text(text.to_owned()) }
}

impl From<Map<String, JsonValue>> for Reply {
    fn from(map: Map<String, JsonValue>) -> Self { Self::Map(map) }
}

/// Objects become maps and strings become text; other JSON values are
/// sent in their serialized form.
impl From<JsonValue> for Reply {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => Self::Map(map),
            JsonValue::String(text) => Self::Text(text),
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<u16> for Reply {
    fn from(code: u16) -> Self { Self::Status(code) }
}

impl From<(u16, String)> for Reply {
    fn from((code, message): (u16, String)) -> Self { Self::StatusMessage(code, message) }
}

impl From<(u16, &str)> for Reply {
    fn from((code, message): (u16, &str)) -> Self { Self::StatusMessage(code, message.to_owned()) }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn render_marks_the_template() {
        let Reply::Map(map) = Reply::render("blogs.html", json!({ "page": 1 })).unwrap() else {
            panic!("expected a map");
        };
        assert_eq!(map[TEMPLATE_KEY], "blogs.html");
        assert_eq!(map["page"], 1);
    }

    #[test]
    fn json_values_pick_their_variant() {
        assert!(matches!(Reply::from(json!({ "a": 1 })), Reply::Map(_)));
        assert!(matches!(Reply::from(json!("hi")), Reply::Text(t) if t == "hi"));
        assert!(matches!(Reply::from(json!([1, 2])), Reply::Other(t) if t == "[1,2]"));
    }
}
