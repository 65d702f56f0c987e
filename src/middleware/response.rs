//! Response normalization.
//!
//! | Reply                       | Response                                          |
//! |-----------------------------|---------------------------------------------------|
//! | `Response`                  | unchanged                                         |
//! | `Bytes`                     | `application/octet-stream`                        |
//! | `Text("redirect:/x")`       | `302 Found`, `location: /x`                       |
//! | `Text`                      | `text/html; charset=utf-8`                        |
//! | `Map` with `__template__`   | rendered template, `text/html; charset=utf-8`     |
//! | `Map`                       | `application/json; charset=utf-8`                 |
//! | `Status(code)`              | empty body with `code` when 100 < code < 600      |
//! | `StatusMessage(code, text)` | `text` with `code` when 100 < code < 600          |
//! | anything else               | `text/plain; charset=utf-8`                       |

use http::StatusCode;
use serde_json::{Map, Value as JsonValue};
use tracing::error;

use crate::reply::{REDIRECT_PREFIX, Reply, TEMPLATE_KEY};
use crate::response::{ContentType, Response};
use crate::templates::Templates;

/// Builds the response for `reply`. Template replies need `templates`.
pub fn respond(reply: Reply, templates: Option<&Templates>) -> Response {
    match reply {
        Reply::Response(response) => response,
        Reply::Bytes(body) => Response::builder().bytes(ContentType::OctetStream, body),
        Reply::Text(text) => match text.strip_prefix(REDIRECT_PREFIX) {
            Some(location) => Response::redirect(location),
            None => Response::html(text),
        },
        Reply::Map(map) => match map.get(TEMPLATE_KEY) {
            None => match serde_json::to_vec(&map) {
                Ok(body) => Response::json(body),
                Err(e) => {
                    error!("failed to serialize response: {e}");
                    Response::status(StatusCode::INTERNAL_SERVER_ERROR)
                }
            },
            Some(JsonValue::String(name)) => render(templates, name, &map),
            Some(other) => {
                error!("template name must be a string, got {other}");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
        Reply::Status(code) => match status(code) {
            Some(status) => Response::status(status),
            None => Response::text(code.to_string()),
        },
        Reply::StatusMessage(code, message) => match status(code) {
            Some(status) => Response::builder().status(status).text(message),
            None => Response::text(format!("({code}, {message})")),
        },
        Reply::Other(text) => Response::text(text),
    }
}

fn render(templates: Option<&Templates>, name: &str, context: &Map<String, JsonValue>) -> Response {
    let Some(templates) = templates else {
        error!("no templates configured, cannot render {name}");
        return Response::status(StatusCode::INTERNAL_SERVER_ERROR);
    };
    match templates.render(name, context) {
        Ok(html) => Response::html(html),
        Err(e) => {
            error!("failed to render {name}: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn status(code: u16) -> Option<StatusCode> {
    if code > 100 && code < 600 {
        StatusCode::from_u16(code).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde_json::json;

    use super::*;

    fn body(response: &Response) -> &str {
        std::str::from_utf8(response.body()).unwrap()
    }

    #[test]
    fn response_passes_through() {
        let response = respond(Reply::Response(Response::status(StatusCode::NO_CONTENT)), None);
        assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn bytes_are_octet_stream() {
        let response = respond(Reply::Bytes(Bytes::from_static(b"\x00\x01")), None);
        assert_eq!(response.header("content-type"), Some("application/octet-stream"));
        assert_eq!(response.body(), b"\x00\x01");
    }

    #[test]
    fn text_is_html_unless_redirect() {
        let response = respond(Reply::from("<h1>hi</h1>"), None);
        assert_eq!(response.header("Content-Type"), Some("text/html; charset=utf-8"));
        assert_eq!(body(&response), "<h1>hi</h1>");

        let response = respond(Reply::redirect("/signin"), None);
        assert_eq!(response.status_code(), StatusCode::FOUND);
        assert_eq!(response.header("location"), Some("/signin"));
        assert!(response.body().is_empty());
    }

    #[test]
    fn map_is_json() {
        let response = respond(Reply::from(json!({ "total": 2 })), None);
        assert!(response.header("content-type").unwrap().starts_with("application/json"));
        assert_eq!(body(&response), r#"{"total":2}"#);
    }

    #[test]
    fn map_with_template_is_rendered() {
        let templates = Templates::from_sources([("t.html", "{{ greeting }}")]).unwrap();
        let reply = Reply::render("t.html", json!({ "greeting": "hey" })).unwrap();
        let response = respond(reply, Some(&templates));
        assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(body(&response), "hey");
    }

    #[test]
    fn failed_render_is_500() {
        let templates = Templates::from_sources([("bad.html", "{{ nope() }}")]).unwrap();
        let reply = Reply::render("bad.html", json!({})).unwrap();
        assert_eq!(respond(reply, Some(&templates)).status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let reply = Reply::render("t.html", json!({})).unwrap();
        assert_eq!(respond(reply, None).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn status_codes() {
        let response = respond(Reply::Status(404), None);
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert!(response.body().is_empty());

        let response = respond(Reply::Status(700), None);
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(body(&response), "700");

        let response = respond(Reply::from((403u16, "forbidden")), None);
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(body(&response), "forbidden");
    }

    #[test]
    fn other_is_plain_text() {
        let response = respond(Reply::from(json!([1, 2])), None);
        assert_eq!(response.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(body(&response), "[1,2]");
    }
}
