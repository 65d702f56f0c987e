//! Binds request data onto a handler's declared parameters.
//!
//! Every route declares its parameters as a list of [`Param`]s. At request
//! time the [`RequestHandler`] collects keyword arguments from the body (for
//! `POST`, `PUT` and `PATCH`: JSON, url-encoded or multipart forms) or the
//! query string (for `GET`, `HEAD` and `DELETE`), merges the path variables
//! over them, checks the required ones and hands the result to the handler
//! as [`Args`].

use std::any::type_name;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use futures_util::stream;
use http::{Extensions, Method, StatusCode};
use multer::Multipart;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::{ApiError, HandlerError};
use crate::handler::BoxedHandler;
use crate::reply::Reply;
use crate::request::Request;
use crate::response::Response;

// ── Parameters ────────────────────────────────────────────────────────────────

/// One declared handler parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Param {
    /// Filled from the path variable of the same name only.
    Positional(&'static str),
    /// Filled from the query string or body.
    Keyword { name: &'static str, required: bool },
    /// Accepts every extracted key.
    VarKeyword,
    /// Receives the request itself.
    Request,
}

impl Param {
    pub const fn required(name: &'static str) -> Self {
        Self::Keyword { name, required: true }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self::Keyword { name, required: false }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positional(name) => write!(f, "{{{name}}}"),
            Self::Keyword { name, required: true } => f.write_str(name),
            Self::Keyword { name, required: false } => write!(f, "{name}?"),
            Self::VarKeyword => f.write_str("**kw"),
            Self::Request => f.write_str("request"),
        }
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum SignatureError {
    #[error("request parameter must be the last positional parameter: ({params})")]
    RequestNotLast { params: String },

    #[error("parameter `{0}` declared twice")]
    Duplicate(String),
}

/// The analysed parameter list of a handler.
#[derive(Clone, Debug)]
pub struct Signature {
    params: Vec<Param>,
    has_request: bool,
    has_var_keyword: bool,
    named: Vec<&'static str>,
    required: Vec<&'static str>,
}

impl Signature {
    /// Validates `params`. Once a [`Param::Request`] is declared only keyword
    /// and catch-all parameters may follow it.
    pub fn new(params: impl IntoIterator<Item = Param>) -> Result<Self, SignatureError> {
        let params: Vec<Param> = params.into_iter().collect();
        let mut signature = Self {
            params: Vec::with_capacity(params.len()),
            has_request: false,
            has_var_keyword: false,
            named: Vec::new(),
            required: Vec::new(),
        };
        let mut seen = Vec::new();

        for param in &params {
            match *param {
                Param::Positional(_) | Param::Request if signature.has_request => {
                    return Err(SignatureError::RequestNotLast { params: join(&params) });
                }
                Param::Request => signature.has_request = true,
                Param::VarKeyword if signature.has_var_keyword => {
                    return Err(SignatureError::Duplicate(param.to_string()));
                }
                Param::VarKeyword => signature.has_var_keyword = true,
                Param::Positional(_) => {}
                Param::Keyword { name, required } => {
                    signature.named.push(name);
                    if required {
                        signature.required.push(name);
                    }
                }
            }
            if let Param::Positional(name) | Param::Keyword { name, .. } = *param {
                if seen.contains(&name) {
                    return Err(SignatureError::Duplicate(name.to_owned()));
                }
                seen.push(name);
            }
        }

        signature.params = params;
        Ok(signature)
    }

    pub fn params(&self) -> &[Param] { &self.params }
    pub fn has_request(&self) -> bool { self.has_request }
    pub fn has_var_keyword(&self) -> bool { self.has_var_keyword }
    pub fn named(&self) -> &[&'static str] { &self.named }
    pub fn required(&self) -> &[&'static str] { &self.required }

    fn reads_request_data(&self) -> bool {
        self.has_var_keyword || !self.named.is_empty()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.params))
    }
}

fn join(params: &[Param]) -> String {
    params.iter().map(Param::to_string).collect::<Vec<_>>().join(", ")
}

// ── Args ──────────────────────────────────────────────────────────────────────

/// The bound arguments a handler is called with.
#[derive(Clone, Debug)]
pub struct Args {
    values: Map<String, JsonValue>,
    request: Option<Request>,
    state: Arc<Extensions>,
}

impl Args {
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.values.get(name)
    }

    /// The argument when it is a string.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(JsonValue::as_str)
    }

    /// Converts an argument to `T`. Query and form values are always strings,
    /// so a string that does not deserialize directly is parsed as JSON
    /// (`"2"` becomes `2`). Failure is reported to the client as `value:invalid`.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ApiError> {
        let Some(value) = self.values.get(name) else {
            return Ok(None);
        };
        if let Ok(parsed) = serde_json::from_value(value.clone()) {
            return Ok(Some(parsed));
        }
        value.as_str()
            .and_then(|s| serde_json::from_str(s).ok())
            .map(Some)
            .ok_or_else(|| ApiError::invalid_value(name, format!("invalid value for `{name}`")))
    }

    pub fn values(&self) -> &Map<String, JsonValue> { &self.values }

    /// The request, when the handler declared [`Param::Request`].
    pub fn request(&self) -> Option<&Request> { self.request.as_ref() }

    /// Shared application state registered with
    /// [`Router::with_state`](crate::Router::with_state).
    pub fn state<T: Send + Sync + 'static>(&self) -> Result<&T, HandlerError> {
        self.state.get::<T>().ok_or(HandlerError::MissingState(type_name::<T>()))
    }
}

// ── Binding ───────────────────────────────────────────────────────────────────

/// Why a request could not be bound; answered with `400` and the message.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("Missing Content-Type.")]
    MissingContentType,

    #[error("Unsupported Content-Type: {0}")]
    UnsupportedContentType(String),

    #[error("Malformed JSON body: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("JSON body must be an object.")]
    JsonNotObject,

    #[error("Malformed multipart body: {0}")]
    MalformedMultipart(#[source] multer::Error),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
}

/// A registered handler together with its signature.
pub(crate) struct RequestHandler {
    name: &'static str,
    signature: Signature,
    handler: BoxedHandler,
}

impl RequestHandler {
    pub(crate) fn new(name: &'static str, signature: Signature, handler: BoxedHandler) -> Self {
        Self { name, signature, handler }
    }

    /// Binds `req`, runs the handler and maps its failures to replies.
    pub(crate) async fn call(&self, req: Request, state: Arc<Extensions>) -> Reply {
        let args = match self.bind(req, state).await {
            Ok(args) => args,
            Err(e) => {
                warn!(handler = self.name, "bad request: {e}");
                return Reply::Response(
                    Response::builder().status(StatusCode::BAD_REQUEST).text(e.to_string()),
                );
            }
        };

        info!("call {} with args: {:?}", self.name, args.values);
        match self.handler.call(args).await {
            Ok(reply) => reply,
            Err(HandlerError::Api(e)) => Reply::Map(e.into_payload()),
            Err(e) => {
                error!(handler = self.name, "handler failed: {e}");
                Reply::Status(StatusCode::INTERNAL_SERVER_ERROR.as_u16())
            }
        }
    }

    async fn bind(&self, req: Request, state: Arc<Extensions>) -> Result<Args, BindError> {
        let sig = &self.signature;
        let extracted = if sig.reads_request_data() { extract(&req).await? } else { None };

        let mut values = match extracted {
            Some(mut values) if !sig.has_var_keyword && !sig.named.is_empty() => {
                values.retain(|key, _| sig.named.iter().any(|name| *name == key.as_str()));
                values
            }
            Some(values) => values,
            None => Map::new(),
        };

        for (key, value) in req.params() {
            if values.contains_key(key) {
                warn!("duplicate arg name in named arg and kw args: {key}");
            }
            values.insert(key.clone(), JsonValue::String(value.clone()));
        }

        if let Some(missing) = sig.required.iter().find(|name| !values.contains_key(**name as &str)) {
            return Err(BindError::MissingArgument(*missing));
        }

        let request = sig.has_request.then_some(req);
        Ok(Args { values, request, state })
    }
}

/// Reads keyword arguments from the body or query string. `None` means the
/// request carries none.
async fn extract(req: &Request) -> Result<Option<Map<String, JsonValue>>, BindError> {
    let method = req.method().clone();
    if method == Method::POST || method == Method::PUT || method == Method::PATCH {
        let raw_content_type = req.content_type().ok_or(BindError::MissingContentType)?;
        let content_type = raw_content_type.to_ascii_lowercase();
        if content_type.starts_with("application/json") {
            match serde_json::from_slice(req.body()).map_err(BindError::MalformedJson)? {
                JsonValue::Object(values) => Ok(Some(values)),
                _ => Err(BindError::JsonNotObject),
            }
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            Ok(Some(first_values(req.body())))
        } else if content_type.starts_with("multipart/form-data") {
            // The boundary is case-sensitive, so it comes from the raw header.
            multipart_values(raw_content_type, req).await.map(Some)
        } else {
            Err(BindError::UnsupportedContentType(content_type))
        }
    } else if method == Method::GET || method == Method::HEAD || method == Method::DELETE {
        Ok(req.query().filter(|q| !q.is_empty()).map(|q| first_values(q.as_bytes())))
    } else {
        Ok(None)
    }
}

/// Decodes `application/x-www-form-urlencoded` data, keeping the first value
/// of repeated keys. Blank values are kept.
fn first_values(input: &[u8]) -> Map<String, JsonValue> {
    let mut values = Map::new();
    for (key, value) in form_urlencoded::parse(input) {
        values.entry(key.into_owned()).or_insert_with(|| JsonValue::String(value.into_owned()));
    }
    values
}

/// Reads the text parts of a `multipart/form-data` body, keeping the first
/// value of repeated names. File parts are skipped.
async fn multipart_values(content_type: &str, req: &Request) -> Result<Map<String, JsonValue>, BindError> {
    let boundary = multer::parse_boundary(content_type).map_err(BindError::MalformedMultipart)?;
    let body = req.body_bytes();
    let mut multipart = Multipart::new(stream::once(async move { Ok::<_, Infallible>(body) }), boundary);

    let mut values = Map::new();
    while let Some(field) = multipart.next_field().await.map_err(BindError::MalformedMultipart)? {
        let Some(name) = field.name().map(str::to_owned) else { continue };
        if let Some(file) = field.file_name() {
            info!("skip uploaded file `{file}` in part `{name}`");
            continue;
        }
        let text = field.text().await.map_err(BindError::MalformedMultipart)?;
        values.entry(name).or_insert(JsonValue::String(text));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::handler::Handler;

    async fn echo(args: Args) -> Result<Reply, HandlerError> {
        let mut values = args.values().clone();
        values.insert("has_request".into(), args.request().is_some().into());
        Ok(Reply::Map(values))
    }

    fn handler(params: impl IntoIterator<Item = Param>) -> RequestHandler {
        RequestHandler::new("echo", Signature::new(params).unwrap(), echo.into_boxed_handler())
    }

    fn request(method: Method, uri: &str, content_type: Option<&str>, body: &str) -> Request {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        Request::from(builder.body(Bytes::from(body.to_owned())).unwrap())
    }

    async fn bind(h: &RequestHandler, req: Request) -> Result<Map<String, JsonValue>, BindError> {
        h.bind(req, Arc::default()).await.map(|args| args.values)
    }

    #[test]
    fn request_must_not_be_followed_by_positional() {
        let err = Signature::new([Param::Request, Param::Positional("id")]).unwrap_err();
        assert!(matches!(err, SignatureError::RequestNotLast { .. }));
        assert!(Signature::new([Param::Request, Param::Request]).is_err());
        assert!(Signature::new([Param::Request, Param::required("name"), Param::VarKeyword]).is_ok());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = Signature::new([Param::Positional("id"), Param::optional("id")]).unwrap_err();
        assert_eq!(err, SignatureError::Duplicate("id".into()));
    }

    #[test]
    fn signature_classifies_params() {
        let sig = Signature::new([Param::required("email"), Param::optional("page"), Param::VarKeyword]).unwrap();
        assert_eq!(sig.named(), ["email", "page"]);
        assert_eq!(sig.required(), ["email"]);
        assert!(sig.has_var_keyword());
        assert!(!sig.has_request());
        assert_eq!(sig.to_string(), "email, page?, **kw");
    }

    #[tokio::test]
    async fn get_reads_first_query_value() {
        let h = handler([Param::required("page")]);
        let values = bind(&h, request(Method::GET, "/?page=2&page=3", None, "")).await.unwrap();
        assert_eq!(values, json!({ "page": "2" }).as_object().cloned().unwrap());
    }

    #[tokio::test]
    async fn missing_required_argument_is_reported() {
        let h = handler([Param::required("page")]);
        let err = bind(&h, request(Method::GET, "/", None, "")).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing argument: page");
    }

    #[tokio::test]
    async fn unknown_keys_are_dropped_without_catch_all() {
        let h = handler([Param::optional("name")]);
        let values = bind(&h, request(Method::GET, "/?name=a&other=b", None, "")).await.unwrap();
        assert_eq!(values.len(), 1);

        let h = handler([Param::optional("name"), Param::VarKeyword]);
        let values = bind(&h, request(Method::GET, "/?name=a&other=b", None, "")).await.unwrap();
        assert_eq!(values.len(), 2);
    }

    #[tokio::test]
    async fn post_reads_json_and_form_bodies() {
        let h = handler([Param::VarKeyword]);
        let values = bind(&h, request(Method::POST, "/", Some("application/json"), r#"{"n":1}"#)).await.unwrap();
        assert_eq!(values["n"], 1);

        let values = bind(
            &h,
            request(Method::POST, "/", Some("application/x-www-form-urlencoded"), "a=1&a=2&b="),
        )
        .await
        .unwrap();
        assert_eq!(values["a"], "1");
        assert_eq!(values["b"], "");
    }

    #[tokio::test]
    async fn post_reads_multipart_text_parts() {
        let h = handler([Param::required("name"), Param::optional("bio")]);
        let body = "--Ab1\r\n\
                    Content-Disposition: form-data; name=\"name\"\r\n\r\n\
                    Ann\r\n\
                    --Ab1\r\n\
                    Content-Disposition: form-data; name=\"name\"\r\n\r\n\
                    Bob\r\n\
                    --Ab1\r\n\
                    Content-Disposition: form-data; name=\"bio\"; filename=\"bio.txt\"\r\n\r\n\
                    hello\r\n\
                    --Ab1--\r\n";
        let values = bind(&h, request(Method::POST, "/", Some("multipart/form-data; boundary=Ab1"), body))
            .await
            .unwrap();
        assert_eq!(values["name"], "Ann");
        assert!(!values.contains_key("bio"));

        let err = bind(&h, request(Method::POST, "/", Some("multipart/form-data"), body)).await.unwrap_err();
        assert!(matches!(err, BindError::MalformedMultipart(_)));
    }

    #[tokio::test]
    async fn post_body_errors() {
        let h = handler([Param::VarKeyword]);
        assert!(matches!(bind(&h, request(Method::POST, "/", None, "")).await, Err(BindError::MissingContentType)));
        assert!(matches!(
            bind(&h, request(Method::POST, "/", Some("text/plain"), "x")).await,
            Err(BindError::UnsupportedContentType(_))
        ));
        assert!(matches!(
            bind(&h, request(Method::POST, "/", Some("application/json"), "[1]")).await,
            Err(BindError::JsonNotObject)
        ));
        assert!(matches!(
            bind(&h, request(Method::POST, "/", Some("application/json"), "{")).await,
            Err(BindError::MalformedJson(_))
        ));
    }

    #[tokio::test]
    async fn body_is_ignored_without_keyword_params() {
        let h = handler([Param::Positional("id")]);
        let req = request(Method::POST, "/blogs/7", None, "").with_params(HashMap::from([("id".into(), "7".into())]));
        let values = bind(&h, req).await.unwrap();
        assert_eq!(values["id"], "7");
    }

    #[tokio::test]
    async fn path_variables_win_over_query() {
        let h = handler([Param::Positional("id"), Param::VarKeyword]);
        let req = request(Method::GET, "/blogs/7?id=9", None, "")
            .with_params(HashMap::from([("id".into(), "7".into())]));
        assert_eq!(bind(&h, req).await.unwrap()["id"], "7");
    }

    #[tokio::test]
    async fn api_errors_become_payloads() {
        async fn fails(_: Args) -> Result<Reply, HandlerError> {
            Err(ApiError::invalid_value("email", "bad email").into())
        }
        let h = RequestHandler::new("fails", Signature::new([]).unwrap(), fails.into_boxed_handler());
        let Reply::Map(map) = h.call(request(Method::GET, "/", None, ""), Arc::default()).await else {
            panic!("expected a map");
        };
        assert_eq!(map["error"], "value:invalid");
        assert_eq!(map["data"], "email");
    }

    #[tokio::test]
    async fn other_errors_become_500() {
        async fn needs_state(args: Args) -> Result<Reply, HandlerError> {
            args.state::<String>()?;
            Ok(Reply::Status(204))
        }
        let h = RequestHandler::new("needs_state", Signature::new([]).unwrap(), needs_state.into_boxed_handler());
        let reply = h.call(request(Method::GET, "/", None, ""), Arc::default()).await;
        assert!(matches!(reply, Reply::Status(500)));
    }

    #[tokio::test]
    async fn request_is_injected_when_declared() {
        let h = handler([Param::Request]);
        let Reply::Map(map) = h.call(request(Method::GET, "/", None, ""), Arc::default()).await else {
            panic!("expected a map");
        };
        assert_eq!(map["has_request"], true);
    }

    #[test]
    fn parse_reads_strings_as_json() {
        let args = Args {
            values: json!({ "page": "2", "name": "x" }).as_object().cloned().unwrap(),
            request: None,
            state: Arc::default(),
        };
        assert_eq!(args.parse::<u64>("page").unwrap(), Some(2));
        assert_eq!(args.parse::<String>("name").unwrap(), Some("x".into()));
        assert_eq!(args.parse::<u64>("missing").unwrap(), None);
        assert!(args.parse::<u64>("name").is_err());
    }
}
