//! Radix-tree request router.
//!
//! One tree per HTTP method. Routes are registered explicitly at startup;
//! each becomes a [`RequestHandler`] that binds request data to the handler's
//! declared parameters.

use std::collections::HashMap;
use std::path::Path;
use std::str::Utf8Error;
use std::sync::Arc;

use bytes::Bytes;
use http::{Extensions, Method};
use matchit::Router as MatchitRouter;
use percent_encoding::percent_decode_str;
use tracing::{Instrument, info, warn};

use crate::adapter::{RequestHandler, Signature};
use crate::error::Error;
use crate::middleware;
use crate::reply::Reply;
use crate::request::Request;
use crate::response::Response;
use crate::route::Route;
use crate::static_files;
use crate::templates::Templates;

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
/// Registration methods take and return `self` so they chain:
///
/// ```rust
/// use blogweb::{Args, HandlerError, Param, Reply, Route, Router};
///
/// async fn hello(args: Args) -> Result<Reply, HandlerError> {
///     Ok(format!("<h1>Hello {}</h1>", args.str("name").unwrap_or("world")).into())
/// }
///
/// # fn main() -> Result<(), blogweb::Error> {
/// let app = Router::new()
///     .add(Route::get("/hello", hello).params([Param::optional("name")]))?
///     .add(Route::get("/hello/{name}", hello).params([Param::Positional("name")]))?;
/// # Ok(())
/// # }
/// ```
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Arc<RequestHandler>>>,
    state: Arc<Extensions>,
    templates: Option<Arc<Templates>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), state: Arc::default(), templates: None }
    }

    /// Shares `value` with every handler through [`Args::state`](crate::Args::state).
    /// One value per type; a second value of the same type replaces the first.
    pub fn with_state<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        Arc::make_mut(&mut self.state).insert(value);
        self
    }

    /// Templates used for replies that name one.
    pub fn templates(mut self, templates: Templates) -> Self {
        self.templates = Some(Arc::new(templates));
        self
    }

    /// Registers `route`. Fails when its parameters are inconsistent or its
    /// path conflicts with an existing route.
    pub fn add(mut self, route: Route) -> Result<Self, Error> {
        let Route { method, path, params, name, handler } = route;
        let signature = Signature::new(params)
            .map_err(|source| Error::Signature { handler: name, source })?;
        info!("add route {method} {path} => {name}({signature})");

        let handler = Arc::new(RequestHandler::new(name, signature, handler));
        self.routes
            .entry(method)
            .or_default()
            .insert(path.as_str(), handler)
            .map_err(|source| Error::Route { path, source })?;
        Ok(self)
    }

    pub fn add_routes(self, routes: impl IntoIterator<Item = Route>) -> Result<Self, Error> {
        routes.into_iter().try_fold(self, Self::add)
    }

    /// Serves the files under `dir` at `GET {prefix}...`.
    pub fn static_files(self, prefix: &str, dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref();
        info!("add static {prefix} => {}", dir.display());
        self.add(static_files::route(prefix, dir))
    }

    /// Routes one request and produces one response. Unknown paths get `404`;
    /// path variables that do not decode to UTF-8 get `400`.
    pub async fn handle(&self, req: http::Request<Bytes>) -> Response {
        let request = Request::from(req);
        let span = middleware::logger::request_span(&request);
        async {
            let reply = match self.lookup(request.method(), request.path()) {
                Some((handler, Ok(params))) => {
                    handler.call(request.with_params(params), Arc::clone(&self.state)).await
                }
                Some((_, Err(e))) => {
                    warn!("undecodable path variable: {e}");
                    Reply::StatusMessage(400, format!("invalid path variable: {e}"))
                }
                None => Reply::Status(404),
            };
            middleware::response::respond(reply, self.templates.as_deref())
        }
        .instrument(span)
        .await
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Arc<RequestHandler>, Result<HashMap<String, String>, Utf8Error>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| percent_decode_str(v).decode_utf8().map(|v| (k.to_owned(), v.into_owned())))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
