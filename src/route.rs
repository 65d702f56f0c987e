//! Route declarations.

use std::any::type_name;

use http::Method;

use crate::adapter::Param;
use crate::handler::{BoxedHandler, Handler};

/// A method, a path pattern, the handler's parameters and the handler.
///
/// Path variables use `{name}` syntax and are bound to the matching
/// [`Param::Positional`] (or any keyword parameter of the same name):
///
/// ```rust
/// use blogweb::{ApiError, Args, HandlerError, Param, Reply, Route};
///
/// async fn get_blog(args: Args) -> Result<Reply, HandlerError> {
///     let id = args.str("id").unwrap_or_default();
///     Err(ApiError::not_found("blog", format!("blog {id} not found")).into())
/// }
///
/// let route = Route::get("/api/blogs/{id}", get_blog).params([Param::Positional("id")]);
/// assert_eq!(route.path(), "/api/blogs/{id}");
/// ```
pub struct Route {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) params: Vec<Param>,
    pub(crate) name: &'static str,
    pub(crate) handler: BoxedHandler,
}

impl Route {
    pub fn new<H: Handler>(method: Method, path: &str, handler: H) -> Self {
        Self {
            method,
            path: path.to_owned(),
            params: Vec::new(),
            name: type_name::<H>(),
            handler: handler.into_boxed_handler(),
        }
    }

    pub fn get(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::GET, path, handler)
    }

    pub fn post(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::POST, path, handler)
    }

    pub fn put(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::PUT, path, handler)
    }

    pub fn delete(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::DELETE, path, handler)
    }

    /// Declares the handler's parameters. Without this call the handler
    /// receives no arguments.
    pub fn params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params = params.into_iter().collect();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn name(&self) -> &'static str { self.name }
}
