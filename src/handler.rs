//! Handler trait and type erasure.
//!
//! The router keeps handlers of different types in one table, so each is
//! wrapped once at registration and stored behind `Arc<dyn ErasedHandler>`:
//!
//! ```text
//! async fn index(args: Args) -> Result<Reply, HandlerError> { … }
//!        ↓ Route::get("/", index)
//! index.into_boxed_handler()                   ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(index))                   ← stored as BoxedHandler
//!        ↓
//! handler.call(args) at request time           ← one vtable dispatch
//!        ↓
//! Box::pin(async { index(args).await.map(Into::into) })
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::adapter::Args;
use crate::api::HandlerError;
use crate::reply::Reply;

/// What every handler resolves to once erased.
pub type HandlerResult = Result<Reply, HandlerError>;

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the return type of
/// [`Handler::into_boxed_handler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, args: Args) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Satisfied by any `async fn` (or closure returning a future) shaped like
///
/// ```text
/// async fn name(args: Args) -> Result<impl Into<Reply>, HandlerError>
/// ```
///
/// The trait is sealed; only the blanket impl below provides it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    R: Into<Reply> + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    R: Into<Reply> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    R: Into<Reply> + Send + 'static,
{
    fn call(&self, args: Args) -> BoxFuture {
        let fut = (self.0)(args);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}
