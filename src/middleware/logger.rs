//! Request logging.

use tracing::{Span, info, info_span};

use crate::request::Request;

/// Opens the span a request is handled in and logs its arrival.
pub fn request_span(req: &Request) -> Span {
    let span = info_span!("request", method = %req.method(), path = %req.path());
    span.in_scope(|| info!("Request: {} {}", req.method(), req.path()));
    span
}
