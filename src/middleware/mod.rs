//! Middleware layer.
//!
//! Cross-cutting steps every request goes through, in order:
//! - [`logger`]: per-request span with method and path, plus a request log line
//! - [`response`]: turns whatever the handler returned into an HTTP response

pub mod logger;
pub mod response;
