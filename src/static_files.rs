//! Static file serving.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{error, warn};

use crate::adapter::{Args, Param};
use crate::api::HandlerError;
use crate::reply::Reply;
use crate::response::{ContentType, Response};
use crate::route::Route;

/// A `GET {prefix}{*path}` route serving files below `dir`.
pub(crate) fn route(prefix: &str, dir: &Path) -> Route {
    let path = format!("{}/{{*path}}", prefix.trim_end_matches('/'));
    let dir = Arc::new(dir.to_path_buf());
    let handler = move |args: Args| {
        let dir = Arc::clone(&dir);
        async move { serve(&dir, &args).await }
    };
    Route::get(&path, handler).params([Param::Positional("path")])
}

async fn serve(dir: &Path, args: &Args) -> Result<Reply, HandlerError> {
    let Some(file) = args.str("path").and_then(|rel| resolve(dir, rel)) else {
        warn!("rejected static path: {:?}", args.get("path"));
        return Ok(Reply::Status(404));
    };
    match tokio::fs::read(&file).await {
        Ok(bytes) => Ok(Response::builder().bytes(content_type(&file), bytes).into()),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => Ok(Reply::Status(404)),
        Err(e) => {
            error!("failed to read {}: {e}", file.display());
            Ok(Reply::Status(500))
        }
    }
}

/// Joins `rel` onto `dir`, refusing anything but plain path segments.
fn resolve(dir: &Path, rel: &str) -> Option<PathBuf> {
    let mut path = dir.to_path_buf();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(segment) => path.push(segment),
            _ => return None,
        }
    }
    (path != dir).then_some(path)
}

fn content_type(path: &Path) -> ContentType {
    let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("css") => ContentType::Css,
        Some("gif") => ContentType::Gif,
        Some("htm" | "html") => ContentType::Html,
        Some("ico") => ContentType::Icon,
        Some("js") => ContentType::Javascript,
        Some("jpg" | "jpeg") => ContentType::Jpeg,
        Some("json") => ContentType::Json,
        Some("png") => ContentType::Png,
        Some("svg") => ContentType::Svg,
        Some("txt") => ContentType::Text,
        Some("woff2") => ContentType::Woff2,
        _ => ContentType::OctetStream,
    }
}
