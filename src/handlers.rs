//! The blog's pages and JSON API.

use serde_json::json;

use crate::adapter::{Args, Param};
use crate::api::{ApiError, HandlerError};
use crate::entity::{Blog, Customer};
use crate::orm::{Database, Find, Limit, Model};
use crate::reply::Reply;
use crate::route::Route;

/// Blogs per page of `/api/blogs`.
pub const PAGE_SIZE: u64 = 10;

pub fn routes() -> Vec<Route> {
    vec![
        Route::get("/", index).params([Param::Request]),
        Route::get("/api/blogs", api_blogs).params([Param::optional("page")]),
        Route::get("/api/blogs/{id}", api_get_blog).params([Param::Positional("id")]),
    ]
}

/// Renders `test.html` with every customer as `users`.
pub async fn index(args: Args) -> Result<Reply, HandlerError> {
    let db: &Database = args.state()?;
    let users = Customer::find_all(db, Find::new()).await?;
    Ok(Reply::render("test.html", json!({ "users": users }))?)
}

/// One page of blogs, newest first, with the total count.
pub async fn api_blogs(args: Args) -> Result<Reply, HandlerError> {
    let db: &Database = args.state()?;
    let page = args.parse::<u64>("page")?.unwrap_or(1).max(1);
    let offset = (page - 1)
        .checked_mul(PAGE_SIZE)
        .ok_or_else(|| ApiError::invalid_value("page", format!("page {page} is out of range")))?;

    let total = Blog::find_total(db, "count(`id`)", None, &[])
        .await?
        .and_then(|total| total.as_i64())
        .unwrap_or(0);
    let blogs = if total == 0 {
        Vec::new()
    } else {
        let find = Find::new()
            .order_by("`created_at` desc")
            .limit(Limit::Window { offset, count: PAGE_SIZE });
        Blog::find_all(db, find).await?
    };

    Ok(json!({ "page": page, "total": total, "blogs": blogs }).into())
}

pub async fn api_get_blog(args: Args) -> Result<Reply, HandlerError> {
    let db: &Database = args.state()?;
    let id = args.str("id").unwrap_or_default();

    let find = Find::new().filter("`id`=?").bind(id).limit(Limit::Count(1));
    match Blog::find_all(db, find).await?.pop() {
        Some(blog) => Ok(serde_json::to_value(blog)?.into()),
        None => Err(ApiError::not_found("blog", format!("blog {id} not found")).into()),
    }
}
