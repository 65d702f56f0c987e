use std::path::PathBuf;

use blogweb::orm::Database;
use blogweb::{Config, Router, Server, Templates, entity, handlers, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), blogweb::Error> {
    let dir = std::env::var_os("BLOG_CONFIG_DIR").map_or_else(|| PathBuf::from("config"), PathBuf::from);
    let config = Config::load(&dir)?;
    telemetry::init(&config.log);
    info!("configuration loaded from {}", dir.display());

    let db = Database::connect(&config.database).await?;
    entity::create_tables(&db).await?;

    let app = Router::new()
        .with_state(db.clone())
        .templates(Templates::from_dir(&config.templates))
        .add_routes(handlers::routes())?
        .static_files("/static/", &config.static_dir)?;

    let result = Server::bind(config.server.addr())
        .max_body_bytes(config.server.max_body_bytes)
        .serve(app)
        .await;
    db.close().await;
    result
}
