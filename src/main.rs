use library_api::config::Config;
use library_api::database::{SqliteLibrary, establish_pool};
use library_api::http::links::LinkResolver;
use library_api::http::{AppState, HttpServer, HttpServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("library_api=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    let pool = establish_pool(config.database_url()).await?;
    let state = AppState::new(
        SqliteLibrary::new(pool),
        LinkResolver::new(config.public_url()),
    );
    let server_config = HttpServerConfig::new(config.server_port());
    let http_server = HttpServer::new(state, server_config).await?;
    http_server.run().await
}
