pub mod author_collections;
pub mod books;
pub mod handler;
pub mod links;
pub mod model_state;
pub mod patch;

use crate::http::links::LinkResolver;
use crate::store::LibraryStore;
use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Debug)]
pub struct AppState<LS: LibraryStore> {
    pub library: Arc<LS>,
    pub links: Arc<LinkResolver>,
}

impl<LS: LibraryStore> AppState<LS> {
    pub fn new(library: LS, links: LinkResolver) -> Self {
        Self {
            library: Arc::new(library),
            links: Arc::new(links),
        }
    }
}

impl<LS: LibraryStore> Clone for AppState<LS> {
    fn clone(&self) -> Self {
        Self {
            library: Arc::clone(&self.library),
            links: Arc::clone(&self.links),
        }
    }
}

#[derive(Debug)]
pub struct HttpServerConfig {
    port: u16,
}

impl HttpServerConfig {
    pub const fn new(port: u16) -> Self {
        Self { port }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<LS: LibraryStore>(
        state: AppState<LS>,
        config: HttpServerConfig,
    ) -> anyhow::Result<Self> {
        let router = router(state);

        let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("Failed to bind to port {}", config.port))?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!("Listening on {}", self.listener.local_addr()?);
        axum::serve(self.listener, self.router)
            .await
            .context("Received error from running server")?;
        Ok(())
    }
}

pub fn router<LS: LibraryStore>(state: AppState<LS>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes<LS: LibraryStore>() -> Router<AppState<LS>> {
    Router::new()
        .route(
            "/authorcollections",
            post(author_collections::create_author_collection::<LS>),
        )
        .route(
            "/authorcollections/{ids}",
            get(author_collections::get_author_collection::<LS>),
        )
        .route(
            "/authors/{author_id}/books",
            get(books::get_books_for_author::<LS>).post(books::create_book_for_author::<LS>),
        )
        .route(
            "/authors/{author_id}/books/{id}",
            get(books::get_book_for_author::<LS>)
                .put(books::update_book_for_author::<LS>)
                .patch(books::partially_update_book_for_author::<LS>)
                .delete(books::delete_book_for_author::<LS>),
        )
}
