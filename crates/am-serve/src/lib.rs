pub mod identity;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod sse;
pub mod ws;

use am_core::{MarketError, Marketplace};
use am_db::schema;
use am_db::store::DbStore;
use am_events::bus::EventBus;
use am_events::rooms::Rooms;
use axum::Router;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct AppState {
    pub db_path: String,
    pub bus: EventBus,
    pub rooms: Rooms,
}

/// One engine per request, over a fresh WAL connection; the shared pieces
/// are the event bus and the room registry living in [`AppState`].
pub fn build_marketplace(state: &AppState) -> Result<Marketplace<DbStore>, MarketError> {
    let conn = schema::open_and_migrate(&state.db_path)
        .map_err(|err| MarketError::internal(err.to_string()))?;
    Ok(Marketplace::new(DbStore::new(conn), state.bus.clone()))
}

pub fn app(state: AppState) -> Router {
    routes::router(state)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app(state)).await
}
