use crate::AppState;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events/feed", get(feed))
        .with_state(state)
}

/// Live global feed as server-sent events. There is no history and no
/// replay: a reconnecting client re-fetches the open-request snapshot.
#[utoipa::path(
    get,
    path = "/api/events/feed",
    responses((status = 200, description = "SSE stream of feed events"))
)]
pub(crate) async fn feed(State(state): State<AppState>) -> Response {
    let stream = BroadcastStream::new(state.bus.subscribe()).filter_map(|item| async {
        match item {
            Ok(event) => {
                let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
                Some(Ok::<Event, std::convert::Infallible>(Event::default().data(json)))
            }
            Err(_) => None,
        }
    });
    Sse::new(stream).into_response()
}
