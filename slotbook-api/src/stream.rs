use std::convert::Infallible;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;
use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/venues/{id}/stream", get(venue_stream))
}

/// Live availability for one venue as server-sent events
async fn venue_stream(
    State(state): State<AppState>,
    Path(venue_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    state.manager.get_venue(venue_id).await?;
    let rx = state.manager.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.venue_id() == venue_id => {
                match Event::default().event(event.name()).json_data(&event) {
                    Ok(sse) => Some(Ok(sse)),
                    Err(e) => {
                        tracing::warn!("Dropping unserializable event: {}", e);
                        None
                    }
                }
            }
            Ok(_) => None,
            // Lagged receivers skip what they missed
            Err(_) => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
