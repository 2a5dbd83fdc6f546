use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::warn;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamFilter {
    /// Only forward events for this seat id
    pub seat: Option<u32>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/seats/stream", get(seat_stream))
}

/// GET /seats/stream
/// Server-Sent Events feed of seat transitions
async fn seat_stream(
    State(state): State<AppState>,
    Query(filter): Query<StreamFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let seat_filter = filter.seat;

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) => {
                if seat_filter.is_some_and(|id| id != event.seat_id) {
                    return None;
                }
                match Event::default().event(event.kind.as_str()).json_data(&event) {
                    Ok(sse) => Some(Ok::<_, Infallible>(sse)),
                    Err(e) => {
                        warn!("Failed to encode seat event: {}", e);
                        None
                    }
                }
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Seat stream subscriber lagged, {} event(s) dropped", skipped);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
