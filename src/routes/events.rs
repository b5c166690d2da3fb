use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;

use crate::app::AppState;

/// SSE stream of engine events (created, updated, deleted, sync and load outcomes)
pub async fn event_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(|message| match message {
        Ok(event) => match Event::default().event(event.kind.to_string()).json_data(&event) {
            Ok(sse) => Some(Ok::<_, Infallible>(sse)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode engine event");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "Event subscriber lagged, events dropped");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
