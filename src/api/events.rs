//! SSE endpoint for real-time notifications (spec §4.I).

use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::stream::{self, Stream};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::warn;

use crate::api::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/sse", get(sse_handler))
}

async fn sse_handler(State(state): State<Arc<AppState>>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.shared.event_bus.subscribe();
    let heartbeat = state.shared.config.read().await.server.sse_heartbeat_interval_seconds;

    let stream = stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some((Ok(Event::default().data(json)), rx)),
                Err(e) => {
                    warn!(error = %e, "failed to serialize SSE event, skipping");
                    Some((
                        Ok(Event::default().event("error").data("event serialization failed")),
                        rx,
                    ))
                }
            },
            Err(broadcast::error::RecvError::Lagged(count)) => {
                warn!(count, "SSE client lagged");
                Some((
                    Ok(Event::default().event("warning").data("missed some events")),
                    rx,
                ))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(heartbeat)))
}
