//! `GET /events`: live alert stream as Server-Sent Events.

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::Stream;
use std::convert::Infallible;
use tokio::time::Duration;

use crate::events::EventBus;

pub fn router(bus: EventBus) -> Router {
    Router::new()
        .route(
            "/events",
            get(stream_events).fallback(|| async { (StatusCode::NOT_FOUND, "Not found") }),
        )
        .with_state(bus)
}

/// Stream every payload published after the client connects, one
/// `data: <payload>` frame each.
///
/// The subscription lives inside the stream; when the client goes away the
/// server drops the stream and the subscriber unregisters itself.
async fn stream_events(
    State(bus): State<EventBus>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscriber = bus.subscribe();
    tracing::debug!(
        "SSE subscriber {} connected ({} live)",
        subscriber.id(),
        bus.subscriber_count()
    );

    let stream = async_stream::stream! {
        while let Some(payload) = subscriber.recv().await {
            yield Ok(Event::default().data(payload));
        }
        tracing::debug!("Event bus closed, ending stream for subscriber {}", subscriber.id());
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(30)))
}
