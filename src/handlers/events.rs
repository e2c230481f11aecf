use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::errors::AppError;
use crate::state::AppState;

// GET /api/events
#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // EventSource can't set headers, so the token rides in the query string
    let token = query.token.as_deref().unwrap_or("");
    if token.is_empty() || token != state.config.admin_token {
        return Err(AppError::Unauthorized);
    }

    let rx = state.events_tx.subscribe();

    let live_stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok::<_, Infallible>(Event::default().data(data).event(event.name())))
        }
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "change feed subscriber lagged");
            None
        }
    });

    let keepalive_stream = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok::<_, Infallible>(Event::default().comment("keepalive")));

    Ok(Sse::new(live_stream.merge(keepalive_stream)))
}
