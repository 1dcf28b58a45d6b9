use axum::{Json, extract::State, response::IntoResponse};
use interestlens_core::cache::keys;
use interestlens_core::ingest;
use tracing::debug;

use crate::core::state::AppState;
use crate::middleware::user::UserId;
use crate::models::error::ApiResult;
use crate::models::requests::EventRequest;
use crate::models::responses::EventResponse;

pub async fn record_event(
    State(state): State<AppState>,
    user: UserId,
    Json(request): Json<EventRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut event = request.event;

    let Some(user_id) = user.as_deref() else {
        debug!("Anonymous {:?} event accepted, not persisted", event.kind);
        return Ok(Json(EventResponse {
            persisted: false,
            interaction_count: 0,
            topics_updated: Vec::new(),
            embedding_updated: false,
        }));
    };

    // Fill in what the enrichment pass already derived for this item.
    if let Some(item_id) = request.item_id.as_deref() {
        if event.embedding.is_none() {
            event.embedding = state.cache.get::<Vec<f32>>(&keys::item(item_id)).await;
        }
        if event.topics.is_empty() {
            event.topics = state
                .cache
                .get::<Vec<String>>(&keys::topics(item_id))
                .await
                .unwrap_or_default();
        }
    }

    let (profile, report) = state
        .profiles
        .update(user_id, |profile| ingest(profile, &event))
        .await?;

    Ok(Json(EventResponse {
        persisted: true,
        interaction_count: profile.interaction_count,
        topics_updated: report.topics_updated,
        embedding_updated: report.embedding_updated,
    }))
}
