use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use interestlens_core::{Activity, HistoryQuery, SignalEvent, ingest};
use tracing::info;

use crate::core::state::AppState;
use crate::middleware::user::UserId;
use crate::models::error::{ApiError, ApiResult};
use crate::models::responses::{DeletedResponse, TrackResponse};

/// Upper bound on activities accepted in one batch
pub const MAX_BATCH: usize = 1000;

pub async fn track(
    State(state): State<AppState>,
    user: UserId,
    Json(batch): Json<Vec<Activity>>,
) -> ApiResult<impl IntoResponse> {
    let user_id = user.require()?;
    if batch.len() > MAX_BATCH {
        return Err(ApiError::BadRequest(format!(
            "at most {MAX_BATCH} activities per batch"
        )));
    }

    let summary = state.activity.record(user_id, &batch).await?;

    let signals: Vec<SignalEvent> = batch.iter().filter_map(Activity::to_signal).collect();
    let topics_updated = if signals.is_empty() {
        Vec::new()
    } else {
        let (_, topics) = state
            .profiles
            .update(user_id, |profile| {
                let mut topics: Vec<String> = signals
                    .iter()
                    .flat_map(|signal| ingest(profile, signal).topics_updated)
                    .collect();
                topics.sort();
                topics.dedup();
                topics
            })
            .await?;
        topics
    };

    info!(
        "Tracked {} activities for {}, {} topics updated",
        summary.activities_processed,
        user_id,
        topics_updated.len()
    );

    Ok(Json(TrackResponse {
        summary,
        topics_updated,
    }))
}

pub async fn history(
    State(state): State<AppState>,
    user: UserId,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let user_id = user.require()?;
    let history = state.activity.history(user_id, &query).await?;
    Ok(Json(history))
}

pub async fn clear_history(
    State(state): State<AppState>,
    user: UserId,
) -> ApiResult<impl IntoResponse> {
    let user_id = user.require()?;
    let deleted = state.activity.clear(user_id).await?;
    Ok(Json(DeletedResponse { deleted }))
}
