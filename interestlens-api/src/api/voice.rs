use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use interestlens_core::signals::clear_voice_preferences;
use interestlens_core::{ProfileSummary, SignalEvent, VoiceSession, ingest};
use tracing::info;

use crate::core::state::AppState;
use crate::middleware::user::UserId;
use crate::models::error::{ApiError, ApiResult};
use crate::models::requests::{ExtractionRequest, SetPreferencesRequest};
use crate::models::responses::{
    PreferencesResponse, SUMMARY_TOPICS, SessionEndResponse, SessionResponse,
};

pub async fn get_preferences(
    State(state): State<AppState>,
    user: UserId,
) -> ApiResult<impl IntoResponse> {
    let user_id = user.require()?;
    let profile = state.profiles.load_or_default(user_id).await;
    Ok(Json(PreferencesResponse::from_profile(&profile)))
}

pub async fn set_preferences(
    State(state): State<AppState>,
    user: UserId,
    Json(request): Json<SetPreferencesRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = user.require()?;
    let event = SignalEvent::voice_complete(request.preferences);
    let (profile, _) = state
        .profiles
        .update(user_id, |profile| ingest(profile, &event))
        .await?;
    Ok(Json(PreferencesResponse::from_profile(&profile)))
}

pub async fn delete_preferences(
    State(state): State<AppState>,
    user: UserId,
) -> ApiResult<impl IntoResponse> {
    let user_id = user.require()?;
    let (profile, _) = state
        .profiles
        .update(user_id, clear_voice_preferences)
        .await?;
    Ok(Json(PreferencesResponse::from_profile(&profile)))
}

pub async fn create_session(
    State(state): State<AppState>,
    user: UserId,
) -> ApiResult<impl IntoResponse> {
    let user_id = user.require()?;
    let session = state.sessions.create(user_id).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

pub async fn get_session(
    State(state): State<AppState>,
    user: UserId,
    Path(session_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let mut session = owned_session(&state, &user, &session_id).await?;
    if state.sessions.touch(&session_id).await? {
        session.last_activity = chrono::Utc::now();
    }
    Ok(Json(SessionResponse::from(session)))
}

pub async fn record_extraction(
    State(state): State<AppState>,
    user: UserId,
    Path(session_id): Path<String>,
    Json(request): Json<ExtractionRequest>,
) -> ApiResult<impl IntoResponse> {
    owned_session(&state, &user, &session_id).await?;
    let session = state
        .sessions
        .record_extraction(&session_id, &request.extraction)
        .await?;
    Ok(Json(SessionResponse::from(session)))
}

/// Ends the session and writes its preferences into the caller's profile
pub async fn end_session(
    State(state): State<AppState>,
    user: UserId,
    Path(session_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user_id = user.require()?;
    owned_session(&state, &user, &session_id).await?;

    let session = state
        .sessions
        .end(&session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("voice session {session_id}")))?;

    let profile = if session.preferences.topics.is_empty() {
        state.profiles.load_or_default(user_id).await
    } else {
        let event = SignalEvent::voice_complete(session.preferences.clone());
        let (profile, _) = state
            .profiles
            .update(user_id, |profile| ingest(profile, &event))
            .await?;
        info!(
            "Voice onboarding complete for {} with {} topics",
            user_id,
            session.preferences.topics.len()
        );
        profile
    };

    Ok(Json(SessionEndResponse {
        session: SessionResponse::from(session),
        profile_summary: ProfileSummary::from_profile(&profile, SUMMARY_TOPICS),
    }))
}

async fn owned_session(
    state: &AppState,
    user: &UserId,
    session_id: &str,
) -> ApiResult<VoiceSession> {
    let user_id = user.require()?;
    let session = state
        .sessions
        .get(session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("voice session {session_id}")))?;

    if session.user_id != user_id {
        return Err(ApiError::Forbidden(format!(
            "voice session {session_id} belongs to another user"
        )));
    }
    Ok(session)
}
