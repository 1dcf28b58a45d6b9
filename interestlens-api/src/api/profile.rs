use axum::{Json, extract::State, response::IntoResponse};
use tracing::info;

use crate::core::state::AppState;
use crate::middleware::user::UserId;
use crate::models::error::ApiResult;
use crate::models::responses::{DeletedResponse, ProfileResponse};

pub async fn get_profile(
    State(state): State<AppState>,
    user: UserId,
) -> ApiResult<impl IntoResponse> {
    let user_id = user.require()?;
    let profile = state.profiles.load_or_default(user_id).await;
    Ok(Json(ProfileResponse::from(profile)))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    user: UserId,
) -> ApiResult<impl IntoResponse> {
    let user_id = user.require()?;
    let deleted = state.profiles.clear(user_id).await?;
    info!("Profile reset for {} (existed: {})", user_id, deleted);
    Ok(Json(DeletedResponse { deleted }))
}
