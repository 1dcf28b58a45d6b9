use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::core::state::AppState;
use crate::models::error::{ApiError, ApiResult};
use crate::models::requests::PreviewQuery;

pub async fn preview(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<impl IntoResponse> {
    let url = query.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ApiError::BadRequest(
            "url must be an absolute http(s) URL".into(),
        ));
    }

    Ok(Json(state.articles.preview(url).await))
}
