use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use interestlens_core::CacheStats;
use serde::Serialize;

use crate::core::state::AppState;
use crate::models::error::ApiResult;
use crate::models::responses::HealthResponse;

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub cache: CacheStats,
    pub active_voice_sessions: usize,
    pub version: &'static str,
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

pub async fn get_stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let stats = SystemStats {
        cache: state.cache.stats(),
        active_voice_sessions: state.sessions.list_active().await?.len(),
        version: env!("CARGO_PKG_VERSION"),
    };

    Ok(Json(stats))
}
