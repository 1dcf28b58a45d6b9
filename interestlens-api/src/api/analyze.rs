use axum::{Json, extract::State, response::IntoResponse};
use interestlens_core::{
    AuthenticityRequest, CheckDepth, ContentItem, ProfileSummary, ScoredItem,
    is_likely_news_article,
};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::core::state::AppState;
use crate::middleware::user::UserId;
use crate::models::error::{ApiError, ApiResult};
use crate::models::requests::AnalyzeRequest;
use crate::models::responses::{AnalyzeResponse, SUMMARY_TOPICS};

/// Upper bound on items accepted in one page analysis
pub const MAX_ITEMS: usize = 500;

pub async fn analyze(
    State(state): State<AppState>,
    user: UserId,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.items.len() > MAX_ITEMS {
        return Err(ApiError::BadRequest(format!(
            "at most {MAX_ITEMS} items can be analyzed at once"
        )));
    }

    let profile = match user.as_deref() {
        Some(user_id) => state.profiles.load(user_id).await,
        None => None,
    };

    let items = state.enricher.enrich_all(request.items).await;
    let mut ranked = state.ranker.rank(&items, profile.as_ref());

    if request.check_authenticity {
        annotate_authenticity(&state, &items, request.page_url.as_deref(), &mut ranked).await?;
    }

    let mode = state.ranker.scoring().mode(profile.as_ref());
    info!(
        "Ranked {} of {} items for {} in {:?} mode",
        ranked.len(),
        items.len(),
        user.as_deref().unwrap_or("anonymous"),
        mode
    );

    Ok(Json(AnalyzeResponse {
        items: ranked,
        mode,
        profile_summary: profile
            .as_ref()
            .map(|p| ProfileSummary::from_profile(p, SUMMARY_TOPICS))
            .unwrap_or_default(),
    }))
}

async fn annotate_authenticity(
    state: &AppState,
    items: &[ContentItem],
    page_url: Option<&str>,
    ranked: &mut [ScoredItem],
) -> ApiResult<()> {
    let Some(service) = &state.authenticity else {
        debug!("Authenticity requested but no checker is configured");
        return Ok(());
    };

    let by_id: HashMap<&str, &ContentItem> = items.iter().map(|i| (i.id.as_str(), i)).collect();
    let requests: Vec<AuthenticityRequest> = ranked
        .iter()
        .filter_map(|scored| by_id.get(scored.id.as_str()))
        .filter(|item| is_likely_news_article(&item.topics, &item.text))
        .filter_map(|item| {
            let url = item.href.as_deref().or(page_url)?;
            Some(AuthenticityRequest {
                item_id: item.id.clone(),
                url: url.to_string(),
                text: item.text.clone(),
                check_depth: CheckDepth::default(),
            })
        })
        .collect();

    if requests.is_empty() {
        return Ok(());
    }

    let results = service
        .check_batch(&requests, state.settings.collaborators.max_concurrent)
        .await?;
    let by_item: HashMap<&str, _> = results.iter().map(|r| (r.item_id.as_str(), r)).collect();
    for scored in ranked.iter_mut() {
        if let Some(result) = by_item.get(scored.id.as_str()) {
            result.annotate(scored);
        }
    }
    Ok(())
}
