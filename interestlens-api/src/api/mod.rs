pub mod activity;
pub mod analyze;
pub mod events;
pub mod preview;
pub mod profile;
pub mod stats;
pub mod voice;


use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::core::state::AppState;
use crate::middleware::{error_handler, request_id};

pub fn build_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/analyze", post(analyze::analyze))
        .route("/events", post(events::record_event))
        .route(
            "/profile",
            get(profile::get_profile).delete(profile::delete_profile),
        )
        .route("/activity/track", post(activity::track))
        .route(
            "/activity/history",
            get(activity::history).delete(activity::clear_history),
        )
        .route(
            "/voice/preferences",
            get(voice::get_preferences)
                .post(voice::set_preferences)
                .delete(voice::delete_preferences),
        )
        .route("/voice/sessions", post(voice::create_session))
        .route(
            "/voice/sessions/:id",
            get(voice::get_session).delete(voice::end_session),
        )
        .route(
            "/voice/sessions/:id/extraction",
            post(voice::record_extraction),
        )
        .route("/preview", get(preview::preview));

    Router::new()
        .route("/health", get(stats::health_check))
        .route("/stats", get(stats::get_stats))
        .nest("/v1", v1)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(error_handler::handle_panic))
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_id::add_request_id))
                .layer(middleware::from_fn(error_handler::handle_errors)),
        )
        .layer(CorsLayer::permissive())
}
