/// API route modules
pub mod health;
pub mod playlists;

use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

/// Build the HTTP router with every route mounted under `/api`
pub fn router(app_state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health::liveness))
        .route("/playlists", post(playlists::create_playlist))
        .route(
            "/playlists/:id",
            get(playlists::get_playlist)
                .put(playlists::update_playlist)
                .delete(playlists::delete_playlist),
        )
        .route("/playlists/:id/tracks", post(playlists::add_track_to_playlist))
        .route(
            "/playlists/:id/tracks/:track_id",
            delete(playlists::remove_track_from_playlist),
        )
        .route("/users/:user_id/playlists", get(playlists::list_user_playlists));

    Router::new()
        .nest("/api", routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
