use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users/:username", get(handlers::dashboard))
        .route("/api/health", get(handlers::health))
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .route(
            "/api/users/:username/profile",
            get(handlers::get_profile).put(handlers::put_profile),
        )
        .route(
            "/api/users/:username/documents/:kind",
            get(handlers::get_document).put(handlers::put_document),
        )
        .route(
            "/api/users/:username/workouts",
            get(handlers::list_workouts).post(handlers::create_workout),
        )
        .route(
            "/api/users/:username/workouts/:id",
            get(handlers::get_workout)
                .put(handlers::update_workout)
                .delete(handlers::delete_workout),
        )
        .route("/api/users/:username/stats", get(handlers::get_stats))
        .route(
            "/api/users/:username/suggestions",
            get(handlers::get_suggestions).post(handlers::add_suggestion),
        )
        .route("/api/users/:username/days/:date", get(handlers::get_day))
        .with_state(state)
}
