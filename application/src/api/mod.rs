//! HTTP API definitions.

pub mod emergency;
pub mod encounter;
pub mod guardian;
pub mod session;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

/// Builds the [`Router`] of the API.
///
/// The [`Service`] is expected to be provided as a request extension.
///
/// [`Service`]: crate::Service
pub fn router() -> Router {
    Router::new()
        .route("/safety-codes", put(session::set_codes))
        .route("/sessions", post(session::start))
        .route("/sessions/:id", get(session::show))
        .route("/sessions/:id/check-in", post(session::check_in))
        .route("/sessions/:id/exit-code", post(session::submit_exit_code))
        .route("/sessions/:id/location", post(session::update_location))
        .route(
            "/sessions/:id/nearest-authority",
            get(session::nearest_authority),
        )
        .route("/panic", post(emergency::panic))
        .route("/events/:id/status-update", post(emergency::status_update))
        .route("/guardians", get(guardian::list).post(guardian::invite))
        .route("/guardians/:id", delete(guardian::remove))
        .route("/guardians/:id/accept", post(guardian::accept))
        .route(
            "/guardian-groups",
            get(guardian::groups).post(guardian::create_group),
        )
        .route("/encounters", post(encounter::record))
        .route("/encounters/:id", get(encounter::show))
        .route(
            "/encounters/:id/reviews",
            get(encounter::reviews).post(encounter::submit_review),
        )
}
