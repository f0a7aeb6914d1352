use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a bearer token: the identity gateway
/// (signup/login) and the health probe. Everything else in the
/// application sits behind the auth layer.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/signup
        // Creates a user (default 'user' role, active) and issues a first token.
        .route("/auth/signup", post(handlers::signup))
        // POST /auth/login
        // Email + password credential check. A wrong password and an unknown
        // email produce the same generic 401.
        .route("/auth/login", post(handlers::login))
}
