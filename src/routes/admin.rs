use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch},
};

/// Admin Router Module
///
/// User administration endpoints, nested under `/admin`. Authentication is
/// guaranteed by the `AuthUser` extractor in each handler; the role check
/// (admin, or admin/superUser for reads) runs inside the handler via the
/// role gate, after the request has passed the authentication layer.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        // Paginated user listing with name/email search. admin or superUser.
        .route("/users", get(handlers::get_users))
        // GET/PUT /admin/users/{id}
        // Lookup (admin or superUser) and partial update (admin only) of any
        // user. Updates record the acting admin in `last_updated_by`.
        .route(
            "/users/{id}",
            get(handlers::get_user).put(handlers::update_user),
        )
        // PATCH /admin/users/{id}/block
        // Soft-block: sets active=false, which also invalidates the user's
        // outstanding tokens at validation time. admin only.
        .route("/users/{id}/block", patch(handlers::block_user))
}
