use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every route here sits behind the `AuthUser` extractor middleware, so
/// handlers always receive a validated identity. Ownership decisions are
/// made per-operation through `OwnerScope`: collection reads stay within
/// the requester's own records, single-record operations allow the
/// elevated (admin/superUser) override.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/revalidate
        // Issues a fresh token for the validated requester.
        .route("/auth/revalidate", get(handlers::revalidate))
        // GET /me
        // The requester's profile plus their item and list counts.
        .route("/me", get(handlers::get_me))
        // --- Item catalog ---
        // POST /items creates an item owned by the requester;
        // GET /items lists the requester's items (limit/offset/search).
        .route("/items", post(handlers::create_item).get(handlers::get_items))
        // GET/PUT/DELETE /items/{id}
        // Single-item operations. A foreign item is indistinguishable from
        // a missing one (404), except under an elevated role.
        .route(
            "/items/{id}",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        // --- Shopping lists ---
        .route("/lists", post(handlers::create_list).get(handlers::get_lists))
        .route(
            "/lists/{id}",
            get(handlers::get_list)
                .put(handlers::update_list)
                .delete(handlers::delete_list),
        )
        // GET /lists/{id}/items
        // List-items of one list, joined with item names. Ownership is
        // checked on the containing list before any rows are returned.
        .route("/lists/{id}/items", get(handlers::get_list_items))
        // --- List membership ---
        // POST /list-items puts an item on a list; a duplicate (list, item)
        // pair is rejected by the storage constraint with 409.
        .route("/list-items", post(handlers::create_list_item))
        // GET/PUT /list-items/{id}
        // No owner scoping at this level by design; the list enforces it
        // upstream.
        .route(
            "/list-items/{id}",
            get(handlers::get_list_item).put(handlers::update_list_item),
        )
}
