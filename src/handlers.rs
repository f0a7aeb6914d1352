use crate::{
    AppState, auth,
    auth::AuthUser,
    error::ApiError,
    models::{
        AuthResponse, CreateItemRequest, CreateListItemRequest, CreateListRequest, Item, List,
        ListDetail, ListItem, LoginRequest, NewUser, Pagination, Role, SignupRequest,
        UpdateItemRequest, UpdateListItemRequest, UpdateListRequest, UpdateUserRequest, User,
        UserProfile,
    },
    repository::OwnerScope,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// PageFilter
///
/// Query parameters accepted by every list-returning endpoint: optional
/// limit/offset (normalized through `Pagination::clamped`) and an optional
/// case-insensitive substring search.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct PageFilter {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
}

impl PageFilter {
    fn page(&self) -> Pagination {
        Pagination::clamped(self.limit, self.offset)
    }
}

fn validate_quantity(quantity: f64) -> Result<(), ApiError> {
    if quantity < 0.0 {
        return Err(ApiError::Invalid {
            field: "quantity",
            message: "quantity must be non-negative".to_string(),
        });
    }
    Ok(())
}

// --- Auth Handlers ---

/// signup
///
/// [Public Route] Registers a new user with the default `user` role and an
/// active account, then issues their first token. A duplicate email is a
/// Conflict.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Registered", body = AuthResponse),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if !payload.email.contains('@') {
        return Err(ApiError::Invalid {
            field: "email",
            message: "email must be a valid address".to_string(),
        });
    }
    if payload.password.len() < 6 {
        return Err(ApiError::Invalid {
            field: "password",
            message: "password must be at least 6 characters".to_string(),
        });
    }

    let password_hash = auth::hash_password(&payload.password)?;
    let user = state
        .repo
        .create_user(NewUser {
            full_name: payload.full_name,
            email: payload.email,
            password_hash,
        })
        .await?;

    let token = auth::issue_token(user.id, &state.config)?;
    Ok(Json(AuthResponse { token, user }))
}

/// login
///
/// [Public Route] Email + password login.
///
/// *Security*: an unknown email and a wrong password both produce the same
/// generic Unauthorized message, so the response never reveals whether the
/// email exists.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Credentials do not match")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let mismatch = || ApiError::Unauthorized("credentials do not match".to_string());

    let user = state
        .repo
        .find_user_by_email(&payload.email)
        .await?
        .ok_or_else(mismatch)?;

    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(mismatch());
    }
    if !user.active {
        return Err(ApiError::Unauthorized("account is blocked".to_string()));
    }

    let token = auth::issue_token(user.id, &state.config)?;
    Ok(Json(AuthResponse { token, user }))
}

/// revalidate
///
/// [Authenticated Route] Issues a fresh token for the already-validated
/// requester. The extractor has re-checked existence and active state.
#[utoipa::path(
    get,
    path = "/auth/revalidate",
    responses((status = 200, description = "Fresh token", body = AuthResponse))
)]
pub async fn revalidate(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .repo
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::Internal("authenticated user no longer resolvable".to_string()))?;
    let token = auth::issue_token(user.id, &state.config)?;
    Ok(Json(AuthResponse { token, user }))
}

/// get_me
///
/// [Authenticated Route] The requester's profile plus their item and list
/// counts.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .repo
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::Internal("authenticated user no longer resolvable".to_string()))?;
    let total_items = state.repo.count_items(id).await?;
    let total_lists = state.repo.count_lists(id).await?;
    Ok(Json(UserProfile {
        user,
        total_items,
        total_lists,
    }))
}

// --- Item Handlers ---

/// create_item
///
/// [Authenticated Route] Creates a catalog item attributed to the
/// requester.
#[utoipa::path(
    post,
    path = "/items",
    request_body = CreateItemRequest,
    responses((status = 200, description = "Created", body = Item))
)]
pub async fn create_item(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<Json<Item>, ApiError> {
    let item = state.repo.create_item(payload, id).await?;
    Ok(Json(item))
}

/// get_items
///
/// [Authenticated Route] Lists the requester's own items with pagination
/// and search.
#[utoipa::path(
    get,
    path = "/items",
    params(PageFilter),
    responses((status = 200, description = "Items", body = [Item]))
)]
pub async fn get_items(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<PageFilter>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state
        .repo
        .find_items(OwnerScope::owned(&user), filter.page(), filter.search)
        .await?;
    Ok(Json(items))
}

/// get_item
///
/// [Authenticated Route] Single item lookup. NotFound covers both a
/// missing id and an item owned by someone else; elevated roles see every
/// item.
#[utoipa::path(
    get,
    path = "/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Found", body = Item),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn get_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .repo
        .find_item(id, OwnerScope::elevated(&user))
        .await?;
    Ok(Json(item))
}

/// update_item
///
/// [Authenticated Route] Partial update of an item, owner-scoped with
/// elevated override.
#[utoipa::path(
    put,
    path = "/items/{id}",
    request_body = UpdateItemRequest,
    responses((status = 200, description = "Updated", body = Item))
)]
pub async fn update_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .repo
        .update_item(id, payload, OwnerScope::elevated(&user))
        .await?;
    Ok(Json(item))
}

/// delete_item
///
/// [Authenticated Route] Deletes an item and returns its prior state for
/// caller confirmation. List memberships of the item go with it.
#[utoipa::path(
    delete,
    path = "/items/{id}",
    responses(
        (status = 200, description = "Deleted", body = Item),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn delete_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .repo
        .remove_item(id, OwnerScope::elevated(&user))
        .await?;
    Ok(Json(item))
}

// --- List Handlers ---

/// create_list
///
/// [Authenticated Route] Creates a shopping list owned by the requester.
#[utoipa::path(
    post,
    path = "/lists",
    request_body = CreateListRequest,
    responses((status = 200, description = "Created", body = List))
)]
pub async fn create_list(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateListRequest>,
) -> Result<Json<List>, ApiError> {
    let list = state.repo.create_list(payload, id).await?;
    Ok(Json(list))
}

/// get_lists
///
/// [Authenticated Route] Lists the requester's own lists with pagination
/// and search.
#[utoipa::path(
    get,
    path = "/lists",
    params(PageFilter),
    responses((status = 200, description = "Lists", body = [List]))
)]
pub async fn get_lists(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<PageFilter>,
) -> Result<Json<Vec<List>>, ApiError> {
    let lists = state
        .repo
        .find_lists(OwnerScope::owned(&user), filter.page(), filter.search)
        .await?;
    Ok(Json(lists))
}

/// get_list
///
/// [Authenticated Route] Single list lookup, returned together with its
/// list-item count.
#[utoipa::path(
    get,
    path = "/lists/{id}",
    params(("id" = Uuid, Path, description = "List ID")),
    responses(
        (status = 200, description = "Found", body = ListDetail),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn get_list(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListDetail>, ApiError> {
    let list = state
        .repo
        .find_list(id, OwnerScope::elevated(&user))
        .await?;
    let total_items = state.repo.count_list_items(list.id).await?;
    Ok(Json(ListDetail { list, total_items }))
}

/// update_list
///
/// [Authenticated Route] Partial update of a list, owner-scoped with
/// elevated override.
#[utoipa::path(
    put,
    path = "/lists/{id}",
    request_body = UpdateListRequest,
    responses((status = 200, description = "Updated", body = List))
)]
pub async fn update_list(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateListRequest>,
) -> Result<Json<List>, ApiError> {
    let list = state
        .repo
        .update_list(id, payload, OwnerScope::elevated(&user))
        .await?;
    Ok(Json(list))
}

/// delete_list
///
/// [Authenticated Route] Deletes a list (and its list-items) and returns
/// the prior state.
#[utoipa::path(
    delete,
    path = "/lists/{id}",
    responses(
        (status = 200, description = "Deleted", body = List),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn delete_list(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<List>, ApiError> {
    let list = state
        .repo
        .remove_list(id, OwnerScope::elevated(&user))
        .await?;
    Ok(Json(list))
}

// --- List Item Handlers ---

/// get_list_items
///
/// [Authenticated Route] Lists the list-items of one list, joined with
/// the item name, searchable by item name.
///
/// *Authorization*: ownership is enforced on the containing list first;
/// list-items themselves carry no owner.
#[utoipa::path(
    get,
    path = "/lists/{id}/items",
    params(("id" = Uuid, Path, description = "List ID"), PageFilter),
    responses((status = 200, description = "List items", body = [ListItem]))
)]
pub async fn get_list_items(
    user: AuthUser,
    State(state): State<AppState>,
    Path(list_id): Path<Uuid>,
    Query(filter): Query<PageFilter>,
) -> Result<Json<Vec<ListItem>>, ApiError> {
    // The list lookup is the ownership check; a foreign list 404s here.
    let list = state
        .repo
        .find_list(list_id, OwnerScope::elevated(&user))
        .await?;
    let rows = state
        .repo
        .find_list_items(list.id, filter.page(), filter.search)
        .await?;
    Ok(Json(rows))
}

/// create_list_item
///
/// [Authenticated Route] Puts an item on a list. The storage layer's
/// unique constraint on (list, item) is the authoritative duplicate
/// check; a violation surfaces as 409 Conflict.
#[utoipa::path(
    post,
    path = "/list-items",
    request_body = CreateListItemRequest,
    responses(
        (status = 200, description = "Created", body = ListItem),
        (status = 409, description = "Item already on list")
    )
)]
pub async fn create_list_item(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateListItemRequest>,
) -> Result<Json<ListItem>, ApiError> {
    validate_quantity(payload.quantity)?;
    let row = state.repo.create_list_item(payload).await?;
    Ok(Json(row))
}

/// get_list_item
///
/// [Authenticated Route] Single list-item lookup. No owner scoping at
/// this level; the containing list enforces ownership upstream.
#[utoipa::path(
    get,
    path = "/list-items/{id}",
    params(("id" = Uuid, Path, description = "ListItem ID")),
    responses((status = 200, description = "Found", body = ListItem))
)]
pub async fn get_list_item(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListItem>, ApiError> {
    let row = state.repo.find_list_item(id).await?;
    Ok(Json(row))
}

/// update_list_item
///
/// [Authenticated Route] Partial update; may re-point the list and/or
/// item, subject to the same uniqueness constraint as creation.
#[utoipa::path(
    put,
    path = "/list-items/{id}",
    request_body = UpdateListItemRequest,
    responses(
        (status = 200, description = "Updated", body = ListItem),
        (status = 409, description = "Item already on target list")
    )
)]
pub async fn update_list_item(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateListItemRequest>,
) -> Result<Json<ListItem>, ApiError> {
    if let Some(quantity) = payload.quantity {
        validate_quantity(quantity)?;
    }
    let row = state.repo.update_list_item(id, payload).await?;
    Ok(Json(row))
}

// --- Admin Handlers ---

/// get_users
///
/// [Admin Route] Lists users with pagination and name/email search.
///
/// *RBAC*: admin or superUser.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(PageFilter),
    responses(
        (status = 200, description = "Users", body = [User]),
        (status = 403, description = "Insufficient role")
    )
)]
pub async fn get_users(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<PageFilter>,
) -> Result<Json<Vec<User>>, ApiError> {
    auth::require_roles(Some(&user), &[Role::Admin, Role::SuperUser])?;
    let users = state.repo.find_users(filter.page(), filter.search).await?;
    Ok(Json(users))
}

/// get_user
///
/// [Admin Route] Single user lookup by id.
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Found", body = User))
)]
pub async fn get_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    auth::require_roles(Some(&user), &[Role::Admin, Role::SuperUser])?;
    let found = state
        .repo
        .find_user(id)
        .await?
        .ok_or(ApiError::NotFound { entity: "user", id })?;
    Ok(Json(found))
}

/// update_user
///
/// [Admin Route] Partial update of any user (name, email, roles, active).
/// Records the acting admin in `last_updated_by`.
///
/// *RBAC*: admin only.
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    request_body = UpdateUserRequest,
    responses((status = 200, description = "Updated", body = User))
)]
pub async fn update_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let admin = auth::require_roles(Some(&user), &[Role::Admin])?;
    let updated = state.repo.update_user(id, payload, admin.id).await?;
    Ok(Json(updated))
}

/// block_user
///
/// [Admin Route] Soft-blocks a user (`active = false`). Their unexpired
/// tokens stop validating immediately; the record is never hard-deleted.
///
/// *RBAC*: admin only.
#[utoipa::path(
    patch,
    path = "/admin/users/{id}/block",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Blocked", body = User))
)]
pub async fn block_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let admin = auth::require_roles(Some(&user), &[Role::Admin])?;
    let blocked = state.repo.block_user(id, admin.id).await?;
    Ok(Json(blocked))
}
