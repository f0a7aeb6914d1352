use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles ---

/// Role
///
/// The closed set of roles a user may carry. Stored in Postgres as a
/// `TEXT[]` column; the storage representation is confined to the
/// repository layer (see `RoleSet::from_names`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Admin,
    User,
    SuperUser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::SuperUser => "superUser",
        }
    }

    pub fn parse(name: &str) -> Option<Role> {
        match name {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            "superUser" => Some(Role::SuperUser),
            _ => None,
        }
    }
}

/// Roles that grant access to records owned by other users.
pub const ELEVATED_ROLES: &[Role] = &[Role::Admin, Role::SuperUser];

/// RoleSet
///
/// A user's role set with a capability-check interface. Callers ask
/// `has_any(required)` instead of inspecting the raw storage array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn new(roles: Vec<Role>) -> Self {
        let mut set = Vec::new();
        for role in roles {
            if !set.contains(&role) {
                set.push(role);
            }
        }
        RoleSet(set)
    }

    /// Builds a set from the stored names, skipping anything unrecognized.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roles = Vec::new();
        for name in names {
            match Role::parse(name.as_ref()) {
                Some(role) => roles.push(role),
                None => tracing::warn!("ignoring unknown role '{}'", name.as_ref()),
            }
        }
        RoleSet::new(roles)
    }

    pub fn to_names(&self) -> Vec<String> {
        self.0.iter().map(|r| r.as_str().to_string()).collect()
    }

    /// Grants when the required set is empty, or when the intersection with
    /// this set is non-empty.
    pub fn has_any(&self, required: &[Role]) -> bool {
        required.is_empty() || required.iter().any(|r| self.0.contains(r))
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical identity record from the `users` table. The password hash is
/// never serialized outward. Users are never hard-deleted; `active = false`
/// soft-blocks the account. `last_updated_by` is a weak self reference
/// recording which user last modified this record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub password_hash: String,
    pub roles: RoleSet,
    pub active: bool,
    pub last_updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item
///
/// A catalog entry exclusively owned by one user. `quantity_units` is a
/// free-form label ("kg", "boxes"), not a number.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub quantity_units: Option<String>,
    // FK to users.id (owner).
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List
///
/// A shopping list exclusively owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct List {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// ListItem
///
/// Membership of an item on a list. The (list_id, item_id) pair is unique:
/// an item appears at most once per list, enforced by the database
/// constraint. Carries no owner of its own; it is reachable only through
/// its list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct ListItem {
    pub id: Uuid,
    pub quantity: f64,
    pub completed: bool,
    pub list_id: Uuid,
    pub item_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Loaded via a JOIN against `items` in list queries.
    #[sqlx(default)]
    pub item_name: Option<String>,
}

// --- Pagination ---

/// Pagination
///
/// Normalized limit/offset applied by every list-returning operation.
/// `limit` defaults to 10 (min 1), `offset` defaults to 0 (min 0). Results
/// are ordered by creation time then id, so pages are stable for one
/// dataset snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub fn clamped(limit: Option<i64>, offset: Option<i64>) -> Self {
        Pagination {
            limit: limit.unwrap_or(10).max(1),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination::clamped(None, None)
    }
}

// --- Request Payloads (Input Schemas) ---

/// SignupRequest
///
/// Input payload for POST /auth/signup. The password is hashed before it
/// ever reaches the repository.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// LoginRequest
///
/// Input payload for POST /auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// NewUser
///
/// Internal creation record handed to the repository after the password
/// has been hashed. Not part of the HTTP surface.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
}

/// UpdateUserRequest
///
/// Partial update payload for PUT /admin/users/{id}. `Option<T>` fields
/// merge onto the stored record; absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<RoleSet>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateItemRequest {
    pub name: String,
    pub quantity_units: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateItemRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_units: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateListRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateListRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// CreateListItemRequest
///
/// Input payload for POST /list-items. Quantity defaults to 0 and
/// completed to false when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateListItemRequest {
    pub list_id: Uuid,
    pub item_id: Uuid,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub completed: bool,
}

/// UpdateListItemRequest
///
/// Partial update for PUT /list-items/{id}. May re-point the list and/or
/// item references alongside the mutable fields; re-pointing is subject to
/// the same (list, item) uniqueness constraint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateListItemRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

// --- Response Schemas (Output) ---

/// AuthResponse
///
/// Output of signup, login, and revalidate: a signed bearer token plus the
/// resolved user record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// ListDetail
///
/// Output of GET /lists/{id}: the list together with its list-item count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListDetail {
    pub list: List,
    pub total_items: i64,
}

/// UserProfile
///
/// Output of GET /me: the authenticated user plus per-owner counts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub user: User,
    pub total_items: i64,
    pub total_lists: i64,
}
