use crate::error::ApiError;
use crate::models::{
    CreateItemRequest, CreateListItemRequest, CreateListRequest, ELEVATED_ROLES, Item, List,
    ListItem, NewUser, Pagination, RoleSet, UpdateItemRequest, UpdateListItemRequest,
    UpdateListRequest, UpdateUserRequest, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;

/// OwnerScope
///
/// The single ownership predicate applied by every read/mutation of an
/// owned entity, instead of an ad hoc owner filter repeated per method.
///
/// `Owned(user)` restricts the operation to records whose `owner_id`
/// matches; a record owned by someone else is indistinguishable from a
/// non-existent one. `Any` is the elevated (admin/superUser) scope with no
/// owner restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    Owned(Uuid),
    Any,
}

impl OwnerScope {
    /// The requester's own scope, regardless of role. Collection reads use
    /// this: even an admin lists their own items by default.
    pub fn owned(user: &AuthUser) -> Self {
        OwnerScope::Owned(user.id)
    }

    /// Elevated scope for single-record reads and mutations: an admin or
    /// superUser may act on any record, everyone else only on their own.
    pub fn elevated(user: &AuthUser) -> Self {
        if user.roles.has_any(ELEVATED_ROLES) {
            OwnerScope::Any
        } else {
            OwnerScope::Owned(user.id)
        }
    }

    pub fn permits(&self, owner_id: Uuid) -> bool {
        match self {
            OwnerScope::Any => true,
            OwnerScope::Owned(user_id) => *user_id == owner_id,
        }
    }
}

/// Repository Trait
///
/// The abstract contract for all persistence operations, shared by the
/// Postgres implementation and the in-memory one (`memory::MemoryRepository`)
/// used in tests and local development.
///
/// Contracts that hold for every implementation:
/// - `find_*`/`update_*`/`remove_*` taking an `OwnerScope` fail with
///   NotFound when the record is absent *or* outside the scope; the two
///   cases are indistinguishable to the caller.
/// - Collection reads order by creation time then id, so pagination is
///   deterministic for a fixed dataset; `search` is a case-insensitive
///   substring match on the record's display name.
/// - `create_list_item` relies on the storage layer's atomic uniqueness
///   check on (list_id, item_id); a violation surfaces as Conflict. There
///   is no pre-check-then-insert.
/// - `remove_*` returns the deleted record's prior state.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Creates an active user with the default `user` role. Duplicate email
    /// is a Conflict.
    async fn create_user(&self, new: NewUser) -> Result<User, ApiError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;
    /// Admin listing; search matches full name or email.
    async fn find_users(
        &self,
        page: Pagination,
        search: Option<String>,
    ) -> Result<Vec<User>, ApiError>;
    /// Partial merge; records `updated_by` in `last_updated_by`.
    async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
        updated_by: Uuid,
    ) -> Result<User, ApiError>;
    /// Soft-block: sets `active = false`. The user record survives.
    async fn block_user(&self, id: Uuid, updated_by: Uuid) -> Result<User, ApiError>;

    // --- Items ---
    async fn create_item(&self, req: CreateItemRequest, owner: Uuid) -> Result<Item, ApiError>;
    async fn find_items(
        &self,
        scope: OwnerScope,
        page: Pagination,
        search: Option<String>,
    ) -> Result<Vec<Item>, ApiError>;
    async fn find_item(&self, id: Uuid, scope: OwnerScope) -> Result<Item, ApiError>;
    async fn update_item(
        &self,
        id: Uuid,
        req: UpdateItemRequest,
        scope: OwnerScope,
    ) -> Result<Item, ApiError>;
    async fn remove_item(&self, id: Uuid, scope: OwnerScope) -> Result<Item, ApiError>;
    async fn count_items(&self, owner: Uuid) -> Result<i64, ApiError>;

    // --- Lists ---
    async fn create_list(&self, req: CreateListRequest, owner: Uuid) -> Result<List, ApiError>;
    async fn find_lists(
        &self,
        scope: OwnerScope,
        page: Pagination,
        search: Option<String>,
    ) -> Result<Vec<List>, ApiError>;
    async fn find_list(&self, id: Uuid, scope: OwnerScope) -> Result<List, ApiError>;
    async fn update_list(
        &self,
        id: Uuid,
        req: UpdateListRequest,
        scope: OwnerScope,
    ) -> Result<List, ApiError>;
    async fn remove_list(&self, id: Uuid, scope: OwnerScope) -> Result<List, ApiError>;
    async fn count_lists(&self, owner: Uuid) -> Result<i64, ApiError>;

    // --- List Items ---
    /// Fails with Conflict if the (list, item) pair already exists, and
    /// with Invalid if either reference is dangling.
    async fn create_list_item(&self, req: CreateListItemRequest) -> Result<ListItem, ApiError>;
    /// List items of one list, joined against the item; search matches the
    /// item's name. Ownership of the list is enforced upstream.
    async fn find_list_items(
        &self,
        list_id: Uuid,
        page: Pagination,
        search: Option<String>,
    ) -> Result<Vec<ListItem>, ApiError>;
    /// No owner scoping at this level by design.
    async fn find_list_item(&self, id: Uuid) -> Result<ListItem, ApiError>;
    async fn update_list_item(
        &self,
        id: Uuid,
        req: UpdateListItemRequest,
    ) -> Result<ListItem, ApiError>;
    async fn count_list_items(&self, list_id: Uuid) -> Result<i64, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres Implementation ---

const USER_COLUMNS: &str =
    "id, full_name, email, password_hash, roles, active, last_updated_by, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, name, quantity_units, owner_id, created_at, updated_at";
const LIST_COLUMNS: &str = "id, name, owner_id, created_at, updated_at";

/// Raw `users` row. Role names stay a plain text array at this level; the
/// conversion into `RoleSet` happens in `into_user`, keeping the storage
/// representation out of the model.
#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    full_name: String,
    email: String,
    password_hash: String,
    roles: Vec<String>,
    active: bool,
    last_updated_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            full_name: self.full_name,
            email: self.email,
            password_hash: self.password_hash,
            roles: RoleSet::from_names(self.roles),
            active: self.active,
            last_updated_by: self.last_updated_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Logs the underlying failure and collapses it into an opaque Internal
/// error. Constraint violations are matched before this is reached.
fn db_error(op: &'static str, err: sqlx::Error) -> ApiError {
    tracing::error!("{} error: {:?}", op, err);
    ApiError::Internal(format!("{} failed", op))
}

fn unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23503"))
}

/// Appends the owner restriction to a WHERE clause already in progress.
/// `Any` appends nothing.
fn push_owner_scope(builder: &mut QueryBuilder<'_, Postgres>, scope: OwnerScope) {
    if let OwnerScope::Owned(owner) = scope {
        builder.push(" AND owner_id = ");
        builder.push_bind(owner);
    }
}

/// PostgresRepository
///
/// The production implementation, backed by the PostgreSQL pool. Dynamic
/// filters (scope, search, pagination) are assembled with `QueryBuilder`
/// so every value is bound, never interpolated.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn create_user(&self, new: NewUser) -> Result<User, ApiError> {
        let sql = format!(
            "INSERT INTO users (id, full_name, email, password_hash, roles, active) \
             VALUES ($1, $2, $3, $4, $5, true) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.full_name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(vec!["user".to_string()])
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if unique_violation(&e) {
                    ApiError::Conflict {
                        field: "email",
                        message: format!("email {} is already registered", new.email),
                    }
                } else {
                    db_error("create_user", e)
                }
            })?;
        Ok(row.into_user())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find_user", e))?;
        Ok(row.map(UserRow::into_user))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find_user_by_email", e))?;
        Ok(row.map(UserRow::into_user))
    }

    async fn find_users(
        &self,
        page: Pagination,
        search: Option<String>,
    ) -> Result<Vec<User>, ApiError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM users WHERE true", USER_COLUMNS));

        if let Some(s) = search {
            let pattern = format!("%{}%", s);
            builder.push(" AND (full_name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR email ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY created_at ASC, id ASC LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);

        let rows = builder
            .build_query_as::<UserRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("find_users", e))?;
        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
        updated_by: Uuid,
    ) -> Result<User, ApiError> {
        let role_names = req.roles.map(|r| r.to_names());

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE users SET full_name = COALESCE(");
        builder.push_bind(req.full_name);
        builder.push(", full_name), email = COALESCE(");
        builder.push_bind(req.email);
        builder.push(", email), roles = COALESCE(");
        builder.push_bind(role_names);
        builder.push(", roles), active = COALESCE(");
        builder.push_bind(req.active);
        builder.push(", active), last_updated_by = ");
        builder.push_bind(updated_by);
        builder.push(", updated_at = NOW() WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {}", USER_COLUMNS));

        let row = builder
            .build_query_as::<UserRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if unique_violation(&e) {
                    ApiError::Conflict {
                        field: "email",
                        message: "email is already registered".to_string(),
                    }
                } else {
                    db_error("update_user", e)
                }
            })?
            .ok_or(ApiError::NotFound { entity: "user", id })?;
        Ok(row.into_user())
    }

    async fn block_user(&self, id: Uuid, updated_by: Uuid) -> Result<User, ApiError> {
        let sql = format!(
            "UPDATE users SET active = false, last_updated_by = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(updated_by)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("block_user", e))?
            .ok_or(ApiError::NotFound { entity: "user", id })?;
        Ok(row.into_user())
    }

    // --- ITEMS ---

    async fn create_item(&self, req: CreateItemRequest, owner: Uuid) -> Result<Item, ApiError> {
        let sql = format!(
            "INSERT INTO items (id, name, quantity_units, owner_id) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            ITEM_COLUMNS
        );
        sqlx::query_as::<_, Item>(&sql)
            .bind(Uuid::new_v4())
            .bind(&req.name)
            .bind(&req.quantity_units)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("create_item", e))
    }

    async fn find_items(
        &self,
        scope: OwnerScope,
        page: Pagination,
        search: Option<String>,
    ) -> Result<Vec<Item>, ApiError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM items WHERE true", ITEM_COLUMNS));
        push_owner_scope(&mut builder, scope);

        if let Some(s) = search {
            builder.push(" AND name ILIKE ");
            builder.push_bind(format!("%{}%", s));
        }

        builder.push(" ORDER BY created_at ASC, id ASC LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);

        builder
            .build_query_as::<Item>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("find_items", e))
    }

    async fn find_item(&self, id: Uuid, scope: OwnerScope) -> Result<Item, ApiError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM items WHERE id = ", ITEM_COLUMNS));
        builder.push_bind(id);
        push_owner_scope(&mut builder, scope);

        builder
            .build_query_as::<Item>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find_item", e))?
            .ok_or(ApiError::NotFound { entity: "item", id })
    }

    async fn update_item(
        &self,
        id: Uuid,
        req: UpdateItemRequest,
        scope: OwnerScope,
    ) -> Result<Item, ApiError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE items SET name = COALESCE(");
        builder.push_bind(req.name);
        builder.push(", name), quantity_units = COALESCE(");
        builder.push_bind(req.quantity_units);
        builder.push(", quantity_units), updated_at = NOW() WHERE id = ");
        builder.push_bind(id);
        push_owner_scope(&mut builder, scope);
        builder.push(format!(" RETURNING {}", ITEM_COLUMNS));

        builder
            .build_query_as::<Item>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("update_item", e))?
            .ok_or(ApiError::NotFound { entity: "item", id })
    }

    async fn remove_item(&self, id: Uuid, scope: OwnerScope) -> Result<Item, ApiError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("DELETE FROM items WHERE id = ");
        builder.push_bind(id);
        push_owner_scope(&mut builder, scope);
        builder.push(format!(" RETURNING {}", ITEM_COLUMNS));

        builder
            .build_query_as::<Item>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("remove_item", e))?
            .ok_or(ApiError::NotFound { entity: "item", id })
    }

    async fn count_items(&self, owner: Uuid) -> Result<i64, ApiError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE owner_id = $1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("count_items", e))
    }

    // --- LISTS ---

    async fn create_list(&self, req: CreateListRequest, owner: Uuid) -> Result<List, ApiError> {
        let sql = format!(
            "INSERT INTO lists (id, name, owner_id) VALUES ($1, $2, $3) RETURNING {}",
            LIST_COLUMNS
        );
        sqlx::query_as::<_, List>(&sql)
            .bind(Uuid::new_v4())
            .bind(&req.name)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("create_list", e))
    }

    async fn find_lists(
        &self,
        scope: OwnerScope,
        page: Pagination,
        search: Option<String>,
    ) -> Result<Vec<List>, ApiError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM lists WHERE true", LIST_COLUMNS));
        push_owner_scope(&mut builder, scope);

        if let Some(s) = search {
            builder.push(" AND name ILIKE ");
            builder.push_bind(format!("%{}%", s));
        }

        builder.push(" ORDER BY created_at ASC, id ASC LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);

        builder
            .build_query_as::<List>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("find_lists", e))
    }

    async fn find_list(&self, id: Uuid, scope: OwnerScope) -> Result<List, ApiError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM lists WHERE id = ", LIST_COLUMNS));
        builder.push_bind(id);
        push_owner_scope(&mut builder, scope);

        builder
            .build_query_as::<List>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find_list", e))?
            .ok_or(ApiError::NotFound { entity: "list", id })
    }

    async fn update_list(
        &self,
        id: Uuid,
        req: UpdateListRequest,
        scope: OwnerScope,
    ) -> Result<List, ApiError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE lists SET name = COALESCE(");
        builder.push_bind(req.name);
        builder.push(", name), updated_at = NOW() WHERE id = ");
        builder.push_bind(id);
        push_owner_scope(&mut builder, scope);
        builder.push(format!(" RETURNING {}", LIST_COLUMNS));

        builder
            .build_query_as::<List>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("update_list", e))?
            .ok_or(ApiError::NotFound { entity: "list", id })
    }

    async fn remove_list(&self, id: Uuid, scope: OwnerScope) -> Result<List, ApiError> {
        // list_items rows referencing this list go with it (ON DELETE CASCADE).
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("DELETE FROM lists WHERE id = ");
        builder.push_bind(id);
        push_owner_scope(&mut builder, scope);
        builder.push(format!(" RETURNING {}", LIST_COLUMNS));

        builder
            .build_query_as::<List>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("remove_list", e))?
            .ok_or(ApiError::NotFound { entity: "list", id })
    }

    async fn count_lists(&self, owner: Uuid) -> Result<i64, ApiError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lists WHERE owner_id = $1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("count_lists", e))
    }

    // --- LIST ITEMS ---

    async fn create_list_item(&self, req: CreateListItemRequest) -> Result<ListItem, ApiError> {
        // Insert and join in one round trip; the unique constraint on
        // (list_id, item_id) is the authoritative conflict check.
        let sql = r#"
            WITH inserted AS (
                INSERT INTO list_items (id, list_id, item_id, quantity, completed)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, quantity, completed, list_id, item_id, created_at, updated_at
            )
            SELECT ins.id, ins.quantity, ins.completed, ins.list_id, ins.item_id,
                   ins.created_at, ins.updated_at, i.name AS item_name
            FROM inserted ins JOIN items i ON ins.item_id = i.id
        "#;

        sqlx::query_as::<_, ListItem>(sql)
            .bind(Uuid::new_v4())
            .bind(req.list_id)
            .bind(req.item_id)
            .bind(req.quantity)
            .bind(req.completed)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if unique_violation(&e) {
                    ApiError::Conflict {
                        field: "list_id, item_id",
                        message: format!(
                            "item {} is already present on list {}",
                            req.item_id, req.list_id
                        ),
                    }
                } else if foreign_key_violation(&e) {
                    ApiError::Invalid {
                        field: "list_id, item_id",
                        message: "referenced list or item does not exist".to_string(),
                    }
                } else {
                    db_error("create_list_item", e)
                }
            })
    }

    async fn find_list_items(
        &self,
        list_id: Uuid,
        page: Pagination,
        search: Option<String>,
    ) -> Result<Vec<ListItem>, ApiError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT li.id, li.quantity, li.completed, li.list_id, li.item_id, \
             li.created_at, li.updated_at, i.name AS item_name \
             FROM list_items li JOIN items i ON li.item_id = i.id WHERE li.list_id = ",
        );
        builder.push_bind(list_id);

        if let Some(s) = search {
            builder.push(" AND i.name ILIKE ");
            builder.push_bind(format!("%{}%", s));
        }

        builder.push(" ORDER BY li.created_at ASC, li.id ASC LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);

        builder
            .build_query_as::<ListItem>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("find_list_items", e))
    }

    async fn find_list_item(&self, id: Uuid) -> Result<ListItem, ApiError> {
        let sql = "SELECT li.id, li.quantity, li.completed, li.list_id, li.item_id, \
                   li.created_at, li.updated_at, i.name AS item_name \
                   FROM list_items li JOIN items i ON li.item_id = i.id WHERE li.id = $1";
        sqlx::query_as::<_, ListItem>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find_list_item", e))?
            .ok_or(ApiError::NotFound {
                entity: "listItem",
                id,
            })
    }

    async fn update_list_item(
        &self,
        id: Uuid,
        req: UpdateListItemRequest,
    ) -> Result<ListItem, ApiError> {
        // Re-pointing list_id/item_id is allowed and runs into the same
        // unique constraint as creation.
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("WITH updated AS (UPDATE list_items SET list_id = COALESCE(");
        builder.push_bind(req.list_id);
        builder.push(", list_id), item_id = COALESCE(");
        builder.push_bind(req.item_id);
        builder.push(", item_id), quantity = COALESCE(");
        builder.push_bind(req.quantity);
        builder.push(", quantity), completed = COALESCE(");
        builder.push_bind(req.completed);
        builder.push(", completed), updated_at = NOW() WHERE id = ");
        builder.push_bind(id);
        builder.push(
            " RETURNING id, quantity, completed, list_id, item_id, created_at, updated_at) \
             SELECT u.id, u.quantity, u.completed, u.list_id, u.item_id, \
             u.created_at, u.updated_at, i.name AS item_name \
             FROM updated u JOIN items i ON u.item_id = i.id",
        );

        builder
            .build_query_as::<ListItem>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if unique_violation(&e) {
                    ApiError::Conflict {
                        field: "list_id, item_id",
                        message: "item is already present on the target list".to_string(),
                    }
                } else if foreign_key_violation(&e) {
                    ApiError::Invalid {
                        field: "list_id, item_id",
                        message: "referenced list or item does not exist".to_string(),
                    }
                } else {
                    db_error("update_list_item", e)
                }
            })?
            .ok_or(ApiError::NotFound {
                entity: "listItem",
                id,
            })
    }

    async fn count_list_items(&self, list_id: Uuid) -> Result<i64, ApiError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM list_items WHERE list_id = $1")
            .bind(list_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("count_list_items", e))
    }
}
