use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    CreateItemRequest, CreateListItemRequest, CreateListRequest, Item, List, ListItem, NewUser,
    Pagination, Role, RoleSet, UpdateItemRequest, UpdateListItemRequest, UpdateListRequest,
    UpdateUserRequest, User,
};
use crate::repository::{OwnerScope, Repository};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use uuid::Uuid;

/// MemoryRepository
///
/// In-memory implementation of `Repository`, used in tests and local
/// development the same way the Postgres one is used in production. It is
/// not a stub: scoping, search, pagination, and the (list, item)
/// uniqueness rule behave exactly as the contracts on the trait demand,
/// so handler and extractor logic can be exercised against it end to end.
///
/// Rows live in insertion order, which doubles as the creation-time order
/// the pagination contract requires.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Store>,
}

#[derive(Default)]
struct Store {
    users: Vec<User>,
    items: Vec<Item>,
    lists: Vec<List>,
    list_items: Vec<ListItem>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> std::sync::MutexGuard<'_, Store> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Test convenience: registers an already-built user (e.g., an admin
    /// with a known id) without going through signup.
    pub fn insert_user(&self, user: User) {
        self.store().users.push(user);
    }
}

fn matches_search(name: &str, search: &Option<String>) -> bool {
    match search {
        Some(s) => name.to_lowercase().contains(&s.to_lowercase()),
        None => true,
    }
}

fn paginate<T: Clone>(rows: Vec<&T>, page: Pagination) -> Vec<T> {
    rows.into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- USERS ---

    async fn create_user(&self, new: NewUser) -> Result<User, ApiError> {
        let mut store = self.store();
        if store.users.iter().any(|u| u.email == new.email) {
            return Err(ApiError::Conflict {
                field: "email",
                message: format!("email {} is already registered", new.email),
            });
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            email: new.email,
            password_hash: new.password_hash,
            roles: RoleSet::new(vec![Role::User]),
            active: true,
            last_updated_by: None,
            created_at: now,
            updated_at: now,
        };
        store.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        Ok(self.store().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        Ok(self
            .store()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_users(
        &self,
        page: Pagination,
        search: Option<String>,
    ) -> Result<Vec<User>, ApiError> {
        let store = self.store();
        let matching: Vec<&User> = store
            .users
            .iter()
            .filter(|u| {
                matches_search(&u.full_name, &search) || matches_search(&u.email, &search)
            })
            .collect();
        Ok(paginate(matching, page))
    }

    async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
        updated_by: Uuid,
    ) -> Result<User, ApiError> {
        let mut store = self.store();
        if let Some(email) = &req.email {
            if store.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(ApiError::Conflict {
                    field: "email",
                    message: "email is already registered".to_string(),
                });
            }
        }
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(ApiError::NotFound { entity: "user", id })?;
        if let Some(full_name) = req.full_name {
            user.full_name = full_name;
        }
        if let Some(email) = req.email {
            user.email = email;
        }
        if let Some(roles) = req.roles {
            user.roles = roles;
        }
        if let Some(active) = req.active {
            user.active = active;
        }
        user.last_updated_by = Some(updated_by);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn block_user(&self, id: Uuid, updated_by: Uuid) -> Result<User, ApiError> {
        let mut store = self.store();
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(ApiError::NotFound { entity: "user", id })?;
        user.active = false;
        user.last_updated_by = Some(updated_by);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    // --- ITEMS ---

    async fn create_item(&self, req: CreateItemRequest, owner: Uuid) -> Result<Item, ApiError> {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            name: req.name,
            quantity_units: req.quantity_units,
            owner_id: owner,
            created_at: now,
            updated_at: now,
        };
        self.store().items.push(item.clone());
        Ok(item)
    }

    async fn find_items(
        &self,
        scope: OwnerScope,
        page: Pagination,
        search: Option<String>,
    ) -> Result<Vec<Item>, ApiError> {
        let store = self.store();
        let matching: Vec<&Item> = store
            .items
            .iter()
            .filter(|i| scope.permits(i.owner_id) && matches_search(&i.name, &search))
            .collect();
        Ok(paginate(matching, page))
    }

    async fn find_item(&self, id: Uuid, scope: OwnerScope) -> Result<Item, ApiError> {
        self.store()
            .items
            .iter()
            .find(|i| i.id == id && scope.permits(i.owner_id))
            .cloned()
            .ok_or(ApiError::NotFound { entity: "item", id })
    }

    async fn update_item(
        &self,
        id: Uuid,
        req: UpdateItemRequest,
        scope: OwnerScope,
    ) -> Result<Item, ApiError> {
        let mut store = self.store();
        let item = store
            .items
            .iter_mut()
            .find(|i| i.id == id && scope.permits(i.owner_id))
            .ok_or(ApiError::NotFound { entity: "item", id })?;
        if let Some(name) = req.name {
            item.name = name;
        }
        if let Some(units) = req.quantity_units {
            item.quantity_units = Some(units);
        }
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn remove_item(&self, id: Uuid, scope: OwnerScope) -> Result<Item, ApiError> {
        let mut store = self.store();
        let pos = store
            .items
            .iter()
            .position(|i| i.id == id && scope.permits(i.owner_id))
            .ok_or(ApiError::NotFound { entity: "item", id })?;
        let removed = store.items.remove(pos);
        // Mirrors ON DELETE CASCADE on list_items.item_id.
        store.list_items.retain(|li| li.item_id != id);
        Ok(removed)
    }

    async fn count_items(&self, owner: Uuid) -> Result<i64, ApiError> {
        Ok(self
            .store()
            .items
            .iter()
            .filter(|i| i.owner_id == owner)
            .count() as i64)
    }

    // --- LISTS ---

    async fn create_list(&self, req: CreateListRequest, owner: Uuid) -> Result<List, ApiError> {
        let now = Utc::now();
        let list = List {
            id: Uuid::new_v4(),
            name: req.name,
            owner_id: owner,
            created_at: now,
            updated_at: now,
        };
        self.store().lists.push(list.clone());
        Ok(list)
    }

    async fn find_lists(
        &self,
        scope: OwnerScope,
        page: Pagination,
        search: Option<String>,
    ) -> Result<Vec<List>, ApiError> {
        let store = self.store();
        let matching: Vec<&List> = store
            .lists
            .iter()
            .filter(|l| scope.permits(l.owner_id) && matches_search(&l.name, &search))
            .collect();
        Ok(paginate(matching, page))
    }

    async fn find_list(&self, id: Uuid, scope: OwnerScope) -> Result<List, ApiError> {
        self.store()
            .lists
            .iter()
            .find(|l| l.id == id && scope.permits(l.owner_id))
            .cloned()
            .ok_or(ApiError::NotFound { entity: "list", id })
    }

    async fn update_list(
        &self,
        id: Uuid,
        req: UpdateListRequest,
        scope: OwnerScope,
    ) -> Result<List, ApiError> {
        let mut store = self.store();
        let list = store
            .lists
            .iter_mut()
            .find(|l| l.id == id && scope.permits(l.owner_id))
            .ok_or(ApiError::NotFound { entity: "list", id })?;
        if let Some(name) = req.name {
            list.name = name;
        }
        list.updated_at = Utc::now();
        Ok(list.clone())
    }

    async fn remove_list(&self, id: Uuid, scope: OwnerScope) -> Result<List, ApiError> {
        let mut store = self.store();
        let pos = store
            .lists
            .iter()
            .position(|l| l.id == id && scope.permits(l.owner_id))
            .ok_or(ApiError::NotFound { entity: "list", id })?;
        let removed = store.lists.remove(pos);
        store.list_items.retain(|li| li.list_id != id);
        Ok(removed)
    }

    async fn count_lists(&self, owner: Uuid) -> Result<i64, ApiError> {
        Ok(self
            .store()
            .lists
            .iter()
            .filter(|l| l.owner_id == owner)
            .count() as i64)
    }

    // --- LIST ITEMS ---

    async fn create_list_item(&self, req: CreateListItemRequest) -> Result<ListItem, ApiError> {
        let mut store = self.store();
        let item_name = store
            .items
            .iter()
            .find(|i| i.id == req.item_id)
            .map(|i| i.name.clone());
        if item_name.is_none() || !store.lists.iter().any(|l| l.id == req.list_id) {
            return Err(ApiError::Invalid {
                field: "list_id, item_id",
                message: "referenced list or item does not exist".to_string(),
            });
        }
        if store
            .list_items
            .iter()
            .any(|li| li.list_id == req.list_id && li.item_id == req.item_id)
        {
            return Err(ApiError::Conflict {
                field: "list_id, item_id",
                message: format!(
                    "item {} is already present on list {}",
                    req.item_id, req.list_id
                ),
            });
        }
        let now = Utc::now();
        let list_item = ListItem {
            id: Uuid::new_v4(),
            quantity: req.quantity,
            completed: req.completed,
            list_id: req.list_id,
            item_id: req.item_id,
            created_at: now,
            updated_at: now,
            item_name,
        };
        store.list_items.push(list_item.clone());
        Ok(list_item)
    }

    async fn find_list_items(
        &self,
        list_id: Uuid,
        page: Pagination,
        search: Option<String>,
    ) -> Result<Vec<ListItem>, ApiError> {
        let store = self.store();
        let mut matching: Vec<ListItem> = Vec::new();
        for li in store.list_items.iter().filter(|li| li.list_id == list_id) {
            let item_name = store
                .items
                .iter()
                .find(|i| i.id == li.item_id)
                .map(|i| i.name.clone())
                .unwrap_or_default();
            if matches_search(&item_name, &search) {
                let mut row = li.clone();
                row.item_name = Some(item_name);
                matching.push(row);
            }
        }
        Ok(matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn find_list_item(&self, id: Uuid) -> Result<ListItem, ApiError> {
        let store = self.store();
        let mut row = store
            .list_items
            .iter()
            .find(|li| li.id == id)
            .cloned()
            .ok_or(ApiError::NotFound {
                entity: "listItem",
                id,
            })?;
        row.item_name = store
            .items
            .iter()
            .find(|i| i.id == row.item_id)
            .map(|i| i.name.clone());
        Ok(row)
    }

    async fn update_list_item(
        &self,
        id: Uuid,
        req: UpdateListItemRequest,
    ) -> Result<ListItem, ApiError> {
        let mut store = self.store();
        let pos = store
            .list_items
            .iter()
            .position(|li| li.id == id)
            .ok_or(ApiError::NotFound {
                entity: "listItem",
                id,
            })?;
        let current = store.list_items[pos].clone();

        let list_id = req.list_id.unwrap_or(current.list_id);
        let item_id = req.item_id.unwrap_or(current.item_id);

        if !store.lists.iter().any(|l| l.id == list_id)
            || !store.items.iter().any(|i| i.id == item_id)
        {
            return Err(ApiError::Invalid {
                field: "list_id, item_id",
                message: "referenced list or item does not exist".to_string(),
            });
        }
        if store
            .list_items
            .iter()
            .any(|li| li.id != id && li.list_id == list_id && li.item_id == item_id)
        {
            return Err(ApiError::Conflict {
                field: "list_id, item_id",
                message: "item is already present on the target list".to_string(),
            });
        }

        let item_name = store
            .items
            .iter()
            .find(|i| i.id == item_id)
            .map(|i| i.name.clone());
        let row = &mut store.list_items[pos];
        row.list_id = list_id;
        row.item_id = item_id;
        if let Some(quantity) = req.quantity {
            row.quantity = quantity;
        }
        if let Some(completed) = req.completed {
            row.completed = completed;
        }
        row.updated_at = Utc::now();
        row.item_name = item_name;
        Ok(row.clone())
    }

    async fn count_list_items(&self, list_id: Uuid) -> Result<i64, ApiError> {
        Ok(self
            .store()
            .list_items
            .iter()
            .filter(|li| li.list_id == list_id)
            .count() as i64)
    }
}

/// Builds an `AuthUser` directly from a stored user record. Test helper;
/// production code always goes through the extractor.
pub fn auth_user_for(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        roles: user.roles.clone(),
    }
}
