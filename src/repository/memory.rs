use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::UserRepository;
use crate::{
    error::{ApiError, ApiResult},
    models::User,
};

#[derive(Debug)]
struct Store {
    rows: BTreeMap<i64, User>,
    // None once i64::MAX has been handed out
    next_id: Option<i64>,
}

/// Process-local store used by tests and by `STORAGE=memory`.
/// Ids come from a sequence starting at 1, like a `BIGSERIAL` column.
#[derive(Debug)]
pub struct InMemoryUserRepository {
    store: RwLock<Store>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        InMemoryUserRepository {
            store: RwLock::new(Store {
                rows: BTreeMap::new(),
                next_id: Some(1),
            }),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: User) -> ApiResult<User> {
        let mut store = self.store.write().await;

        let id = match user.id {
            Some(id) => {
                // Keep the sequence ahead of explicitly chosen ids
                if store.next_id.is_some_and(|next| id >= next) {
                    store.next_id = id.checked_add(1);
                }
                id
            }
            None => {
                let id = store
                    .next_id
                    .ok_or_else(|| ApiError::database("user id sequence exhausted"))?;
                store.next_id = id.checked_add(1);
                id
            }
        };

        let saved = User::with_id(id, user.name);
        store.rows.insert(id, saved.clone());

        debug!("Stored user {} in memory", id);
        Ok(saved)
    }

    async fn find_all(&self) -> ApiResult<Vec<User>> {
        let store = self.store.read().await;
        Ok(store.rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> ApiResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.rows.get(&id).cloned())
    }
}
