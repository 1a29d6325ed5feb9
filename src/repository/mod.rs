//! Persistence gateway for [`User`] records.
//!
//! Handlers only ever see `Arc<dyn UserRepository>`; the concrete store is
//! picked once at startup.

mod memory;

pub use memory::InMemoryUserRepository;

use async_trait::async_trait;
use std::sync::Arc;

use crate::{error::ApiResult, models::User};

/// Narrow repository over the `users` store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts `user` when it has no id yet, otherwise upserts the row with
    /// that id. Returns the stored record with its id populated.
    async fn save(&self, user: User) -> ApiResult<User>;

    /// Every stored record, in store-defined order.
    async fn find_all(&self) -> ApiResult<Vec<User>>;

    /// `None` when no record has this id.
    async fn find_by_id(&self, id: i64) -> ApiResult<Option<User>>;
}

/// Shared handle injected into the router as state.
pub type SharedUserRepository = Arc<dyn UserRepository>;
