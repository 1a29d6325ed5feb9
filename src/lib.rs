// Library root for the home users API

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;

// Re-export commonly used types
pub use db::Database;
pub use error::{ApiError, ApiResult};
pub use models::User;
pub use repository::{InMemoryUserRepository, SharedUserRepository, UserRepository};
pub use routes::create_router;
