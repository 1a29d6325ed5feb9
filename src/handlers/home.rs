// Home handlers
// Seed-and-list plus lookup endpoints under /home

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::{error::ApiError, models::User, repository::SharedUserRepository};

/// Name given to the user inserted on every `GET /home`.
pub const SEED_USER_NAME: &str = "test";

/// Insert a "test" user, then list everyone
/// GET /home
///
/// Not idempotent: each call adds a row.
pub async fn home(
    State(repo): State<SharedUserRepository>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = repo.save(User::new(SEED_USER_NAME)).await?;
    info!(user_id = ?saved.id, "=== new user saved ===");

    let users = repo.find_all().await?;

    info!("Retrieved {} users", users.len());
    Ok((StatusCode::OK, Json(users)))
}

/// Get user by ID
/// GET /home/:user_id
///
/// A missing user is still a 200, with a JSON `null` body.
pub async fn get_user(
    State(repo): State<SharedUserRepository>,
    Path(user_id): Path<i64>,
) -> Result<Response, ApiError> {
    info!("Fetching user with id: {}", user_id);

    let response = match repo.find_by_id(user_id).await? {
        Some(user) => (StatusCode::OK, Json(user)).into_response(),
        None => {
            info!("No user with id: {}", user_id);
            (StatusCode::OK, Json(serde_json::Value::Null)).into_response()
        }
    };

    Ok(response)
}
