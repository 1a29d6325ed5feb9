use axum::{routing::get, Router};
use std::time::Duration;

use crate::{
    handlers::{
        health_check,
        home::{get_user, home},
    },
    middleware::create_middleware_stack,
    repository::SharedUserRepository,
};

/// Create the Axum router with all endpoints and middleware
pub fn create_router(repo: SharedUserRepository, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/home", get(home))
        .route("/home/:user_id", get(get_user))
        // The store handle is the only shared state
        .with_state(repo)
        .layer(create_middleware_stack(request_timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{ApiError, ApiResult},
        models::User,
        repository::{InMemoryUserRepository, UserRepository},
    };
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app() -> (Router, Arc<InMemoryUserRepository>) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let app = create_router(repo.clone(), Duration::from_secs(5));
        (app, repo)
    }

    /// Store whose every call fails like an unreachable database
    struct UnavailableRepository;

    #[async_trait]
    impl UserRepository for UnavailableRepository {
        async fn save(&self, _user: User) -> ApiResult<User> {
            Err(ApiError::database("Database connection unavailable"))
        }

        async fn find_all(&self) -> ApiResult<Vec<User>> {
            Err(ApiError::database("Database connection unavailable"))
        }

        async fn find_by_id(&self, _id: i64) -> ApiResult<Option<User>> {
            Err(ApiError::database("Database connection unavailable"))
        }
    }

    fn unavailable_app() -> Router {
        create_router(Arc::new(UnavailableRepository), Duration::from_secs(5))
    }

    async fn send_get(app: &Router, uri: &str) -> Response {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn users_of(body: &Value) -> &Vec<Value> {
        body.as_array().expect("response is a JSON array")
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = test_app();

        let response = send_get(&app, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_home_on_empty_store_returns_single_seed_user() {
        let (app, _) = test_app();

        let response = send_get(&app, "/home").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let users = users_of(&body);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["name"], "test");
        assert!(users[0]["id"].is_i64());
    }

    #[tokio::test]
    async fn test_home_grows_list_by_one_each_call() {
        let (app, _) = test_app();

        let mut previous = 0;
        for _ in 0..3 {
            let body = body_json(send_get(&app, "/home").await).await;
            let users = users_of(&body);
            assert_eq!(users.len(), previous + 1);
            assert_eq!(users.last().unwrap()["name"], "test");
            previous = users.len();
        }
    }

    #[tokio::test]
    async fn test_home_is_not_idempotent() {
        let (app, _) = test_app();

        send_get(&app, "/home").await;
        let body = body_json(send_get(&app, "/home").await).await;

        let ids: Vec<i64> = users_of(&body)
            .iter()
            .map(|u| u["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn test_get_existing_user() {
        let (app, repo) = test_app();
        repo.save(User::new("test")).await.unwrap();

        let response = send_get(&app, "/home/1").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({"id": 1, "name": "test"}));
    }

    #[tokio::test]
    async fn test_get_missing_user_is_ok_with_null_body() {
        let (app, repo) = test_app();
        repo.save(User::new("test")).await.unwrap();

        let response = send_get(&app, "/home/999").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, Value::Null);
    }

    #[tokio::test]
    async fn test_inserted_users_are_retrievable_by_id() {
        let (app, _) = test_app();

        send_get(&app, "/home").await;
        let body = body_json(send_get(&app, "/home").await).await;
        let ids: Vec<i64> = users_of(&body)
            .iter()
            .map(|u| u["id"].as_i64().unwrap())
            .collect();

        let unused = ids.iter().max().unwrap() + 1;
        assert_eq!(body_json(send_get(&app, &format!("/home/{}", unused)).await).await, Value::Null);

        for id in ids {
            let user = body_json(send_get(&app, &format!("/home/{}", id)).await).await;
            assert_eq!(user["id"], id);
            assert_eq!(user["name"], "test");
        }
    }

    #[tokio::test]
    async fn test_malformed_id_is_rejected_by_extractor() {
        let (app, _) = test_app();

        let response = send_get(&app, "/home/abc").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_home_store_failure_is_generic_500() {
        let app = unavailable_app();

        let response = send_get(&app, "/home").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "DATABASE_ERROR");
        assert_eq!(
            body["error"]["message"],
            "Database service is temporarily unavailable"
        );
    }

    #[tokio::test]
    async fn test_get_user_store_failure_is_generic_500() {
        let app = unavailable_app();

        let response = send_get(&app, "/home/1").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"]["code"], "DATABASE_ERROR");
    }

    #[tokio::test]
    async fn test_health_check_does_not_touch_store() {
        let app = unavailable_app();

        let response = send_get(&app, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
    }
}
