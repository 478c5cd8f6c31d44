use crate::{
    cors::OriginPolicy,
    handlers, // Import handlers module
    AppState, // Use the AppState defined in main.rs
};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Request body ceiling. Generous because images arrive base64-encoded in
/// JSON bodies.
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>, cors: &OriginPolicy) -> Router {
    Router::new()
        .route("/api", get(handlers::api_status))
        .route("/api/memes", get(handlers::get_memes).post(handlers::create_meme))
        .route("/api/trending", get(handlers::get_trending))
        .route("/api/memes/{id}/like", post(handlers::toggle_like))
        .route("/api/memes/{id}/report", post(handlers::report_meme))
        .route("/api/memes/{id}", delete(handlers::delete_meme))
        .route("/api/generate-caption", post(handlers::generate_caption))
        // Middleware Layers
        .layer(cors.layer())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cors::CorsMode;
    use crate::service::MemeService;
    use crate::testing::{InMemoryMediaStore, InMemoryMemeRepository};
    use axum::body::Body;
    use axum::http::{header, Request, Response, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let repo = Arc::new(InMemoryMemeRepository::default());
        let media = Arc::new(InMemoryMediaStore::default());
        let state = Arc::new(AppState {
            service: MemeService::new(repo, media, None),
        });
        let cors = OriginPolicy::new(
            vec!["http://localhost:5173".to_string()],
            CorsMode::LogOnly,
        );
        create_router(state, &cors)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    async fn create_meme(app: &Router, category: &str, tags: Value) -> Value {
        let request = json_request(
            "POST",
            "/api/memes",
            json!({
                "imageData": "data:image/jpeg;base64,QUFBQQ==",
                "caption": "test caption",
                "category": category,
                "tags": tags,
                "userId": "alice",
            }),
        );
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[tokio::test]
    async fn status_banner_reports_online() {
        let app = test_app();
        let request = Request::builder().uri("/api").body(Body::empty()).expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "online");
        assert_eq!(body["message"], "Welcome to MemeStream API");
    }

    #[tokio::test]
    async fn created_meme_shows_up_under_its_category_only() {
        let app = test_app();
        let created = create_meme(&app, "Sports", json!(["nfl"])).await;
        assert_eq!(created["success"], true);
        assert_eq!(created["meme"]["likes"], 0);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/memes?category=Sports")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().expect("array").len(), 1);
        assert_eq!(listed[0]["category"], "Sports");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/memes?category=Tech")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let listed = body_json(response).await;
        assert!(listed.as_array().expect("array").is_empty());
    }

    #[tokio::test]
    async fn create_without_required_fields_is_rejected() {
        let app = test_app();
        let request = json_request(
            "POST",
            "/api/memes",
            json!({ "caption": "no image", "category": "Dank" }),
        );
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn invalid_pagination_is_a_bad_request() {
        let app = test_app();
        for uri in ["/api/memes?page=0", "/api/memes?limit=0", "/api/memes?page=abc"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
        }
    }

    #[tokio::test]
    async fn like_toggles_through_the_http_surface() {
        let app = test_app();
        let created = create_meme(&app, "Dank", json!([])).await;
        let id = created["meme"]["id"].as_str().expect("id").to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/memes/{id}/like"),
                json!({ "userId": "bob" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["liked"], true);
        assert_eq!(body["likes"], 1);

        // Missing userId is a validation failure.
        let response = app
            .clone()
            .oneshot(json_request("POST", &format!("/api/memes/{id}/like"), json!({})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Unknown meme is a 404.
        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/memes/{}/like", uuid::Uuid::new_v4()),
                json!({ "userId": "bob" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_by_a_stranger_is_forbidden() {
        let app = test_app();
        let created = create_meme(&app, "Dank", json!([])).await;
        let id = created["meme"]["id"].as_str().expect("id").to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "DELETE",
                &format!("/api/memes/{id}"),
                json!({ "userId": "mallory" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // The meme is still listed.
        let response = app
            .oneshot(Request::builder().uri("/api/memes").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().expect("array").len(), 1);
    }

    #[tokio::test]
    async fn report_endpoint_acknowledges_and_dedupes() {
        let app = test_app();
        let created = create_meme(&app, "Dark", json!([])).await;
        let id = created["meme"]["id"].as_str().expect("id").to_string();

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    &format!("/api/memes/{id}/report"),
                    json!({ "userId": "carol", "reason": "spam" }),
                ))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
            let body = body_json(response).await;
            assert_eq!(body["success"], true);
        }
    }

    #[tokio::test]
    async fn trending_starts_empty() {
        let app = test_app();
        create_meme(&app, "Dank", json!([])).await; // zero likes, never trending
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/trending?timeframe=week")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let listed = body_json(response).await;
        assert!(listed.as_array().expect("array").is_empty());
    }

    #[tokio::test]
    async fn caption_endpoint_uses_the_mock_without_a_credential() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/generate-caption",
                json!({ "imageData": "QUFBQQ==", "tags": ["coding"] }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["caption"],
            "When your code works on the first try and you're both happy and suspicious"
        );

        // Missing imageData is a validation failure.
        let response = app
            .oneshot(json_request("POST", "/api/generate-caption", json!({})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn log_only_cors_reflects_unlisted_origins() {
        let app = test_app();
        let request = Request::builder()
            .uri("/api")
            .header(header::ORIGIN, "https://unlisted.example.com")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .expect("cors header"),
            "https://unlisted.example.com"
        );
    }
}
