pub mod asset_routes;
pub mod health_routes;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use asset_routes::{AssetState, index_handler};
use health_routes::health_handler;

/// `/` and `/health`, with every other path resolved against the asset
/// directory.
pub fn app_router(config: &ServerConfig) -> Router {
    let state = AssetState { index_path: config.index_path() };

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .fallback_service(ServeDir::new(&config.assets_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;

    fn assets(with_index: bool) -> (TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        if with_index {
            std::fs::write(dir.path().join("index.html"), "<h1>Agent Harness</h1>").unwrap();
        }
        std::fs::write(dir.path().join("app.js"), "console.log('hi');").unwrap();

        let config = ServerConfig {
            port: 0,
            assets_dir: dir.path().to_path_buf(),
            backend_url: "http://localhost:8080".to_string(),
        };
        let router = app_router(&config);
        (dir, router)
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (_dir, router) = assets(true);
        let (status, body) = get(router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "ok", "message": "Frontend server is running"})
        );
    }

    #[tokio::test]
    async fn root_serves_index_page() {
        let (_dir, router) = assets(true);
        let (status, body) = get(router, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>Agent Harness</h1>");
    }

    #[tokio::test]
    async fn root_without_index_is_not_found() {
        let (_dir, router) = assets(false);
        let (status, body) = get(router, "/").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("index.html"));
    }

    #[tokio::test]
    async fn static_files_are_served_from_asset_dir() {
        let (_dir, router) = assets(true);
        let response = router
            .clone()
            .oneshot(Request::builder().uri("/app.js").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.contains("javascript"));

        let (status, _) = get(router, "/missing.css").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cross_origin_requests_are_allowed() {
        let (_dir, router) = assets(true);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://elsewhere.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
