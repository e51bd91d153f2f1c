pub mod handlers;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::state::AppState;

async fn not_found() -> AppError {
    AppError::NotFound("No such route".to_string())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/resumes/score", post(handlers::handle_score_resume))
        .route("/api/v1/recommendations", post(handlers::handle_rank_jobs))
        .route(
            "/api/v1/recommendations/:user_id",
            get(handlers::handle_get_recommendations),
        )
        .route("/api/v1/jobs/refresh", post(handlers::handle_refresh_jobs))
        .route("/api/v1/jobs/budget", get(handlers::handle_budget_status))
        .fallback(not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::config::Config;
    use crate::jobs::source::tests::{Behavior, FakeProvider};
    use crate::jobs::MemoryJobCache;
    use crate::models::job::posting;
    use crate::pipeline::tests::service_with;
    use crate::recommendations::MemoryRecommendationStore;

    fn test_state(behavior: Behavior) -> AppState {
        let config = Config {
            database_url: None,
            job_provider_url: "http://provider.test".to_string(),
            scoring_oracle_url: "http://oracle.test".to_string(),
            api_call_limit: 10,
            provider_timeout: Duration::from_secs(10),
            oracle_timeout: Duration::from_secs(30),
            pipeline_timeout: Duration::from_secs(60),
            cache_row_limit: 50,
            max_results: 20,
            scoring_config_path: None,
            skill_categories_path: None,
            port: 0,
            rust_log: "info".to_string(),
        };
        let service = service_with(
            Arc::new(FakeProvider::new(behavior)),
            Arc::new(MemoryJobCache::new()),
            Arc::new(MemoryRecommendationStore::new()),
        );
        AppState {
            config,
            service: Arc::new(service),
        }
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state(Behavior::Fail));
        let (status, body) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = build_router(test_state(Behavior::Fail));
        let (status, body) = send(app, Request::get("/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_score_resume_endpoint() {
        let app = build_router(test_state(Behavior::Fail));
        let request = post_json(
            "/api/v1/resumes/score",
            json!({"text": "Experience\n- Built 3 services", "experienceLevel": "principal"}),
        );
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["targetLevel"], "senior");
        assert!(body["score"].as_f64().unwrap() <= 100.0);
    }

    #[tokio::test]
    async fn test_score_without_level_uses_detected_level() {
        let app = build_router(test_state(Behavior::Fail));
        let request = post_json(
            "/api/v1/resumes/score",
            json!({"text": "Principal engineer with 12 years of experience\nExperience\n- Led 4 teams"}),
        );
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["detectedLevel"], "senior");
        assert_eq!(body["targetLevel"], "senior");
        assert!(body["insights"].as_array().is_some());
        assert!(body.get("extractedInfo").is_some());
    }

    #[tokio::test]
    async fn test_rank_then_read_back() {
        let state = test_state(Behavior::Return(vec![posting(
            "https://a",
            "Full Stack Developer",
            "python and react",
            2,
        )]));
        let user_id = Uuid::new_v4();
        let request = post_json(
            "/api/v1/recommendations",
            json!({
                "userId": user_id,
                "resumeId": Uuid::new_v4(),
                "analysis": {
                    "score": 81.0,
                    "skills": {"technical": ["python", "react", "aws"]},
                    "extractedText": "jane@example.com\nExperience\n- Built APIs\nEducation\nBSc",
                    "metrics": {
                        "wordCount": 420,
                        "sectionsFound": 3,
                        "actionVerbCount": 6,
                        "quantifiedBulletRatio": 0.3
                    }
                }
            }),
        );
        let (status, body) = send(build_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matches"][0]["posting"]["canonicalUrl"], "https://a");

        let (status, body) = send(
            build_router(state.clone()),
            Request::get(format!("/api/v1/recommendations/{user_id}?limit=5"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matches"].as_array().unwrap().len(), 1);

        let (status, body) = send(
            build_router(state),
            Request::get("/api/v1/jobs/budget").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["used"], 1);
        assert_eq!(body["exhausted"], false);
    }

    #[tokio::test]
    async fn test_invalid_resume_is_unprocessable() {
        let app = build_router(test_state(Behavior::Fail));
        let request = post_json(
            "/api/v1/recommendations",
            json!({
                "userId": Uuid::new_v4(),
                "resumeId": Uuid::new_v4(),
                "analysis": {"score": 10.0, "skills": [], "extractedText": "hello"}
            }),
        );
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "INVALID_RESUME_FORMAT");
    }

    #[tokio::test]
    async fn test_refresh_validation() {
        let state = test_state(Behavior::Fail);
        let (status, _) = send(
            build_router(state.clone()),
            post_json("/api/v1/jobs/refresh", json!({"query": " "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            build_router(state),
            post_json("/api/v1/jobs/refresh", json!({"query": "rust", "location": "Berlin"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }
}
