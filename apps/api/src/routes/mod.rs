pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::alerts::handlers as alerts;
use crate::applications::handlers as applications;
use crate::generation::handlers as generation;
use crate::jobs::handlers as jobs;
use crate::notifications::{handlers as notifications, ws};
use crate::scrapers::scheduler;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/:id", get(jobs::handle_get_job))
        .route(
            "/api/v1/jobs/:id/duplicates",
            get(jobs::handle_list_duplicates),
        )
        .route(
            "/api/v1/jobs/:id/cover-letter",
            post(generation::handle_cover_letter),
        )
        .route("/api/v1/dedup/stats", get(jobs::handle_dedup_stats))
        .route("/api/v1/scrape/run", post(scheduler::handle_run_scrape))
        // Alerts
        .route(
            "/api/v1/alerts",
            get(alerts::handle_list_alerts).post(alerts::handle_create_alert),
        )
        .route(
            "/api/v1/alerts/:id",
            axum::routing::delete(alerts::handle_delete_alert),
        )
        // Notifications
        .route(
            "/api/v1/notifications",
            get(notifications::handle_list_notifications),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(notifications::handle_mark_all_read),
        )
        .route(
            "/api/v1/notifications/:id/read",
            post(notifications::handle_mark_read),
        )
        .route("/api/v1/ws", get(ws::ws_handler))
        // Applications
        .route(
            "/api/v1/applications",
            get(applications::handle_list_applications)
                .post(applications::handle_create_application),
        )
        .route(
            "/api/v1/applications/stats",
            get(applications::handle_application_stats),
        )
        .route(
            "/api/v1/applications/:id",
            get(applications::handle_get_application)
                .patch(applications::handle_update_application)
                .delete(applications::handle_delete_application),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::state::offline_state;

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = build_router(offline_state())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "jobwatch-api");
    }

    #[tokio::test]
    async fn test_manual_job_requires_title() {
        let (status, body) = send(json_post(
            "/api/v1/jobs",
            serde_json::json!({
                "title": " ",
                "company": "Acme",
                "url": "https://acme.io/jobs/1"
            }),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_cover_letter_requires_summary() {
        let uri = format!("/api/v1/jobs/{}/cover-letter", Uuid::new_v4());
        let (status, body) = send(json_post(
            &uri,
            serde_json::json!({ "user_id": Uuid::new_v4(), "candidate_summary": "" }),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_alert_without_keywords_rejected() {
        let (status, _) = send(json_post(
            "/api/v1/alerts",
            serde_json::json!({ "user_id": Uuid::new_v4(), "name": "rust", "keywords": [] }),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_job_id_is_rejected() {
        let request = Request::builder()
            .uri("/api/v1/jobs/not-a-uuid")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_dedup_stats_on_empty_index() {
        let request = Request::builder()
            .uri("/api/v1/dedup/stats")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"], 0);
    }
}
