//! HTTP gateway exposing the engine API.

mod handlers;
mod response;
mod server;

pub use handlers::{CreateInstanceRequest, GatewayState, StatusRequest, SweepRequest};
pub use response::{ApiError, ApiResponse};
pub use server::GatewayServer;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use cadence_core::config::GatewayConfig;

    use super::GatewayServer;
    use crate::notify::{LogNotifier, NotifierBackend};
    use crate::store::{InMemoryInstanceStore, StoreBackend};
    use crate::{Engine, WorkflowEngine};

    fn app() -> Router {
        let engine: Engine = WorkflowEngine::new(
            StoreBackend::Memory(InMemoryInstanceStore::new()),
            NotifierBackend::Log(LogNotifier::new()),
        );
        GatewayServer::new(GatewayConfig::default(), Arc::new(engine))
            .with_request_logging(false)
            .router(CancellationToken::new())
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn create(app: &Router) -> String {
        let (status, body) = call(
            app,
            "POST",
            "/instances",
            Some(json!({
                "processId": "exam-1",
                "processTitle": "Linear Algebra",
                "anchorDate": "2024-03-01"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let app = app();
        let id = create(&app).await;

        let (status, body) = call(&app, "GET", &format!("/instances/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["currentStep"], "convocation");
        assert_eq!(body["data"]["status"], "active");
        assert_eq!(body["data"]["steps"][0]["startDate"], "2024-02-15");

        let (_, list) = call(&app, "GET", "/instances", None).await;
        assert_eq!(list["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_anchor_date_is_invalid_argument() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/instances",
            Some(json!({
                "processId": "exam-1",
                "processTitle": "Linear Algebra",
                "anchorDate": "2024-02-30"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_unknown_instance_is_not_found() {
        let app = app();
        let uri = format!("/instances/{}", uuid::Uuid::new_v4());
        let (status, body) = call(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) = call(&app, "GET", "/instances/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_gated_transition_names_dependency() {
        let app = app();
        let id = create(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/instances/{id}/steps/grade_entry/transition"),
            Some(json!({ "status": "in_progress" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "DEPENDENCY_NOT_SATISFIED");
        assert_eq!(body["error"]["details"]["dependency"], "exam_session");
    }

    #[tokio::test]
    async fn test_transition_and_sweep() {
        let app = app();
        let id = create(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/instances/{id}/steps/convocation/transition"),
            Some(json!({ "status": "in_progress" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["steps"][0]["status"], "in_progress");

        let sweep = json!({ "today": "2024-02-15" });
        let (status, body) = call(&app, "POST", "/sweep", Some(sweep)).await;
        assert_eq!(status, StatusCode::OK);
        let results = body["data"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["stepId"], "convocation");
        assert_eq!(results[0]["outcome"], "completed");

        let (_, body) = call(&app, "GET", &format!("/instances/{id}"), None).await;
        assert_eq!(body["data"]["currentStep"], "exam_session");
    }

    #[tokio::test]
    async fn test_pause_and_resume() {
        let app = app();
        let id = create(&app).await;

        let (status, body) = call(&app, "POST", &format!("/instances/{id}/pause"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "paused");

        let (status, body) = call(&app, "POST", &format!("/instances/{id}/resume"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "active");
    }
}
