use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use reqflow::workflows::import::{import_router, ImportWorkflow};
use reqflow::workflows::requisition::{EmployeeDirectory, RequisitionGateway};

pub(crate) fn with_import_routes<D, G>(workflow: Arc<ImportWorkflow<D, G>>) -> axum::Router
where
    D: EmployeeDirectory + 'static,
    G: RequisitionGateway + 'static,
{
    import_router(workflow)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryEmployeeDirectory, InMemoryRequisitionGateway};
    use axum::body::Body;
    use axum::http::Request;
    use reqflow::workflows::import::CancelToken;
    use reqflow::workflows::requisition::{ActingUser, BoardHandle};
    use std::time::Duration;
    use tower::util::ServiceExt;

    const SAMPLE_FILE: &str = "\
registration;name;title;cost_center;terminated_on;hierarchy\n\
1042;Ana Souza;Analyst;CC-10;2026-01-15;H1\n\
1044;Bruno Lima;Coordinator;CC-12;2026-01-22;H2\n";

    fn test_router() -> axum::Router {
        let workflow = Arc::new(ImportWorkflow::new(
            Arc::new(InMemoryEmployeeDirectory::default()),
            Arc::new(InMemoryRequisitionGateway::default()),
            BoardHandle::new(),
            ActingUser {
                name: "test-operator".to_string(),
                registration: None,
            },
            CancelToken::new(),
            Duration::from_secs(60),
        ));
        import_router(workflow)
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    #[tokio::test]
    async fn preview_then_commit_populates_the_board() {
        let router = test_router();

        let response = router
            .clone()
            .oneshot(json_request(
                "/api/v1/import/preview",
                json!({ "file_text": SAMPLE_FILE }),
            ))
            .await
            .expect("preview call");
        assert_eq!(response.status(), StatusCode::OK);
        let preview = body_json(response).await;
        assert_eq!(preview["new_count"], 2);
        assert_eq!(preview["existing_count"], 0);

        let response = router
            .clone()
            .oneshot(json_request(
                "/api/v1/import/commit",
                json!({ "decision": "persist-and-create" }),
            ))
            .await
            .expect("commit call");
        assert_eq!(response.status(), StatusCode::OK);
        let commit = body_json(response).await;
        assert_eq!(commit["receipt"]["created"], 2);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/board")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("board call");
        assert_eq!(response.status(), StatusCode::OK);
        let board = body_json(response).await;
        assert_eq!(board["total"], 2);
        assert_eq!(board["columns"][0]["label"], "Open");
        assert_eq!(board["columns"][0]["count"], 2);
    }

    #[tokio::test]
    async fn malformed_file_is_unprocessable() {
        let router = test_router();
        let response = router
            .oneshot(json_request(
                "/api/v1/import/preview",
                json!({ "file_text": "registration;name\n" }),
            ))
            .await
            .expect("preview call");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn commit_without_preview_conflicts() {
        let router = test_router();
        let response = router
            .oneshot(json_request(
                "/api/v1/import/commit",
                json!({ "decision": "persist-only" }),
            ))
            .await
            .expect("commit call");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn cancel_while_idle_needs_no_confirmation() {
        let router = test_router();
        let response = router
            .oneshot(json_request("/api/v1/import/cancel", json!({})))
            .await
            .expect("cancel call");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let payload = body_json(response).await;
        assert_eq!(payload["phase"], "cancelled");
    }

    #[tokio::test]
    async fn moving_an_unknown_card_is_bad_gateway() {
        let router = test_router();
        let response = router
            .oneshot(json_request(
                "/api/v1/requisitions/REQ-0404/stage",
                json!({ "stage": "frozen" }),
            ))
            .await
            .expect("stage call");
        // The in-memory backend rejects unknown codes before the board is
        // consulted.
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
