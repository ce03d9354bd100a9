use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::BytesRejection},
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use lineage_core::{
    EventSummary, LINEAGE_PATH, LineageEvent,
    wire::{self, Acknowledgement, CONTENT_TYPE_JSON, InvalidPayload, NotFound},
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::EventSink;

#[derive(Clone)]
struct AppState {
    sink: Arc<dyn EventSink>,
}

/// 构建收集器路由。
///
/// # 教案级注释
///
/// ## 契约（What）
/// - `POST /api/v1/lineage`：请求体交给 [`LineageEvent::parse`]；成功时把摘要交给 `sink`
///   并返回 201 `{"status": "received", "timestamp": ...}`，失败时返回 400
///   `{"error": "Invalid JSON", "message": ...}`；
/// - 同一路径上的其他方法、以及任意其他路径：404 `{"error": "Not found", "path": ...}`；
/// - 所有响应体都是 `application/json`，任何请求级错误都不会变成连接重置。
///
/// ## 逻辑（How）
/// - 请求体按 `Content-Length`（或分块编码）完整读取后再解析；读取失败同样按 400 处理；
/// - 路径级与方法级的兜底共用同一个 404 处理器，替代框架默认的 405。
///
/// ## 风险与权衡（Trade-offs）
/// - 请求体受框架默认的 2 MiB 上限约束，超限按读取失败返回 400；
/// - 路由器本身无状态，多个连接并发调用互不影响。
pub fn router(sink: Arc<dyn EventSink>) -> Router {
    Router::new()
        .route(LINEAGE_PATH, post(ingest).fallback(not_found))
        .fallback(not_found)
        .with_state(AppState { sink })
}

async fn ingest(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let message = rejection.body_text();
            warn!(error = %message, "failed to read lineage event body");
            return json_response(StatusCode::BAD_REQUEST, &InvalidPayload::new(message));
        }
    };

    match LineageEvent::parse(&body) {
        Ok(event) => {
            state.sink.record(&EventSummary::from_event(&event));
            json_response(StatusCode::CREATED, &Acknowledgement::now())
        }
        Err(err) => {
            warn!(code = err.code(), error = %err, "rejected lineage event");
            json_response(StatusCode::BAD_REQUEST, &InvalidPayload::from(&err))
        }
    }
}

async fn not_found(uri: Uri) -> Response {
    let path = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned());
    debug!(path = %path, "no route");
    json_response(StatusCode::NOT_FOUND, &NotFound::new(path))
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match wire::to_json(body) {
        Ok(bytes) => (status, [(header::CONTENT_TYPE, CONTENT_TYPE_JSON)], bytes).into_response(),
        Err(err) => {
            error!(error = %err, "failed to render response body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;
    use tracing_test::traced_test;

    use super::*;
    use crate::MemorySink;

    async fn call(router: Router, method: Method, path: &str, body: &'static str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, CONTENT_TYPE_JSON)
            .body(Body::from(body))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn valid_event_is_acknowledged_and_recorded() {
        let sink = Arc::new(MemorySink::new());
        let (status, body) = call(
            router(sink.clone()),
            Method::POST,
            LINEAGE_PATH,
            r#"{"eventType":"START","job":{"namespace":"test","name":"glue-test-job"},"run":{"runId":"test-run-123"},"eventTime":"2025-08-14T19:00:00.000Z"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert!(body.contains(r#""status": "received""#));
        let value: Value = serde_json::from_str(&body).unwrap();
        assert!(value["timestamp"].as_str().is_some_and(|ts| !ts.is_empty()));

        let recorded = sink.snapshot();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].job, "test/glue-test-job");
        assert_eq!(recorded[0].run_id, "test-run-123");
    }

    #[tokio::test]
    #[traced_test]
    async fn empty_body_is_rejected_without_recording() {
        let sink = Arc::new(MemorySink::new());
        let (status, body) = call(router(sink.clone()), Method::POST, LINEAGE_PATH, "").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains(r#""error": "Invalid JSON""#));
        let value: Value = serde_json::from_str(&body).unwrap();
        assert!(!value["message"].as_str().unwrap().is_empty());
        assert!(sink.is_empty());
        assert!(logs_contain("lineage.event.invalid_json"));
    }

    #[tokio::test]
    async fn other_paths_and_methods_are_not_found() {
        let sink = Arc::new(MemorySink::new());
        let (status, body) = call(router(sink.clone()), Method::GET, "/other/path", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains(r#""path": "/other/path""#));

        let (status, body) = call(router(sink.clone()), Method::GET, LINEAGE_PATH, "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains(r#""path": "/api/v1/lineage""#));

        let (status, _) = call(router(sink.clone()), Method::POST, "/api/v1/lineage/extra", "{}").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn query_string_is_echoed_in_not_found_path() {
        let sink = Arc::new(MemorySink::new());
        let (_, body) = call(router(sink), Method::DELETE, "/x?y=1", "").await;
        assert!(body.contains(r#""path": "/x?y=1""#));
    }
}
