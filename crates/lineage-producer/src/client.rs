use std::time::Duration;

use lineage_core::wire::CONTENT_TYPE_JSON;
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{ConnectionError, config::DEFAULT_TIMEOUT_MS};

/// 投递单个事件并返回状态码与响应体。
///
/// # 教案级注释
///
/// ## 契约（What）
/// - 任何 HTTP 状态码（包括 4xx/5xx）都算一次成功往返，由调用方解读；
/// - 只有网络层失败（连接被拒、超时、TLS 握手失败）返回 [`ConnectionError`]；
/// - `insecure` 只影响这一次调用：每次调用新建客户端，不读取也不修改任何全局 TLS 设置。
///
/// ## 逻辑（How）
/// - 客户端关闭连接池（`pool_max_idle_per_host(0)`），响应读完即释放连接；
/// - 超时沿用 `http-insecure` 传输的缺省值。
pub async fn post_event<E>(
    url: &str,
    event: &E,
    insecure: bool,
) -> Result<(StatusCode, String), ConnectionError>
where
    E: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(event)?;
    let client = Client::builder()
        .danger_accept_invalid_certs(insecure)
        .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
        .pool_max_idle_per_host(0)
        .build()
        .map_err(|source| ConnectionError::from_reqwest(url, source))?;

    let response = client
        .post(url)
        .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
        .body(payload)
        .send()
        .await
        .map_err(|source| ConnectionError::from_reqwest(url, source))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| ConnectionError::from_reqwest(url, source))?;
    Ok((status, body))
}

/// 可达性验证使用的固定事件。
pub fn verification_event() -> Value {
    json!({
        "eventType": "START",
        "eventTime": "2025-08-14T19:00:00.000Z",
        "job": {"namespace": "test", "name": "glue-test-job"},
        "run": {"runId": "test-run-123"}
    })
}

/// 向 `url` 发送验证事件并记录结果；网络失败只记录警告，返回 `None`。
pub async fn verify_endpoint(url: &str, insecure: bool) -> Option<(StatusCode, String)> {
    match post_event(url, &verification_event(), insecure).await {
        Ok((status, body)) => {
            info!(%url, status = status.as_u16(), response = %body, "verification call completed");
            Some((status, body))
        }
        Err(err) => {
            warn!(%url, code = err.code(), error = %err, "verification call failed");
            None
        }
    }
}
