use lineage_core::wire::CONTENT_TYPE_JSON;
use reqwest::{Client, header::CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, info};

use crate::{ConnectionError, InsecureHttpConfig, TransportConfig};

/// 通过 HTTP(S) POST 投递血缘事件，可按配置跳过证书校验。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 收集器的 TLS 模式使用自签名证书，标准信任库无法验证；生产者需要一种“只对这个
///   端点放宽校验”的传输，而不是修改进程级的 TLS 默认值。
///
/// ## 逻辑（How）
/// 1. 构造时建立专属 `reqwest::Client`：`danger_accept_invalid_certs` 只作用于该客户端，
///    超时取自配置；
/// 2. `emit` 接受任意可序列化的事件（运行事件之外，数据集、作业事件同样适用），
///    序列化为 JSON，附加 `Content-Type` 与自定义请求头后 POST；
/// 3. 2xx 视为成功，其余状态码读取响应体后返回 [`ConnectionError::UnexpectedStatus`]。
///
/// ## 契约（What）
/// - 网络失败按 [`ConnectionError`] 分类返回，调用方负责记录并决定是否继续；
/// - 传输对象可在多次 `emit` 之间复用，底层连接由客户端连接池管理。
#[derive(Clone, Debug)]
pub struct HttpTransport {
    config: InsecureHttpConfig,
    client: Client,
}

impl HttpTransport {
    pub const TYPE: &'static str = "http-insecure";

    pub fn new(config: InsecureHttpConfig) -> Result<Self, ConnectionError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.timeout())
            .build()
            .map_err(|source| ConnectionError::from_reqwest(&config.url, source))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &InsecureHttpConfig {
        &self.config
    }

    pub async fn emit<E>(&self, event: &E) -> Result<(), ConnectionError>
    where
        E: Serialize + ?Sized,
    {
        let url = &self.config.url;
        let payload = serde_json::to_vec(event)?;

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .body(payload);
        for (name, value) in &self.config.headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ConnectionError::from_reqwest(url, source))?;
        let status = response.status();
        if status.is_success() {
            debug!(%url, status = status.as_u16(), "lineage event delivered");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ConnectionError::UnexpectedStatus {
            url: url.clone(),
            status: status.as_u16(),
            body,
        })
    }
}

/// 把事件 JSON 写入日志，不发起任何网络请求。
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub const TYPE: &'static str = "console";

    pub fn emit<E>(&self, event: &E) -> Result<(), ConnectionError>
    where
        E: Serialize + ?Sized,
    {
        let payload = serde_json::to_string(event)?;
        info!(event = %payload, "lineage event");
        Ok(())
    }
}

/// 按 [`TransportConfig`] 选定的传输。
#[derive(Clone, Debug)]
pub enum Transport {
    Console(ConsoleTransport),
    Http(HttpTransport),
}

impl Transport {
    pub fn from_config(config: &TransportConfig) -> Result<Self, ConnectionError> {
        match config {
            TransportConfig::Console => Ok(Self::Console(ConsoleTransport)),
            TransportConfig::HttpInsecure(http) => HttpTransport::new(http.clone()).map(Self::Http),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Console(_) => ConsoleTransport::TYPE,
            Self::Http(_) => HttpTransport::TYPE,
        }
    }

    pub async fn emit<E>(&self, event: &E) -> Result<(), ConnectionError>
    where
        E: Serialize + ?Sized,
    {
        match self {
            Self::Console(console) => console.emit(event),
            Self::Http(http) => http.emit(event).await,
        }
    }
}
