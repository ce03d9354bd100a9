use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::JobError;

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_NAMESPACE: &str = "lineage-demo";
pub const DEFAULT_OUTPUT_PATH: &str = "s3://glue-data-bucket/output/employee_summary/";

/// `http-insecure` 传输的配置。
///
/// # 教案式说明
/// - **契约（What）**：
///   - `url` 为完整的事件投递地址，必填；
///   - `timeout_ms` 同时约束连接与读取，缺省 5000；
///   - `headers` 原样附加到每个请求上，常用于鉴权头；
///   - `insecure` 为真时跳过证书链与主机名校验，仅作用于该传输自己的客户端；
/// - **权衡（Trade-offs）**：`insecure` 缺省为真，贴合“对接自签名收集器”的用途；
///   对接正式端点时应显式关闭。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct InsecureHttpConfig {
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_insecure")]
    pub insecure: bool,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_insecure() -> bool {
    true
}

impl InsecureHttpConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            headers: BTreeMap::new(),
            insecure: true,
        }
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 传输选择，以 `type` 字段区分。
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransportConfig {
    /// 只把事件 JSON 写进日志。
    #[default]
    Console,
    HttpInsecure(InsecureHttpConfig),
}

/// 演示作业配置，可从 TOML 加载；命令行参数覆盖同名字段。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    pub namespace: String,
    pub output_path: String,
    pub transport: TransportConfig,
    /// 作业收尾时做一次可达性验证的地址；缺省沿用 HTTP 传输的 `url`。
    pub verify_url: Option<String>,
    pub verify_insecure: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            output_path: DEFAULT_OUTPUT_PATH.to_owned(),
            transport: TransportConfig::Console,
            verify_url: None,
            verify_insecure: true,
        }
    }
}

impl JobConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn from_file(path: &Path) -> Result<Self, JobError> {
        let raw = fs::read_to_string(path).map_err(|source| JobError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| JobError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 验证步骤实际使用的地址。
    pub fn verification_url(&self) -> Option<&str> {
        match (&self.verify_url, &self.transport) {
            (Some(url), _) => Some(url),
            (None, TransportConfig::HttpInsecure(http)) => Some(&http.url),
            (None, TransportConfig::Console) => None,
        }
    }
}
