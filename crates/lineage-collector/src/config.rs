use std::{
    fs,
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
    time::Duration,
};

use lineage_transport_tls::{CertificatePaths, DEFAULT_CERT_FILE, DEFAULT_KEY_FILE};
use serde::Deserialize;

use crate::CollectorError;

pub const DEFAULT_PLAIN_PORT: u16 = 8080;
pub const DEFAULT_TLS_PORT: u16 = 8443;
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;

/// 启动时二选一的传输模式。
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TransportMode {
    #[default]
    Plain,
    SelfSignedTls,
}

impl TransportMode {
    pub fn default_port(self) -> u16 {
        match self {
            Self::Plain => DEFAULT_PLAIN_PORT,
            Self::SelfSignedTls => DEFAULT_TLS_PORT,
        }
    }

    pub fn scheme(self) -> &'static str {
        match self {
            Self::Plain => "http",
            Self::SelfSignedTls => "https",
        }
    }
}

/// 收集器配置。
///
/// # 教案式说明
/// - **意图（Why）**：集中描述“监听在哪、用什么传输、证书放哪、停机等多久”，
///   以便二进制入口、集成测试与 TOML 文件共用一份结构；
/// - **契约（What）**：
///   - 所有字段均有默认值，空 TOML 文档即为合法配置；
///   - `port` 缺省时由 [`TransportMode::default_port`] 决定（8080 / 8443），显式写 `0`
///     表示由操作系统分配；
///   - `cleanup_certificates` 仅在 TLS 模式下生效，控制停机时是否删除证书与私钥；
///   - `shutdown_grace_ms` 为停机阶段等待在途请求完成的上限；
/// - **加载顺序（How）**：TOML 文件 → 命令行覆盖，由二进制入口负责合并。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorConfig {
    pub bind_host: IpAddr,
    pub port: Option<u16>,
    pub transport: TransportMode,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub cleanup_certificates: bool,
    pub shutdown_grace_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: None,
            transport: TransportMode::Plain,
            cert_path: PathBuf::from(DEFAULT_CERT_FILE),
            key_path: PathBuf::from(DEFAULT_KEY_FILE),
            cleanup_certificates: true,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
        }
    }
}

impl CollectorConfig {
    /// 明文模式，监听指定端口。
    pub fn plain(port: u16) -> Self {
        Self {
            port: Some(port),
            ..Self::default()
        }
    }

    /// 自签名 TLS 模式，监听指定端口，证书写入 `paths`。
    pub fn self_signed_tls(port: u16, paths: CertificatePaths) -> Self {
        Self {
            port: Some(port),
            transport: TransportMode::SelfSignedTls,
            cert_path: paths.cert,
            key_path: paths.key,
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn from_file(path: &Path) -> Result<Self, CollectorError> {
        let raw = fs::read_to_string(path).map_err(|source| CollectorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| CollectorError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.transport.default_port())
    }

    pub fn certificate_paths(&self) -> CertificatePaths {
        CertificatePaths::new(self.cert_path.clone(), self.key_path.clone())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
