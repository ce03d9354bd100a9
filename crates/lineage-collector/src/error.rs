use std::{io, net::SocketAddr, path::PathBuf};

use lineage_transport_tls::CredentialError;
use thiserror::Error;

/// 收集器启动与生命周期错误。
///
/// 单个请求的失败（解析失败、路由不匹配、握手失败）在请求周期内就地处理，
/// 不会出现在这里；这里只有会阻止收集器进入监听状态、或让服务任务异常结束的错误。
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to read config `{}`: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config `{}`: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("tls credentials unavailable: {0}")]
    Credential(#[from] CredentialError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("collector task terminated abnormally: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CollectorError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigRead { .. } => "lineage.collector.config_read",
            Self::ConfigParse { .. } => "lineage.collector.config_invalid",
            Self::Credential(inner) => inner.code(),
            Self::Bind { .. } => "lineage.collector.bind_failed",
            Self::Task(_) => "lineage.collector.task_failed",
        }
    }
}
