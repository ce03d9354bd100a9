use std::{error::Error as StdError, io, path::PathBuf};

use thiserror::Error;

/// 生产者侧的网络/TLS 失败。
///
/// # 教案式说明
/// - **意图（Why）**：调用方（演示作业、验证步骤）需要区分“连不上”“超时”“证书不被信任”，
///   以便在日志里给出可操作的提示；但无论哪种，都只是记录后继续，不中断作业；
/// - **契约（What）**：
///   - `Connect`/`Timeout`/`Tls`/`Request` 来自网络层，[`post_event`](crate::post_event)
///     与 [`HttpTransport::emit`](crate::HttpTransport::emit) 均可能返回；
///   - `UnexpectedStatus` 只由 `emit` 返回，`post_event` 把任何状态码都视为成功往返；
///   - `code()` 为稳定的机器可读标识；
/// - **分类方式（How）**：`reqwest` 自带超时/连接判定；TLS 失败需沿错误链向下查找
///   `rustls::Error`，它通常藏在 `io::Error` 的内部错误里。
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid request to `{url}`: {source}")]
    Build {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not connect to `{url}`: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("timed out waiting for `{url}`")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("tls handshake with `{url}` failed: {source}")]
    Tls {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to `{url}` failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("`{url}` answered {status}: {body}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ConnectionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Build { .. } => "lineage.producer.invalid_request",
            Self::Connect { .. } => "lineage.producer.connect_failed",
            Self::Timeout { .. } => "lineage.producer.timeout",
            Self::Tls { .. } => "lineage.producer.tls_failed",
            Self::Request { .. } => "lineage.producer.request_failed",
            Self::UnexpectedStatus { .. } => "lineage.producer.unexpected_status",
            Self::Serialize(_) => "lineage.producer.serialize_failed",
        }
    }

    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        let url = url.to_owned();
        if source.is_builder() {
            Self::Build { url, source }
        } else if source.is_timeout() {
            Self::Timeout { url, source }
        } else if caused_by_tls(&source) {
            Self::Tls { url, source }
        } else if source.is_connect() {
            Self::Connect { url, source }
        } else {
            Self::Request { url, source }
        }
    }
}

fn caused_by_tls(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(error) = current {
        if error.is::<rustls::Error>() {
            return true;
        }
        // io::Error::source 跳过了自身包裹的错误，需要经 get_ref 逐层取出；
        // hyper-util 会把 rustls 错误包在两层 io::Error 里。
        current = match error.downcast_ref::<io::Error>() {
            Some(io_error) => io_error
                .get_ref()
                .map(|inner| inner as &(dyn StdError + 'static)),
            None => error.source(),
        };
    }
    false
}

/// 演示作业自身的失败。网络失败不在此列，它们只记录日志。
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to write summary to `{}`: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read job config `{}`: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid job config `{}`: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Transport(#[from] ConnectionError),
}

impl JobError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Write { .. } => "lineage.job.write_failed",
            Self::ConfigRead { .. } => "lineage.job.config_read",
            Self::ConfigParse { .. } => "lineage.job.config_invalid",
            Self::Transport(inner) => inner.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] io::Error);

    #[test]
    fn finds_rustls_error_inside_io_error() {
        let inner = io::Error::new(
            io::ErrorKind::InvalidData,
            rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer),
        );
        assert!(caused_by_tls(&Outer(inner)));
    }

    #[test]
    fn finds_rustls_error_behind_nested_io_errors() {
        let handshake = io::Error::new(
            io::ErrorKind::InvalidData,
            rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer),
        );
        let connect = io::Error::new(io::ErrorKind::Other, handshake);
        assert!(caused_by_tls(&Outer(connect)));
    }

    #[test]
    fn nested_io_errors_without_rustls_are_not_tls() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        let connect = io::Error::new(io::ErrorKind::Other, refused);
        assert!(!caused_by_tls(&Outer(connect)));
    }

    #[test]
    fn plain_io_failure_is_not_tls() {
        let inner = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert!(!caused_by_tls(&Outer(inner)));
    }

    #[test]
    fn status_errors_have_stable_code() {
        let err = ConnectionError::UnexpectedStatus {
            url: "http://127.0.0.1/x".into(),
            status: 404,
            body: String::new(),
        };
        assert_eq!(err.code(), "lineage.producer.unexpected_status");
        assert!(err.to_string().contains("404"));
    }
}
