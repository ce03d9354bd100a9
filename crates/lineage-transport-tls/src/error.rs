use std::{io, path::PathBuf, time::Duration};

use rustls::{AlertDescription, Error as RustlsError};
use thiserror::Error;

/// 凭据供给阶段的错误。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - TLS 模式下收集器必须持有有效凭据才能进入监听状态，所有失败路径都在此集中归类，
///   由收集器在启动阶段整体视为致命错误；
/// - 每个变体携带稳定错误码（[`Self::code`]），与日志字段 `error.code` 对齐。
///
/// ## 契约（What）
/// - `Generate`：`rcgen` 生成密钥或签发证书失败；
/// - `Write`/`Read`：证书或私钥文件 I/O 失败，`path` 指向出错文件；
/// - `Pem`：文件内容不是合法 PEM；`EmptyChain`：证书文件中没有任何证书块；
/// - `Config`：`rustls` 拒绝证书/私钥组合（例如私钥与证书不匹配）。
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to generate self-signed certificate: {0}")]
    Generate(#[from] rcgen::Error),

    #[error("failed to write `{}`: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{}` is not valid PEM: {source}", path.display())]
    Pem {
        path: PathBuf,
        #[source]
        source: rustls_pki_types::pem::Error,
    },

    #[error("`{}` contains no certificate", path.display())]
    EmptyChain { path: PathBuf },

    #[error("rejected certificate/key pair: {0}")]
    Config(#[from] RustlsError),
}

impl CredentialError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Generate(_) => "lineage.tls.generate_failed",
            Self::Write { .. } => "lineage.tls.write_failed",
            Self::Read { .. } => "lineage.tls.read_failed",
            Self::Pem { .. } => "lineage.tls.invalid_pem",
            Self::EmptyChain { .. } => "lineage.tls.empty_chain",
            Self::Config(_) => "lineage.tls.config_rejected",
        }
    }
}

/// 握手失败的粗粒度分类，决定收集器记录日志的级别。
///
/// - `Authentication`：对端因证书不受信任等原因中止握手，自签名场景下属预期行为；
/// - `Integrity`：报文畸形、协议违规等；
/// - `Transient`：连接被重置、超时等瞬时故障。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeClass {
    Authentication,
    Integrity,
    Transient,
}

/// 单个连接的 TLS 握手失败。
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("tls handshake: {0}")]
    Io(#[source] io::Error),

    #[error("tls handshake timed out after {0:?}")]
    TimedOut(Duration),
}

impl HandshakeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "lineage.tls.handshake_failed",
            Self::TimedOut(_) => "lineage.tls.handshake_timeout",
        }
    }

    pub fn class(&self) -> HandshakeClass {
        match self {
            Self::Io(error) => categorize_with_rustls(error),
            Self::TimedOut(_) => HandshakeClass::Transient,
        }
    }
}

fn categorize_with_rustls(error: &io::Error) -> HandshakeClass {
    if let Some(source) = error.get_ref()
        && let Some(rustls_error) = source.downcast_ref::<RustlsError>()
    {
        return categorize_rustls_error(rustls_error);
    }
    HandshakeClass::Transient
}

fn categorize_rustls_error(error: &RustlsError) -> HandshakeClass {
    use RustlsError::*;
    match error {
        NoCertificatesPresented | InvalidCertificate(_) | UnsupportedNameType => {
            HandshakeClass::Authentication
        }
        AlertReceived(alert) => alert_to_class(alert),
        InappropriateMessage { .. }
        | InappropriateHandshakeMessage { .. }
        | InvalidMessage(_)
        | PeerMisbehaved(_)
        | PeerIncompatible(_)
        | DecryptError
        | PeerSentOversizedRecord
        | NoApplicationProtocol => HandshakeClass::Integrity,
        _ => HandshakeClass::Transient,
    }
}

fn alert_to_class(alert: &AlertDescription) -> HandshakeClass {
    use AlertDescription::*;
    match alert {
        BadCertificate
        | UnsupportedCertificate
        | CertificateRevoked
        | CertificateExpired
        | CertificateUnknown
        | UnknownCA
        | AccessDenied => HandshakeClass::Authentication,
        CloseNotify | UserCanceled => HandshakeClass::Transient,
        _ => HandshakeClass::Integrity,
    }
}
