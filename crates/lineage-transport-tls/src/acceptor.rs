use std::{sync::Arc, time::Duration};

use rustls::ServerConfig;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    time::timeout,
};
use tokio_rustls::{TlsAcceptor as TokioTlsAcceptor, server::TlsStream};

use crate::HandshakeError;

/// 客户端连上后迟迟不发 ClientHello 时的握手上限。
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// TLS 服务端握手入口。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 在 TCP 层接受连接后执行握手，为上层 HTTP 服务提供加密流；
/// - 握手必须有上限：收集器停机时会等待在途连接，卡在握手里的连接不能无限拖延停机。
///
/// ## 逻辑（How）
/// 1. 持有 `Arc<ServerConfig>` 构造的 `tokio_rustls::TlsAcceptor`，克隆开销仅为引用计数；
/// 2. `accept` 以 `tokio::time::timeout` 包裹异步握手，超时返回 [`HandshakeError::TimedOut`]；
/// 3. 其余失败包装为 [`HandshakeError::Io`]，由 [`HandshakeError::class`] 细分原因。
///
/// ## 契约（What）
/// - `accept`：成功时返回可直接读写明文的 [`TlsStream`]；
/// - 握手失败只影响当前连接，调用方应记录日志后丢弃该连接。
#[derive(Clone)]
pub struct TlsAcceptor {
    inner: TokioTlsAcceptor,
    handshake_timeout: Duration,
}

impl TlsAcceptor {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self {
            inner: TokioTlsAcceptor::from(config),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    /// 对单个连接执行 TLS 握手。
    pub async fn accept<IO>(&self, stream: IO) -> Result<TlsStream<IO>, HandshakeError>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        match timeout(self.handshake_timeout, self.inner.accept(stream)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(err)) => Err(HandshakeError::Io(err)),
            Err(_) => Err(HandshakeError::TimedOut(self.handshake_timeout)),
        }
    }
}

impl std::fmt::Debug for TlsAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsAcceptor")
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}
