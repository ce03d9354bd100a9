#![deny(unsafe_code)]
#![doc = r#"
# lineage-transport-tls

## 设计动机（Why）
- **测试用加密入口**：收集器的 TLS 变体需要一对本地生成、不被任何信任库认可的证书/私钥，
  用来验证“跳过证书校验”的生产者仍能完成握手并投递事件；
- **可运维性**：凭据生成/加载失败统一归类为 [`CredentialError`]，握手失败按
  [`HandshakeClass`] 分类，便于收集器决定日志级别而不必理解 `rustls` 细节。

## 核心契约（What）
- [`ensure_certificate`]：证书文件不存在时生成 ECDSA P-384 自签名证书（有效期 1 天），
  已存在则原样复用；同一进程内重复调用不会重新生成；
- [`remove_certificate_files`]：尽力删除证书与私钥，缺失文件不算错误；
- [`server_config`]：以 PEM 文件内容构建 `rustls::ServerConfig`（无客户端认证，ALPN `http/1.1`）；
- [`TlsAcceptor`]：对单个 TCP 连接执行带超时的服务端握手。

## 风险与考量（Trade-offs）
- 复用已有证书时不检查有效期；过期证书会在握手阶段被严格校验的客户端拒绝，
  而跳过校验的客户端不受影响；
- 私钥以明文 PEM 落盘（Unix 下权限 0600），仅适用于测试场景。
"#]

mod acceptor;
mod config;
mod error;
mod provision;

pub use acceptor::{DEFAULT_HANDSHAKE_TIMEOUT, TlsAcceptor};
pub use config::server_config;
pub use error::{CredentialError, HandshakeClass, HandshakeError};
pub use provision::{
    CertificateMaterial, CertificateOrigin, CertificatePaths, DEFAULT_CERT_FILE, DEFAULT_KEY_FILE,
    ensure_certificate, remove_certificate_files,
};
