use std::sync::Arc;

use rustls::{
    ServerConfig,
    crypto::aws_lc_rs,
    pki_types::{CertificateDer, PrivateKeyDer, pem::PemObject},
};

use crate::{CertificateMaterial, CredentialError};

/// 由 PEM 凭据构建服务端 TLS 配置。
///
/// - 显式使用 AWS-LC 加密提供者，不依赖进程级默认提供者，同进程内存在其他 `rustls`
///   使用方（例如 HTTP 客户端）时也不会冲突；
/// - 不要求客户端证书；ALPN 只声明 `http/1.1`。
pub fn server_config(material: &CertificateMaterial) -> Result<Arc<ServerConfig>, CredentialError> {
    let chain = CertificateDer::pem_slice_iter(material.cert_pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| CredentialError::Pem {
            path: material.paths.cert.clone(),
            source,
        })?;
    if chain.is_empty() {
        return Err(CredentialError::EmptyChain {
            path: material.paths.cert.clone(),
        });
    }

    let key = PrivateKeyDer::from_pem_slice(material.key_pem.as_bytes()).map_err(|source| {
        CredentialError::Pem {
            path: material.paths.key.clone(),
            source,
        }
    })?;

    let mut config = ServerConfig::builder_with_provider(Arc::new(aws_lc_rs::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(chain, key)?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}
