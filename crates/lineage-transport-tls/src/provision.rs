use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, PKCS_ECDSA_P384_SHA384};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::CredentialError;

pub const DEFAULT_CERT_FILE: &str = "cert.pem";
pub const DEFAULT_KEY_FILE: &str = "key.pem";

const SUBJECT_ALT_NAMES: [&str; 2] = ["localhost", "127.0.0.1"];
const VALIDITY: Duration = Duration::days(1);
const CLOCK_SKEW: Duration = Duration::minutes(1);

/// 证书与私钥的落盘位置。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificatePaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl CertificatePaths {
    pub fn new(cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
        }
    }

    /// 以 `dir/cert.pem` 与 `dir/key.pem` 构造路径对。
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(DEFAULT_CERT_FILE), dir.join(DEFAULT_KEY_FILE))
    }
}

impl Default for CertificatePaths {
    fn default() -> Self {
        Self::new(DEFAULT_CERT_FILE, DEFAULT_KEY_FILE)
    }
}

/// 证书来源：本次新生成，或复用磁盘上已有文件。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CertificateOrigin {
    Generated,
    Reused,
}

/// 供 [`crate::server_config`] 使用的 PEM 凭据。
#[derive(Clone, Debug)]
pub struct CertificateMaterial {
    pub paths: CertificatePaths,
    pub cert_pem: String,
    pub key_pem: String,
    pub origin: CertificateOrigin,
}

/// 确保证书/私钥存在，返回其 PEM 内容。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 收集器的 TLS 变体需要一对自签名凭据；首次启动时自动生成，后续启动（或同一进程内的
///   重复调用）直接复用，避免无意义的重新签发。
///
/// ## 逻辑（How）
/// 1. 以证书文件是否存在作为唯一判据：存在则读取证书与私钥并返回 [`CertificateOrigin::Reused`]；
/// 2. 不存在则生成 ECDSA P-384 密钥（安全强度高于 RSA-4096），签发主题为
///    `C=US, ST=Test, L=Test, O=Test, CN=localhost` 的自签名证书，SAN 覆盖 `localhost` 与
///    `127.0.0.1`，有效期为当前时刻前后 `[-1min, +1day]`；
/// 3. 先写私钥再写证书，保证“证书存在”蕴含“私钥已写完”。
///
/// ## 契约（What）
/// - **前置条件**：路径所在目录可写；
/// - **后置条件**：成功返回时两份文件都已落盘，且返回内容与文件内容一致；
/// - **错误**：任何生成或 I/O 失败返回 [`CredentialError`]，调用方不得在此情况下启动 TLS 监听。
///
/// ## 风险与权衡（Trade-offs）
/// - 复用路径不检查有效期，也不校验证书与私钥是否匹配；不匹配会在
///   [`crate::server_config`] 阶段以 [`CredentialError::Config`] 暴露。
pub fn ensure_certificate(paths: &CertificatePaths) -> Result<CertificateMaterial, CredentialError> {
    if paths.cert.exists() {
        let cert_pem = read_pem(&paths.cert)?;
        let key_pem = read_pem(&paths.key)?;
        info!(cert = %paths.cert.display(), "reusing existing self-signed certificate");
        return Ok(CertificateMaterial {
            paths: paths.clone(),
            cert_pem,
            key_pem,
            origin: CertificateOrigin::Reused,
        });
    }

    let (cert_pem, key_pem) = generate_self_signed()?;
    write_private(&paths.key, key_pem.as_bytes())?;
    fs::write(&paths.cert, cert_pem.as_bytes()).map_err(|source| CredentialError::Write {
        path: paths.cert.clone(),
        source,
    })?;
    info!(
        cert = %paths.cert.display(),
        key = %paths.key.display(),
        "generated self-signed certificate"
    );

    Ok(CertificateMaterial {
        paths: paths.clone(),
        cert_pem,
        key_pem,
        origin: CertificateOrigin::Generated,
    })
}

/// 尽力删除证书与私钥。缺失文件静默跳过，其他错误只记录日志。
pub fn remove_certificate_files(paths: &CertificatePaths) {
    for path in [&paths.cert, &paths.key] {
        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed credential file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %path.display(), error = %err, "failed to remove credential file"),
        }
    }
}

fn generate_self_signed() -> Result<(String, String), CredentialError> {
    let mut params = CertificateParams::new(
        SUBJECT_ALT_NAMES
            .iter()
            .map(|name| (*name).to_owned())
            .collect::<Vec<_>>(),
    )?;

    let mut dn = DistinguishedName::new();
    dn.push(DnType::CountryName, "US");
    dn.push(DnType::StateOrProvinceName, "Test");
    dn.push(DnType::LocalityName, "Test");
    dn.push(DnType::OrganizationName, "Test");
    dn.push(DnType::CommonName, "localhost");
    params.distinguished_name = dn;

    let now = OffsetDateTime::now_utc();
    params.not_before = now - CLOCK_SKEW;
    params.not_after = now + VALIDITY;

    let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384)?;
    let certificate = params.self_signed(&key_pair)?;
    Ok((certificate.pem(), key_pair.serialize_pem()))
}

fn read_pem(path: &Path) -> Result<String, CredentialError> {
    fs::read_to_string(path).map_err(|source| CredentialError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write_private(path: &Path, contents: &[u8]) -> Result<(), CredentialError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
        .open(path)
        .and_then(|mut file| file.write_all(contents))
        .map_err(|source| CredentialError::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_pair_is_pem_encoded() {
        let (cert, key) = generate_self_signed().expect("生成自签名证书");
        assert!(cert.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(key.contains("PRIVATE KEY-----"));
    }

    #[test]
    fn in_dir_uses_default_file_names() {
        let paths = CertificatePaths::in_dir("/tmp/x");
        assert_eq!(paths.cert, PathBuf::from("/tmp/x/cert.pem"));
        assert_eq!(paths.key, PathBuf::from("/tmp/x/key.pem"));
    }

    #[test]
    fn removing_missing_files_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        remove_certificate_files(&CertificatePaths::in_dir(dir.path()));
    }
}
