//! `lineage-collector`：本地血缘事件收集器的命令行入口。
//!
//! # 使用方式（How）
//! - `lineage-collector`：明文 HTTP，监听 `0.0.0.0:8080`；
//! - `lineage-collector 9000`：明文 HTTP，监听 9000；
//! - `lineage-collector --tls`：自签名 HTTPS，监听 8443，证书写入当前目录；
//! - `--config collector.toml` 加载 TOML 配置，其余命令行参数覆盖文件中的同名字段。
//!
//! # 契约（What）
//! - 事件摘要写标准输出，运行日志写标准错误，级别由 `RUST_LOG` 控制（默认 `info`）；
//! - Ctrl-C 或 SIGTERM 触发优雅停机，TLS 模式下停机后证书与私钥已被删除；
//! - 启动失败（证书、绑定）以非零状态码退出。

use std::{io, net::IpAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use lineage_collector::{
    CollectorConfig, CollectorServer, StdoutSink, TransportMode, signal::terminated,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lineage-collector", version, about = "Local collector for lineage events")]
struct Cli {
    /// Port to listen on (defaults to 8080, or 8443 with --tls)
    port: Option<u16>,

    /// Serve HTTPS with a self-signed certificate
    #[arg(long)]
    tls: bool,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, value_name = "ADDR")]
    host: Option<IpAddr>,

    /// Certificate path used in TLS mode
    #[arg(long, value_name = "FILE")]
    cert: Option<PathBuf>,

    /// Private key path used in TLS mode
    #[arg(long, value_name = "FILE")]
    key: Option<PathBuf>,

    /// Leave certificate files on disk after shutdown
    #[arg(long)]
    keep_certificates: bool,

    /// Upper bound for draining in-flight requests on shutdown
    #[arg(long, value_name = "MS")]
    shutdown_grace_ms: Option<u64>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<CollectorConfig> {
        let mut config = match &self.config {
            Some(path) => CollectorConfig::from_file(path)?,
            None => CollectorConfig::default(),
        };
        if self.tls {
            config.transport = TransportMode::SelfSignedTls;
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(host) = self.host {
            config.bind_host = host;
        }
        if let Some(cert) = self.cert {
            config.cert_path = cert;
        }
        if let Some(key) = self.key {
            config.key_path = key;
        }
        if self.keep_certificates {
            config.cleanup_certificates = false;
        }
        if let Some(grace) = self.shutdown_grace_ms {
            config.shutdown_grace_ms = grace;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let config = Cli::parse().into_config()?;
    let running = CollectorServer::new(config, Arc::new(StdoutSink))
        .start()
        .await
        .context("failed to start lineage collector")?;
    println!("Lineage collector accepting events at {}", running.endpoint_url());
    println!("Press Ctrl+C to stop");

    let handle = running.shutdown_handle();
    tokio::spawn(async move {
        terminated().await;
        info!("shutdown signal received");
        handle.trigger();
    });

    running.wait().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_flag_switches_default_port() {
        let config = Cli::parse_from(["lineage-collector", "--tls"]).into_config().unwrap();
        assert_eq!(config.transport, TransportMode::SelfSignedTls);
        assert_eq!(config.effective_port(), 8443);
        assert!(config.cleanup_certificates);
    }

    #[test]
    fn positional_port_and_overrides_apply() {
        let config = Cli::parse_from([
            "lineage-collector",
            "9000",
            "--host",
            "127.0.0.1",
            "--keep-certificates",
            "--shutdown-grace-ms",
            "100",
        ])
        .into_config()
        .unwrap();
        assert_eq!(config.transport, TransportMode::Plain);
        assert_eq!(config.effective_port(), 9000);
        assert_eq!(config.bind_host.to_string(), "127.0.0.1");
        assert!(!config.cleanup_certificates);
        assert_eq!(config.shutdown_grace_ms, 100);
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        assert!(Cli::try_parse_from(["lineage-collector", "eighty"]).is_err());
    }
}
