#![deny(unsafe_code)]
#![doc = r#"
# lineage-collector

## 教案目的（Why）
- 为血缘事件生产者提供一个可在本地起停的接收端：事件经 `POST /api/v1/lineage` 投递，
  收集器校验 JSON、打印摘要并回以确认；
- 同一进程内既可以明文 HTTP 运行，也可以在自签名证书上运行 HTTPS，便于验证生产者的
  TLS 处理路径。

## 模块职责（What）
- [`config`]：监听地址、传输模式、证书路径与停机宽限期，支持 TOML 加载；
- [`router`]：请求路由与三种应答（201 / 400 / 404）；
- [`server`]：生命周期 `Listening → Serving → ShuttingDown → Stopped`，负责证书准备、
  接受循环、优雅停机与证书清理；
- [`sink`]：事件摘要去向（标准输出或内存）；
- [`signal`]：进程信号到停机请求的桥接。

## 使用方式（How）
```no_run
use std::sync::Arc;
use lineage_collector::{CollectorConfig, CollectorServer, StdoutSink};

# async fn demo() -> Result<(), lineage_collector::CollectorError> {
let running = CollectorServer::new(CollectorConfig::plain(0), Arc::new(StdoutSink))
    .start()
    .await?;
println!("post events to {}", running.endpoint_url());
running.shutdown().await?;
# Ok(())
# }
```
"#]

pub mod config;
mod error;
pub mod router;
pub mod server;
pub mod signal;
pub mod sink;

pub use config::{CollectorConfig, DEFAULT_PLAIN_PORT, DEFAULT_TLS_PORT, TransportMode};
pub use error::CollectorError;
pub use server::{CollectorServer, CollectorState, RunningCollector, ShutdownHandle};
pub use sink::{EventSink, MemorySink, StdoutSink};
