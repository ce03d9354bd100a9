#![deny(unsafe_code)]
#![doc = r#"
# lineage-producer

## 教案目的（Why）
- 演示一个数据作业如何把血缘事件投递到收集器，并验证它在自签名 HTTPS 端点上
  依旧能完成握手；
- 投递失败对作业而言是“可观测但不致命”的副作用。

## 模块职责（What）
- [`config`]：`http-insecure` 传输配置与作业配置（TOML）；
- [`transport`]：[`HttpTransport`]（2xx 以外视为失败）与仅写日志的 [`ConsoleTransport`]；
- [`client`]：单次往返的 [`post_event`] 与不会失败的 [`verify_endpoint`]；
- [`pipeline`]：员工样例数据、过滤、按角色聚合与 CSV 写出；
- [`job`]：把以上步骤串成一次带 START/COMPLETE 事件的作业运行。

## 风险与权衡（Trade-offs）
- `insecure` 只跳过本 crate 自建客户端的证书校验，不影响进程内其他 TLS 客户端；
- 作业不做重试：事件丢失只体现在报告的失败计数里。
"#]

pub mod client;
pub mod config;
mod error;
pub mod job;
pub mod pipeline;
pub mod transport;

pub use client::{post_event, verification_event, verify_endpoint};
pub use config::{InsecureHttpConfig, JobConfig, TransportConfig};
pub use error::{ConnectionError, JobError};
pub use job::{JobOptions, JobReport, VerifyTarget, run_job};
pub use reqwest::StatusCode;
pub use transport::{ConsoleTransport, HttpTransport, Transport};
