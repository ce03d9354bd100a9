#![deny(unsafe_code)]
#![doc = r#"
# lineage-core

## 设计动机（Why）
- **定位**：描述血缘事件（lineage event）在收集器与生产者之间流转时的数据形态，
  并提供收集器所需的“宽松解析”语义；
- **架构角色**：位于依赖图最底层，`lineage-collector` 用它解析请求体并渲染摘要，
  `lineage-producer` 用它构造出站事件；
- **设计理念**：缺失或畸形的可选字段在解析时一次性降级为默认值（`"unknown"`），
  之后的代码不再需要判空。

## 核心契约（What）
- [`LineageEvent::parse`]：任意字节序列 → 结构化事件或 [`ParseError`]；只有语法错误
  （含空请求体）才会失败；
- [`EventSummary`]：面向人类的展示投影，`Display` 输出固定格式的多行摘要；
- [`wire`]：201/400/404 三种响应体，以及使用 `": "` / `", "` 分隔符的 JSON 渲染；
- [`RunEvent`]：生产者侧的出站事件构造器，序列化为 camelCase 线上格式。

## 风险与考量（Trade-offs）
- 解析不做任何语义校验（例如时间戳格式），调用方若需要严格校验应自行追加；
- 顶层合法但非对象的 JSON（例如数组）同样被接受，所有字段按默认值展示。
"#]

mod error;
mod event;
mod run_event;
mod summary;
pub mod wire;

pub use error::ParseError;
pub use event::{Dataset, EventType, JobRef, LineageEvent, UNKNOWN};
pub use run_event::{DEFAULT_PRODUCER, RunEvent, RunEventBuilder, RunRef, SCHEMA_URL};
pub use summary::{EventSummary, SEPARATOR};
pub use wire::LINEAGE_PATH;
