use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::ParseError;

/// 缺失或畸形字段的统一展示值。
pub const UNKNOWN: &str = "unknown";

/// 事件所处的运行生命周期阶段。
///
/// # 教案式说明
/// - **意图（Why）**：把线上的字符串枚举映射为强类型，同时不拒绝任何未知取值；
/// - **契约（What）**：
///   - 已知取值按大写字面量识别（`START`/`RUNNING`/`COMPLETE`/`ABORT`/`FAIL`/`OTHER`）；
///   - 其他字符串保存在 [`EventType::Unrecognized`] 中原样展示；
///   - 字段缺失或不是字符串时为 [`EventType::Unknown`]，展示为 `"unknown"`；
/// - **风险（Trade-offs）**：大小写敏感，`"start"` 会落入 `Unrecognized`，与线上规范一致。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventType {
    Start,
    Running,
    Complete,
    Abort,
    Fail,
    Other,
    Unrecognized(String),
    Unknown,
}

impl EventType {
    fn from_wire(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("START") => Self::Start,
            Some("RUNNING") => Self::Running,
            Some("COMPLETE") => Self::Complete,
            Some("ABORT") => Self::Abort,
            Some("FAIL") => Self::Fail,
            Some("OTHER") => Self::Other,
            Some(other) => Self::Unrecognized(other.to_owned()),
            None => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Start => "START",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Abort => "ABORT",
            Self::Fail => "FAIL",
            Self::Other => "OTHER",
            Self::Unrecognized(raw) => raw,
            Self::Unknown => UNKNOWN,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// 作业标识：`namespace` + `name`。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobRef {
    pub namespace: String,
    pub name: String,
}

impl JobRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    fn from_wire(value: Option<&Value>) -> Self {
        let object = value.and_then(Value::as_object);
        Self {
            namespace: text_field(object, "namespace"),
            name: text_field(object, "name"),
        }
    }
}

impl fmt::Display for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// 数据集描述符。线上可能携带 facets 等更多字段，这里只保留标识部分。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub namespace: String,
    pub name: String,
}

impl Dataset {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    fn from_wire(value: &Value) -> Self {
        let object = value.as_object();
        Self {
            namespace: text_field(object, "namespace"),
            name: text_field(object, "name"),
        }
    }
}

/// 收集器视角的血缘事件：所有可选字段均已在解析时落定默认值。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 取代“对解析结果做任意属性访问”的动态写法：字段集合固定，默认值只在
///   [`LineageEvent::parse`] 中应用一次；
/// - 后续的摘要渲染、日志输出都可以直接读取字段，无需再判断缺失。
///
/// ## 契约（What）
/// - 字符串字段缺失、为 `null` 或类型不符时统一为 `"unknown"`；
/// - `inputs`/`outputs` 仅在线上字段存在且为数组时为 `Some`，空数组同样为 `Some(vec![])`；
///   数组中的非对象元素计为一个 `unknown/unknown` 数据集，保证计数与原始长度一致；
/// - `event_time` 不做格式校验，原样保存。
///
/// ## 风险与权衡（Trade-offs）
/// - 存在但不是数组的 `inputs` 被视为畸形并折叠为 `None`，展示时与缺失无异。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineageEvent {
    pub event_type: EventType,
    pub event_time: String,
    pub job: JobRef,
    pub run_id: String,
    pub producer: String,
    pub inputs: Option<Vec<Dataset>>,
    pub outputs: Option<Vec<Dataset>>,
}

impl LineageEvent {
    /// 解析请求体。
    ///
    /// - **输入**：请求体原始字节，长度由请求的 `Content-Length` 决定；
    /// - **返回**：语法合法时返回已填充默认值的事件；空请求体或语法错误返回 [`ParseError`]；
    /// - **副作用**：无。
    pub fn parse(raw: &[u8]) -> Result<Self, ParseError> {
        let document: Value = serde_json::from_slice(raw)?;
        Ok(Self::from_document(&document))
    }

    /// 从已解析的 JSON 文档构造事件；非对象文档的全部字段均为默认值。
    pub fn from_document(document: &Value) -> Self {
        let object = document.as_object();
        let field = |key: &str| object.and_then(|map| map.get(key));
        let run = field("run").and_then(Value::as_object);

        Self {
            event_type: EventType::from_wire(field("eventType")),
            event_time: text_field(object, "eventTime"),
            job: JobRef::from_wire(field("job")),
            run_id: text_field(run, "runId"),
            producer: text_field(object, "producer"),
            inputs: datasets(field("inputs")),
            outputs: datasets(field("outputs")),
        }
    }
}

fn text_field(object: Option<&Map<String, Value>>, key: &str) -> String {
    object
        .and_then(|map| map.get(key))
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN)
        .to_owned()
}

fn datasets(value: Option<&Value>) -> Option<Vec<Dataset>> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().map(Dataset::from_wire).collect())
}
