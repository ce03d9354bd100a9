use thiserror::Error;

/// 请求体无法解析为结构化文档时返回的错误。
///
/// # 教案式说明
/// - **意图（Why）**：收集器需要把底层语法诊断原样回传给调用方（400 响应体的 `message`
///   字段），同时在日志中给出稳定的错误码；
/// - **契约（What）**：
///   - `message` 为 `serde_json` 给出的诊断文本，保证非空；
///   - `line`/`column` 为出错位置（从 1 开始；空请求体时列号为 0）；
///   - [`Self::code`] 恒为 `lineage.event.invalid_json`；
/// - **风险（Trade-offs）**：保存 `String` 而非 `serde_json::Error`，牺牲一次分配换取
///   `Clone + Eq`，便于在测试中直接比较。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    message: String,
    line: usize,
    column: usize,
}

impl ParseError {
    pub const CODE: &'static str = "lineage.event.invalid_json";

    /// 稳定错误码，供日志与告警聚合使用。
    pub fn code(&self) -> &'static str {
        Self::CODE
    }

    /// 语法诊断文本。
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(error: serde_json::Error) -> Self {
        Self {
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        }
    }
}
