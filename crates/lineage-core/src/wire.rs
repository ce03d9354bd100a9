//! 收集器的线上响应体。
//!
//! 三种响应体都以强类型结构定义，由 [`to_json`] 渲染为与参考收集器一致的文本：
//! 键值之间使用 `": "`、成员之间使用 `", "`，便于测试夹具直接做子串匹配。

use std::io;

use chrono::{Local, SecondsFormat};
use serde::Serialize;
use serde_json::ser::Formatter;

use crate::ParseError;

/// 唯一受理的端点路径。
pub const LINEAGE_PATH: &str = "/api/v1/lineage";

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// 201 响应体。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
    pub status: &'static str,
    pub timestamp: String,
}

impl Acknowledgement {
    pub const STATUS_RECEIVED: &'static str = "received";

    /// 以收集器当前本地时间（ISO-8601，微秒精度，带时区偏移）构造确认体。
    pub fn now() -> Self {
        Self {
            status: Self::STATUS_RECEIVED,
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Micros, false),
        }
    }
}

/// 400 响应体。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvalidPayload {
    pub error: &'static str,
    pub message: String,
}

impl InvalidPayload {
    pub const ERROR: &'static str = "Invalid JSON";

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Self::ERROR,
            message: message.into(),
        }
    }
}

impl From<&ParseError> for InvalidPayload {
    fn from(error: &ParseError) -> Self {
        Self::new(error.message())
    }
}

/// 404 响应体。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NotFound {
    pub error: &'static str,
    pub path: String,
}

impl NotFound {
    pub const ERROR: &'static str = "Not found";

    pub fn new(path: impl Into<String>) -> Self {
        Self {
            error: Self::ERROR,
            path: path.into(),
        }
    }
}

/// 以 `": "` / `", "` 分隔符序列化任意值。
///
/// 对本模块的响应体而言序列化不会失败；返回 `Result` 只是为了不对任意 `T` 做假设。
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(96);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}
