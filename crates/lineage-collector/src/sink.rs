use std::io::{self, Write};

use lineage_core::EventSummary;
use parking_lot::Mutex;

/// 事件摘要的去向。
///
/// # 教案式说明
/// - **意图（Why）**：摘要是收集器唯一的“业务输出”，测试夹具依赖其确定性；把输出目的地抽成
///   trait，二进制入口写标准输出，测试则收集到内存中逐条断言；
/// - **契约（What）**：`record` 在请求处理路径上同步调用，实现方不得阻塞过久，也不得 panic；
///   输出失败应自行吞掉，不影响 201 响应；
/// - **并发（How）**：多个连接任务可能并发调用，实现需 `Send + Sync`。
pub trait EventSink: Send + Sync + 'static {
    fn record(&self, summary: &EventSummary);
}

/// 把摘要块写到标准输出，每块之前空一行。
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn record(&self, summary: &EventSummary) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "\n{summary}");
        let _ = out.flush();
    }
}

/// 在内存中保存全部摘要，供嵌入方与测试读取。
#[derive(Debug, Default)]
pub struct MemorySink {
    summaries: Mutex<Vec<EventSummary>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<EventSummary> {
        self.summaries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.summaries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.lock().is_empty()
    }
}

impl EventSink for MemorySink {
    fn record(&self, summary: &EventSummary) {
        self.summaries.lock().push(summary.clone());
    }
}
