use std::fmt;

use chrono::{DateTime, Local};

use crate::LineageEvent;

/// 摘要块上下边框。
pub const SEPARATOR: &str = "============================================================";

/// 收集器为每个成功解析的事件输出的人类可读摘要。
///
/// # 教案式说明
/// - **意图（Why）**：测试夹具依赖确定性的标准输出，摘要格式需要集中定义，
///   避免散落在请求处理逻辑里；
/// - **契约（What）**：
///   - 字段取自 [`LineageEvent`]，输入/输出数据集计数仅在事件携带对应字段时出现；
///   - `received_at` 为收集器本地时间，`Display` 中以 `HH:MM:SS` 呈现；
/// - **风险（Trade-offs）**：时间戳精度只到秒，同一秒内的多个事件无法靠摘要区分先后。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventSummary {
    pub received_at: DateTime<Local>,
    pub event_type: String,
    pub job: String,
    pub run_id: String,
    pub event_time: String,
    pub producer: String,
    pub input_count: Option<usize>,
    pub output_count: Option<usize>,
}

impl EventSummary {
    /// 以当前本地时间作为接收时刻构造摘要。
    pub fn from_event(event: &LineageEvent) -> Self {
        Self::received_at(event, Local::now())
    }

    pub fn received_at(event: &LineageEvent, received_at: DateTime<Local>) -> Self {
        Self {
            received_at,
            event_type: event.event_type.to_string(),
            job: event.job.to_string(),
            run_id: event.run_id.clone(),
            event_time: event.event_time.clone(),
            producer: event.producer.clone(),
            input_count: event.inputs.as_ref().map(Vec::len),
            output_count: event.outputs.as_ref().map(Vec::len),
        }
    }
}

impl fmt::Display for EventSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Received lineage event at {}",
            self.received_at.format("%H:%M:%S")
        )?;
        writeln!(f, "{SEPARATOR}")?;
        writeln!(f, "Event Type: {}", self.event_type)?;
        writeln!(f, "Job: {}", self.job)?;
        writeln!(f, "Run ID: {}", self.run_id)?;
        writeln!(f, "Event Time: {}", self.event_time)?;
        writeln!(f, "Producer: {}", self.producer)?;
        if let Some(count) = self.input_count {
            writeln!(f, "Inputs: {count} dataset(s)")?;
        }
        if let Some(count) = self.output_count {
            writeln!(f, "Outputs: {count} dataset(s)")?;
        }
        write!(f, "{SEPARATOR}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2025, 8, 14, 19, 0, 1)
            .single()
            .expect("本地时区下该时刻唯一")
    }

    #[test]
    fn renders_block_without_dataset_lines_when_absent() {
        let event = LineageEvent::parse(
            br#"{"eventType":"START","job":{"namespace":"test","name":"glue-test-job"},"run":{"runId":"test-run-123"},"eventTime":"2025-08-14T19:00:00.000Z"}"#,
        )
        .unwrap();
        let rendered = EventSummary::received_at(&event, fixed_time()).to_string();
        let expected = format!(
            "Received lineage event at 19:00:01\n{SEPARATOR}\nEvent Type: START\nJob: test/glue-test-job\nRun ID: test-run-123\nEvent Time: 2025-08-14T19:00:00.000Z\nProducer: unknown\n{SEPARATOR}"
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn renders_dataset_counts_including_empty_lists() {
        let event = LineageEvent::parse(br#"{"inputs": [], "outputs": [{}, {}]}"#).unwrap();
        let rendered = EventSummary::received_at(&event, fixed_time()).to_string();
        assert!(rendered.contains("Inputs: 0 dataset(s)"));
        assert!(rendered.contains("Outputs: 2 dataset(s)"));
    }
}
