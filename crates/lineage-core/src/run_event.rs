use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{Dataset, EventType, JobRef};

/// 生产者未显式指定时使用的 `producer` 标识。
pub const DEFAULT_PRODUCER: &str = "https://github.com/lineage-harness/lineage-producer";

pub const SCHEMA_URL: &str = "https://openlineage.io/spec/2-0-2/OpenLineage.json#/$defs/RunEvent";

/// 生产者发出的运行事件（线上格式）。
///
/// # 教案式说明
/// - **意图（Why）**：与收集器侧宽松的 [`crate::LineageEvent`] 相对，出站事件字段齐全、
///   类型确定，序列化结果即为线上 JSON；
/// - **契约（What）**：字段名为 camelCase；`inputs`/`outputs` 始终输出（可能为空数组）；
/// - **构造方式（How）**：经由 [`RunEvent::builder`]，未设置的 `runId` 取随机 UUID v4，
///   `eventTime` 取当前 UTC 时刻（毫秒精度）。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub event_type: EventType,
    pub event_time: String,
    pub run: RunRef,
    pub job: JobRef,
    pub inputs: Vec<Dataset>,
    pub outputs: Vec<Dataset>,
    pub producer: String,
    #[serde(rename = "schemaURL")]
    pub schema_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRef {
    pub run_id: String,
}

impl RunEvent {
    pub fn builder(
        event_type: EventType,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> RunEventBuilder {
        RunEventBuilder {
            event_type,
            job: JobRef::new(namespace, name),
            run_id: None,
            event_time: None,
            producer: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

/// [`RunEvent`] 的建造器。
#[derive(Clone, Debug)]
pub struct RunEventBuilder {
    event_type: EventType,
    job: JobRef,
    run_id: Option<String>,
    event_time: Option<String>,
    producer: Option<String>,
    inputs: Vec<Dataset>,
    outputs: Vec<Dataset>,
}

impl RunEventBuilder {
    /// 同一次运行的 START/COMPLETE 事件应共用同一个 `run_id`。
    pub fn run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn event_time(mut self, event_time: impl Into<String>) -> Self {
        self.event_time = Some(event_time.into());
        self
    }

    pub fn producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }

    pub fn input(mut self, dataset: Dataset) -> Self {
        self.inputs.push(dataset);
        self
    }

    pub fn output(mut self, dataset: Dataset) -> Self {
        self.outputs.push(dataset);
        self
    }

    pub fn build(self) -> RunEvent {
        RunEvent {
            event_type: self.event_type,
            event_time: self
                .event_time
                .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            run: RunRef {
                run_id: self.run_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            },
            job: self.job,
            inputs: self.inputs,
            outputs: self.outputs,
            producer: self
                .producer
                .unwrap_or_else(|| DEFAULT_PRODUCER.to_owned()),
            schema_url: SCHEMA_URL.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::LineageEvent;

    #[test]
    fn serializes_to_camel_case_wire_format() {
        let event = RunEvent::builder(EventType::Start, "test", "glue-test-job")
            .run_id("test-run-123")
            .event_time("2025-08-14T19:00:00.000Z")
            .producer("urn:test")
            .input(Dataset::new("memory", "employees"))
            .build();

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "eventType": "START",
                "eventTime": "2025-08-14T19:00:00.000Z",
                "run": {"runId": "test-run-123"},
                "job": {"namespace": "test", "name": "glue-test-job"},
                "inputs": [{"namespace": "memory", "name": "employees"}],
                "outputs": [],
                "producer": "urn:test",
                "schemaURL": SCHEMA_URL,
            })
        );
    }

    #[test]
    fn defaults_generate_distinct_run_ids() {
        let first = RunEvent::builder(EventType::Start, "ns", "job").build();
        let second = RunEvent::builder(EventType::Start, "ns", "job").build();
        assert_ne!(first.run.run_id, second.run.run_id);
        assert_eq!(first.producer, DEFAULT_PRODUCER);
        assert!(first.event_time.ends_with('Z'));
    }

    #[test]
    fn collector_reads_back_what_producer_wrote() {
        let outgoing = RunEvent::builder(EventType::Complete, "glue", "summary")
            .output(Dataset::new("file", "/tmp/out"))
            .build();
        let raw = serde_json::to_vec(&outgoing).unwrap();

        let received = LineageEvent::parse(&raw).unwrap();
        assert_eq!(received.event_type, EventType::Complete);
        assert_eq!(received.run_id, outgoing.run.run_id);
        assert_eq!(received.outputs.map(|o| o.len()), Some(1));
    }
}
