use std::path::PathBuf;

use lineage_core::{Dataset, EventType, RunEvent};
use reqwest::StatusCode;
use tracing::{info, warn};

use crate::{
    JobError, Transport, verify_endpoint,
    pipeline::{self, Employee, OutputLocation, RoleSummary},
};

/// 一次演示作业运行所需的全部输入。
#[derive(Clone, Debug)]
pub struct JobOptions {
    pub job_name: String,
    pub namespace: String,
    pub output: OutputLocation,
    pub transport: Transport,
    pub verify: Option<VerifyTarget>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyTarget {
    pub url: String,
    pub insecure: bool,
}

/// 作业运行结果，供二进制入口打印。
#[derive(Clone, Debug)]
pub struct JobReport {
    pub run_id: String,
    pub input: Vec<Employee>,
    pub filtered: Vec<Employee>,
    pub summary: Vec<RoleSummary>,
    pub output: Dataset,
    pub written_to: Option<PathBuf>,
    pub events_delivered: usize,
    pub events_failed: usize,
    pub verification: Option<(StatusCode, String)>,
}

/// 运行演示作业。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 模拟一个“顺带上报血缘”的数据作业：真正的工作是过滤与聚合，血缘事件只是副作用，
///   收集器不可达不应让作业失败。
///
/// ## 逻辑（How）
/// 1. 生成运行 ID，发出 `START`（输入数据集为内存中的员工表）；
/// 2. 过滤 `age > 26` 的行，并对全量数据按角色统计人数与平均年龄；
/// 3. 写出汇总：本地目录落盘为 CSV，远端路径仅登记；
/// 4. 成功则发出 `COMPLETE`（携带输入与输出数据集），写出失败则发出 `FAIL` 并返回错误；
/// 5. 若配置了验证地址，发送一次固定的验证事件。
///
/// ## 契约（What）
/// - 事件投递失败只计数并记录警告，不改变返回值；
/// - 仅写出失败会令作业返回 [`JobError`]。
pub async fn run_job(options: &JobOptions) -> Result<JobReport, JobError> {
    let input = Dataset::new("memory", "employees");
    let output = options.output.dataset();
    let mut delivery = Delivery::default();

    let start = RunEvent::builder(EventType::Start, &options.namespace, &options.job_name)
        .input(input.clone())
        .build();
    let run_id = start.run.run_id.clone();
    info!(
        job = %options.job_name,
        run_id = %run_id,
        transport = options.transport.kind(),
        "starting lineage demo job"
    );
    delivery.emit(&options.transport, &start).await;

    let rows = pipeline::sample_employees();
    let filtered = pipeline::older_than(&rows, 26);
    let summary = pipeline::summarize_by_role(&rows);

    let written_to = match pipeline::write_summary(&options.output, &summary) {
        Ok(written_to) => written_to,
        Err(err) => {
            warn!(code = err.code(), error = %err, "failed to write job output");
            let fail = RunEvent::builder(EventType::Fail, &options.namespace, &options.job_name)
                .run_id(&run_id)
                .input(input)
                .build();
            delivery.emit(&options.transport, &fail).await;
            return Err(err);
        }
    };

    let complete = RunEvent::builder(EventType::Complete, &options.namespace, &options.job_name)
        .run_id(&run_id)
        .input(input)
        .output(output.clone())
        .build();
    delivery.emit(&options.transport, &complete).await;

    let verification = match &options.verify {
        Some(target) => verify_endpoint(&target.url, target.insecure).await,
        None => None,
    };

    info!(
        job = %options.job_name,
        run_id = %run_id,
        delivered = delivery.delivered,
        failed = delivery.failed,
        "lineage demo job completed"
    );
    Ok(JobReport {
        run_id,
        input: rows,
        filtered,
        summary,
        output,
        written_to,
        events_delivered: delivery.delivered,
        events_failed: delivery.failed,
        verification,
    })
}

#[derive(Default)]
struct Delivery {
    delivered: usize,
    failed: usize,
}

impl Delivery {
    async fn emit(&mut self, transport: &Transport, event: &RunEvent) {
        match transport.emit(event).await {
            Ok(()) => self.delivered += 1,
            Err(err) => {
                self.failed += 1;
                warn!(
                    event_type = %event.event_type,
                    code = err.code(),
                    error = %err,
                    "failed to deliver lineage event"
                );
            }
        }
    }
}
