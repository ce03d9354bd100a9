//! `lineage-job`：上报血缘事件的演示数据作业。
//!
//! # 使用方式（How）
//! - `lineage-job --JOB_NAME demo`：事件只写日志，结果登记到默认的远端路径；
//! - `lineage-job --JOB_NAME demo --lineage-url https://127.0.0.1:8443/api/v1/lineage --insecure`：
//!   经 `http-insecure` 传输投递到自签名收集器，并在收尾时做一次验证调用；
//! - `--config job.toml` 读取作业配置，其余参数覆盖文件中的同名字段。
//!
//! # 契约（What）
//! - 数据与结果打印到标准输出，运行日志写标准错误；
//! - 血缘投递与验证调用失败不影响退出码，仅结果写出失败以非零状态退出。

use std::{io, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use lineage_producer::{
    InsecureHttpConfig, JobConfig, JobOptions, JobReport, Transport, TransportConfig,
    VerifyTarget, pipeline::OutputLocation, run_job,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lineage-job", version, about = "Demo data job that reports lineage events")]
struct Cli {
    /// Job name reported in every lineage event
    #[arg(long = "JOB_NAME", value_name = "NAME")]
    job_name: String,

    /// TOML job configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Collector endpoint; selects the http-insecure transport
    #[arg(long, value_name = "URL")]
    lineage_url: Option<String>,

    /// Skip certificate verification for the lineage endpoint
    #[arg(long)]
    insecure: bool,

    /// Job namespace
    #[arg(long)]
    namespace: Option<String>,

    /// Where the role summary is written (local directory or s3://...)
    #[arg(long, value_name = "PATH")]
    output_path: Option<String>,

    /// Endpoint for the final reachability check
    #[arg(long, value_name = "URL")]
    verify_url: Option<String>,
}

impl Cli {
    fn into_options(self) -> anyhow::Result<JobOptions> {
        let mut config = match &self.config {
            Some(path) => JobConfig::from_file(path)?,
            None => JobConfig::default(),
        };
        if let Some(url) = self.lineage_url {
            config.transport =
                TransportConfig::HttpInsecure(InsecureHttpConfig::new(url).with_insecure(self.insecure));
            config.verify_insecure = self.insecure;
        }
        if let Some(namespace) = self.namespace {
            config.namespace = namespace;
        }
        if let Some(output_path) = self.output_path {
            config.output_path = output_path;
        }
        if let Some(verify_url) = self.verify_url {
            config.verify_url = Some(verify_url);
        }

        let transport = Transport::from_config(&config.transport)
            .context("failed to build lineage transport")?;
        let verify = config.verification_url().map(|url| VerifyTarget {
            url: url.to_owned(),
            insecure: config.verify_insecure,
        });
        Ok(JobOptions {
            job_name: self.job_name,
            namespace: config.namespace,
            output: OutputLocation::parse(&config.output_path),
            transport,
            verify,
        })
    }
}

fn print_report(report: &JobReport) {
    println!("Sample data:");
    for row in &report.input {
        println!("  {:<8} {:>3}  {}", row.name, row.age, row.role);
    }
    println!("Filtered data (age > 26):");
    for row in &report.filtered {
        println!("  {:<8} {:>3}  {}", row.name, row.age, row.role);
    }
    println!("Summary by role:");
    for row in &report.summary {
        println!("  {:<10} count={} avg_age={:.1}", row.role, row.count, row.avg_age);
    }
    match &report.written_to {
        Some(path) => println!("Data written to: {}", path.display()),
        None => println!(
            "Data registered at: {}/{}",
            report.output.namespace, report.output.name
        ),
    }
    if let Some((status, body)) = &report.verification {
        println!("Test lineage call status: {}", status.as_u16());
        println!("Response: {body}");
    }
    println!(
        "Job completed: run {} ({} event(s) delivered, {} failed)",
        report.run_id, report.events_delivered, report.events_failed
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let options = Cli::parse().into_options()?;
    let report = run_job(&options).await.context("lineage demo job failed")?;
    print_report(&report);
    Ok(())
}
