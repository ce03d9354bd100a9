//! 生产者对真实收集器的集成测试。
//!
//! # 教案式说明
//! - **Why**：“跳过校验即可投递到自签名端点”与“投递失败不影响作业”是生产者存在的理由，
//!   只能在真实的 HTTP/HTTPS 收集器上验证；
//! - **How**：在 `127.0.0.1:0` 上启动收集器并以内存去向记录摘要，TLS 凭据写入临时目录。

use std::{net::Ipv4Addr, sync::Arc};

use lineage_collector::{CollectorConfig, CollectorServer, MemorySink, RunningCollector};
use lineage_core::{Dataset, EventType, RunEvent};
use lineage_producer::{
    ConnectionError, HttpTransport, InsecureHttpConfig, JobError, JobOptions, StatusCode, Transport,
    VerifyTarget, pipeline::OutputLocation, post_event, run_job, verification_event,
    verify_endpoint,
};
use lineage_transport_tls::CertificatePaths;
use tokio::net::TcpListener;

async fn start(mut config: CollectorConfig) -> (RunningCollector, Arc<MemorySink>) {
    config.bind_host = Ipv4Addr::LOCALHOST.into();
    config.shutdown_grace_ms = 1_000;
    let sink = Arc::new(MemorySink::new());
    let running = CollectorServer::new(config, sink.clone())
        .start()
        .await
        .expect("collector starts");
    (running, sink)
}

async fn closed_port_url() -> String {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/v1/lineage")
}

fn event() -> RunEvent {
    RunEvent::builder(EventType::Start, "demo", "employee-summary")
        .input(Dataset::new("memory", "employees"))
        .build()
}

#[tokio::test(flavor = "multi_thread")]
async fn insecure_transport_delivers_to_self_signed_collector() {
    let dir = tempfile::tempdir().unwrap();
    let (running, sink) = start(CollectorConfig::self_signed_tls(0, CertificatePaths::in_dir(dir.path()))).await;

    let transport = HttpTransport::new(
        InsecureHttpConfig::new(running.endpoint_url()).with_header("x-api-key", "test"),
    )
    .unwrap();
    transport.emit(&event()).await.unwrap();

    let recorded = sink.snapshot();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].job, "demo/employee-summary");
    assert_eq!(recorded[0].input_count, Some(1));
    assert_eq!(recorded[0].output_count, Some(0));

    running.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn insecure_transport_delivers_dataset_and_job_events() {
    let dir = tempfile::tempdir().unwrap();
    let (running, sink) = start(CollectorConfig::self_signed_tls(0, CertificatePaths::in_dir(dir.path()))).await;
    let transport = HttpTransport::new(InsecureHttpConfig::new(running.endpoint_url())).unwrap();

    let dataset_event = serde_json::json!({
        "eventTime": "2025-08-14T19:00:00.000Z",
        "producer": "lineage-producer",
        "dataset": {"namespace": "memory", "name": "employees"},
    });
    let job_event = serde_json::json!({
        "eventTime": "2025-08-14T19:00:01.000Z",
        "producer": "lineage-producer",
        "job": {"namespace": "demo", "name": "employee-summary"},
    });
    transport.emit(&dataset_event).await.unwrap();
    transport.emit(&job_event).await.unwrap();

    let recorded = sink.snapshot();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].event_type, "unknown");
    assert_eq!(recorded[0].job, "unknown/unknown");
    assert_eq!(recorded[1].job, "demo/employee-summary");

    running.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn verifying_transport_reports_tls_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (running, sink) = start(CollectorConfig::self_signed_tls(0, CertificatePaths::in_dir(dir.path()))).await;

    let transport =
        HttpTransport::new(InsecureHttpConfig::new(running.endpoint_url()).with_insecure(false)).unwrap();
    let err = transport.emit(&event()).await.expect_err("untrusted certificate");
    assert!(matches!(err, ConnectionError::Tls { .. }), "{err:?}");
    assert_eq!(err.code(), "lineage.producer.tls_failed");
    assert!(sink.is_empty());

    running.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn non_success_status_fails_emit_but_not_post_event() {
    let (running, _) = start(CollectorConfig::plain(0)).await;
    let wrong_path = format!("http://{}/wrong", running.local_addr());

    let transport = HttpTransport::new(InsecureHttpConfig::new(&wrong_path)).unwrap();
    match transport.emit(&event()).await {
        Err(ConnectionError::UnexpectedStatus { status, body, .. }) => {
            assert_eq!(status, 404);
            assert!(body.contains(r#""path": "/wrong""#), "{body}");
        }
        other => panic!("expected unexpected status, got {other:?}"),
    }

    let (status, body) = post_event(&wrong_path, &event(), false).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Not found"));

    running.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn post_event_is_scoped_to_the_insecure_flag() {
    let dir = tempfile::tempdir().unwrap();
    let (running, sink) = start(CollectorConfig::self_signed_tls(0, CertificatePaths::in_dir(dir.path()))).await;
    let url = running.endpoint_url().to_owned();

    let (status, body) = post_event(&url, &verification_event(), true).await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.contains(r#""status": "received""#));

    let strict = post_event(&url, &verification_event(), false).await;
    assert!(matches!(strict, Err(ConnectionError::Tls { .. })));

    let (status, _) = post_event(&url, &verification_event(), true).await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sink.len(), 2);
    assert_eq!(sink.snapshot()[0].run_id, "test-run-123");

    running.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_endpoint_is_a_connect_error() {
    let url = closed_port_url().await;
    let err = post_event(&url, &verification_event(), false).await.expect_err("nothing listens");
    assert_eq!(err.code(), "lineage.producer.connect_failed");
    assert!(verify_endpoint(&url, true).await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn demo_job_reports_start_complete_and_verification() {
    let (running, sink) = start(CollectorConfig::plain(0)).await;
    let out = tempfile::tempdir().unwrap();
    let url = running.endpoint_url().to_owned();

    let options = JobOptions {
        job_name: "employee-summary".into(),
        namespace: "demo".into(),
        output: OutputLocation::Local(out.path().join("summary")),
        transport: Transport::Http(HttpTransport::new(InsecureHttpConfig::new(&url)).unwrap()),
        verify: Some(VerifyTarget { url, insecure: true }),
    };
    let report = run_job(&options).await.unwrap();

    assert_eq!(report.events_delivered, 2);
    assert_eq!(report.events_failed, 0);
    assert_eq!(report.filtered.len(), 3);
    assert_eq!(report.summary.len(), 4);
    assert!(report.written_to.as_ref().is_some_and(|path| path.exists()));
    assert_eq!(report.verification.as_ref().map(|(status, _)| *status), Some(StatusCode::CREATED));

    let recorded = sink.snapshot();
    let types: Vec<_> = recorded.iter().map(|summary| summary.event_type.as_str()).collect();
    assert_eq!(types, ["START", "COMPLETE", "START"]);
    assert_eq!(recorded[0].run_id, report.run_id);
    assert_eq!(recorded[1].run_id, report.run_id);
    assert_eq!(recorded[1].output_count, Some(1));
    assert_eq!(recorded[2].run_id, "test-run-123");

    running.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_write_reports_fail_for_the_same_run() {
    let (running, sink) = start(CollectorConfig::plain(0)).await;
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "a regular file").unwrap();
    let url = running.endpoint_url().to_owned();

    let options = JobOptions {
        job_name: "employee-summary".into(),
        namespace: "demo".into(),
        output: OutputLocation::Local(blocker.join("summary")),
        transport: Transport::Http(HttpTransport::new(InsecureHttpConfig::new(&url)).unwrap()),
        verify: Some(VerifyTarget { url, insecure: true }),
    };
    let err = run_job(&options).await.expect_err("output directory cannot be created");
    assert!(matches!(err, JobError::Write { .. }), "{err:?}");
    assert_eq!(err.code(), "lineage.job.write_failed");

    let recorded = sink.snapshot();
    let types: Vec<_> = recorded.iter().map(|summary| summary.event_type.as_str()).collect();
    assert_eq!(types, ["START", "FAIL"]);
    assert_eq!(recorded[0].run_id, recorded[1].run_id);
    assert_eq!(recorded[1].job, "demo/employee-summary");
    assert_eq!(recorded[1].input_count, Some(1));

    running.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn demo_job_survives_unreachable_collector() {
    let url = closed_port_url().await;
    let options = JobOptions {
        job_name: "employee-summary".into(),
        namespace: "demo".into(),
        output: OutputLocation::parse("s3://glue-data-bucket/output/employee_summary/"),
        transport: Transport::Http(HttpTransport::new(InsecureHttpConfig::new(&url)).unwrap()),
        verify: Some(VerifyTarget { url, insecure: true }),
    };
    let report = run_job(&options).await.unwrap();

    assert_eq!(report.events_delivered, 0);
    assert_eq!(report.events_failed, 2);
    assert_eq!(report.written_to, None);
    assert!(report.verification.is_none());
}
