mod common;

use std::io::Write;
use std::time::Duration;

use serde_json::json;
use taskline::driver::{self, DriverConfig, Manifest};
use taskline::error::StartupError;
use taskline::rpc::Response;
use tempfile::NamedTempFile;

use common::{start_server, test_config, wait_until_idle};

fn write_manifest(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const MANIFEST: &str = r#"[
    {"task": 1, "input": ["casa", "masa", "trei", "tanc", "4321"]},
    {"task": 2, "input": ["abd4g5", "1sdf6fd", "fd2fdsf5"]},
    {"task": 3, "input": [12, 13, 14]},
    {"task": 5, "input": ["2dasdas", "12", "dasdas", "1010", "101"]},
    {"task": 9, "input": []}
]"#;

#[tokio::test]
async fn test_driver_reports_every_client() {
    let (addr, admission) = start_server(test_config()).await;
    let file = write_manifest(MANIFEST);

    let manifest = Manifest::load(file.path()).unwrap();
    let requests = manifest.select(&[1, 2, 3, 5, 9]).unwrap();
    let config = DriverConfig {
        addr: addr.to_string(),
        spawn_delay: Duration::from_millis(10),
        ..Default::default()
    };

    let reports = driver::run(&config, requests).await;
    assert_eq!(reports.len(), 5);

    let outcomes: Vec<(i64, i64, Response)> = reports
        .into_iter()
        .map(|r| (r.client_id, r.task, r.outcome.unwrap()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (1, 1, Response::success(json!(["cmtt4", "aara3", "ssen2", "aaic1"]))),
            (2, 2, Response::success(json!(2))),
            (3, 3, Response::success(json!(93))),
            (4, 5, Response::success(json!([10, 5]))),
            (5, 9, Response::internal_error()),
        ]
    );

    wait_until_idle(&admission).await;
}

#[tokio::test]
async fn test_driver_with_more_clients_than_slots() {
    let mut config = test_config();
    config.max_concurrent_connections = 1;
    let (addr, admission) = start_server(config).await;

    let manifest = Manifest::from_json(MANIFEST).unwrap();
    let requests = manifest.select(&[3]).unwrap();
    let config = DriverConfig {
        addr: addr.to_string(),
        clients_per_task: 4,
        spawn_delay: Duration::ZERO,
        ..Default::default()
    };

    let reports = tokio::time::timeout(Duration::from_secs(10), driver::run(&config, requests))
        .await
        .expect("driver did not finish");

    assert_eq!(reports.len(), 4);
    for (expected_id, report) in (1..).zip(&reports) {
        assert_eq!(report.client_id, expected_id);
        assert_eq!(
            report.outcome.as_ref().unwrap(),
            &Response::success(json!(93))
        );
    }

    wait_until_idle(&admission).await;
}

#[test]
fn test_missing_task_aborts_before_running() {
    let file = write_manifest(MANIFEST);
    let manifest = Manifest::load(file.path()).unwrap();

    let err = manifest.select(&[1, 4]).unwrap_err();
    assert!(matches!(err, StartupError::MissingTask(4)));
}
