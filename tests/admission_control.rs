mod common;

use std::time::Duration;

use taskline::rpc::TaskClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use common::{start_server, test_config, wait_until_idle};

#[tokio::test]
async fn test_extra_connection_waits_for_a_free_slot() {
    let mut config = test_config();
    config.max_concurrent_connections = 2;
    let (addr, admission) = start_server(config).await;
    let client = TaskClient::new(addr.to_string());

    let first = client.connect().await.unwrap();
    let _second = client.connect().await.unwrap();
    assert_eq!(admission.in_use(), 2);

    // The third socket is accepted by the OS, but its session must not start.
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut waiting = BufReader::new(stream);
    let mut welcome = String::new();
    let early = timeout(Duration::from_millis(300), waiting.read_line(&mut welcome)).await;
    assert!(early.is_err(), "got welcome while pool was full: {welcome:?}");
    assert_eq!(admission.in_use(), 2);

    drop(first);

    let read = timeout(Duration::from_secs(2), waiting.read_line(&mut welcome))
        .await
        .expect("timeout waiting for admission")
        .unwrap();
    assert!(read > 0);
    assert_eq!(welcome, "hello tester\n");
    assert_eq!(admission.in_use(), 2);
}

#[tokio::test]
async fn test_sessions_never_exceed_capacity() {
    let mut config = test_config();
    config.max_concurrent_connections = 3;
    let (addr, admission) = start_server(config).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let client = TaskClient::new(addr.to_string());
        let admission = admission.clone();
        handles.push(tokio::spawn(async move {
            let connection = client.connect().await.unwrap();
            assert!(admission.in_use() <= 3);
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(connection);
        }));
    }

    for handle in handles {
        timeout(Duration::from_secs(5), handle)
            .await
            .expect("timeout waiting for client")
            .expect("client task panicked");
    }

    wait_until_idle(&admission).await;
}
