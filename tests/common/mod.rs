#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use taskline::config::ServerConfig;
use taskline::rpc::{AdmissionPool, TaskServer};

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        welcome_message: "hello tester".to_string(),
        max_message_size: 1024,
        max_concurrent_connections: 4,
        connection_idle_timeout_seconds: 5,
    }
}

/// Bind on an ephemeral port and serve in the background.
pub async fn start_server(config: ServerConfig) -> (SocketAddr, AdmissionPool) {
    let server = TaskServer::bind(config).await.expect("bind failed");
    let addr = server.local_addr().expect("no local addr");
    let admission = server.admission();
    tokio::spawn(server.serve());
    (addr, admission)
}

/// Poll until every admission slot is free again.
pub async fn wait_until_idle(admission: &AdmissionPool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while admission.in_use() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timeout waiting for sessions to release their slots");
}
