//! Load generator that fans out logical clients against the server.
//!
//! Each logical client opens its own connection, sends exactly one request
//! from the manifest and reports the outcome. Clients fail independently and
//! nothing is retried.

use std::path::Path;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::{ClientError, StartupError};
use crate::rpc::client::DEFAULT_CONNECT_TIMEOUT;
use crate::rpc::{Request, Response, TaskClient};

/// Requests available to the driver, keyed by their task number.
#[derive(Debug, Clone)]
pub struct Manifest {
    requests: Vec<Request>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, StartupError> {
        let content = std::fs::read_to_string(path).map_err(|source| StartupError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, StartupError> {
        let requests = serde_json::from_str(json).map_err(StartupError::ManifestParse)?;
        Ok(Self { requests })
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// The first request for each task in `tasks`, in the order given.
    pub fn select(&self, tasks: &[i64]) -> Result<Vec<Request>, StartupError> {
        tasks
            .iter()
            .map(|&task| {
                self.requests
                    .iter()
                    .find(|r| r.task == task)
                    .cloned()
                    .ok_or(StartupError::MissingTask(task))
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub addr: String,
    /// Logical clients launched per selected request.
    pub clients_per_task: usize,
    pub connect_timeout: Duration,
    /// Pause between spawns. Keeps interleaved logs readable.
    pub spawn_delay: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            addr: "localhost:8080".to_string(),
            clients_per_task: 1,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            spawn_delay: Duration::from_millis(150),
        }
    }
}

/// Outcome of one logical client.
#[derive(Debug)]
pub struct ClientReport {
    pub client_id: i64,
    pub task: i64,
    pub outcome: Result<Response, ClientError>,
}

/// Launch one logical client per request (times `clients_per_task`) and wait
/// for all of them. Reports come back ordered by client id.
pub async fn run(config: &DriverConfig, requests: Vec<Request>) -> Vec<ClientReport> {
    let client = TaskClient::new(config.addr.clone()).with_connect_timeout(config.connect_timeout);
    let mut clients = JoinSet::new();
    let mut next_id: i64 = 1;

    info!(
        addr = %config.addr,
        requests = requests.len(),
        clients_per_task = config.clients_per_task,
        "Starting clients"
    );

    for request in requests {
        for _ in 0..config.clients_per_task {
            let client = client.clone();
            let mut request = request.clone();
            request.client_id = next_id;
            next_id += 1;

            clients.spawn(run_client(client, request));
            tokio::time::sleep(config.spawn_delay).await;
        }
    }

    info!("Waiting for all clients to finish");
    let mut reports = Vec::with_capacity(clients.len());
    while let Some(joined) = clients.join_next().await {
        match joined {
            Ok(report) => reports.push(report),
            Err(e) => error!(error = %e, "Client task failed"),
        }
    }
    info!(finished = reports.len(), "All clients have finished");

    reports.sort_by_key(|r| r.client_id);
    reports
}

async fn run_client(client: TaskClient, request: Request) -> ClientReport {
    let client_id = request.client_id;
    let task = request.task;

    let outcome = async {
        let mut connection = client.connect().await?;
        info!(client_id, welcome = %connection.welcome(), "Connected");
        info!(client_id, task, "Requested task");
        connection.call(&request).await
    }
    .await;

    match &outcome {
        Ok(Response::Success { result }) => info!(client_id, task, %result, "Success"),
        Ok(Response::Error { error }) => info!(client_id, task, error = %error, "Error response"),
        Err(e) => error!(client_id, task, error = %e, "Client failed"),
    }

    ClientReport {
        client_id,
        task,
        outcome,
    }
}
