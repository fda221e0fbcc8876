use std::sync::Arc;

use crate::config::ServerConfig;
use crate::rpc::AdmissionPool;

/// State shared by the listener and every session. The config is read-only.
#[derive(Clone)]
pub struct ServerContext {
    pub config: Arc<ServerConfig>,
    pub admission: AdmissionPool,
}

impl ServerContext {
    pub fn new(config: ServerConfig) -> Self {
        let admission = AdmissionPool::new(config.max_concurrent_connections);
        Self {
            config: Arc::new(config),
            admission,
        }
    }
}
