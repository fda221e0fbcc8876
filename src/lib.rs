pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod logging;
pub mod rpc;
pub mod tasks;
