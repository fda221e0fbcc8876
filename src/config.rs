//! Server configuration.
//!
//! Layers, lowest precedence first: built-in defaults, the JSON config file,
//! `TASKLINE_*` environment variables, then command-line overrides.

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
    value::Uncased,
};
use serde::{Deserialize, Serialize};

use crate::error::StartupError;

pub const ENV_PREFIX: &str = "TASKLINE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub welcome_message: String,
    /// Longest accepted request line in bytes, newline excluded.
    pub max_message_size: usize,
    pub max_concurrent_connections: usize,
    pub connection_idle_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            welcome_message: "Welcome to the task server!".to_string(),
            max_message_size: 4096,
            max_concurrent_connections: 10,
            connection_idle_timeout_seconds: 30,
        }
    }
}

impl ServerConfig {
    /// Load the config file at `path`, layered with the environment and any
    /// serialized command-line overrides.
    pub fn load<T: Serialize>(path: &Path, overrides: Option<&T>) -> Result<Self, StartupError> {
        if !path.is_file() {
            return Err(StartupError::ConfigNotFound(path.to_path_buf()));
        }

        let mut figment = Figment::from(Serialized::defaults(ServerConfig::default()))
            .merge(Json::file(path))
            .merge(
                // `map` resets the lowercase flag, so it has to come last.
                Env::prefixed(ENV_PREFIX)
                    .map(|key| Uncased::from(pascal_case(key.as_str())))
                    .lowercase(false),
            );

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        let config: ServerConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StartupError> {
        if self.max_message_size == 0 {
            return Err(StartupError::InvalidConfig(
                "MaxMessageSize must be greater than zero".into(),
            ));
        }
        if self.max_concurrent_connections == 0 {
            return Err(StartupError::InvalidConfig(
                "MaxConcurrentConnections must be greater than zero".into(),
            ));
        }
        if self.connection_idle_timeout_seconds == 0 {
            return Err(StartupError::InvalidConfig(
                "ConnectionIdleTimeoutSeconds must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Sliding read deadline, also used as the write deadline.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_idle_timeout_seconds)
    }
}

/// `MAX_MESSAGE_SIZE` -> `MaxMessageSize`
fn pascal_case(key: &str) -> String {
    key.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let lower = part.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    const CONFIG: &str = r#"{
        "Host": "127.0.0.1",
        "Port": 9090,
        "WelcomeMessage": "hello",
        "MaxMessageSize": 1024,
        "MaxConcurrentConnections": 2,
        "ConnectionIdleTimeoutSeconds": 5
    }"#;

    fn load(path: &str) -> Result<ServerConfig, StartupError> {
        ServerConfig::load(Path::new(path), None::<&ServerConfig>)
    }

    #[test]
    fn pascal_case_converts_env_keys() {
        assert_eq!(pascal_case("MAX_MESSAGE_SIZE"), "MaxMessageSize");
        assert_eq!(pascal_case("port"), "Port");
        assert_eq!(
            pascal_case("CONNECTION_IDLE_TIMEOUT_SECONDS"),
            "ConnectionIdleTimeoutSeconds"
        );
    }

    #[test]
    fn loads_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.json", CONFIG)?;
            let config = load("config.json").map_err(|e| e.to_string())?;

            assert_eq!(config.bind_addr(), "127.0.0.1:9090");
            assert_eq!(config.welcome_message, "hello");
            assert_eq!(config.max_message_size, 1024);
            assert_eq!(config.max_concurrent_connections, 2);
            assert_eq!(config.idle_timeout(), Duration::from_secs(5));
            Ok(())
        });
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("config.json", r#"{"Port": 7000}"#)?;
            let config = load("config.json").map_err(|e| e.to_string())?;

            assert_eq!(config.port, 7000);
            assert_eq!(config.max_concurrent_connections, 10);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.json", CONFIG)?;
            jail.set_env("TASKLINE_MAX_CONCURRENT_CONNECTIONS", "7");
            jail.set_env("TASKLINE_WELCOME_MESSAGE", "from env");
            let config = load("config.json").map_err(|e| e.to_string())?;

            assert_eq!(config.max_concurrent_connections, 7);
            assert_eq!(config.welcome_message, "from env");
            assert_eq!(config.port, 9090);
            Ok(())
        });
    }

    #[test]
    fn env_port_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.json", CONFIG)?;
            jail.set_env("TASKLINE_PORT", "1234");
            let config = load("config.json").map_err(|e| e.to_string())?;

            assert_eq!(config.port, 1234);
            assert_eq!(config.host, "127.0.0.1");
            Ok(())
        });
    }

    #[test]
    fn overrides_take_precedence() {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Overrides {
            port: u16,
        }

        Jail::expect_with(|jail| {
            jail.create_file("config.json", CONFIG)?;
            jail.set_env("TASKLINE_PORT", "1111");
            let config =
                ServerConfig::load(Path::new("config.json"), Some(&Overrides { port: 2222 }))
                    .map_err(|e| e.to_string())?;

            assert_eq!(config.port, 2222);
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_fatal() {
        Jail::expect_with(|_jail| {
            let err = load("nope.json").unwrap_err();
            assert!(matches!(err, StartupError::ConfigNotFound(_)));
            Ok(())
        });
    }

    #[test]
    fn malformed_file_is_fatal() {
        Jail::expect_with(|jail| {
            jail.create_file("config.json", "{ not json")?;
            let err = load("config.json").unwrap_err();
            assert!(matches!(err, StartupError::Config(_)));
            Ok(())
        });
    }

    #[test]
    fn zero_limits_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("config.json", r#"{"MaxConcurrentConnections": 0}"#)?;
            let err = load("config.json").unwrap_err();
            assert!(matches!(err, StartupError::InvalidConfig(_)));
            Ok(())
        });
    }
}
