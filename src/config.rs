use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::event_sourcing::ScyllaConfig;

// ============================================================================
// Process configuration, read from the environment
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Scylla,
    Memory,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scylla" => Ok(Backend::Scylla),
            "memory" => Ok(Backend::Memory),
            _ => Err(ConfigError::Invalid { var: "STORE_BACKEND", value: s.to_string() }),
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub scylla_nodes: Vec<String>,
    pub keyspace: String,
    pub connect_timeout: Duration,
    /// 0 disables the metrics server
    pub metrics_port: u16,
    pub reset_on_start: bool,
    /// Walk a demo key through its lifecycle at startup
    pub run_demo: bool,
    pub tx_max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Scylla,
            scylla_nodes: vec!["127.0.0.1:9042".to_string()],
            keyspace: "event_kv".to_string(),
            connect_timeout: Duration::from_secs(10),
            metrics_port: 9090,
            reset_on_start: false,
            run_demo: false,
            tx_max_attempts: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from any variable source; unset variables keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(value) = lookup("STORE_BACKEND") {
            config.backend = value.parse()?;
        }
        if let Some(value) = lookup("SCYLLA_NODES") {
            let nodes: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|node| !node.is_empty())
                .map(String::from)
                .collect();
            if nodes.is_empty() {
                return Err(ConfigError::Invalid { var: "SCYLLA_NODES", value });
            }
            config.scylla_nodes = nodes;
        }
        if let Some(value) = lookup("SCYLLA_KEYSPACE") {
            // Interpolated into CREATE KEYSPACE, so only plain identifiers
            let valid = !value.is_empty()
                && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(ConfigError::Invalid { var: "SCYLLA_KEYSPACE", value });
            }
            config.keyspace = value;
        }
        if let Some(value) = lookup("CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = Duration::from_secs(parse_number("CONNECT_TIMEOUT_SECS", value)?);
        }
        if let Some(value) = lookup("METRICS_PORT") {
            config.metrics_port = parse_number("METRICS_PORT", value)?;
        }
        if let Some(value) = lookup("RESET_ON_START") {
            config.reset_on_start = parse_flag("RESET_ON_START", value)?;
        }
        if let Some(value) = lookup("RUN_DEMO") {
            config.run_demo = parse_flag("RUN_DEMO", value)?;
        }
        if let Some(value) = lookup("TX_MAX_ATTEMPTS") {
            config.tx_max_attempts = parse_number("TX_MAX_ATTEMPTS", value)?;
        }

        Ok(config)
    }

    /// Demo keys are permanent in a durable log, so only the in-memory
    /// backend runs the demo without being asked to
    pub fn demo_enabled(&self) -> bool {
        self.backend == Backend::Memory || self.run_demo
    }

    pub fn scylla(&self) -> ScyllaConfig {
        ScyllaConfig {
            nodes: self.scylla_nodes.clone(),
            keyspace: self.keyspace.clone(),
            connect_timeout: self.connect_timeout,
        }
    }
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}

fn parse_number<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.backend, Backend::Scylla);
        assert_eq!(config.scylla_nodes, vec!["127.0.0.1:9042".to_string()]);
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.tx_max_attempts, 20);
        assert!(!config.reset_on_start);
        assert!(!config.run_demo);
    }

    #[test]
    fn test_demo_only_on_memory_unless_requested() {
        assert!(!config_from(&[]).unwrap().demo_enabled());
        assert!(config_from(&[("STORE_BACKEND", "memory")]).unwrap().demo_enabled());
        assert!(config_from(&[("RUN_DEMO", "yes")]).unwrap().demo_enabled());
        assert!(config_from(&[("RUN_DEMO", "sometimes")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("STORE_BACKEND", "Memory"),
            ("SCYLLA_NODES", "10.0.0.1:9042, 10.0.0.2:9042"),
            ("SCYLLA_KEYSPACE", "kv_test"),
            ("CONNECT_TIMEOUT_SECS", "3"),
            ("METRICS_PORT", "0"),
            ("RESET_ON_START", "true"),
            ("TX_MAX_ATTEMPTS", "7"),
        ])
        .unwrap();

        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.scylla_nodes.len(), 2);
        assert_eq!(config.scylla().keyspace, "kv_test");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.metrics_port, 0);
        assert!(config.reset_on_start);
        assert_eq!(config.tx_max_attempts, 7);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config_from(&[("STORE_BACKEND", "postgres")]).is_err());
        assert!(config_from(&[("METRICS_PORT", "99999")]).is_err());
        assert!(config_from(&[("SCYLLA_KEYSPACE", "ks; DROP")]).is_err());
        assert!(config_from(&[("SCYLLA_NODES", " , ")]).is_err());
        assert_eq!(
            config_from(&[("RESET_ON_START", "maybe")]).unwrap_err(),
            ConfigError::Invalid { var: "RESET_ON_START", value: "maybe".to_string() }
        );
    }
}
