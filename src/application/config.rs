use std::{collections::HashMap, net::SocketAddr, str::FromStr};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_DATABASE_TIMEOUT: &str = "100";
const DEFAULT_MAX_CONNECTIONS: &str = "5";

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not found in env")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Memory,
    Postgres {
        url: String,
        timeout: u64,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    bind_address: SocketAddr,
    store: StoreConfig,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = parse_or(vars, "BIND_ADDRESS", DEFAULT_BIND_ADDRESS)?;
        let store = match vars.get("PERSONS_STORE").map(|s| s.as_str()) {
            Some("memory") => StoreConfig::Memory,
            Some("postgres") | None => StoreConfig::Postgres {
                url: vars
                    .get("DATABASE_URL")
                    .cloned()
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?,
                timeout: parse_or(vars, "DATABASE_TIMEOUT", DEFAULT_DATABASE_TIMEOUT)?,
                max_connections: parse_or(
                    vars,
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_MAX_CONNECTIONS,
                )?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "PERSONS_STORE",
                    reason: format!("expected `postgres` or `memory`, got `{}`", other),
                })
            }
        };
        Ok(Self {
            bind_address,
            store,
        })
    }

    pub fn bind_address(&self) -> &SocketAddr {
        &self.bind_address
    }
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }
}

fn parse_or<T>(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    let raw = vars.get(name).map(|s| s.as_str()).unwrap_or(default);
    T::from_str(raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}
