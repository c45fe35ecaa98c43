use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};

use crate::query::{GeneratorOptions, DEFAULT_TIMEZONE};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub api_key: Option<String>,
    /// LIMIT rendered when a query state carries none.
    pub default_limit: i64,
    pub max_sessions: usize,
    pub default_timezone: String,
    /// Raw editor text shown when a document has no query yet.
    pub default_query: String,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    sitewise_sql_listen_addr: Option<String>,
    #[serde(default)]
    sitewise_sql_listen_host: Option<String>,
    #[serde(default)]
    sitewise_sql_listen_port: Option<u16>,
    #[serde(default)]
    sitewise_sql_api_key: Option<String>,
    #[serde(default = "default_limit")]
    sitewise_sql_default_limit: i64,
    #[serde(default = "default_max_sessions")]
    sitewise_sql_max_sessions: usize,
    #[serde(default)]
    sitewise_sql_default_timezone: Option<String>,
    #[serde(default)]
    sitewise_sql_default_query: Option<String>,
}

const fn default_limit() -> i64 {
    100
}

const fn default_max_sessions() -> usize {
    1024
}

const DEFAULT_QUERY: &str = "SELECT * FROM asset LIMIT 100";

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig =
            envy::from_env().context("failed to parse SITEWISE_SQL_* environment variables")?;

        let listen_addr = resolve_addr(
            raw.sitewise_sql_listen_addr,
            raw.sitewise_sql_listen_host,
            raw.sitewise_sql_listen_port,
        )?;

        let api_key = raw
            .sitewise_sql_api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(Self {
            listen_addr,
            api_key,
            default_limit: raw.sitewise_sql_default_limit.max(1),
            max_sessions: raw.sitewise_sql_max_sessions.max(1),
            default_timezone: non_blank(raw.sitewise_sql_default_timezone)
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            default_query: non_blank(raw.sitewise_sql_default_query)
                .unwrap_or_else(|| DEFAULT_QUERY.to_string()),
        })
    }

    /// Defaults without consulting the environment, for tests and embedding.
    pub fn embedded() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            api_key: None,
            default_limit: default_limit(),
            max_sessions: default_max_sessions(),
            default_timezone: DEFAULT_TIMEZONE.to_string(),
            default_query: DEFAULT_QUERY.to_string(),
        }
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            default_limit: self.default_limit,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_addr(
    addr: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    if let Some(addr) = addr {
        return addr
            .to_socket_addrs()
            .context("invalid SITEWISE_SQL_LISTEN_ADDR value")?
            .next()
            .context("SITEWISE_SQL_LISTEN_ADDR resolved to no addresses");
    }

    let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
    let port = port.unwrap_or(8490);
    let combined = format!("{}:{}", host, port);
    combined
        .to_socket_addrs()
        .context("invalid listen host/port combination")?
        .next()
        .context("listen address resolved to no targets")
}
