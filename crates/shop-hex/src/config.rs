use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = env::var("SERVER_PORT").unwrap_or_else(|_| "3000".into());
        server_port
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("SERVER_PORT `{server_port}` is not a port: {e}"))?;
        let database_url = env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty());
        let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| "debug".into());
        Ok(Self {
            server_port,
            database_url,
            log_filter,
        })
    }
}
