//! Server configuration from the environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        let host = env::var("ZENITE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("ZENITE_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8080);
        let database_url =
            env::var("ZENITE_DATABASE_URL").unwrap_or_else(|_| "sqlite:zenite.db".to_string());
        Self {
            host,
            port,
            database_url,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
