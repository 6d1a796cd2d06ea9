use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// File name of the metadata database inside `data_dir`.
pub const DB_FILE: &str = "filehost.db";

/// Where the server listens and keeps its files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Holds the metadata database and, for the local backend, the object root.
    pub data_dir: PathBuf,
}

impl ServerConfig {
    /// The listen address. `host` must be an IP literal; names are not resolved.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// The SQLite database every command opens, so `serve` and `user add`
    /// agree on it for a given config.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    /// Applies command line flags on top of the file and environment values.
    pub fn override_with(
        &mut self,
        host: Option<String>,
        port: Option<u16>,
        data_dir: Option<PathBuf>,
    ) {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
        }
    }
}
