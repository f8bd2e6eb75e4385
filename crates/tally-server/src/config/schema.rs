use std::net::SocketAddr;

use serde::Deserialize;
use tally_core::error::{Result, TallyError};

/// Paths owned by the server; the scrape path may not shadow them.
const RESERVED_PATHS: [&str; 3] = ["/", "/healthz", "/admin/gauge"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub admin: AdminSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            admin: AdminSection::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TallyError::UnsupportedVersion);
        }
        self.server.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            metrics_path: default_metrics_path(),
        }
    }
}

impl ServerSection {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            TallyError::BadRequest(format!(
                "server.listen must be a valid socket address ({}): {e}",
                self.listen
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;

        let path = self.metrics_path.as_str();
        if !path.starts_with('/') {
            return Err(TallyError::BadRequest(
                "server.metrics_path must start with '/'".into(),
            ));
        }
        if RESERVED_PATHS.contains(&path) {
            return Err(TallyError::BadRequest(format!(
                "server.metrics_path must not be one of {RESERVED_PATHS:?}"
            )));
        }
        // Route syntax characters would turn the scrape path into a pattern.
        if path.contains([':', '*', '{', '}']) {
            return Err(TallyError::BadRequest(
                "server.metrics_path must be a literal path".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminSection {
    #[serde(default = "default_admin_enabled")]
    pub enabled: bool,
}

impl Default for AdminSection {
    fn default() -> Self {
        Self {
            enabled: default_admin_enabled(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8000".into()
}
fn default_metrics_path() -> String {
    "/metrics".into()
}
fn default_admin_enabled() -> bool {
    true
}
