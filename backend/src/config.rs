//! Service configuration.
//!
//! Values come from the environment (a `.env` file is loaded first if
//! present) and can be overridden by `serve` flags.
//!
//! | Variable | Default |
//! |---|---|
//! | `TABLECONVERTER_BIND` | `0.0.0.0` |
//! | `TABLECONVERTER_PORT` | `8080` |
//! | `TABLECONVERTER_SESSION_TTL_SECS` | `3600` |
//! | `TABLECONVERTER_SWEEP_INTERVAL_SECS` | `30` |
//! | `TABLECONVERTER_UPLOAD_FIELD` | `file` |
//! | `TABLECONVERTER_UPLOAD_DIR` | system temp dir |
//! | `TABLECONVERTER_MAX_UPLOAD_BYTES` | `67108864` |

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default session lifetime (one hour).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Default delay between expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Default multipart field holding the uploaded table.
pub const DEFAULT_UPLOAD_FIELD: &str = "file";

/// Default upload size limit (64 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

const DEFAULT_PORT: u16 = 8080;

/// Invalid configuration value.
#[derive(Debug, Error)]
#[error("Invalid value {value:?} for {key}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

/// Settings for the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// How long an upload waits for its conversion request.
    pub session_ttl: Duration,
    /// Delay between expiry sweeps.
    pub sweep_interval: Duration,
    /// Multipart field name of the uploaded file.
    pub upload_field: String,
    /// Directory for staged uploads.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            session_ttl: DEFAULT_SESSION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            upload_field: DEFAULT_UPLOAD_FIELD.to_string(),
            upload_dir: env::temp_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try loading .env file
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let ip: IpAddr = parse_var(&lookup, "TABLECONVERTER_BIND")?.unwrap_or(config.bind.ip());
        let port: u16 = parse_var(&lookup, "TABLECONVERTER_PORT")?.unwrap_or(config.bind.port());
        config.bind = SocketAddr::new(ip, port);

        if let Some(secs) = parse_var::<u64, _>(&lookup, "TABLECONVERTER_SESSION_TTL_SECS")? {
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "TABLECONVERTER_SWEEP_INTERVAL_SECS")? {
            if secs == 0 {
                return Err(ConfigError {
                    key: "TABLECONVERTER_SWEEP_INTERVAL_SECS",
                    value: secs.to_string(),
                });
            }
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(field) = lookup("TABLECONVERTER_UPLOAD_FIELD").filter(|f| !f.trim().is_empty()) {
            config.upload_field = field.trim().to_string();
        }
        if let Some(dir) = lookup("TABLECONVERTER_UPLOAD_DIR").filter(|d| !d.is_empty()) {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(max) = parse_var(&lookup, "TABLECONVERTER_MAX_UPLOAD_BYTES")? {
            config.max_upload_bytes = max;
        }

        Ok(config)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.bind.set_port(port);
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError { key, value: raw }),
    }
}
