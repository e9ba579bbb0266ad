//! Configuration types for ipfs-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Content-addressed directory on the public pinit gateway holding the numbered JSON files
pub const DEFAULT_GATEWAY_URL: &str =
    "https://gateway.pinit.io/ipfs/QmRYQaQR1gyAukfrUP386yx2PaR3xkaz4bnPWPGj2qknRk";

/// Remote gateway settings
///
/// The base URL is injected into the fetcher at construction, so tests can point
/// it at a mock server.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GatewayConfig {
    /// Base URL that resource names are appended to
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    /// Bounded wait for one resource request, in milliseconds (default: 10000)
    #[serde(
        default = "default_fetch_timeout",
        rename = "timeout_ms",
        with = "duration_ms_serde"
    )]
    #[schema(value_type = u64)]
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            timeout: default_fetch_timeout(),
        }
    }
}

/// Local storage area settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Directory accumulating fetched files (default: "public/downloads/ipfs_json_files")
    #[serde(default = "default_download_dir")]
    #[schema(value_type = String)]
    pub download_dir: PathBuf,

    /// Path reported to callers as `downloadPath` in the summary record
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// Attachment filename offered for the archive (default: "ipfs_files.zip")
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            public_path: default_public_path(),
            archive_name: default_archive_name(),
        }
    }
}

/// Values substituted for fields a download request leaves out
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RangeDefaults {
    /// First identifier (default: 0)
    #[serde(default)]
    pub start: u64,

    /// Last identifier, inclusive (default: 100)
    #[serde(default = "default_range_end")]
    pub end: u64,

    /// Pause between items in milliseconds (default: 100)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RangeDefaults {
    fn default() -> Self {
        Self {
            start: 0,
            end: default_range_end(),
            delay_ms: default_delay_ms(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:3000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// Main configuration for RangeDownloader
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Remote gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Local storage area settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Defaults for omitted request fields
    #[serde(default)]
    pub defaults: RangeDefaults,

    /// API server settings
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that would otherwise only fail at the first fetch
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.gateway.base_url).map_err(|e| Error::Config {
            message: format!("invalid gateway URL '{}': {}", self.gateway.base_url, e),
            key: Some("gateway.base_url".to_string()),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("unsupported gateway URL scheme '{}'", url.scheme()),
                key: Some("gateway.base_url".to_string()),
            });
        }

        if self.gateway.timeout.is_zero() {
            return Err(Error::Config {
                message: "fetch timeout must be greater than zero".to_string(),
                key: Some("gateway.timeout_ms".to_string()),
            });
        }

        Ok(())
    }

    /// Storage directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.storage.download_dir
    }
}

/// Join a base URL and a resource name with exactly one separating slash
pub(crate) fn join_url(base: &str, resource_name: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        resource_name.trim_start_matches('/')
    )
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_fetch_timeout() -> Duration {
    Duration::from_millis(10_000)
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("public")
        .join("downloads")
        .join("ipfs_json_files")
}

fn default_public_path() -> String {
    "/downloads/ipfs_json_files/".to_string()
}

fn default_archive_name() -> String {
    "ipfs_files.zip".to_string()
}

fn default_range_end() -> u64 {
    100
}

fn default_delay_ms() -> u64 {
    100
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
