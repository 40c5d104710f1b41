use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_TARGET_URL: &str = "https://aqtwwx.net/home";
pub const DEFAULT_DATA_FILE: &str = "public/data.json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Largest page body the fetcher will buffer.
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    pub endpoint: Url,
    pub data_file: PathBuf,
    pub timeout: Duration,
    pub user_agent: String,
    pub max_body_bytes: usize,
}

impl UpdaterConfig {
    pub fn new(endpoint: &str, data_file: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let url = Url::parse(endpoint).map_err(|source| ConfigError::InvalidUrl {
            url: endpoint.to_string(),
            source,
        })?;
        if !(url.scheme() == "https" || url.scheme() == "http") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }

        Ok(Self {
            endpoint: url,
            data_file: data_file.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: BROWSER_USER_AGENT.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Built-in defaults, with `UPDATER_TARGET_URL` / `UPDATER_DATA_FILE`
    /// overriding them when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint =
            std::env::var("UPDATER_TARGET_URL").unwrap_or_else(|_| DEFAULT_TARGET_URL.into());
        let data_file =
            std::env::var("UPDATER_DATA_FILE").unwrap_or_else(|_| DEFAULT_DATA_FILE.into());
        Self::new(&endpoint, data_file)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}
