use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

static CONFIG: OnceCell<HarnessConfig> = OnceCell::new();

/// Settings shared by the caller, the protocol handler and the browser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Default `HTTP_HOST` placed in every dispatch environment.
    pub host: String,
    /// Default `HTTP_REFERER` placed in every dispatch environment.
    pub referer: String,

    pub handle_errors: bool,
    pub raise_http_errors: bool,

    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub follow_refresh: bool,
    /// Longest `Refresh` delay, in seconds, that is followed immediately.
    pub max_refresh_delay: u64,

    /// Decode gzip / deflate response bodies.
    pub decode_content: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            referer: "localhost".to_string(),

            handle_errors: true,
            raise_http_errors: true,

            follow_redirects: true,
            max_redirects: 10,
            follow_refresh: true,
            max_refresh_delay: 0,

            decode_content: true,
        }
    }
}

impl HarnessConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<HarnessConfig>(content).map_err(|err| Error::Config(err.to_string()))
    }

    /// Loads a TOML file, falling back to the defaults when it cannot be
    /// read or parsed.
    pub fn from_file(path: &str) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path, %err, "failed to read config, falling back to defaults");
                return HarnessConfig::default();
            }
        };

        match Self::from_toml(&content) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(path, %err, "failed to deserialize config, falling back to defaults");
                HarnessConfig::default()
            }
        }
    }
}

pub fn set_config(cfg: HarnessConfig) -> Result<()> {
    CONFIG
        .set(cfg)
        .map_err(|_| Error::Config("config already set".to_string()))
}

/// Process-wide configuration; the defaults until [`set_config`] is called.
pub fn config() -> &'static HarnessConfig {
    CONFIG.get_or_init(HarnessConfig::default)
}
