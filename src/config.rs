use crate::client::{PageOptions, Result, DEFAULT_PAGE_DELAY, DEFAULT_PAGE_LIMIT};
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf, str::FromStr, time::Duration};

/// Client settings, usually read from a TOML file:
///
/// ```toml
/// base-url = "https://github.example.com/api/v3/"
/// token-file = "/home/me/.config/github-token"
/// timeout-secs = 30
///
/// [pagination]
/// limit = 500
/// delay-secs = 2
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
    /// Where tokens are persisted. Defaults to `$GITHUB_TOKEN_FILE` or
    /// `.github-token`
    pub token_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PaginationConfig {
    /// Stop fetching pages after this many items
    pub limit: Option<usize>,
    /// Seconds to wait between page requests
    pub delay_secs: Option<u64>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        contents.parse()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            limit: self.pagination.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            delay: self
                .pagination
                .delay_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_PAGE_DELAY),
        }
    }
}

impl FromStr for Config {
    type Err = crate::client::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
