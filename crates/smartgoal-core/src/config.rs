//! Configuration types for the smartgoal client.
//!
//! Configuration lives in a `smartgoal.json` file next to where the CLI is run.
//! Every field has a default, so a missing file is not an error. Environment
//! variables override the file; CLI flags override both.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "smartgoal.json";

/// Environment variable overriding [`Config::base_url`].
pub const ENV_BASE_URL: &str = "SMARTGOAL_BASE_URL";

/// Environment variable overriding [`Config::session_cookie`].
pub const ENV_SESSION_COOKIE: &str = "SMARTGOAL_SESSION_COOKIE";

/// Default backend origin.
fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

/// Default versioned API path prefix.
fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

/// Default per-request timeout in seconds.
const fn default_request_timeout() -> u64 {
    30
}

/// Default number of roster rows per page.
const fn default_roster_page_size() -> usize {
    25
}

/// Main configuration for the smartgoal client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Backend origin, e.g. `https://feedback.example.org`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Versioned path prefix every endpoint lives under.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Timeout applied to each HTTP request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Raw `Cookie` header value forwarded to the backend.
    ///
    /// Authentication happens in the browser against the backend's login URL;
    /// the resulting session cookie is what lets the CLI act as that user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,

    /// Number of roster rows shown per page.
    #[serde(default = "default_roster_page_size")]
    pub roster_page_size: usize,

    /// Output format used when a command is not given `--format`.
    #[serde(default)]
    pub default_format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            request_timeout_secs: default_request_timeout(),
            session_cookie: None,
            roster_page_size: default_roster_page_size(),
            default_format: OutputFormat::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `smartgoal.json` in the current directory. If not found,
    /// returns the default configuration.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            CoreError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `smartgoal.json` inside a specific directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the (validated) default configuration.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConfigParseError` if the file exists but cannot be
    /// read or parsed, and `CoreError::ConfigValidationError` if a value is
    /// out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(CoreError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| CoreError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `SMARTGOAL_BASE_URL` and `SMARTGOAL_SESSION_COOKIE` overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = base_url;
        }
        if let Some(cookie) = lookup(ENV_SESSION_COOKIE).filter(|v| !v.trim().is_empty()) {
            self.session_cookie = Some(cookie);
        }
    }

    /// Full URL of the API root, without a trailing slash.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartgoal_core::Config;
    ///
    /// let config = Config {
    ///     base_url: "https://feedback.example.org/".to_string(),
    ///     ..Config::default()
    /// };
    /// assert_eq!(config.api_root(), "https://feedback.example.org/api/v1");
    /// ```
    #[must_use]
    pub fn api_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{prefix}")
        }
    }

    /// Validates the configuration values.
    ///
    /// - `baseUrl` must be an `http://` or `https://` origin
    /// - `requestTimeoutSecs` must be greater than 0
    /// - `rosterPageSize` must be greater than 0
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(CoreError::config_validation(
                "baseUrl must not be empty",
                "Set baseUrl to the backend origin in your smartgoal.json",
            ));
        }

        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(CoreError::config_validation(
                format!("baseUrl '{base}' must start with http:// or https://"),
                "Use a full origin such as https://feedback.example.org",
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(CoreError::config_validation(
                "requestTimeoutSecs must be greater than 0",
                "Set requestTimeoutSecs to at least 1 second in your smartgoal.json",
            ));
        }

        if self.roster_page_size == 0 {
            return Err(CoreError::config_validation(
                "rosterPageSize must be greater than 0",
                "Set rosterPageSize to at least 1 in your smartgoal.json",
            ));
        }

        Ok(())
    }
}

/// Output format for rendered views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable Markdown (default).
    #[default]
    Markdown,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a string into an `OutputFormat`, case-insensitively.
    ///
    /// Accepts `md` as shorthand for Markdown.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OutputFormat {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid output format '{s}': expected one of 'markdown', 'md', 'json'"
            ))
        })
    }
}

impl Serialize for OutputFormat {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
