//! SDK configuration
//!
//! [`SdkConfig`] names the comment canister and, optionally, the replica host
//! to reach it through. It can be built in code, read from a TOML file, and
//! overlaid from `ZONIA_*` environment variables.

use crate::errors::{Result, ZoniaError};
use candid::Principal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Page size used when a load does not specify one.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Environment variable overriding [`SdkConfig::server_id`].
pub const ENV_SERVER_ID: &str = "ZONIA_SERVER_ID";
/// Environment variable overriding [`SdkConfig::host`].
pub const ENV_HOST: &str = "ZONIA_HOST";
/// Environment variable overriding [`SdkConfig::page_limit`].
pub const ENV_PAGE_LIMIT: &str = "ZONIA_PAGE_LIMIT";

fn default_page_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

/// Connection settings for one comment canister.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Textual principal of the comment canister
    pub server_id: String,
    /// Replica URL; `None` leaves the choice to the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Default page size for thread loads
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl SdkConfig {
    /// Config for `server_id` with default settings.
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            host: None,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Set the replica host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the default page size.
    #[must_use]
    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit;
        self
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ZoniaError::not_found(format!("config file {}", path.display()))
            }
            _ => ZoniaError::internal(format!("Failed to read config file: {e}")),
        })?;

        toml::from_str(&content)
            .map_err(|e| ZoniaError::invalid(format!("Invalid config TOML: {e}")))
    }

    /// Overlay values from `ZONIA_*` environment variables.
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable source.
    pub fn merge_with_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(server_id) = lookup(ENV_SERVER_ID) {
            debug!(key = ENV_SERVER_ID, "config overridden from environment");
            self.server_id = server_id;
        }
        if let Some(host) = lookup(ENV_HOST) {
            debug!(key = ENV_HOST, "config overridden from environment");
            self.host = Some(host);
        }
        if let Some(raw) = lookup(ENV_PAGE_LIMIT) {
            self.page_limit = raw.trim().parse().map_err(|_| {
                ZoniaError::invalid(format!("{ENV_PAGE_LIMIT} is not a page size: {raw:?}"))
            })?;
            debug!(
                key = ENV_PAGE_LIMIT,
                page_limit = self.page_limit,
                "config overridden from environment"
            );
        }
        Ok(())
    }

    /// Check that the config can address a canister.
    pub fn validate(&self) -> Result<()> {
        self.principal()?;

        if let Some(host) = &self.host {
            let rest = host
                .strip_prefix("https://")
                .or_else(|| host.strip_prefix("http://"));
            if rest.map_or(true, str::is_empty) {
                return Err(ZoniaError::invalid(format!(
                    "host must be an http(s) URL, got {host:?}"
                )));
            }
        }

        if self.page_limit == 0 {
            return Err(ZoniaError::invalid("page_limit must be at least 1"));
        }

        Ok(())
    }

    /// Parsed canister principal.
    pub fn principal(&self) -> Result<Principal> {
        Principal::from_text(self.server_id.trim()).map_err(|e| {
            ZoniaError::invalid(format!("server_id {:?} is not a principal: {e}", self.server_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::collections::HashMap;
    use std::io::Write;

    const CANISTER: &str = "rrkah-fqaaa-aaaaa-aaaaq-cai";

    #[test]
    fn test_defaults() {
        let config = SdkConfig::new(CANISTER);
        assert_eq!(config.page_limit, 10);
        assert!(config.host.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server_id = \"{CANISTER}\"").unwrap();
        writeln!(file, "host = \"http://127.0.0.1:4943\"").unwrap();

        let config = SdkConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.server_id, CANISTER);
        assert_eq!(config.host.as_deref(), Some("http://127.0.0.1:4943"));
        assert_eq!(config.page_limit, DEFAULT_PAGE_LIMIT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SdkConfig::load_from_file(Path::new("/nonexistent/zonia.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page_limit = \"lots\"").unwrap();

        let err = SdkConfig::load_from_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            (ENV_SERVER_ID, CANISTER),
            (ENV_HOST, "https://icp0.io"),
            (ENV_PAGE_LIMIT, " 25 "),
        ]
        .into_iter()
        .collect();

        let mut config = SdkConfig::new("placeholder");
        config
            .merge_with_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server_id, CANISTER);
        assert_eq!(config.host.as_deref(), Some("https://icp0.io"));
        assert_eq!(config.page_limit, 25);
    }

    #[test]
    fn test_env_bad_page_limit() {
        let mut config = SdkConfig::new(CANISTER);
        let err = config
            .merge_with_vars(|key| (key == ENV_PAGE_LIMIT).then(|| "-3".to_string()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(config.page_limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            SdkConfig::new("not a principal"),
            SdkConfig::new(""),
            SdkConfig::new(CANISTER).with_host("ftp://example.org"),
            SdkConfig::new(CANISTER).with_host("https://"),
            SdkConfig::new(CANISTER).with_page_limit(0),
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{config:?}");
        }
    }
}
