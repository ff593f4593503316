#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use toml_config::{AppConfig, KiteConfig};

use crate::adapters::kite::KiteClient;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KiteCredentials {
    pub api_key: String,
    pub access_token: String,
}

/// First non-empty line of `path`, if the file is readable.
fn read_first_line(path: &str) -> Option<String> {
    let content = std::fs::read_to_string(Path::new(path)).ok()?;
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl KiteConfig {
    /// Config value (unless it is an unresolved `${VAR}`), then `API_KEY`/`KITE_API_KEY`,
    /// then the key file.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !key.contains("${"))
            .map(str::to_string)
            .or_else(|| non_empty_env("API_KEY"))
            .or_else(|| non_empty_env("KITE_API_KEY"))
            .or_else(|| self.api_key_file.as_deref().and_then(read_first_line))
    }

    pub fn resolve_access_token(&self) -> Option<String> {
        non_empty_env("KITE_ACCESS_TOKEN").or_else(|| read_first_line(&self.access_token_file))
    }

    pub fn credentials(&self) -> Option<KiteCredentials> {
        let api_key = self.resolve_api_key();
        let access_token = self.resolve_access_token();
        match (api_key, access_token) {
            (Some(api_key), Some(access_token)) => Some(KiteCredentials {
                api_key,
                access_token,
            }),
            (None, _) => {
                tracing::warn!("⚠️ Kite API key not configured");
                None
            }
            (_, None) => {
                tracing::warn!(
                    "⚠️ Kite access token not found (KITE_ACCESS_TOKEN or {})",
                    self.access_token_file
                );
                None
            }
        }
    }

    /// Client for the configured account, or `None` when credentials are missing.
    pub fn client(&self) -> Option<KiteClient> {
        self.credentials().map(|creds| {
            KiteClient::with_base_url(
                self.base_url.clone(),
                creds.api_key,
                creds.access_token,
                self.timeout_seconds,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn api_key_from_file_when_config_is_unresolved() {
        let mut key_file = NamedTempFile::new().unwrap();
        writeln!(key_file, "\n  filekey123  \nsecret").unwrap();

        let config = KiteConfig {
            api_key: Some("${GTT_DESK_MISSING_KEY}".to_string()),
            api_key_file: Some(key_file.path().to_string_lossy().to_string()),
            ..KiteConfig::default()
        };
        // API_KEY/KITE_API_KEY would take precedence over the file.
        if std::env::var("API_KEY").is_err() && std::env::var("KITE_API_KEY").is_err() {
            assert_eq!(config.resolve_api_key().as_deref(), Some("filekey123"));
        }
    }

    #[test]
    fn configured_api_key_wins() {
        let config = KiteConfig {
            api_key: Some(" cfgkey ".to_string()),
            ..KiteConfig::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("cfgkey"));
    }
}
