//! API credential loading.
//!
//! The game API token is read once at startup from a `KEY=value` file (falling
//! back to the process environment) and passed explicitly to every client.

use std::path::Path;

use crate::config::{CredentialsConfig, PublishSettings};
use crate::error::{GauntletError, Result};

/// A secret token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiToken(<{} chars>)", self.0.len())
    }
}

/// Find `key` in `KEY=value` text. Blank lines and `#` comments are ignored,
/// an `export ` prefix is accepted, and surrounding quotes are stripped.
pub fn parse_env_value(content: &str, key: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (k, v) = line.split_once('=')?;
        if k.trim() != key {
            return None;
        }
        let v = v.trim();
        let v = v
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
            .unwrap_or(v);
        Some(v.to_string())
    })
}

/// Load the game API token.
///
/// Looks in the configured env file first, then in the process environment.
/// A missing or empty token is a [`GauntletError::Config`]: callers must abort
/// before making any network call.
pub fn load_api_token(config: &CredentialsConfig) -> Result<ApiToken> {
    let from_file = read_env_file(&config.env_file)?
        .and_then(|content| parse_env_value(&content, &config.token_key));

    let token = from_file
        .filter(|t| !t.is_empty())
        .or_else(|| std::env::var(&config.token_key).ok().filter(|t| !t.is_empty()));

    match token {
        Some(token) => {
            tracing::info!(
                key = %config.token_key,
                len = token.len(),
                "API token loaded"
            );
            Ok(ApiToken::new(token))
        }
        None => Err(GauntletError::config(format!(
            "no API token found. Add {key}=your_token_here to {file} or set the {key} environment variable.",
            key = config.token_key,
            file = config.env_file.display(),
        ))),
    }
}

/// Load the GitHub token from the env var named in the publish settings.
pub fn load_github_token(settings: &PublishSettings) -> Result<ApiToken> {
    let var_name = &settings.token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(ApiToken::new(val)),
        _ => Err(GauntletError::config(format!(
            "GitHub token not found. Set the {var_name} environment variable."
        ))),
    }
}

fn read_env_file(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "env file not found");
            Ok(None)
        }
        Err(e) => Err(GauntletError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn temp_env_file(content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gauntlet-cred-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".env");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn parses_quoted_and_plain_values() {
        let content = "# tokens\nOTHER=1\nILLUVIUM_API_TOKEN=\"abc123\"\n";
        assert_eq!(
            parse_env_value(content, "ILLUVIUM_API_TOKEN").as_deref(),
            Some("abc123")
        );
        assert_eq!(parse_env_value("export KEY='x=y'", "KEY").as_deref(), Some("x=y"));
        assert_eq!(parse_env_value("KEY = plain ", "KEY").as_deref(), Some("plain"));
        assert_eq!(parse_env_value("#KEY=commented", "KEY"), None);
    }

    #[test]
    fn loads_token_from_file() {
        let path = temp_env_file("GAUNTLET_TEST_TOKEN_FILE=secret-value\n");
        let config = CredentialsConfig {
            env_file: path.clone(),
            token_key: "GAUNTLET_TEST_TOKEN_FILE".into(),
        };
        let token = load_api_token(&config).expect("token");
        assert_eq!(token.expose(), "secret-value");
        assert!(!format!("{token:?}").contains("secret"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_token_is_config_error() {
        let path = temp_env_file("SOMETHING_ELSE=1\n");
        // Use a unique key name to avoid interfering with the real environment
        let config = CredentialsConfig {
            env_file: path.clone(),
            token_key: "GAUNTLET_TEST_NONEXISTENT_KEY_12345".into(),
        };
        let err = load_api_token(&config).unwrap_err();
        assert!(matches!(err, GauntletError::Config { .. }));
        assert!(err.to_string().contains("no API token found"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_env_file_is_not_an_io_error() {
        let config = CredentialsConfig {
            env_file: PathBuf::from("/nonexistent/gauntlet/.env"),
            token_key: "GAUNTLET_TEST_NONEXISTENT_KEY_67890".into(),
        };
        let err = load_api_token(&config).unwrap_err();
        assert!(matches!(err, GauntletError::Config { .. }));
    }

    #[test]
    fn github_token_validation() {
        let settings = PublishSettings {
            token_env: "GAUNTLET_TEST_NONEXISTENT_GITHUB_TOKEN".into(),
            ..PublishSettings::default()
        };
        let err = load_github_token(&settings).unwrap_err();
        assert!(err.to_string().contains("GitHub token not found"));
    }
}
