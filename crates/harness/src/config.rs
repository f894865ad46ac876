//! Harness configuration.
//!
//! A run is described by a [`HarnessConfig`], built either in code with the
//! `with_*` setters or from a TOML file:
//!
//! ```toml
//! [general]
//! api_url = "http://127.0.0.1:8000/api/v1"
//! number_of_users = 10
//! max_posts_per_user = 5
//! max_likes_per_user = 10
//! # seed = 42
//! # accept_invalid_certs = true
//! ```
//!
//! `api_url` and the three counts are required. The counts are signed on
//! purpose: zero or a negative value is a valid "off" setting, not a parse
//! error.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up when no config path is given.
pub const CONFIG_FILE_NAME: &str = "loadbot.toml";

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required option `{0}`")]
    Missing(&'static str),
}

/// Configuration for a harness run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Base URL of the API, e.g. `http://127.0.0.1:8000/api/v1`.
    pub api_url: String,

    /// Users to create. Also the worker pool width. `<= 0` aborts the run.
    pub number_of_users: i64,

    /// Upper bound of posts per user. `<= 0` skips the content stage.
    pub max_posts_per_user: i64,

    /// Vote budget per user. `<= 0` skips the voting stage.
    ///
    /// A user makes `max_likes_per_user - 1` vote attempts.
    pub max_likes_per_user: i64,

    /// Seed for every random choice of the run. Drawn from entropy when unset.
    pub seed: Option<u64>,

    /// Accept self-signed or otherwise invalid TLS certificates.
    pub accept_invalid_certs: bool,
}

impl HarnessConfig {
    /// Create a configuration for the API at `api_url`.
    ///
    /// Every count starts at zero, so nothing runs until the counts are set.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            number_of_users: 0,
            max_posts_per_user: 0,
            max_likes_per_user: 0,
            seed: None,
            accept_invalid_certs: true,
        }
    }

    /// Set the number of users.
    pub fn with_number_of_users(mut self, users: i64) -> Self {
        self.number_of_users = users;
        self
    }

    /// Set the maximum posts per user.
    pub fn with_max_posts_per_user(mut self, posts: i64) -> Self {
        self.max_posts_per_user = posts;
        self
    }

    /// Set the vote budget per user.
    pub fn with_max_likes_per_user(mut self, likes: i64) -> Self {
        self.max_likes_per_user = likes;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set whether invalid TLS certificates are accepted.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Build a configuration from individually supplied options.
    ///
    /// Fails on the first missing one, before anything is contacted.
    pub fn from_options(
        api_url: Option<String>,
        number_of_users: Option<i64>,
        max_posts_per_user: Option<i64>,
        max_likes_per_user: Option<i64>,
    ) -> Result<Self, ConfigError> {
        let api_url = api_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("api_url"))?;
        let users = number_of_users.ok_or(ConfigError::Missing("number_of_users"))?;
        let posts = max_posts_per_user.ok_or(ConfigError::Missing("max_posts_per_user"))?;
        let likes = max_likes_per_user.ok_or(ConfigError::Missing("max_likes_per_user"))?;

        Ok(Self::new(api_url)
            .with_number_of_users(users)
            .with_max_posts_per_user(posts)
            .with_max_likes_per_user(likes))
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        file.general.into_config()
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    general: GeneralSection,
}

#[derive(Debug, Deserialize)]
struct GeneralSection {
    api_url: Option<String>,
    number_of_users: Option<i64>,
    max_posts_per_user: Option<i64>,
    max_likes_per_user: Option<i64>,
    seed: Option<u64>,
    accept_invalid_certs: Option<bool>,
}

impl GeneralSection {
    fn into_config(self) -> Result<HarnessConfig, ConfigError> {
        let mut config = HarnessConfig::from_options(
            self.api_url,
            self.number_of_users,
            self.max_posts_per_user,
            self.max_likes_per_user,
        )?;
        config.seed = self.seed;
        if let Some(accept) = self.accept_invalid_certs {
            config.accept_invalid_certs = accept;
        }
        Ok(config)
    }
}

/// Default locations searched for [`CONFIG_FILE_NAME`]: the working directory,
/// then `/etc`.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    dirs.push(PathBuf::from("/etc"));
    dirs
}

/// First existing `file_name` among `dirs`.
pub fn locate_config_file(dirs: &[PathBuf], file_name: &str) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = HarnessConfig::from_toml_str(
            r#"
            [general]
            api_url = "http://127.0.0.1:8000/api/v1"
            number_of_users = 3
            max_posts_per_user = 2
            max_likes_per_user = 0
            seed = 99
            accept_invalid_certs = false
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            HarnessConfig::new("http://127.0.0.1:8000/api/v1")
                .with_number_of_users(3)
                .with_max_posts_per_user(2)
                .with_max_likes_per_user(0)
                .with_seed(99)
                .with_accept_invalid_certs(false)
        );
    }

    #[test]
    fn test_optional_keys_default() {
        let config = HarnessConfig::from_toml_str(
            r#"
            [general]
            api_url = "http://host"
            number_of_users = 1
            max_posts_per_user = 1
            max_likes_per_user = 1
            "#,
        )
        .unwrap();
        assert!(config.seed.is_none());
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn test_missing_count_is_an_error() {
        let err = HarnessConfig::from_toml_str(
            "[general]\napi_url = \"http://host\"\nmax_posts_per_user = 1\nmax_likes_per_user = 1\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("number_of_users")));

        let err = HarnessConfig::from_toml_str(
            "[general]\napi_url = \"http://host\"\nnumber_of_users = 1\nmax_likes_per_user = 1\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("max_posts_per_user")));

        let err = HarnessConfig::from_toml_str(
            "[general]\napi_url = \"http://host\"\nnumber_of_users = 1\nmax_posts_per_user = 1\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("max_likes_per_user")));
    }

    #[test]
    fn test_from_options_requires_every_count() {
        let err = HarnessConfig::from_options(Some("http://host".into()), Some(3), None, Some(2))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("max_posts_per_user")));

        let err = HarnessConfig::from_options(None, Some(3), Some(1), Some(2)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("api_url")));

        let config =
            HarnessConfig::from_options(Some("http://host".into()), Some(3), Some(1), Some(-2))
                .unwrap();
        assert_eq!(config.number_of_users, 3);
        assert_eq!(config.max_posts_per_user, 1);
        assert_eq!(config.max_likes_per_user, -2);
    }

    #[test]
    fn test_new_runs_nothing_until_counts_are_set() {
        let config = HarnessConfig::new("http://host");
        assert_eq!(config.number_of_users, 0);
        assert_eq!(config.max_posts_per_user, 0);
        assert_eq!(config.max_likes_per_user, 0);
    }

    #[test]
    fn test_negative_counts_are_accepted() {
        let config = HarnessConfig::from_toml_str(
            r#"
            [general]
            api_url = "http://host"
            number_of_users = -1
            max_posts_per_user = 0
            max_likes_per_user = -5
            "#,
        )
        .unwrap();
        assert_eq!(config.number_of_users, -1);
        assert_eq!(config.max_likes_per_user, -5);
    }

    #[test]
    fn test_missing_api_url() {
        let err = HarnessConfig::from_toml_str("[general]\nnumber_of_users = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("api_url")));

        let err = HarnessConfig::from_toml_str("[general]\napi_url = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("api_url")));
    }

    #[test]
    fn test_missing_section_is_parse_error() {
        let err = HarnessConfig::from_toml_str("api_url = \"http://host\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_locate_and_load() {
        let empty = tempfile::tempdir().unwrap();
        let populated = tempfile::tempdir().unwrap();
        std::fs::write(
            populated.path().join(CONFIG_FILE_NAME),
            "[general]\napi_url = \"http://found\"\nnumber_of_users = 2\nmax_posts_per_user = 1\nmax_likes_per_user = 0\n",
        )
        .unwrap();

        let dirs = vec![empty.path().to_path_buf(), populated.path().to_path_buf()];
        let path = locate_config_file(&dirs, CONFIG_FILE_NAME).unwrap();
        assert_eq!(path, populated.path().join(CONFIG_FILE_NAME));

        let config = HarnessConfig::load(&path).unwrap();
        assert_eq!(config.api_url, "http://found");

        assert!(locate_config_file(&dirs[..1], CONFIG_FILE_NAME).is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = HarnessConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
