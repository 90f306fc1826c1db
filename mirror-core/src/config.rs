use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ConfigError, CoreError};

pub const DEFAULT_CONFIG_PATH: &str = "gfy_mirror.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    pub reddit: RedditSettings,
    pub sources: SourceSettings,
    pub filter: FilterSettings,
    pub polling: PollingSettings,
    pub cache: CacheSettings,
    pub mirrors: MirrorSettings,
    pub footer: FooterSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedditSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// JSON file of the form `{"user": "...", "pwd": "..."}`.
    pub credentials_file: Option<PathBuf>,
    pub user_agent: String,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            credentials_file: None,
            user_agent: "/u/gfy_mirror by /u/pandanomic".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSettings {
    pub subreddits: Vec<String>,
    pub fetch_limit: u32,
    /// Only applied when more than one subreddit is scanned.
    pub recent_window_minutes: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            subreddits: vec!["soccer".to_string()],
            fetch_limit: 30,
            recent_window_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSettings {
    pub allowed_domains: Vec<String>,
    pub allowed_extensions: Vec<String>,
    pub disabled_extensions: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        let strings = |values: &[&str]| values.iter().map(|v| v.to_string()).collect();
        Self {
            allowed_domains: strings(&[
                "gfycat.com",
                "vine.co",
                "giant.gfycat.com",
                "mediacru.sh",
                "offsided.com",
                "fitbamob.com",
                "i.imgur.com",
                "streamable.com",
            ]),
            allowed_extensions: strings(&[".gif"]),
            disabled_extensions: strings(&[".jpg", ".jpeg", ".png"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingSettings {
    pub interval_secs: u64,
    /// Pause after each processed post.
    pub comment_delay_secs: u64,
    /// Run a single cycle and exit.
    pub run_once: bool,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            comment_delay_secs: 5,
            run_once: false,
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn comment_delay(&self) -> Duration {
        Duration::from_secs(self.comment_delay_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    File,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub path: PathBuf,
    pub redis_url: Option<String>,
    pub redis_key: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::File,
            path: PathBuf::from("gfy_mirror_DB.json"),
            redis_url: None,
            redis_key: "gfy_mirror:seen".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorSettings {
    pub gfycat: bool,
    pub mediacrush: bool,
    pub offsided: bool,
    /// Imgur uploads run only when a client id is present.
    pub imgur_client_id: Option<String>,
    /// Streamable imports run only when both are present.
    pub streamable_username: Option<String>,
    pub streamable_password: Option<String>,
    pub poll_attempts: u32,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            gfycat: true,
            mediacrush: true,
            offsided: true,
            imgur_client_id: None,
            streamable_username: None,
            streamable_password: None,
            poll_attempts: 60,
            poll_interval_secs: 1,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FooterSettings {
    pub source_url: String,
    pub maintainer: String,
    pub feedback_subject: String,
}

impl Default for FooterSettings {
    fn default() -> Self {
        Self {
            source_url: "https://github.com/hzsweers/gfy_mirror".to_string(),
            maintainer: "pandanomic".to_string(),
            feedback_subject: "gfymirror".to_string(),
        }
    }
}

/// Login material resolved from config, credentials file and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    user: String,
    pwd: String,
}

impl BotConfig {
    /// Reads the TOML file at `path`. An explicit path must exist; the default
    /// path falls back to built-in defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&raw)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies environment overrides. `REDIS_URL` switches to the remote cache
    /// and single-cycle mode.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut Option<String>, var: &str| {
            if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
                *target = Some(value);
            }
        };

        set(&mut self.reddit.client_id, "REDDIT_CLIENT_ID");
        set(&mut self.reddit.client_secret, "REDDIT_CLIENT_SECRET");
        set(&mut self.reddit.username, "REDDIT_USERNAME");
        set(&mut self.reddit.password, "REDDIT_PASSWORD");
        set(&mut self.mirrors.imgur_client_id, "IMGUR_CLIENT_ID");
        set(&mut self.mirrors.streamable_username, "STREAMABLE_USERNAME");
        set(&mut self.mirrors.streamable_password, "STREAMABLE_PASSWORD");

        if let Some(redis_url) = lookup("REDIS_URL").filter(|v| !v.is_empty()) {
            info!("REDIS_URL set, using the remote seen-set and single-cycle mode");
            self.cache.backend = CacheBackend::Redis;
            self.cache.redis_url = Some(redis_url);
            self.polling.run_once = true;
        }
    }

    pub fn apply_process_env(&mut self) {
        self.apply_env(|var| std::env::var(var).ok());
    }

    /// Fills username and password from `reddit.credentials_file` when they are unset.
    pub fn apply_credentials_file(&mut self) -> Result<(), CoreError> {
        let Some(path) = self.reddit.credentials_file.clone() else {
            return Ok(());
        };
        if self.reddit.username.is_some() && self.reddit.password.is_some() {
            return Ok(());
        }
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let raw = std::fs::read_to_string(&path)?;
        let file: CredentialsFile = serde_json::from_str(&raw)?;
        self.reddit.username.get_or_insert(file.user);
        self.reddit.password.get_or_insert(file.pwd);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.subreddits.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::MissingField {
                field: "sources.subreddits".to_string(),
            });
        }
        if self.sources.fetch_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sources.fetch_limit".to_string(),
                value: "0".to_string(),
            });
        }
        if self.mirrors.poll_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "mirrors.poll_attempts".to_string(),
                value: "0".to_string(),
            });
        }
        if self.cache.backend == CacheBackend::Redis && self.cache.redis_url.is_none() {
            return Err(ConfigError::MissingField {
                field: "cache.redis_url".to_string(),
            });
        }
        Ok(())
    }

    pub fn credentials(&self) -> Result<RedditCredentials, ConfigError> {
        fn required(value: &Option<String>, field: &str) -> Result<String, ConfigError> {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingField {
                    field: field.to_string(),
                })
        }

        Ok(RedditCredentials {
            client_id: required(&self.reddit.client_id, "reddit.client_id")?,
            client_secret: required(&self.reddit.client_secret, "reddit.client_secret")?,
            username: required(&self.reddit.username, "reddit.username")?,
            password: required(&self.reddit.password, "reddit.password")?,
        })
    }
}
