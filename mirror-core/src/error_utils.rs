use crate::error::*;
use std::time::Duration;
use tracing::{error, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::RedditApi(e) => {
                error!("Reddit API error details: {:?}", e);
            }
            CoreError::Mirror(e) => {
                error!("Mirror error details: {:?}", e);
            }
            CoreError::Resolve(e) => {
                error!("Resolve error details: {:?}", e);
            }
            CoreError::Cache(e) => {
                error!("Seen cache error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::RedditApi(e) => e.is_retryable(),
            CoreError::Mirror(e) => e.is_retryable(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            CoreError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(e) => e.retry_after(),
            CoreError::Timeout { seconds } => Some(Duration::from_secs(*seconds)),
            _ if self.is_retryable() => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Mirror(e) => e.user_friendly_message(),
            CoreError::Resolve(e) => e.user_friendly_message(),
            CoreError::Cache(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            CoreError::Timeout { .. } => {
                "The operation took too long to complete. Please try again.".to_string()
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API".to_string(),
            CoreError::Mirror(_) => "MIRROR".to_string(),
            CoreError::Resolve(_) => "RESOLVE".to_string(),
            CoreError::Cache(_) => "CACHE".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for RedditApiError {
    fn log_error(&self) -> &Self {
        error!("RedditApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("RedditApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            RedditApiError::RateLimitExceeded { .. } => true,
            RedditApiError::RequestTimeout => true,
            RedditApiError::ServerError { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            RedditApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ if self.is_retryable() => Some(Duration::from_secs(30)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => {
                "Reddit login failed. Please check the bot credentials.".to_string()
            }
            RedditApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            RedditApiError::Forbidden { resource } => {
                format!("Access denied to {}.", resource)
            }
            RedditApiError::SubredditNotFound { subreddit } => {
                format!("Subreddit '{}' not found or is private.", subreddit)
            }
            RedditApiError::PostNotFound { .. } => {
                "The requested post could not be found.".to_string()
            }
            RedditApiError::InvalidToken => {
                "Reddit authentication token is invalid. Logging in again.".to_string()
            }
            RedditApiError::RequestTimeout => {
                "Request to Reddit timed out. Please try again.".to_string()
            }
            RedditApiError::CommentRejected { message, .. } => {
                format!("Reddit rejected the comment: {}", message)
            }
            _ => "Reddit API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED".to_string(),
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT".to_string(),
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN".to_string(),
            RedditApiError::SubredditNotFound { .. } => "REDDIT_SUBREDDIT_NOT_FOUND".to_string(),
            RedditApiError::PostNotFound { .. } => "REDDIT_POST_NOT_FOUND".to_string(),
            RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN".to_string(),
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT".to_string(),
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE".to_string(),
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR".to_string(),
            RedditApiError::CommentRejected { .. } => "REDDIT_COMMENT_REJECTED".to_string(),
        }
    }
}

impl ErrorExt for MirrorError {
    fn log_error(&self) -> &Self {
        error!(service = %self.service(), "MirrorError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(service = %self.service(), "MirrorError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            MirrorError::UnexpectedStatus { status_code, .. } => *status_code >= 500,
            MirrorError::Request { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_secs(10))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            MirrorError::Timeout { service, .. } => {
                format!("{} did not finish converting in time.", service)
            }
            MirrorError::Rejected { service, reason, .. } => {
                format!("{} refused the upload: {}", service, reason)
            }
            _ => format!("{} is unavailable right now.", self.service()),
        }
    }

    fn error_code(&self) -> String {
        match self {
            MirrorError::Rejected { .. } => "MIRROR_REJECTED".to_string(),
            MirrorError::UnexpectedStatus { .. } => "MIRROR_BAD_STATUS".to_string(),
            MirrorError::InvalidResponse { .. } => "MIRROR_INVALID_RESPONSE".to_string(),
            MirrorError::Timeout { .. } => "MIRROR_TIMEOUT".to_string(),
            MirrorError::Request { .. } => "MIRROR_REQUEST_FAILED".to_string(),
        }
    }
}

impl ErrorExt for ResolveError {
    fn log_error(&self) -> &Self {
        error!("ResolveError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ResolveError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::UnexpectedStatus { status_code, .. } if *status_code >= 500)
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ResolveError::MetaTagMissing { url, .. } => {
                format!("Could not find the video behind {}.", url)
            }
            _ => "Could not resolve the media URL of the post.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ResolveError::MetaTagMissing { .. } => "RESOLVE_META_MISSING".to_string(),
            ResolveError::UnexpectedStatus { .. } => "RESOLVE_BAD_STATUS".to_string(),
            ResolveError::InvalidResponse { .. } => "RESOLVE_INVALID_RESPONSE".to_string(),
            ResolveError::InvalidUrl { .. } => "RESOLVE_INVALID_URL".to_string(),
        }
    }
}

impl ErrorExt for CacheError {
    fn log_error(&self) -> &Self {
        error!("CacheError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CacheError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(self, CacheError::Backend { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_secs(1))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CacheError::MalformedSnapshot { .. } | CacheError::UnsupportedVersion { .. } => {
                "The seen-set cache is unreadable. Fix or remove it before restarting.".to_string()
            }
            CacheError::Backend { backend, .. } => {
                format!("The {} seen-set backend is unavailable.", backend)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            CacheError::MalformedSnapshot { .. } => "CACHE_MALFORMED".to_string(),
            CacheError::UnsupportedVersion { .. } => "CACHE_VERSION".to_string(),
            CacheError::Backend { .. } => "CACHE_BACKEND".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false // Config errors are typically not retryable
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}
