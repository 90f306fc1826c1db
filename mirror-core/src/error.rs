use thiserror::Error;

use crate::types::MirrorService;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit API error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("Mirror error: {0}")]
    Mirror(#[from] MirrorError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Seen cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum RedditApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Subreddit not found: {subreddit}")]
    SubredditNotFound { subreddit: String },

    #[error("Post not found: {post_id}")]
    PostNotFound { post_id: String },

    #[error("Invalid OAuth token")]
    InvalidToken,

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Comment rejected ({code}): {message}")]
    CommentRejected { code: String, message: String },
}

/// Failure of a single mirror conversion. Never aborts the post.
#[derive(Error, Debug, Clone)]
pub enum MirrorError {
    #[error("{service} rejected {url}: {reason}")]
    Rejected {
        service: MirrorService,
        url: String,
        reason: String,
    },

    #[error("{service} returned status {status_code}: {body}")]
    UnexpectedStatus {
        service: MirrorService,
        status_code: u16,
        body: String,
    },

    #[error("Invalid response from {service}: {details}")]
    InvalidResponse {
        service: MirrorService,
        details: String,
    },

    #[error("{service} conversion timed out after {attempts} status checks")]
    Timeout {
        service: MirrorService,
        attempts: u32,
    },

    #[error("{service} request failed: {details}")]
    Request {
        service: MirrorService,
        details: String,
    },
}

impl MirrorError {
    pub fn service(&self) -> MirrorService {
        match self {
            MirrorError::Rejected { service, .. }
            | MirrorError::UnexpectedStatus { service, .. }
            | MirrorError::InvalidResponse { service, .. }
            | MirrorError::Timeout { service, .. }
            | MirrorError::Request { service, .. } => *service,
        }
    }
}

/// Failure to turn a post URL into a direct media URL. Aborts the post.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("No media meta tag `{property}` found at {url}")]
    MetaTagMissing { property: String, url: String },

    #[error("{url} returned status {status_code}")]
    UnexpectedStatus { url: String, status_code: u16 },

    #[error("Invalid response from {url}: {details}")]
    InvalidResponse { url: String, details: String },

    #[error("Cannot derive a media id from {url}")]
    InvalidUrl { url: String },
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Malformed seen-set snapshot: {details}")]
    MalformedSnapshot { details: String },

    #[error("Unsupported seen-set schema version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Seen-set backend `{backend}` failed: {details}")]
    Backend { backend: String, details: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
