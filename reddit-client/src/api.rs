use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use mirror_core::{CoreError, RedditApiError, RedditComment, RedditPost};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    pub subreddit: String,
    pub url: String,
    pub domain: String,
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub is_self: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub body: String,
    /// Either an empty string or a nested listing.
    #[serde(default)]
    pub replies: Value,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    json: CommentResponseBody,
}

#[derive(Debug, Deserialize)]
struct CommentResponseBody {
    #[serde(default)]
    errors: Vec<Vec<Value>>,
    #[serde(default)]
    ratelimit: Option<f64>,
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: RateLimiter,
    user_agent: String,
    base_url: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        Self::with_base_url(user_agent, REDDIT_API_BASE.to_string())
    }

    pub fn with_base_url(user_agent: String, base_url: String) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(RateLimitConfig::reddit_oauth()),
            user_agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let permit = self.rate_limiter.acquire_permit().await;
        debug!(
            "Acquired rate limit permit for {} {} after {:?}",
            method, endpoint, permit.queue_wait_time
        );

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }
        if let Some(fields) = form {
            request_builder = request_builder.form(fields);
        }

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let api_error = match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            401 => RedditApiError::InvalidToken,
            403 => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            404 => not_found_error(endpoint),
            code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
            code => {
                let body = response.text().await.unwrap_or_default();
                RedditApiError::InvalidResponse {
                    details: format!("Unexpected status {} for {}: {}", code, endpoint, body),
                }
            }
        };
        Err(CoreError::RedditApi(api_error))
    }

    /// Newest posts of a subreddit, newest first.
    pub async fn get_new_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        limit: u32,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/new", subreddit);
        let limit_str = limit.to_string();
        let params = [("limit", limit_str.as_str()), ("raw_json", "1")];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params), None)
            .await?;

        let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
            error!("Failed to parse subreddit posts: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse posts for r/{}", subreddit),
            })
        })?;

        info!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }

    /// All comments on a post, flattened depth-first.
    pub async fn get_comments(
        &self,
        access_token: &str,
        post_id: &str,
    ) -> Result<Vec<RedditComment>, CoreError> {
        let endpoint = format!("/comments/{}", post_id);
        let params = [("limit", "500"), ("raw_json", "1")];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params), None)
            .await?;

        let listings: Vec<RedditListing<Value>> = response.json().await.map_err(|e| {
            error!("Failed to parse comments for {}: {}", post_id, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse comments for {}", post_id),
            })
        })?;

        let comments = comments_from_listings(&listings);
        debug!("Post {} has {} comments", post_id, comments.len());
        Ok(comments)
    }

    /// Posts `text` as a top-level comment on `thing_id` (`t3_<id>`).
    pub async fn submit_comment(
        &self,
        access_token: &str,
        thing_id: &str,
        text: &str,
    ) -> Result<(), CoreError> {
        let form = [("api_type", "json"), ("thing_id", thing_id), ("text", text)];

        let response = self
            .make_request(Method::POST, "/api/comment", access_token, None, Some(&form))
            .await?;

        let body: CommentResponse = response.json().await.map_err(|e| {
            error!("Failed to parse comment response for {}: {}", thing_id, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse comment response for {}", thing_id),
            })
        })?;

        check_comment_response(body.json)?;
        info!("Comment posted on {}", thing_id);
        Ok(())
    }
}

/// The comments endpoint returns `[post listing, comment listing]`.
pub fn comments_from_listings(listings: &[RedditListing<Value>]) -> Vec<RedditComment> {
    let mut comments = Vec::new();
    if let Some(comment_listing) = listings.get(1) {
        flatten_comments(comment_listing, &mut comments);
    }
    comments
}

fn flatten_comments(listing: &RedditListing<Value>, out: &mut Vec<RedditComment>) {
    for child in &listing.data.children {
        // "more" stubs carry no author
        if child.kind != "t1" {
            continue;
        }
        let data: RedditCommentData = match serde_json::from_value(child.data.clone()) {
            Ok(data) => data,
            Err(e) => {
                warn!("Skipping unparseable comment: {}", e);
                continue;
            }
        };

        let replies = match &data.replies {
            Value::Object(_) => {
                serde_json::from_value::<RedditListing<Value>>(data.replies.clone()).ok()
            }
            _ => None,
        };

        out.push(RedditComment {
            id: data.id,
            author: data.author,
            body: data.body,
        });

        if let Some(replies) = replies {
            flatten_comments(&replies, out);
        }
    }
}

/// Maps a 404 to the resource the endpoint names.
fn not_found_error(endpoint: &str) -> RedditApiError {
    if let Some(post_id) = endpoint.strip_prefix("/comments/") {
        return RedditApiError::PostNotFound {
            post_id: post_id.to_string(),
        };
    }
    if let Some(subreddit) = endpoint
        .strip_prefix("/r/")
        .and_then(|rest| rest.strip_suffix("/new"))
    {
        return RedditApiError::SubredditNotFound {
            subreddit: subreddit.to_string(),
        };
    }
    RedditApiError::InvalidResponse {
        details: format!("Resource not found: {}", endpoint),
    }
}

fn check_comment_response(body: CommentResponseBody) -> Result<(), RedditApiError> {
    let Some(first) = body.errors.first() else {
        return Ok(());
    };

    let field = |index: usize| {
        first
            .get(index)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let code = field(0);
    let message = field(1);

    if code == "RATELIMIT" {
        let retry_after = body.ratelimit.map(|secs| secs.ceil() as u64).unwrap_or(60);
        return Err(RedditApiError::RateLimitExceeded { retry_after });
    }
    Err(RedditApiError::CommentRejected { code, message })
}

impl From<RedditPostData> for RedditPost {
    fn from(post_data: RedditPostData) -> Self {
        Self {
            id: post_data.id,
            title: post_data.title,
            subreddit: post_data.subreddit,
            url: post_data.url,
            domain: post_data.domain,
            permalink: post_data.permalink,
            created_utc: post_data.created_utc as i64,
        }
    }
}
