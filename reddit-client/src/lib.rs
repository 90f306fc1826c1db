use async_trait::async_trait;
use mirror_core::{
    CoreError, RedditApiError, RedditComment, RedditCredentials, RedditGateway, RedditPost,
};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, ResourceOwnerPassword,
    ResourceOwnerUsername, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

pub mod api;
pub mod rate_limiter;
pub mod retry;


use api::RedditApiClient;
use retry::{RetryConfig, RetryExecutor};

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Tokens are renewed this long before Reddit would expire them.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

impl RedditOAuth2Config {
    pub fn new(
        client_id: String,
        client_secret: String,
        username: String,
        password: String,
        user_agent: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            username,
            password,
            user_agent,
        }
    }

    pub fn from_credentials(credentials: &RedditCredentials, user_agent: &str) -> Self {
        Self::new(
            credentials.client_id.clone(),
            credentials.client_secret.clone(),
            credentials.username.clone(),
            credentials.password.clone(),
            user_agent.to_string(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub enum AuthState {
    NotAuthenticated,
    Authenticated { token: RedditToken },
    TokenExpired { token: RedditToken },
}

/// Script-app client logged in as the bot account.
pub struct RedditClient {
    config: RedditOAuth2Config,
    oauth_client: BasicClient,
    token_http: reqwest::Client,
    auth_state: RwLock<AuthState>,
    api_client: RedditApiClient,
    read_retry: RetryExecutor,
}

impl RedditClient {
    pub fn new(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| {
            CoreError::InvalidInput {
                message: format!("Invalid auth URL: {}", e),
            }
        })?;
        let token_url = TokenUrl::new(REDDIT_TOKEN_URL.to_string()).map_err(|e| {
            CoreError::InvalidInput {
                message: format!("Invalid token URL: {}", e),
            }
        })?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::BasicAuth);

        // Reddit rejects token requests without a descriptive User-Agent
        let token_http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        let api_client = RedditApiClient::new(config.user_agent.clone())?;

        Ok(Self {
            config,
            oauth_client,
            token_http,
            auth_state: RwLock::new(AuthState::NotAuthenticated),
            api_client,
            read_retry: RetryExecutor::new(RetryConfig::reddit()),
        })
    }

    pub fn get_required_scopes() -> Vec<&'static str> {
        vec!["identity", "read", "submit"]
    }

    /// Password-grant login as the configured account.
    pub async fn authenticate(&self) -> Result<(), CoreError> {
        info!("Logging in to Reddit as /u/{}", self.config.username);

        let username = ResourceOwnerUsername::new(self.config.username.clone());
        let password = ResourceOwnerPassword::new(self.config.password.clone());
        let mut request = self.oauth_client.exchange_password(&username, &password);
        for scope in Self::get_required_scopes() {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        let http = self.token_http.clone();
        let token_result = request
            .request_async(move |request| send_token_request(http, request))
            .await
            .map_err(|e| {
                CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: e.to_string(),
                })
            })?;

        let expires_in = token_result
            .expires_in()
            .unwrap_or(Duration::from_secs(3600));
        let token = RedditToken {
            access_token: token_result.access_token().secret().clone(),
            refresh_token: token_result
                .refresh_token()
                .map(|token| token.secret().clone()),
            expires_at: SystemTime::now() + expires_in,
            scope: token_result
                .scopes()
                .map(|scopes| scopes.iter().map(|scope| scope.to_string()).collect())
                .unwrap_or_else(|| {
                    Self::get_required_scopes()
                        .into_iter()
                        .map(String::from)
                        .collect()
                }),
        };

        self.set_token(token);
        info!("Logged in to Reddit, token valid for {:?}", expires_in);
        Ok(())
    }

    pub fn get_auth_state(&self) -> AuthState {
        self.read_state().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.read_state(), AuthState::Authenticated { .. })
    }

    pub fn set_token(&self, token: RedditToken) {
        let state = if token.is_expired() {
            AuthState::TokenExpired { token }
        } else {
            AuthState::Authenticated { token }
        };
        *self.write_state() = state;
    }

    /// Returns a usable access token, logging in again if the current one expired.
    pub async fn ensure_authenticated(&self) -> Result<String, CoreError> {
        let state = self.get_auth_state();
        match state {
            AuthState::NotAuthenticated => {
                Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: "Not authenticated".to_string(),
                }))
            }
            AuthState::Authenticated { token } if !token.is_expired() => Ok(token.access_token),
            AuthState::Authenticated { token } | AuthState::TokenExpired { token } => {
                debug!("Access token expired, logging in again");
                *self.write_state() = AuthState::TokenExpired { token };
                self.authenticate().await?;
                match self.get_auth_state() {
                    AuthState::Authenticated { token } => Ok(token.access_token),
                    _ => Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                        reason: "Token refresh did not produce a valid token".to_string(),
                    })),
                }
            }
        }
    }

    /// A 401 means Reddit revoked the token early; the next call logs in again.
    fn note_error(&self, error: &CoreError) {
        if !matches!(error, CoreError::RedditApi(RedditApiError::InvalidToken)) {
            return;
        }
        let mut state = self.write_state();
        if let AuthState::Authenticated { token } = &*state {
            warn!("Reddit rejected the access token, will log in again");
            *state = AuthState::TokenExpired {
                token: token.clone(),
            };
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, AuthState> {
        self.auth_state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.auth_state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn send_token_request(
    http: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = http
        .request(request.method, request.url)
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

#[async_trait]
impl RedditGateway for RedditClient {
    async fn new_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<RedditPost>, CoreError> {
        let token = self.ensure_authenticated().await?;
        let token = token.as_str();
        let listing = self
            .read_retry
            .execute("new_posts", move || {
                self.api_client.get_new_posts(token, subreddit, limit)
            })
            .await
            .inspect_err(|e| self.note_error(e))?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into())
            .collect())
    }

    async fn comments(&self, post_id: &str) -> Result<Vec<RedditComment>, CoreError> {
        let token = self.ensure_authenticated().await?;
        let token = token.as_str();
        self.read_retry
            .execute("comments", move || self.api_client.get_comments(token, post_id))
            .await
            .inspect_err(|e| self.note_error(e))
    }

    /// Never retried: a retry after a lost response would double-post.
    async fn add_comment(&self, post_id: &str, text: &str) -> Result<(), CoreError> {
        let token = self.ensure_authenticated().await?;
        let thing_id = format!("t3_{}", post_id);
        self.api_client
            .submit_comment(&token, &thing_id, text)
            .await
            .inspect_err(|e| self.note_error(e))
    }
}
