//! Collaborator traits the pipeline is written against.

use async_trait::async_trait;

use crate::dispatch::ResolveStrategy;
use crate::error::{CacheError, CoreError, MirrorError, ResolveError};
use crate::seen::SeenSet;
use crate::types::{MirrorService, RedditComment, RedditPost};

#[async_trait]
pub trait RedditGateway: Send + Sync {
    /// Newest posts first.
    async fn new_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<RedditPost>, CoreError>;

    /// Every comment on the post, replies included.
    async fn comments(&self, post_id: &str) -> Result<Vec<RedditComment>, CoreError>;

    async fn add_comment(&self, post_id: &str, text: &str) -> Result<(), CoreError>;
}

#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, strategy: ResolveStrategy, post_url: &str)
        -> Result<String, ResolveError>;
}

#[async_trait]
pub trait MirrorConverter: Send + Sync {
    fn service(&self) -> MirrorService;

    /// Rehosts `media_url` and returns the public mirror URL.
    async fn convert(&self, media_url: &str, title: &str) -> Result<String, MirrorError>;
}

#[async_trait]
pub trait SeenStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn load(&self) -> Result<SeenSet, CacheError>;

    async fn save(&self, seen: &SeenSet) -> Result<(), CacheError>;
}
