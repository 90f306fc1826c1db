use std::collections::HashSet;

use crate::config::FilterSettings;
use crate::dispatch::extension;
use crate::seen::SeenSet;
use crate::types::{RedditComment, RedditPost};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Domain not allowed, or an allowed domain linking to a disabled extension.
    UnsupportedMedia,
    /// Post id or URL already in the seen-set.
    AlreadySeen,
    /// The bot already commented on the post.
    AlreadyCommented,
}

#[derive(Debug, Clone)]
pub struct PostFilter {
    allowed_domains: HashSet<String>,
    allowed_extensions: HashSet<String>,
    disabled_extensions: HashSet<String>,
    bot_name: String,
}

fn normalized(values: &[String]) -> HashSet<String> {
    values.iter().map(|v| v.to_ascii_lowercase()).collect()
}

impl PostFilter {
    pub fn new(settings: &FilterSettings, bot_name: impl Into<String>) -> Self {
        Self {
            allowed_domains: normalized(&settings.allowed_domains),
            allowed_extensions: normalized(&settings.allowed_extensions),
            disabled_extensions: normalized(&settings.disabled_extensions),
            bot_name: bot_name.into(),
        }
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// Domain / extension rule:
    /// `(domain allowed AND extension not disabled) OR extension always allowed`.
    pub fn is_supported_media(&self, post: &RedditPost) -> bool {
        let ext = extension(&post.url);
        let domain_ok = self
            .allowed_domains
            .contains(&post.domain.to_ascii_lowercase())
            && !self.disabled_extensions.contains(&ext);
        domain_ok || self.allowed_extensions.contains(&ext)
    }

    /// Checks that need no network access.
    pub fn precheck(&self, post: &RedditPost, seen: &SeenSet) -> Result<(), Rejection> {
        if !self.is_supported_media(post) {
            return Err(Rejection::UnsupportedMedia);
        }
        if seen.contains(&post.id) || seen.contains(&post.url) {
            return Err(Rejection::AlreadySeen);
        }
        Ok(())
    }

    pub fn has_own_comment(&self, comments: &[RedditComment]) -> bool {
        comments
            .iter()
            .any(|comment| comment.author.eq_ignore_ascii_case(&self.bot_name))
    }

    /// Full eligibility decision given the post's comments.
    pub fn evaluate(
        &self,
        post: &RedditPost,
        seen: &SeenSet,
        comments: &[RedditComment],
    ) -> Result<(), Rejection> {
        self.precheck(post, seen)?;
        if self.has_own_comment(comments) {
            return Err(Rejection::AlreadyCommented);
        }
        Ok(())
    }
}
