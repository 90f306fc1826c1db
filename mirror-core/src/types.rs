use serde::{Deserialize, Serialize};
use std::fmt;

/// A submission as seen by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    pub subreddit: String,
    pub url: String,
    pub domain: String,
    pub permalink: String,
    pub created_utc: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedditComment {
    pub id: String,
    pub author: String,
    pub body: String,
}

/// Hosting services a post can be mirrored to, in comment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorService {
    Gfycat,
    Mediacrush,
    Offsided,
    Imgur,
    Streamable,
}

impl MirrorService {
    pub const ALL: [MirrorService; 5] = [
        MirrorService::Gfycat,
        MirrorService::Mediacrush,
        MirrorService::Offsided,
        MirrorService::Imgur,
        MirrorService::Streamable,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            MirrorService::Gfycat => "Gfycat",
            MirrorService::Mediacrush => "Mediacrush",
            MirrorService::Offsided => "Offsided",
            MirrorService::Imgur => "Imgur",
            MirrorService::Streamable => "Streamable",
        }
    }
}

impl fmt::Display for MirrorService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One record per processed post. Each mirror field is write-once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirroredRecord {
    pub post_id: String,
    pub original_url: String,
    pub original_domain: String,
    pub gfycat_url: Option<String>,
    pub mediacrush_url: Option<String>,
    pub offsided_url: Option<String>,
    pub imgur_url: Option<String>,
    pub streamable_url: Option<String>,
}

impl MirroredRecord {
    pub fn new(post: &RedditPost) -> Self {
        Self {
            post_id: post.id.clone(),
            original_url: post.url.clone(),
            original_domain: post.domain.clone(),
            gfycat_url: None,
            mediacrush_url: None,
            offsided_url: None,
            imgur_url: None,
            streamable_url: None,
        }
    }

    fn slot_mut(&mut self, service: MirrorService) -> &mut Option<String> {
        match service {
            MirrorService::Gfycat => &mut self.gfycat_url,
            MirrorService::Mediacrush => &mut self.mediacrush_url,
            MirrorService::Offsided => &mut self.offsided_url,
            MirrorService::Imgur => &mut self.imgur_url,
            MirrorService::Streamable => &mut self.streamable_url,
        }
    }

    pub fn get(&self, service: MirrorService) -> Option<&str> {
        match service {
            MirrorService::Gfycat => self.gfycat_url.as_deref(),
            MirrorService::Mediacrush => self.mediacrush_url.as_deref(),
            MirrorService::Offsided => self.offsided_url.as_deref(),
            MirrorService::Imgur => self.imgur_url.as_deref(),
            MirrorService::Streamable => self.streamable_url.as_deref(),
        }
    }

    /// Stores `url` for `service` unless a value is already present.
    /// Returns whether the value was written.
    pub fn set(&mut self, service: MirrorService, url: impl Into<String>) -> bool {
        let slot = self.slot_mut(service);
        if slot.is_some() {
            return false;
        }
        *slot = Some(url.into());
        true
    }

    pub fn populated(&self) -> impl Iterator<Item = (MirrorService, &str)> + '_ {
        MirrorService::ALL
            .into_iter()
            .filter_map(move |service| self.get(service).map(|url| (service, url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> RedditPost {
        RedditPost {
            id: "abc1".to_string(),
            title: "Goal".to_string(),
            subreddit: "soccer".to_string(),
            url: "https://vine.co/v/xyz".to_string(),
            domain: "vine.co".to_string(),
            permalink: "/r/soccer/comments/abc1/goal/".to_string(),
            created_utc: 1_400_000_000,
        }
    }

    #[test]
    fn test_mirror_fields_are_write_once() {
        let mut record = MirroredRecord::new(&post());
        assert!(record.set(MirrorService::Gfycat, "http://gfycat.com/First"));
        assert!(!record.set(MirrorService::Gfycat, "http://gfycat.com/Second"));
        assert_eq!(
            record.get(MirrorService::Gfycat),
            Some("http://gfycat.com/First")
        );
    }

    #[test]
    fn test_populated_follows_service_order() {
        let mut record = MirroredRecord::new(&post());
        record.set(MirrorService::Streamable, "https://streamable.com/s");
        record.set(MirrorService::Gfycat, "http://gfycat.com/G");
        record.set(MirrorService::Offsided, "http://offsided.com/o");

        let services: Vec<_> = record.populated().map(|(s, _)| s).collect();
        assert_eq!(
            services,
            vec![
                MirrorService::Gfycat,
                MirrorService::Offsided,
                MirrorService::Streamable
            ]
        );
    }
}
