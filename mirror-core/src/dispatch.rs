//! Table-driven mapping from a post's domain to how its media is resolved
//! and which mirror it already is.

use crate::types::{MirrorService, RedditPost};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
    /// The post URL already points at the media.
    PassThrough,
    /// Scrape the `twitter:player:stream` meta tag of the landing page.
    PlayerMetaTag,
    /// Ask the Gfycat info endpoint for the mp4 URL.
    GfycatInfo,
    /// Rewrite to the MediaCrush CDN mp4.
    MediacrushCdn,
    /// Ask the Offsided link endpoint for the mp4 URL.
    OffsidedInfo,
    /// Ask the Streamable video endpoint for the mp4 URL.
    StreamableInfo,
}

#[derive(Debug, Clone, Copy)]
pub struct DomainRule {
    pub domain: &'static str,
    pub strategy: ResolveStrategy,
    /// The post itself is already hosted on this mirror.
    pub existing_mirror: Option<MirrorService>,
    /// Restricts `existing_mirror` to URLs with this extension.
    pub existing_mirror_extension: Option<&'static str>,
    /// Set for sources whose media carries audio.
    pub audio_source: Option<&'static str>,
}

impl DomainRule {
    const fn new(domain: &'static str, strategy: ResolveStrategy) -> Self {
        Self {
            domain,
            strategy,
            existing_mirror: None,
            existing_mirror_extension: None,
            audio_source: None,
        }
    }

    const fn mirrored_on(mut self, service: MirrorService) -> Self {
        self.existing_mirror = Some(service);
        self
    }

    const fn only_for_extension(mut self, extension: &'static str) -> Self {
        self.existing_mirror_extension = Some(extension);
        self
    }

    const fn with_audio(mut self, label: &'static str) -> Self {
        self.audio_source = Some(label);
        self
    }
}

pub const DOMAIN_RULES: &[DomainRule] = &[
    DomainRule::new("vine.co", ResolveStrategy::PlayerMetaTag).with_audio("Vine"),
    DomainRule::new("gfycat.com", ResolveStrategy::GfycatInfo).mirrored_on(MirrorService::Gfycat),
    DomainRule::new("giant.gfycat.com", ResolveStrategy::PassThrough)
        .mirrored_on(MirrorService::Gfycat),
    DomainRule::new("mediacru.sh", ResolveStrategy::MediacrushCdn)
        .mirrored_on(MirrorService::Mediacrush),
    DomainRule::new("offsided.com", ResolveStrategy::OffsidedInfo)
        .mirrored_on(MirrorService::Offsided),
    DomainRule::new("fitbamob.com", ResolveStrategy::OffsidedInfo)
        .mirrored_on(MirrorService::Offsided),
    DomainRule::new("imgur.com", ResolveStrategy::PassThrough)
        .mirrored_on(MirrorService::Imgur)
        .only_for_extension(".gif"),
    DomainRule::new("i.imgur.com", ResolveStrategy::PassThrough)
        .mirrored_on(MirrorService::Imgur)
        .only_for_extension(".gif"),
    DomainRule::new("streamable.com", ResolveStrategy::StreamableInfo)
        .mirrored_on(MirrorService::Streamable),
];

/// What to do with one accepted post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    pub strategy: ResolveStrategy,
    /// Mirror URL taken straight from the post; that converter is skipped.
    pub existing_mirror: Option<(MirrorService, String)>,
    pub audio_source: Option<&'static str>,
}

impl DispatchPlan {
    pub fn skips(&self, service: MirrorService) -> bool {
        matches!(self.existing_mirror, Some((existing, _)) if existing == service)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DomainDispatcher {
    rules: &'static [DomainRule],
}

impl Default for DomainDispatcher {
    fn default() -> Self {
        Self::new(DOMAIN_RULES)
    }
}

impl DomainDispatcher {
    pub fn new(rules: &'static [DomainRule]) -> Self {
        Self { rules }
    }

    pub fn rule_for(&self, domain: &str) -> Option<&'static DomainRule> {
        self.rules
            .iter()
            .find(|rule| rule.domain.eq_ignore_ascii_case(domain))
    }

    pub fn audio_source(&self, domain: &str) -> Option<&'static str> {
        self.rule_for(domain).and_then(|rule| rule.audio_source)
    }

    pub fn plan(&self, post: &RedditPost) -> DispatchPlan {
        let Some(rule) = self.rule_for(&post.domain) else {
            return DispatchPlan {
                strategy: ResolveStrategy::PassThrough,
                existing_mirror: None,
                audio_source: None,
            };
        };

        let extension_matches = rule
            .existing_mirror_extension
            .map_or(true, |wanted| extension(&post.url) == wanted);

        let existing_mirror = rule
            .existing_mirror
            .filter(|_| extension_matches)
            .and_then(|service| existing_mirror_url(service, &post.url).map(|url| (service, url)));

        DispatchPlan {
            strategy: rule.strategy,
            existing_mirror,
            audio_source: rule.audio_source,
        }
    }
}

fn existing_mirror_url(service: MirrorService, post_url: &str) -> Option<String> {
    match service {
        // Both gfycat.com/Name and giant.gfycat.com/Name.gif map to the page URL.
        MirrorService::Gfycat => media_id(post_url).map(|id| format!("https://gfycat.com/{id}")),
        _ => Some(post_url.to_string()),
    }
}

fn last_path_segment(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let trimmed = without_query.trim_end_matches('/');
    match trimmed.find("://") {
        Some(scheme_end) => {
            let rest = &trimmed[scheme_end + 3..];
            match rest.find('/') {
                Some(slash) => rest[slash..].rsplit('/').next().unwrap_or(""),
                None => "",
            }
        }
        None => trimmed.rsplit('/').next().unwrap_or(""),
    }
}

/// Lowercased extension of the URL's last path segment including the dot,
/// or an empty string.
pub fn extension(url: &str) -> String {
    let segment = last_path_segment(url);
    match segment.rfind('.') {
        Some(dot) if dot + 1 < segment.len() => segment[dot..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Media id of a `host/<id>` style URL, with any extension removed.
pub fn media_id(url: &str) -> Option<String> {
    let segment = last_path_segment(url);
    let id = match segment.rfind('.') {
        Some(dot) if dot > 0 => &segment[..dot],
        _ => segment,
    };
    (!id.is_empty()).then(|| id.to_string())
}
