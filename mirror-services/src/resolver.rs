//! Turns a post URL into a direct media URL according to its dispatch strategy.

use async_trait::async_trait;
use mirror_core::{media_id, MediaResolver, ResolveError, ResolveStrategy};
use reqwest::Client;
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

pub const PLAYER_STREAM_PROPERTY: &str = "twitter:player:stream";

#[derive(Debug, Clone)]
pub struct ResolverEndpoints {
    pub gfycat: String,
    pub mediacrush_cdn: String,
    pub offsided: String,
    pub streamable: String,
}

impl Default for ResolverEndpoints {
    fn default() -> Self {
        Self {
            gfycat: "http://www.gfycat.com".to_string(),
            mediacrush_cdn: "https://cdn.mediacru.sh".to_string(),
            offsided: "http://offsided.com".to_string(),
            streamable: "https://api.streamable.com".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GfycatInfo {
    #[serde(rename = "gfyItem")]
    gfy_item: GfycatItem,
}

#[derive(Debug, Deserialize)]
struct GfycatItem {
    #[serde(rename = "mp4Url")]
    mp4_url: String,
}

pub struct HttpMediaResolver {
    client: Client,
    endpoints: ResolverEndpoints,
}

impl HttpMediaResolver {
    pub fn new(client: Client) -> Self {
        Self::with_endpoints(client, ResolverEndpoints::default())
    }

    pub fn with_endpoints(client: Client, endpoints: ResolverEndpoints) -> Self {
        Self { client, endpoints }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ResolveError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("Request to {} failed: {}", url, e);
            ResolveError::InvalidResponse {
                url: url.to_string(),
                details: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned {}", url, status);
            return Err(ResolveError::UnexpectedStatus {
                url: url.to_string(),
                status_code: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ResolveError::InvalidResponse {
                url: url.to_string(),
                details: e.to_string(),
            })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ResolveError> {
        let body = self.fetch_text(url).await?;
        serde_json::from_str(&body).map_err(|e| ResolveError::InvalidResponse {
            url: url.to_string(),
            details: e.to_string(),
        })
    }

    async fn player_stream(&self, post_url: &str) -> Result<String, ResolveError> {
        let html = self.fetch_text(post_url).await?;
        extract_player_stream(&html).ok_or_else(|| ResolveError::MetaTagMissing {
            property: PLAYER_STREAM_PROPERTY.to_string(),
            url: post_url.to_string(),
        })
    }

    async fn gfycat_mp4(&self, post_url: &str) -> Result<String, ResolveError> {
        let id = require_id(post_url)?;
        let info_url = format!("{}/cajax/get/{}", self.endpoints.gfycat, id);
        let info: GfycatInfo = self.fetch_json(&info_url).await?;
        Ok(info.gfy_item.mp4_url)
    }

    async fn offsided_mp4(&self, post_url: &str) -> Result<String, ResolveError> {
        let id = require_id(post_url)?;
        let info_url = format!("{}/link/{}", self.endpoints.offsided, id);
        let info: Value = self.fetch_json(&info_url).await?;
        offsided_mp4_url(&info).ok_or_else(|| ResolveError::InvalidResponse {
            url: info_url,
            details: "no mp4_url in link info".to_string(),
        })
    }

    async fn streamable_mp4(&self, post_url: &str) -> Result<String, ResolveError> {
        let id = require_id(post_url)?;
        let info_url = format!("{}/videos/{}", self.endpoints.streamable, id);
        let info: Value = self.fetch_json(&info_url).await?;
        streamable_mp4_url(&info).ok_or_else(|| ResolveError::InvalidResponse {
            url: info_url,
            details: "no files.mp4.url in video info".to_string(),
        })
    }
}

fn require_id(post_url: &str) -> Result<String, ResolveError> {
    media_id(post_url).ok_or_else(|| ResolveError::InvalidUrl {
        url: post_url.to_string(),
    })
}

/// Content of the player stream meta tag, without its query string.
pub fn extract_player_stream(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(&format!(
        r#"meta[property="{0}"], meta[name="{0}"]"#,
        PLAYER_STREAM_PROPERTY
    ))
    .ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.split('?').next().unwrap_or(content).trim())
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

pub fn offsided_mp4_url(info: &Value) -> Option<String> {
    info.get("mp4_url")
        .or_else(|| info.get("source").and_then(|source| source.get("mp4_url")))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn streamable_mp4_url(info: &Value) -> Option<String> {
    let url = info.pointer("/files/mp4/url")?.as_str()?;
    if url.starts_with("//") {
        Some(format!("https:{}", url))
    } else {
        Some(url.to_string())
    }
}

pub fn mediacrush_cdn_url(cdn_base: &str, post_url: &str) -> Result<String, ResolveError> {
    let id = require_id(post_url)?;
    Ok(format!("{}/{}.mp4", cdn_base.trim_end_matches('/'), id))
}

#[async_trait]
impl MediaResolver for HttpMediaResolver {
    async fn resolve(
        &self,
        strategy: ResolveStrategy,
        post_url: &str,
    ) -> Result<String, ResolveError> {
        debug!("Resolving {} with {:?}", post_url, strategy);
        let media_url = match strategy {
            ResolveStrategy::PassThrough => return Ok(post_url.to_string()),
            ResolveStrategy::PlayerMetaTag => self.player_stream(post_url).await?,
            ResolveStrategy::GfycatInfo => self.gfycat_mp4(post_url).await?,
            ResolveStrategy::MediacrushCdn => {
                mediacrush_cdn_url(&self.endpoints.mediacrush_cdn, post_url)?
            }
            ResolveStrategy::OffsidedInfo => self.offsided_mp4(post_url).await?,
            ResolveStrategy::StreamableInfo => self.streamable_mp4(post_url).await?,
        };
        info!("Resolved {} to {}", post_url, media_url);
        Ok(media_url)
    }
}
