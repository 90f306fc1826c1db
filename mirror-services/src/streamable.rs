use crate::http::{read_json, request_error, trim_base};
use async_trait::async_trait;
use mirror_core::{MirrorConverter, MirrorError, MirrorService};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

pub const STREAMABLE_API_BASE: &str = "https://api.streamable.com";

const SERVICE: MirrorService = MirrorService::Streamable;

#[derive(Debug, Deserialize)]
pub(crate) struct ImportResponse {
    #[serde(default)]
    shortcode: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StreamableCredentials {
    pub username: String,
    pub password: String,
}

/// Import by URL; the shortcode is usable immediately.
pub struct StreamableConverter {
    client: Client,
    base_url: String,
    credentials: StreamableCredentials,
}

impl StreamableConverter {
    pub fn new(client: Client, credentials: StreamableCredentials) -> Self {
        Self::with_base_url(client, credentials, STREAMABLE_API_BASE)
    }

    pub fn with_base_url(
        client: Client,
        credentials: StreamableCredentials,
        base_url: &str,
    ) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            credentials,
        }
    }
}

pub(crate) fn shortcode_url(body: ImportResponse, media_url: &str) -> Result<String, MirrorError> {
    match body.shortcode {
        Some(code) if !code.is_empty() => Ok(format!("https://streamable.com/{}", code)),
        _ => Err(MirrorError::Rejected {
            service: SERVICE,
            url: media_url.to_string(),
            reason: "import response without a shortcode".to_string(),
        }),
    }
}

#[async_trait]
impl MirrorConverter for StreamableConverter {
    fn service(&self) -> MirrorService {
        SERVICE
    }

    async fn convert(&self, media_url: &str, _title: &str) -> Result<String, MirrorError> {
        info!("Importing {} to Streamable", media_url);
        let response = self
            .client
            .get(format!("{}/import", self.base_url))
            .query(&[("url", media_url), ("noresize", "")])
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|e| request_error(SERVICE, e))?;

        let body: ImportResponse = read_json(SERVICE, response, &[]).await?;
        let mirror_url = shortcode_url(body, media_url)?;
        info!("Streamable import finished: {}", mirror_url);
        Ok(mirror_url)
    }
}
