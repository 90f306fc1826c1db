use crate::http::{read_json, request_error, trim_base};
use async_trait::async_trait;
use mirror_core::{MirrorConverter, MirrorError, MirrorService};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const IMGUR_API_BASE: &str = "https://api.imgur.com";

const SERVICE: MirrorService = MirrorService::Imgur;

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    image: &'a str,
    title: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    success: bool,
    #[serde(default)]
    data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Synchronous URL upload authorised with an application client id.
pub struct ImgurConverter {
    client: Client,
    base_url: String,
    client_id: String,
}

impl ImgurConverter {
    pub fn new(client: Client, client_id: String) -> Self {
        Self::with_base_url(client, client_id, IMGUR_API_BASE)
    }

    pub fn with_base_url(client: Client, client_id: String, base_url: &str) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            client_id,
        }
    }
}

pub(crate) fn uploaded_link(body: UploadResponse, media_url: &str) -> Result<String, MirrorError> {
    let data = body.data;
    if !body.success {
        let reason = data
            .and_then(|data| data.error)
            .map(|error| error.to_string())
            .unwrap_or_else(|| "upload failed".to_string());
        return Err(MirrorError::Rejected {
            service: SERVICE,
            url: media_url.to_string(),
            reason,
        });
    }
    data.and_then(|data| data.link)
        .ok_or_else(|| MirrorError::InvalidResponse {
            service: SERVICE,
            details: "successful upload without a link".to_string(),
        })
}

#[async_trait]
impl MirrorConverter for ImgurConverter {
    fn service(&self) -> MirrorService {
        SERVICE
    }

    async fn convert(&self, media_url: &str, title: &str) -> Result<String, MirrorError> {
        info!("Uploading {} to Imgur", media_url);
        let response = self
            .client
            .post(format!("{}/3/upload", self.base_url))
            .header(AUTHORIZATION, format!("Client-ID {}", self.client_id))
            .header(ACCEPT, "application/json")
            .json(&UploadRequest {
                image: media_url,
                title,
                kind: "URL",
            })
            .send()
            .await
            .map_err(|e| request_error(SERVICE, e))?;

        let body: UploadResponse = read_json(SERVICE, response, &[]).await?;
        let link = uploaded_link(body, media_url)?;
        info!("Imgur upload finished: {}", link);
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_http_client;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_successful_upload_link() {
        let body: UploadResponse = serde_json::from_str(
            r#"{"success": true, "status": 200, "data": {"link": "https://i.imgur.com/AbCdEf.gif"}}"#,
        )
        .unwrap();
        assert_eq!(
            uploaded_link(body, "u").unwrap(),
            "https://i.imgur.com/AbCdEf.gif"
        );
    }

    #[test]
    fn test_unsuccessful_upload_is_rejected() {
        let body: UploadResponse = serde_json::from_str(
            r#"{"success": false, "status": 400, "data": {"error": "File is over the size limit"}}"#,
        )
        .unwrap();
        assert!(matches!(
            uploaded_link(body, "u"),
            Err(MirrorError::Rejected { ref reason, .. }) if reason.contains("size limit")
        ));
    }

    #[tokio::test]
    async fn test_upload_sends_client_id() {
        let server = MockServer::start();
        let upload = server.mock(|when, then| {
            when.method(POST)
                .path("/3/upload")
                .header("authorization", "Client-ID abc123");
            then.status(200).json_body(json!({
                "success": true,
                "data": {"link": "https://i.imgur.com/Qw3r7y.gif"}
            }));
        });

        let client = build_http_client(Duration::from_secs(5)).unwrap();
        let converter =
            ImgurConverter::with_base_url(client, "abc123".to_string(), &server.base_url());
        let link = converter
            .convert("https://example.com/a.gif", "Goal")
            .await
            .unwrap();

        assert_eq!(link, "https://i.imgur.com/Qw3r7y.gif");
        upload.assert_calls(1);
    }
}
