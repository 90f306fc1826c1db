use crate::http::{read_json, request_error, trim_base};
use crate::poll::{poll_until, PollConfig, PollStatus};
use async_trait::async_trait;
use mirror_core::{MirrorConverter, MirrorError, MirrorService};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

pub const MEDIACRUSH_BASE: &str = "https://mediacru.sh";

const SERVICE: MirrorService = MirrorService::Mediacrush;

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    status: String,
}

pub struct MediacrushConverter {
    client: Client,
    base_url: String,
    poll: PollConfig,
}

impl MediacrushConverter {
    pub fn new(client: Client, poll: PollConfig) -> Self {
        Self::with_base_url(client, poll, MEDIACRUSH_BASE)
    }

    pub fn with_base_url(client: Client, poll: PollConfig, base_url: &str) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            poll,
        }
    }

    async fn upload(&self, media_url: &str) -> Result<String, MirrorError> {
        let response = self
            .client
            .post(format!("{}/api/upload/url", self.base_url))
            .form(&[("url", media_url)])
            .send()
            .await
            .map_err(|e| request_error(SERVICE, e))?;

        // 409 means the file was uploaded before and carries its hash
        let body: UploadResponse = read_json(SERVICE, response, &[StatusCode::CONFLICT]).await?;
        upload_hash(body, media_url)
    }

    async fn status(&self, hash: &str, media_url: &str) -> Result<PollStatus<()>, MirrorError> {
        let response = self
            .client
            .get(format!("{}/api/{}/status", self.base_url, hash))
            .send()
            .await
            .map_err(|e| request_error(SERVICE, e))?;
        let body: StatusResponse = read_json(SERVICE, response, &[]).await?;
        interpret_status(&body.status, media_url)
    }
}

pub(crate) fn upload_hash(body: UploadResponse, media_url: &str) -> Result<String, MirrorError> {
    match (body.hash, body.error) {
        (Some(hash), _) if !hash.is_empty() => Ok(hash),
        (_, Some(error)) => Err(MirrorError::Rejected {
            service: SERVICE,
            url: media_url.to_string(),
            reason: error.to_string(),
        }),
        _ => Err(MirrorError::InvalidResponse {
            service: SERVICE,
            details: "upload response without a hash".to_string(),
        }),
    }
}

pub(crate) fn interpret_status(
    status: &str,
    media_url: &str,
) -> Result<PollStatus<()>, MirrorError> {
    match status {
        "done" | "ready" => Ok(PollStatus::Ready(())),
        "error" | "timeout" | "unrecognised" | "internal_error" => Err(MirrorError::Rejected {
            service: SERVICE,
            url: media_url.to_string(),
            reason: status.to_string(),
        }),
        other => {
            debug!("MediaCrush status {}", other);
            Ok(PollStatus::Pending)
        }
    }
}

#[async_trait]
impl MirrorConverter for MediacrushConverter {
    fn service(&self) -> MirrorService {
        SERVICE
    }

    async fn convert(&self, media_url: &str, _title: &str) -> Result<String, MirrorError> {
        info!("Uploading {} to MediaCrush", media_url);
        let hash = self.upload(media_url).await?;
        let hash = hash.as_str();

        poll_until(SERVICE, self.poll, move || async move {
            self.status(hash, media_url).await
        })
        .await?;

        let mirror_url = format!("{}/{}", self.base_url, hash);
        info!("MediaCrush upload finished: {}", mirror_url);
        Ok(mirror_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_http_client;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn converter(server: &MockServer) -> MediacrushConverter {
        let client = build_http_client(Duration::from_secs(5)).unwrap();
        let poll = PollConfig {
            attempts: 5,
            interval: Duration::ZERO,
        };
        MediacrushConverter::with_base_url(client, poll, &server.base_url())
    }

    #[test]
    fn test_upload_hash_accepts_existing_upload() {
        let body: UploadResponse =
            serde_json::from_str(r#"{"hash": "Ab12Cd34", "x-status": 409}"#).unwrap();
        assert_eq!(upload_hash(body, "u").unwrap(), "Ab12Cd34");
    }

    #[test]
    fn test_upload_error_is_rejected() {
        let body: UploadResponse = serde_json::from_str(r#"{"error": 415}"#).unwrap();
        assert!(matches!(
            upload_hash(body, "u"),
            Err(MirrorError::Rejected { .. })
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(interpret_status("done", "u").unwrap(), PollStatus::Ready(()));
        assert_eq!(interpret_status("ready", "u").unwrap(), PollStatus::Ready(()));
        assert_eq!(interpret_status("processing", "u").unwrap(), PollStatus::Pending);
        assert!(interpret_status("timeout", "u").is_err());
        assert!(interpret_status("unrecognised", "u").is_err());
    }

    #[tokio::test]
    async fn test_conflict_upload_reuses_existing_hash() {
        let server = MockServer::start();
        let upload = server.mock(|when, then| {
            when.method(POST).path("/api/upload/url");
            then.status(409)
                .json_body(json!({"hash": "Ab12Cd34", "x-status": 409}));
        });
        let status = server.mock(|when, then| {
            when.method(GET).path("/api/Ab12Cd34/status");
            then.status(200).json_body(json!({"status": "done"}));
        });

        let mirror_url = converter(&server)
            .convert("https://v.cdn.vine.co/r/videos/a.mp4", "Goal")
            .await
            .unwrap();

        assert_eq!(mirror_url, format!("{}/Ab12Cd34", server.base_url()));
        upload.assert_calls(1);
        status.assert_calls(1);
    }

    #[tokio::test]
    async fn test_failed_processing_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/upload/url");
            then.status(200).json_body(json!({"hash": "Ab12Cd34"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/Ab12Cd34/status");
            then.status(200).json_body(json!({"status": "unrecognised"}));
        });

        let result = converter(&server).convert("https://example.com/a.gif", "").await;

        assert!(matches!(
            result,
            Err(MirrorError::Rejected { ref reason, .. }) if reason == "unrecognised"
        ));
    }

    #[tokio::test]
    async fn test_server_error_on_upload() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/upload/url");
            then.status(500).body("boom");
        });

        let result = converter(&server).convert("https://example.com/a.gif", "").await;

        assert!(matches!(
            result,
            Err(MirrorError::UnexpectedStatus {
                status_code: 500,
                ..
            })
        ));
    }
}
