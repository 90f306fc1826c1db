use crate::http::{read_json, request_error, trim_base};
use crate::poll::{poll_until, PollConfig, PollStatus};
use async_trait::async_trait;
use mirror_core::{MirrorConverter, MirrorError, MirrorService};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

pub const GFYCAT_UPLOAD_BASE: &str = "http://upload.gfycat.com";

const KEY_LEN: usize = 8;
const SERVICE: MirrorService = MirrorService::Gfycat;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GfycatStatus {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    task: Option<String>,
    #[serde(default, rename = "gfyname")]
    gfy_name: Option<String>,
}

/// Converts through `transcodeRelease` and waits on the status endpoint.
pub struct GfycatConverter {
    client: Client,
    base_url: String,
    poll: PollConfig,
}

impl GfycatConverter {
    pub fn new(client: Client, poll: PollConfig) -> Self {
        Self::with_base_url(client, poll, GFYCAT_UPLOAD_BASE)
    }

    pub fn with_base_url(client: Client, poll: PollConfig, base_url: &str) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            poll,
        }
    }

    async fn transcode(&self, media_url: &str, key: &str) -> Result<String, MirrorError> {
        let transcode_url = url::Url::parse_with_params(
            &format!("{}/transcodeRelease/{}", self.base_url, key),
            &[("noMd5", "true"), ("fetchUrl", media_url)],
        )
        .map_err(|e| MirrorError::Request {
            service: SERVICE,
            details: e.to_string(),
        })?;

        info!("Converting {} to Gfycat with key {}", media_url, key);
        let accepted = self.fetch_status(transcode_url.as_str()).await?;
        check_error(&accepted, media_url)?;

        let status_url = format!("{}/status/{}", self.base_url, key);
        let status_url = status_url.as_str();
        let gfy_url = poll_until(SERVICE, self.poll, move || async move {
            let status = self.fetch_status(status_url).await?;
            interpret_status(status, media_url)
        })
        .await?;

        info!("Gfycat conversion finished: {}", gfy_url);
        Ok(gfy_url)
    }

    async fn fetch_status(&self, url: &str) -> Result<GfycatStatus, MirrorError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, e))?;
        read_json(SERVICE, response, &[]).await
    }
}

pub(crate) fn random_key() -> String {
    std::iter::repeat_with(fastrand::alphanumeric)
        .take(KEY_LEN)
        .collect()
}

fn check_error(status: &GfycatStatus, media_url: &str) -> Result<(), MirrorError> {
    match &status.error {
        Some(reason) => Err(MirrorError::Rejected {
            service: SERVICE,
            url: media_url.to_string(),
            reason: reason.clone(),
        }),
        None => Ok(()),
    }
}

pub(crate) fn interpret_status(
    status: GfycatStatus,
    media_url: &str,
) -> Result<PollStatus<String>, MirrorError> {
    check_error(&status, media_url)?;
    if status.task.as_deref() != Some("complete") {
        return Ok(PollStatus::Pending);
    }
    match status.gfy_name {
        Some(name) => Ok(PollStatus::Ready(format!("http://gfycat.com/{}", name))),
        None => Err(MirrorError::InvalidResponse {
            service: SERVICE,
            details: "complete status without a gfyname".to_string(),
        }),
    }
}

#[async_trait]
impl MirrorConverter for GfycatConverter {
    fn service(&self) -> MirrorService {
        SERVICE
    }

    async fn convert(&self, media_url: &str, _title: &str) -> Result<String, MirrorError> {
        self.transcode(media_url, &random_key()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_http_client;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    const VINE_MP4: &str = "https://v.cdn.vine.co/r/videos/a.mp4";

    fn fast_poll() -> PollConfig {
        PollConfig {
            attempts: 60,
            interval: Duration::ZERO,
        }
    }

    fn converter(server: &MockServer) -> GfycatConverter {
        let client = build_http_client(Duration::from_secs(5)).unwrap();
        GfycatConverter::with_base_url(client, fast_poll(), &server.base_url())
    }

    fn status(json: &str) -> GfycatStatus {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_random_key_is_eight_alphanumerics() {
        let key = random_key();
        assert_eq!(key.len(), 8);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_complete_status_yields_gfycat_url() {
        let result = interpret_status(
            status(r#"{"task": "complete", "gfyname": "HappyGoal"}"#),
            "https://v.cdn.vine.co/r/videos/a.mp4",
        )
        .unwrap();
        assert_eq!(
            result,
            PollStatus::Ready("http://gfycat.com/HappyGoal".to_string())
        );
    }

    #[test]
    fn test_encoding_status_is_pending() {
        let result = interpret_status(status(r#"{"task": "encoding"}"#), "u").unwrap();
        assert_eq!(result, PollStatus::Pending);
    }

    #[test]
    fn test_error_field_fails() {
        let result = interpret_status(status(r#"{"error": "file too big"}"#), "u");
        assert!(matches!(
            result,
            Err(MirrorError::Rejected { ref reason, .. }) if reason == "file too big"
        ));
    }

    #[tokio::test]
    async fn test_transcode_polls_until_complete() {
        let server = MockServer::start();
        let transcode = server.mock(|when, then| {
            when.method(GET)
                .path("/transcodeRelease/Key12345")
                .query_param("noMd5", "true")
                .query_param("fetchUrl", VINE_MP4);
            then.status(200).json_body(json!({"isOk": true}));
        });
        let status = server.mock(|when, then| {
            when.method(GET).path("/status/Key12345");
            then.status(200)
                .json_body(json!({"task": "complete", "gfyname": "HappyGoal"}));
        });

        let result = converter(&server).transcode(VINE_MP4, "Key12345").await;

        assert_eq!(result.unwrap(), "http://gfycat.com/HappyGoal");
        transcode.assert_calls(1);
        status.assert_calls(1);
    }

    #[tokio::test]
    async fn test_status_that_never_completes_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/transcodeRelease/Key12345");
            then.status(200).json_body(json!({"isOk": true}));
        });
        let status = server.mock(|when, then| {
            when.method(GET).path("/status/Key12345");
            then.status(200).json_body(json!({"task": "encoding"}));
        });

        let result = converter(&server).transcode(VINE_MP4, "Key12345").await;

        assert!(matches!(
            result,
            Err(MirrorError::Timeout {
                service: MirrorService::Gfycat,
                attempts: 60
            })
        ));
        status.assert_calls(60);
    }

    #[tokio::test]
    async fn test_rejected_transcode_skips_polling() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/transcodeRelease/Key12345");
            then.status(200).json_body(json!({"error": "not a video"}));
        });
        let status = server.mock(|when, then| {
            when.method(GET).path("/status/Key12345");
            then.status(200).json_body(json!({"task": "encoding"}));
        });

        let result = converter(&server).transcode(VINE_MP4, "Key12345").await;

        assert!(matches!(result, Err(MirrorError::Rejected { .. })));
        status.assert_calls(0);
    }
}
