use crate::http::{read_json, request_error, trim_base};
use crate::poll::{poll_until, PollConfig, PollStatus};
use async_trait::async_trait;
use mirror_core::{MirrorConverter, MirrorError, MirrorService};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const OFFSIDED_BASE: &str = "http://offsided.com";

const SERVICE: MirrorService = MirrorService::Offsided;

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    url: &'a str,
    title: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    canonical_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    status: String,
}

/// Title-aware uploader; the canonical URL is known up front and valid once the job completes.
pub struct OffsidedConverter {
    client: Client,
    base_url: String,
    poll: PollConfig,
}

impl OffsidedConverter {
    pub fn new(client: Client, poll: PollConfig) -> Self {
        Self::with_base_url(client, poll, OFFSIDED_BASE)
    }

    pub fn with_base_url(client: Client, poll: PollConfig, base_url: &str) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            poll,
        }
    }

    async fn status(
        &self,
        upload_id: &str,
        media_url: &str,
    ) -> Result<PollStatus<()>, MirrorError> {
        let response = self
            .client
            .get(format!("{}/api/v1/{}", self.base_url, upload_id))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| request_error(SERVICE, e))?;
        let body: StatusResponse = read_json(SERVICE, response, &[]).await?;
        interpret_status(&body.status, media_url)
    }
}

pub(crate) fn accepted_upload(
    body: UploadResponse,
    media_url: &str,
) -> Result<(String, String), MirrorError> {
    if let Some(reason) = body.error.filter(|reason| !reason.is_empty()) {
        return Err(MirrorError::Rejected {
            service: SERVICE,
            url: media_url.to_string(),
            reason,
        });
    }
    match (body.id, body.canonical_url) {
        (Some(id), Some(canonical_url)) => Ok((id, canonical_url)),
        _ => Err(MirrorError::InvalidResponse {
            service: SERVICE,
            details: "upload response without id or canonical_url".to_string(),
        }),
    }
}

pub(crate) fn interpret_status(
    status: &str,
    media_url: &str,
) -> Result<PollStatus<()>, MirrorError> {
    match status {
        "complete" => Ok(PollStatus::Ready(())),
        "error" => Err(MirrorError::Rejected {
            service: SERVICE,
            url: media_url.to_string(),
            reason: "conversion failed".to_string(),
        }),
        _ => Ok(PollStatus::Pending),
    }
}

#[async_trait]
impl MirrorConverter for OffsidedConverter {
    fn service(&self) -> MirrorService {
        SERVICE
    }

    async fn convert(&self, media_url: &str, title: &str) -> Result<String, MirrorError> {
        info!("Uploading {} to Offsided", media_url);
        let response = self
            .client
            .post(format!("{}/api/v1/upload-url", self.base_url))
            .header(ACCEPT, "application/json")
            .json(&UploadRequest {
                url: media_url,
                title,
            })
            .send()
            .await
            .map_err(|e| request_error(SERVICE, e))?;

        let body: UploadResponse = read_json(SERVICE, response, &[]).await?;
        let (upload_id, canonical_url) = accepted_upload(body, media_url)?;
        let upload_id = upload_id.as_str();

        poll_until(SERVICE, self.poll, move || async move {
            self.status(upload_id, media_url).await
        })
        .await?;

        info!("Offsided upload finished: {}", canonical_url);
        Ok(canonical_url)
    }
}
