use mirror_core::{CoreError, MirrorError, MirrorService};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

const USER_AGENT: &str = concat!("gfy_mirror/", env!("CARGO_PKG_VERSION"));

/// Shared client for converter and resolver calls.
pub fn build_http_client(timeout: Duration) -> Result<Client, CoreError> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

pub(crate) fn request_error(service: MirrorService, error: reqwest::Error) -> MirrorError {
    warn!("{} request failed: {}", service, error);
    MirrorError::Request {
        service,
        details: error.to_string(),
    }
}

/// Reads a JSON body, treating any status outside 2xx and `also_accept` as a failure.
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: MirrorService,
    response: Response,
    also_accept: &[StatusCode],
) -> Result<T, MirrorError> {
    let status = response.status();
    let url = response.url().to_string();
    let body = response
        .text()
        .await
        .map_err(|e| request_error(service, e))?;

    if !status.is_success() && !also_accept.contains(&status) {
        warn!("{} returned {} for {}: {}", service, status, url, body);
        return Err(MirrorError::UnexpectedStatus {
            service,
            status_code: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        warn!("{} sent an unparseable body for {}: {}", service, url, body);
        MirrorError::InvalidResponse {
            service,
            details: e.to_string(),
        }
    })
}

pub(crate) fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
