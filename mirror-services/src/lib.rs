use mirror_core::{CoreError, MirrorConverter, MirrorSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod gfycat;
pub mod http;
pub mod imgur;
pub mod mediacrush;
pub mod offsided;
pub mod poll;
pub mod resolver;
pub mod streamable;

pub use gfycat::GfycatConverter;
pub use http::build_http_client;
pub use imgur::ImgurConverter;
pub use mediacrush::MediacrushConverter;
pub use offsided::OffsidedConverter;
pub use poll::{poll_until, PollConfig, PollStatus};
pub use resolver::{HttpMediaResolver, ResolverEndpoints};
pub use streamable::{StreamableConverter, StreamableCredentials};

/// Enabled converters in comment order.
pub fn build_converters(
    settings: &MirrorSettings,
) -> Result<Vec<Arc<dyn MirrorConverter>>, CoreError> {
    let client = build_http_client(Duration::from_secs(settings.request_timeout_secs))?;
    let poll = PollConfig::from_settings(settings);
    let mut converters: Vec<Arc<dyn MirrorConverter>> = Vec::new();

    if settings.gfycat {
        converters.push(Arc::new(GfycatConverter::new(client.clone(), poll)));
    }
    if settings.mediacrush {
        converters.push(Arc::new(MediacrushConverter::new(client.clone(), poll)));
    }
    if settings.offsided {
        converters.push(Arc::new(OffsidedConverter::new(client.clone(), poll)));
    }
    if let Some(client_id) = settings.imgur_client_id.as_ref().filter(|id| !id.is_empty()) {
        converters.push(Arc::new(ImgurConverter::new(
            client.clone(),
            client_id.clone(),
        )));
    }
    if let (Some(username), Some(password)) = (
        settings.streamable_username.as_ref(),
        settings.streamable_password.as_ref(),
    ) {
        converters.push(Arc::new(StreamableConverter::new(
            client.clone(),
            StreamableCredentials {
                username: username.clone(),
                password: password.clone(),
            },
        )));
    }

    let names: Vec<String> = converters
        .iter()
        .map(|converter| converter.service().to_string())
        .collect();
    info!("Mirror converters enabled: {}", names.join(", "));
    Ok(converters)
}
