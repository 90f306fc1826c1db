//! Bounded status polling for services that convert asynchronously.

use mirror_core::{MirrorError, MirrorService, MirrorSettings};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollConfig {
    pub fn from_settings(settings: &MirrorSettings) -> Self {
        Self {
            attempts: settings.poll_attempts,
            interval: Duration::from_secs(settings.poll_interval_secs),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: 60,
            interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    Pending,
    Ready(T),
}

/// Calls `check` until it reports `Ready`, an error, or the attempts run out.
pub async fn poll_until<T, F, Fut>(
    service: MirrorService,
    config: PollConfig,
    mut check: F,
) -> Result<T, MirrorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus<T>, MirrorError>>,
{
    for attempt in 1..=config.attempts {
        match check().await? {
            PollStatus::Ready(value) => {
                debug!("{} ready after {} status checks", service, attempt);
                return Ok(value);
            }
            PollStatus::Pending => {
                if attempt < config.attempts {
                    sleep(config.interval).await;
                }
            }
        }
    }

    Err(MirrorError::Timeout {
        service,
        attempts: config.attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(attempts: u32) -> PollConfig {
        PollConfig {
            attempts,
            interval: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_ready_on_third_check() {
        let calls = Cell::new(0);
        let result = poll_until(MirrorService::Gfycat, fast(5), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Ok(PollStatus::Pending)
                } else {
                    Ok(PollStatus::Ready("done"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_never_ready_times_out_after_all_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = poll_until(MirrorService::Mediacrush, fast(60), || {
            calls.set(calls.get() + 1);
            async { Ok(PollStatus::Pending) }
        })
        .await;

        assert!(matches!(
            result,
            Err(MirrorError::Timeout {
                service: MirrorService::Mediacrush,
                attempts: 60
            })
        ));
        assert_eq!(calls.get(), 60);
    }

    #[tokio::test]
    async fn test_error_stops_polling() {
        let calls = Cell::new(0);
        let result: Result<(), _> = poll_until(MirrorService::Offsided, fast(10), || {
            calls.set(calls.get() + 1);
            async {
                Err(MirrorError::Rejected {
                    service: MirrorService::Offsided,
                    url: "https://example.com/a.mp4".to_string(),
                    reason: "error".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(MirrorError::Rejected { .. })));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_from_settings() {
        let config = PollConfig::from_settings(&MirrorSettings::default());
        assert_eq!(config.attempts, 60);
        assert_eq!(config.interval, Duration::from_secs(1));
    }
}
