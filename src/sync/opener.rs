use async_trait::async_trait;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_warn};

/// Hands a URL to whatever application handles its scheme.
///
/// Resolves to whether the handler accepted the URL. Implementations report
/// every failure as `false` instead of erroring.
#[async_trait]
pub trait UrlOpener: Send + Sync {
    async fn open(&self, url: &str) -> bool;
}

/// Opens URLs through the operating system's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

#[async_trait]
impl UrlOpener for SystemOpener {
    async fn open(&self, url: &str) -> bool {
        let target = url.to_string();
        match tokio::task::spawn_blocking(move || open::that(target)).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                log_warn!("No handler accepted URL: {err}");
                false
            }
            Err(join_err) => {
                log_error!("URL open worker failed: {join_err}");
                false
            }
        }
    }
}
