use engine_logging::{engine_error, engine_info, engine_warn};
use mirror_core::RewriteTable;
use tokio_util::sync::CancellationToken;

use crate::intercept::Interceptor;

/// Turns an acquisition link into a directly fetchable url.
///
/// Host rewrites are tried first; otherwise the link is opened in a browser
/// session and the first downloadable response wins.
#[derive(Clone)]
pub struct AcquisitionResolver {
    rewrites: RewriteTable,
    interceptor: Option<Interceptor>,
}

impl AcquisitionResolver {
    pub fn new(rewrites: RewriteTable, interceptor: Interceptor) -> Self {
        Self {
            rewrites,
            interceptor: Some(interceptor),
        }
    }

    /// Resolver without a browser; links no rule covers resolve to `None`.
    pub fn rewrites_only(rewrites: RewriteTable) -> Self {
        Self {
            rewrites,
            interceptor: None,
        }
    }

    pub fn rewrites(&self) -> &RewriteTable {
        &self.rewrites
    }

    /// True when resolving `link` will not need a browser.
    pub fn is_static(&self, link: &str) -> bool {
        self.rewrites.rewrite(link).is_some()
    }

    /// True when links no rule covers can fall back to a browser.
    pub fn can_intercept(&self) -> bool {
        self.interceptor.is_some()
    }

    pub async fn resolve(&self, link: &str) -> Option<String> {
        self.resolve_until(link, &CancellationToken::new()).await
    }

    /// [`Self::resolve`], giving up early when `cancel` fires.
    pub async fn resolve_until(&self, link: &str, cancel: &CancellationToken) -> Option<String> {
        if let Some(direct) = self.rewrites.rewrite(link) {
            engine_info!("Rewrote {} to direct url {}", link, direct);
            return Some(direct);
        }
        let Some(interceptor) = &self.interceptor else {
            engine_warn!("No rewrite rule for {} and no browser configured", link);
            return None;
        };
        match interceptor.intercept(link, cancel).await {
            Ok(Some(found)) => {
                let direct = self.rewrites.rewrite_or_keep(&found);
                if direct != found {
                    engine_info!("Rewrote intercepted {} to {}", found, direct);
                }
                Some(direct)
            }
            Ok(None) => {
                engine_warn!("No direct download url found for {}", link);
                None
            }
            Err(err) => {
                engine_error!("Interception of {} failed: {}", link, err);
                None
            }
        }
    }
}
