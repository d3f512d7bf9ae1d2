use mirror_core::ObservedResponse;

use crate::MirrorError;

/// Starts controlled browser sessions for the interception fallback.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, MirrorError>;
}

/// One browser tab whose network traffic is observed passively.
#[async_trait::async_trait]
pub trait BrowserSession: Send {
    /// Start loading `url`. Returns once the navigation is issued, not when the
    /// page finishes loading.
    async fn navigate(&mut self, url: &str) -> Result<(), MirrorError>;

    /// Current document markup.
    async fn page_content(&mut self) -> Result<String, MirrorError>;

    /// Responses received since the previous call, in arrival order.
    async fn drain_responses(&mut self) -> Result<Vec<ObservedResponse>, MirrorError>;

    /// Abort the in-progress load.
    async fn stop_loading(&mut self) -> Result<(), MirrorError>;

    /// Tear the session down. Called exactly once, whatever the outcome.
    async fn close(&mut self);
}
