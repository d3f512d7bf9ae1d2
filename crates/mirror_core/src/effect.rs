use std::time::Duration;

/// Work the driver must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptEffect {
    /// Wait before the next effect. Must not block the executor.
    Sleep(Duration),
    /// Read page content and report [`crate::Observation::ChallengeChecked`].
    CheckChallenge,
    /// Drain newly observed responses and report [`crate::Observation::Responses`].
    InspectResponses,
    /// Abort the in-progress page load so the browser does not start the transfer itself.
    StopLoading,
}
