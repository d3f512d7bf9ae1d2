use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InterceptState {
    #[default]
    Navigating,
    /// First poll that saw challenge markers.
    ChallengeDetected,
    /// Challenge still present on a later poll.
    Waiting,
    Observing,
    Matched { url: String },
    TimedOut { challenged: bool },
    Fatal { reason: String },
}

impl InterceptState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InterceptState::Matched { .. }
                | InterceptState::TimedOut { .. }
                | InterceptState::Fatal { .. }
        )
    }

    pub fn is_challenged(&self) -> bool {
        matches!(
            self,
            InterceptState::ChallengeDetected | InterceptState::Waiting
        )
    }

    pub fn matched_url(&self) -> Option<&str> {
        match self {
            InterceptState::Matched { url } => Some(url),
            _ => None,
        }
    }
}

/// Poll cadence for the interception machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptTiming {
    /// Delay between navigation and the first challenge check.
    pub settle: Duration,
    /// Cadence while a challenge is on screen.
    pub challenge_poll: Duration,
    /// Cadence while watching network traffic.
    pub observe_poll: Duration,
}

impl Default for InterceptTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(3),
            challenge_poll: Duration::from_secs(5),
            observe_poll: Duration::from_secs(1),
        }
    }
}
