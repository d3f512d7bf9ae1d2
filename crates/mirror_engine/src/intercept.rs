use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use mirror_core::{
    is_challenge_page, step, InterceptEffect, InterceptState, InterceptTiming, Observation,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::MirrorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptSettings {
    /// Hard bound on one interception, challenge waits included.
    pub ceiling: Duration,
    pub timing: InterceptTiming,
}

impl Default for InterceptSettings {
    fn default() -> Self {
        Self {
            ceiling: Duration::from_secs(120),
            timing: InterceptTiming::default(),
        }
    }
}

/// Runs the interception state machine against real browser sessions.
#[derive(Clone)]
pub struct Interceptor {
    launcher: Arc<dyn BrowserLauncher>,
    settings: InterceptSettings,
}

impl Interceptor {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: InterceptSettings) -> Self {
        Self { launcher, settings }
    }

    pub fn settings(&self) -> &InterceptSettings {
        &self.settings
    }

    /// Load `url` in a fresh session and return the first downloadable
    /// response url.
    ///
    /// `Ok(None)` on deadline or cancellation, `ChallengeTimeout` when the
    /// deadline hit while a challenge was still showing, `Browser` when the
    /// session failed. The session is closed in every case.
    pub async fn intercept(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, MirrorError> {
        let deadline = Instant::now() + self.settings.ceiling;
        let mut session = match bounded(self.launcher.launch(), cancel, deadline).await {
            Bounded::Done(launched) => launched?,
            Bounded::Cancelled => {
                engine_info!("Interception cancelled before the browser started");
                return Ok(None);
            }
            Bounded::Expired => {
                engine_warn!("Browser did not start within {:?}", self.settings.ceiling);
                return Ok(None);
            }
        };
        engine_info!("Browser launched, watching traffic from {}", url);
        let outcome = self.drive(session.as_mut(), url, cancel, deadline).await;
        session.close().await;
        outcome
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<Option<String>, MirrorError> {
        let mut state = InterceptState::default();
        let mut pending = VecDeque::new();
        let mut cancelled = false;

        let first = match bounded(session.navigate(url), cancel, deadline).await {
            Bounded::Done(Ok(())) => Observation::Navigated,
            Bounded::Done(Err(err)) => Observation::SessionFailed(err.to_string()),
            Bounded::Cancelled => {
                cancelled = true;
                Observation::DeadlineElapsed
            }
            Bounded::Expired => Observation::DeadlineElapsed,
        };
        state = self.apply(state, first, &mut pending);

        while let Some(effect) = pending.pop_front() {
            let observation = match bounded(run_effect(session, effect), cancel, deadline).await {
                Bounded::Done(observed) => observed,
                Bounded::Cancelled => {
                    cancelled = true;
                    Some(Observation::DeadlineElapsed)
                }
                Bounded::Expired => Some(Observation::DeadlineElapsed),
            };
            if let Some(observation) = observation {
                state = self.apply(state, observation, &mut pending);
            }
        }

        match state {
            InterceptState::Matched { url } => {
                engine_info!("Detected downloadable url {}", url);
                Ok(Some(url))
            }
            InterceptState::TimedOut { .. } if cancelled => {
                engine_info!("Interception cancelled");
                Ok(None)
            }
            InterceptState::TimedOut { challenged: true } => {
                Err(MirrorError::ChallengeTimeout(self.settings.ceiling))
            }
            InterceptState::TimedOut { challenged: false } => {
                engine_warn!(
                    "No downloadable response within {:?}",
                    self.settings.ceiling
                );
                Ok(None)
            }
            InterceptState::Fatal { reason } => Err(MirrorError::Browser(reason)),
            other => {
                engine_warn!("Interception stopped early in state {:?}", other);
                Ok(None)
            }
        }
    }

    fn apply(
        &self,
        state: InterceptState,
        observation: Observation,
        pending: &mut VecDeque<InterceptEffect>,
    ) -> InterceptState {
        let (next, effects) = step(state.clone(), observation, &self.settings.timing);
        if next != state {
            engine_debug!("Interception {:?} -> {:?}", state, next);
            if next == InterceptState::ChallengeDetected {
                engine_info!("Challenge detected; solve it in the browser window, polling until it clears");
            }
        }
        pending.clear();
        pending.extend(effects);
        next
    }
}

enum Bounded<T> {
    Done(T),
    Cancelled,
    Expired,
}

/// Awaits `work` unless cancellation or the deadline comes first.
async fn bounded<F: Future>(
    work: F,
    cancel: &CancellationToken,
    deadline: Instant,
) -> Bounded<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Bounded::Cancelled,
        _ = tokio::time::sleep_until(deadline) => Bounded::Expired,
        done = work => Bounded::Done(done),
    }
}

async fn run_effect(
    session: &mut dyn BrowserSession,
    effect: InterceptEffect,
) -> Option<Observation> {
    match effect {
        InterceptEffect::Sleep(delay) => {
            tokio::time::sleep(delay).await;
            None
        }
        InterceptEffect::CheckChallenge => {
            let challenged = match session.page_content().await {
                Ok(content) => is_challenge_page(&content),
                Err(err) => {
                    engine_debug!("Could not read page content: {}", err);
                    false
                }
            };
            Some(Observation::ChallengeChecked { challenged })
        }
        InterceptEffect::InspectResponses => Some(match session.drain_responses().await {
            Ok(responses) => Observation::Responses(responses),
            Err(err) => Observation::SessionFailed(err.to_string()),
        }),
        InterceptEffect::StopLoading => {
            if let Err(err) = session.stop_loading().await {
                engine_warn!("Could not stop page load: {}", err);
            }
            None
        }
    }
}
