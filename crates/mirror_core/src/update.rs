use crate::{InterceptEffect, InterceptState, InterceptTiming, Observation};

/// Pure transition function: applies an observation to the interception state
/// and returns the effects the driver must run next.
///
/// Terminal states absorb every observation. Each poll checks for a challenge
/// before looking at traffic, and a cleared challenge may come back.
pub fn step(
    state: InterceptState,
    observation: Observation,
    timing: &InterceptTiming,
) -> (InterceptState, Vec<InterceptEffect>) {
    if state.is_terminal() {
        return (state, Vec::new());
    }

    match observation {
        Observation::Navigated => (
            state,
            vec![
                InterceptEffect::Sleep(timing.settle),
                InterceptEffect::CheckChallenge,
            ],
        ),
        Observation::ChallengeChecked { challenged: true } => {
            let next = if state.is_challenged() {
                InterceptState::Waiting
            } else {
                InterceptState::ChallengeDetected
            };
            (
                next,
                vec![
                    InterceptEffect::Sleep(timing.challenge_poll),
                    InterceptEffect::CheckChallenge,
                ],
            )
        }
        Observation::ChallengeChecked { challenged: false } => (
            InterceptState::Observing,
            vec![InterceptEffect::InspectResponses],
        ),
        Observation::Responses(responses) => {
            if state != InterceptState::Observing {
                return (state, vec![InterceptEffect::CheckChallenge]);
            }
            match responses.into_iter().find(|r| r.is_downloadable()) {
                Some(hit) => (
                    InterceptState::Matched { url: hit.url },
                    vec![InterceptEffect::StopLoading],
                ),
                None => (
                    state,
                    vec![
                        InterceptEffect::Sleep(timing.observe_poll),
                        InterceptEffect::CheckChallenge,
                    ],
                ),
            }
        }
        Observation::DeadlineElapsed => (
            InterceptState::TimedOut {
                challenged: state.is_challenged(),
            },
            Vec::new(),
        ),
        Observation::SessionFailed(reason) => (InterceptState::Fatal { reason }, Vec::new()),
    }
}
