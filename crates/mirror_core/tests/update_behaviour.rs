use std::sync::Once;
use std::time::Duration;

use mirror_core::{
    step, InterceptEffect, InterceptState, InterceptTiming, ObservedResponse, Observation,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn timing() -> InterceptTiming {
    InterceptTiming::default()
}

fn run(observations: Vec<Observation>) -> (InterceptState, Vec<InterceptEffect>) {
    let timing = timing();
    let mut state = InterceptState::default();
    let mut last = Vec::new();
    for obs in observations {
        let (next, effects) = step(state, obs, &timing);
        state = next;
        last = effects;
    }
    (state, last)
}

fn archive(url: &str) -> ObservedResponse {
    ObservedResponse::new(url, Vec::<(String, String)>::new())
}

#[test]
fn navigation_settles_then_checks() {
    init_logging();
    let (state, effects) = run(vec![Observation::Navigated]);

    assert_eq!(state, InterceptState::Navigating);
    assert_eq!(
        effects,
        vec![
            InterceptEffect::Sleep(Duration::from_secs(3)),
            InterceptEffect::CheckChallenge,
        ]
    );
}

#[test]
fn challenge_detected_then_waiting_on_five_second_cadence() {
    init_logging();
    let (state, effects) = run(vec![
        Observation::Navigated,
        Observation::ChallengeChecked { challenged: true },
    ]);
    assert_eq!(state, InterceptState::ChallengeDetected);
    assert_eq!(
        effects,
        vec![
            InterceptEffect::Sleep(Duration::from_secs(5)),
            InterceptEffect::CheckChallenge,
        ]
    );

    let (state, _) = step(
        state,
        Observation::ChallengeChecked { challenged: true },
        &timing(),
    );
    assert_eq!(state, InterceptState::Waiting);

    let (state, _) = step(
        state,
        Observation::ChallengeChecked { challenged: true },
        &timing(),
    );
    assert_eq!(state, InterceptState::Waiting);
}

#[test]
fn cleared_challenge_moves_to_observing_and_inspects() {
    init_logging();
    let (state, effects) = run(vec![
        Observation::Navigated,
        Observation::ChallengeChecked { challenged: true },
        Observation::ChallengeChecked { challenged: false },
    ]);

    assert_eq!(state, InterceptState::Observing);
    assert_eq!(effects, vec![InterceptEffect::InspectResponses]);
}

#[test]
fn challenge_can_reappear_after_being_cleared() {
    init_logging();
    let (state, _) = run(vec![
        Observation::Navigated,
        Observation::ChallengeChecked { challenged: false },
        Observation::Responses(Vec::new()),
        Observation::ChallengeChecked { challenged: true },
    ]);

    assert_eq!(state, InterceptState::ChallengeDetected);
}

#[test]
fn first_downloadable_response_wins_and_stops_loading() {
    init_logging();
    let attachment = ObservedResponse::new(
        "https://cdn.example.com/get?id=1",
        [("Content-Disposition", "attachment; filename=a.bin")],
    );
    let (state, effects) = run(vec![
        Observation::Navigated,
        Observation::ChallengeChecked { challenged: false },
        Observation::Responses(vec![
            archive("https://example.com/script.js"),
            attachment,
            archive("https://cdn.example.com/b.zip"),
        ]),
    ]);

    assert_eq!(
        state,
        InterceptState::Matched {
            url: "https://cdn.example.com/get?id=1".to_string()
        }
    );
    assert_eq!(effects, vec![InterceptEffect::StopLoading]);
}

#[test]
fn no_match_sleeps_briefly_and_polls_again() {
    init_logging();
    let (state, effects) = run(vec![
        Observation::Navigated,
        Observation::ChallengeChecked { challenged: false },
        Observation::Responses(vec![archive("https://example.com/index.html")]),
    ]);

    assert_eq!(state, InterceptState::Observing);
    assert_eq!(
        effects,
        vec![
            InterceptEffect::Sleep(Duration::from_secs(1)),
            InterceptEffect::CheckChallenge,
        ]
    );
}

#[test]
fn deadline_while_challenged_is_recorded() {
    init_logging();
    let (state, effects) = run(vec![
        Observation::Navigated,
        Observation::ChallengeChecked { challenged: true },
        Observation::DeadlineElapsed,
    ]);

    assert_eq!(state, InterceptState::TimedOut { challenged: true });
    assert!(effects.is_empty());
}

#[test]
fn deadline_while_observing_is_plain_timeout() {
    init_logging();
    let (state, _) = run(vec![
        Observation::Navigated,
        Observation::ChallengeChecked { challenged: false },
        Observation::DeadlineElapsed,
    ]);

    assert_eq!(state, InterceptState::TimedOut { challenged: false });
}

#[test]
fn session_failure_is_fatal() {
    init_logging();
    let (state, _) = run(vec![Observation::SessionFailed("browser crashed".into())]);

    assert_eq!(
        state,
        InterceptState::Fatal {
            reason: "browser crashed".into()
        }
    );
}
