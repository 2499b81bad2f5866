//! Poll a remote resource until it converges on a target state.
//!
//! The poller never enforces a deadline itself; wrap it in
//! [`crate::timeout::with_timeout`] (as the sandbox operations do). Every
//! suspension point is a plain `.await`, so dropping the future on timeout
//! abandons the in-flight fetch or the inter-attempt sleep immediately.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{DaytonaError, Result};
use crate::types::{Workspace, state};

/// Delay between consecutive state fetches.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The two fields of a resource the poller reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub state: String,
    pub error_reason: Option<String>,
}

impl StateSnapshot {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            error_reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.error_reason = Some(reason.into());
        self
    }
}

impl From<&Workspace> for StateSnapshot {
    fn from(ws: &Workspace) -> Self {
        Self {
            state: ws.state.clone().unwrap_or_default(),
            error_reason: ws.error_reason.clone(),
        }
    }
}

/// What to wait for, and how to describe a failure.
#[derive(Debug, Clone, Copy)]
pub struct WaitTarget<'a> {
    /// Resource kind used in error messages, e.g. `"Sandbox"`.
    pub kind: &'static str,
    pub id: &'a str,
    pub state: &'a str,
    /// Verb used in error messages, e.g. `"start"`.
    pub verb: &'static str,
}

/// Decides whether a failed fetch should be retried.
pub type Classifier = fn(&DaytonaError) -> bool;

pub struct StatePoller<'a> {
    target: WaitTarget<'a>,
    interval: Duration,
    is_transient: Classifier,
}

impl<'a> StatePoller<'a> {
    pub fn new(target: WaitTarget<'a>) -> Self {
        Self {
            target,
            interval: POLL_INTERVAL,
            is_transient: DaytonaError::is_transient,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Replace the default transient-error check ([`DaytonaError::is_transient`]).
    pub fn classify(mut self, is_transient: Classifier) -> Self {
        self.is_transient = is_transient;
        self
    }

    /// Poll `fetch` until the target state is observed.
    ///
    /// `initial` is the last known state, if the caller has one. Without it a
    /// single fetch establishes the starting point. Either way, a resource
    /// already in the target state returns without further fetches.
    pub async fn run<F, Fut>(&self, initial: Option<StateSnapshot>, mut fetch: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<StateSnapshot>>,
    {
        let target = self.target;

        let fetched = initial.is_none();
        let initial = match initial {
            Some(snapshot) => Some(snapshot),
            None => match fetch().await {
                Ok(snapshot) => Some(snapshot),
                Err(e) if (self.is_transient)(&e) => {
                    warn!(id = target.id, error = %e, "initial state lookup failed, polling");
                    None
                }
                Err(e) => return Err(e),
            },
        };
        if initial.as_ref().is_some_and(|s| s.state == target.state) {
            debug!(id = target.id, state = target.state, "already in target state");
            return Ok(());
        }
        // The initial lookup counts as a poll; space the next one out.
        if fetched {
            tokio::time::sleep(self.interval).await;
        }

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match fetch().await {
                Ok(snapshot) if snapshot.state == target.state => {
                    debug!(id = target.id, state = target.state, attempts, "target state reached");
                    return Ok(());
                }
                Ok(snapshot) if snapshot.state == state::ERROR => {
                    return Err(DaytonaError::Resource {
                        kind: target.kind,
                        id: target.id.to_string(),
                        verb: target.verb,
                        state: snapshot.state,
                        reason: snapshot.error_reason.unwrap_or_default(),
                    });
                }
                Ok(snapshot) => {
                    debug!(id = target.id, state = %snapshot.state, attempts, "waiting for {}", target.state);
                }
                Err(e) if (self.is_transient)(&e) => {
                    warn!(id = target.id, error = %e, attempts, "transient state lookup failure, retrying");
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Poll with the default interval and classifier. See [`StatePoller::run`].
pub async fn wait_until<F, Fut>(
    target: WaitTarget<'_>,
    initial: Option<StateSnapshot>,
    fetch: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<StateSnapshot>>,
{
    StatePoller::new(target).run(initial, fetch).await
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::timeout::with_timeout;

    /// Replays a fixed sequence of fetch outcomes; the last entry repeats.
    #[derive(Clone)]
    struct Script {
        steps: Arc<Mutex<VecDeque<Step>>>,
        calls: Arc<Mutex<u32>>,
    }

    #[derive(Clone)]
    enum Step {
        State(&'static str, Option<&'static str>),
        Transient,
        Fatal,
    }

    impl Script {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Arc::new(Mutex::new(steps.into())),
                calls: Arc::new(Mutex::new(0)),
            }
        }

        fn states(states: &[&'static str]) -> Self {
            Self::new(states.iter().map(|s| Step::State(*s, None)).collect())
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }

        async fn fetch(&self) -> Result<StateSnapshot> {
            *self.calls.lock().unwrap() += 1;
            let step = {
                let mut steps = self.steps.lock().unwrap();
                if steps.len() > 1 {
                    steps.pop_front().unwrap()
                } else {
                    steps.front().cloned().unwrap()
                }
            };
            match step {
                Step::State(s, reason) => Ok(StateSnapshot {
                    state: s.to_string(),
                    error_reason: reason.map(String::from),
                }),
                Step::Transient => Err(DaytonaError::Validation(
                    "state: Input should be a valid string".into(),
                )),
                Step::Fatal => Err(DaytonaError::Api {
                    status: reqwest::StatusCode::NOT_FOUND,
                    message: "sandbox not found".into(),
                }),
            }
        }
    }

    fn start_target(id: &str) -> WaitTarget<'_> {
        WaitTarget {
            kind: "Sandbox",
            id,
            state: state::STARTED,
            verb: "start",
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_target_after_progress() {
        let script = Script::states(&["starting", "starting", "started"]);
        let s = script.clone();

        wait_until(start_target("sb-1"), None, || s.fetch())
            .await
            .unwrap();
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn cached_target_state_skips_fetching() {
        let script = Script::states(&["stopped"]);
        let s = script.clone();

        wait_until(
            start_target("sb-1"),
            Some(StateSnapshot::new("started")),
            || s.fetch(),
        )
        .await
        .unwrap();
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test]
    async fn initial_fetch_in_target_state_is_the_only_fetch() {
        let script = Script::states(&["started"]);
        let s = script.clone();

        wait_until(start_target("sb-1"), None, || s.fetch())
            .await
            .unwrap();
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn error_state_fails_with_reason() {
        let script = Script::new(vec![
            Step::State("pulling", None),
            Step::State("pulling", None),
            Step::State("error", Some("disk full")),
        ]);
        let s = script.clone();

        let err = wait_until(start_target("sb-1"), None, || s.fetch())
            .await
            .unwrap_err();

        assert!(
            err.to_string()
                .contains("failed to start with state: error, error reason: disk full"),
            "{err}"
        );
        match err {
            DaytonaError::Resource { id, verb, state, reason, .. } => {
                assert_eq!(id, "sb-1");
                assert_eq!(verb, "start");
                assert_eq!(state, "error");
                assert_eq!(reason, "disk full");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn error_state_without_reason_renders_empty() {
        let script = Script::states(&["stopping", "error"]);
        let s = script.clone();
        let target = WaitTarget {
            kind: "Sandbox",
            id: "sb-2",
            state: state::STOPPED,
            verb: "stop",
        };

        let err = wait_until(target, None, || s.fetch()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Sandbox sb-2 failed to stop with state: error, error reason: "
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_swallowed() {
        let script = Script::new(vec![
            Step::State("starting", None),
            Step::Transient,
            Step::Transient,
            Step::State("started", None),
        ]);
        let s = script.clone();

        wait_until(start_target("sb-1"), None, || s.fetch())
            .await
            .unwrap();
        assert_eq!(script.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_initial_lookup_keeps_polling() {
        let script = Script::new(vec![Step::Transient, Step::State("started", None)]);
        let s = script.clone();

        wait_until(start_target("sb-1"), None, || s.fetch())
            .await
            .unwrap();
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_propagates_without_retry() {
        let script = Script::new(vec![Step::Fatal, Step::State("started", None)]);
        let s = script.clone();

        let err = wait_until(
            start_target("sb-1"),
            Some(StateSnapshot::new("starting")),
            || s.fetch(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DaytonaError::Api { .. }));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_classifier_overrides_default() {
        let script = Script::new(vec![Step::Transient, Step::State("started", None)]);
        let s = script.clone();

        let err = StatePoller::new(start_target("sb-1"))
            .classify(|_| false)
            .run(None, || s.fetch())
            .await
            .unwrap_err();
        assert!(matches!(err, DaytonaError::Validation(_)));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_polling() {
        let script = Script::states(&["starting"]);
        let s = script.clone();
        let started = tokio::time::Instant::now();

        let err = with_timeout(
            Some(0.3),
            |t| format!("Sandbox sb-1 failed to start within the {t} seconds timeout period"),
            wait_until(start_target("sb-1"), None, || s.fetch()),
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert!(err.to_string().contains("sb-1"));
        assert!(err.to_string().contains("0.3"));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(400), "{elapsed:?}");
        assert!(script.calls() <= 4, "calls: {}", script.calls());
    }

    #[tokio::test(start_paused = true)]
    async fn initial_fetch_is_spaced_from_first_poll() {
        let started = tokio::time::Instant::now();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        wait_until(start_target("sb-1"), None, || {
            let log = log.clone();
            async move {
                let mut at = log.lock().unwrap();
                at.push(started.elapsed());
                let state = if at.len() < 2 { "starting" } else { "started" };
                Ok(StateSnapshot::new(state))
            }
        })
        .await
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.first(), Some(&Duration::ZERO));
        assert!(seen.get(1).is_some_and(|t| *t >= POLL_INTERVAL), "{seen:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_deadline_waits_for_slow_convergence() {
        let mut steps = vec![Step::State("starting", None); 50];
        steps.push(Step::State("started", None));
        let script = Script::new(steps);
        let s = script.clone();

        with_timeout(
            Some(0.0),
            |t| format!("timed out after {t}"),
            wait_until(start_target("sb-1"), None, || s.fetch()),
        )
        .await
        .unwrap();
        assert_eq!(script.calls(), 51);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_waits_are_independent() {
        let fast = Script::states(&["starting", "started"]);
        let slow = Script::new(vec![
            Step::State("starting", None),
            Step::State("starting", None),
            Step::State("starting", None),
            Step::State("error", Some("out of capacity")),
        ]);
        let (f, s) = (fast.clone(), slow.clone());

        let (a, b) = tokio::join!(
            wait_until(start_target("sb-a"), None, || f.fetch()),
            wait_until(start_target("sb-b"), None, || s.fetch()),
        );

        assert!(a.is_ok());
        let err = b.unwrap_err();
        assert!(err.to_string().starts_with("Sandbox sb-b failed to start"), "{err}");
        assert_eq!(fast.calls(), 2);
        assert_eq!(slow.calls(), 4);
    }
}
