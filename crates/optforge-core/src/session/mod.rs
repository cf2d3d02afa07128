//! The compilation-session lifecycle protocol: the traits a service
//! implements and the state machine that wraps every live session.

use std::path::Path;

use async_trait::async_trait;
use optforge_proto::common::v1::{Event, event, space};
use optforge_proto::service::v1::{ActionSpace, Benchmark, ObservationSpace};

use crate::error::{Result, SessionError};

/// Outcome of applying a single action.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    /// The session reached a terminal state and further actions are
    /// pointless; the caller decides when to actually end the session.
    pub end_of_session: bool,
    /// Replaces the session's legal-action set when present. Callers must
    /// re-fetch the action space before acting again.
    pub new_action_space: Option<ActionSpace>,
    /// The action left the program state unchanged, as determined by the
    /// service (e.g. a structural diff of the IR before and after).
    pub action_had_no_effect: bool,
}

/// One in-progress compilation/optimization attempt, owned by the service.
///
/// Sessions are driven strictly sequentially by their owning caller; the
/// protocol defines no concurrent-mutation contract.
#[async_trait]
pub trait CompilationSession: Send + Sync {
    /// Apply one action to the compiler state. Implementations may assume
    /// the action was already validated against the current action space;
    /// on error the compiler state must be left exactly as it was.
    async fn apply_action(&mut self, action: &Event) -> Result<StepOutcome>;

    /// Compute an observation. Never mutates session state.
    async fn observe(&self, space: &ObservationSpace) -> Result<Event>;

    /// Snapshot-copy this session into a fully independent sibling.
    /// External resources (files, subprocess handles) must be duplicated,
    /// never aliased.
    async fn fork(&self) -> Result<Box<dyn CompilationSession>> {
        Err(SessionError::ForkUnsupported)
    }

    /// Out-of-band key/value configuration not modeled as an action.
    /// `Ok(None)` means the key is not recognized by this service.
    async fn handle_session_parameter(&mut self, _key: &str, _value: &str) -> Result<Option<String>> {
        Ok(None)
    }

    /// Release resources held by the session.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Constructs sessions and describes the fixed catalog of spaces the
/// service supports. Space indices are stable only within one service
/// instance.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Version of the compiler behind this service.
    fn compiler_version(&self) -> String;

    /// Supported action spaces, in catalog order.
    fn action_spaces(&self) -> Vec<ActionSpace>;

    /// Supported observation spaces, in catalog order.
    fn observation_spaces(&self) -> Vec<ObservationSpace>;

    /// Create a new session. May perform expensive setup (e.g. invoking a
    /// compiler front end); a failure aborts creation entirely and must
    /// leave nothing behind in `working_dir`.
    async fn start(
        &self,
        working_dir: &Path,
        action_space: ActionSpace,
        benchmark: Benchmark,
    ) -> Result<Box<dyn CompilationSession>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed but still applying setup-time actions.
    Created,
    Active,
    /// Accepts no further operations.
    Terminated,
}

/// State machine wrapper around a service session.
///
/// Owns the negotiated action space and enforces Created -> Active ->
/// Terminated. Actions are validated against the current action space
/// before the session sees them. Every operation on a terminated handle
/// fails with [`SessionError::SessionClosed`], including a second `close`:
/// ending a session twice is an error, not a no-op.
pub struct SessionHandle {
    session: Box<dyn CompilationSession>,
    action_space: ActionSpace,
    state: SessionState,
}

impl SessionHandle {
    pub fn new(session: Box<dyn CompilationSession>, action_space: ActionSpace) -> Self {
        Self {
            session,
            action_space,
            state: SessionState::Created,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    /// Setup is complete; the session now serves its caller.
    pub fn activate(&mut self) {
        if self.state == SessionState::Created {
            self.state = SessionState::Active;
        }
    }

    /// Validate and apply one action. Out-of-range and malformed actions
    /// fail before the session is touched; a replacement action space
    /// returned by the session updates this handle's copy.
    pub async fn apply_action(&mut self, action: &Event) -> Result<StepOutcome> {
        self.ensure_open()?;
        validate_action(&self.action_space, action)?;
        let outcome = self.session.apply_action(action).await?;
        if let Some(space) = &outcome.new_action_space {
            self.action_space = space.clone();
        }
        Ok(outcome)
    }

    pub async fn observe(&self, space: &ObservationSpace) -> Result<Event> {
        self.ensure_open()?;
        self.session.observe(space).await
    }

    /// Fork into an independent handle carrying a copy of the current
    /// action space. The caller must guarantee no concurrent mutation of
    /// this session for the duration of the call.
    pub async fn fork(&self) -> Result<SessionHandle> {
        self.ensure_open()?;
        let session = self.session.fork().await?;
        Ok(SessionHandle {
            session,
            action_space: self.action_space.clone(),
            state: self.state,
        })
    }

    pub async fn handle_session_parameter(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<Option<String>> {
        self.ensure_open()?;
        self.session.handle_session_parameter(key, value).await
    }

    /// Terminate the session and release its resources.
    pub async fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.state = SessionState::Terminated;
        self.session.close().await
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == SessionState::Terminated {
            return Err(SessionError::SessionClosed);
        }
        Ok(())
    }
}

/// Check an action against an action space before any state is mutated.
///
/// The discrete families constrain the action to an in-range int64 index;
/// other space kinds carry no generic index semantics and are validated by
/// the service itself.
pub fn validate_action(space: &ActionSpace, action: &Event) -> Result<()> {
    let Some(kind) = space.space.as_ref().and_then(|s| s.value.as_ref()) else {
        return Ok(());
    };
    let size = match kind {
        space::Value::Discrete(discrete) => discrete.n,
        space::Value::NamedDiscrete(named) => named.names.len() as i64,
        _ => return Ok(()),
    };
    let index = match action.value.as_ref() {
        Some(event::Value::Int64Value(index)) => *index,
        _ => {
            return Err(SessionError::MalformedAction(
                "discrete action spaces take an int64_value event".to_string(),
            ));
        }
    };
    if index < 0 || index >= size {
        return Err(SessionError::OutOfRangeAction { index, size });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use optforge_proto::common::v1 as common;

    /// Counts applied actions; action 0 is a no-op after the first use.
    struct CountingSession {
        applied: Vec<i64>,
    }

    #[async_trait]
    impl CompilationSession for CountingSession {
        async fn apply_action(&mut self, action: &Event) -> Result<StepOutcome> {
            let index = match action.value.as_ref() {
                Some(event::Value::Int64Value(index)) => *index,
                _ => unreachable!("validated by the handle"),
            };
            let no_effect = self.applied.last() == Some(&index);
            self.applied.push(index);
            Ok(StepOutcome {
                action_had_no_effect: no_effect,
                ..Default::default()
            })
        }

        async fn observe(&self, _space: &ObservationSpace) -> Result<Event> {
            Ok(Event {
                value: Some(event::Value::Int64Value(self.applied.len() as i64)),
            })
        }

        async fn fork(&self) -> Result<Box<dyn CompilationSession>> {
            Ok(Box::new(CountingSession {
                applied: self.applied.clone(),
            }))
        }
    }

    fn discrete_action_space(n: i64) -> ActionSpace {
        ActionSpace {
            space: Some(common::Space {
                name: "default".to_string(),
                value: Some(space::Value::Discrete(common::DiscreteSpace { n })),
            }),
        }
    }

    fn int64_action(index: i64) -> Event {
        Event {
            value: Some(event::Value::Int64Value(index)),
        }
    }

    fn handle() -> SessionHandle {
        let mut handle = SessionHandle::new(
            Box::new(CountingSession { applied: vec![] }),
            discrete_action_space(3),
        );
        handle.activate();
        handle
    }

    #[tokio::test]
    async fn out_of_range_action_leaves_state_untouched() {
        let mut handle = handle();
        handle.apply_action(&int64_action(1)).await.unwrap();

        let err = handle.apply_action(&int64_action(5)).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::OutOfRangeAction { index: 5, size: 3 }
        ));

        let space = ObservationSpace::default();
        let observed = handle.observe(&space).await.unwrap();
        assert_eq!(observed, int64_action(1));
    }

    #[tokio::test]
    async fn malformed_action_is_rejected() {
        let mut handle = handle();
        let action = Event {
            value: Some(event::Value::StringValue("dce".to_string())),
        };
        let err = handle.apply_action(&action).await.unwrap_err();
        assert!(matches!(err, SessionError::MalformedAction(_)));
    }

    #[tokio::test]
    async fn repeated_action_reports_no_effect() {
        let mut handle = handle();
        let first = handle.apply_action(&int64_action(2)).await.unwrap();
        assert!(!first.action_had_no_effect);
        let second = handle.apply_action(&int64_action(2)).await.unwrap();
        assert!(second.action_had_no_effect);
    }

    #[tokio::test]
    async fn closed_sessions_accept_no_operations() {
        let mut handle = handle();
        handle.close().await.unwrap();
        assert_eq!(handle.state(), SessionState::Terminated);

        let err = handle.apply_action(&int64_action(0)).await.unwrap_err();
        assert!(matches!(err, SessionError::SessionClosed));
        let err = handle.close().await.unwrap_err();
        assert!(matches!(err, SessionError::SessionClosed));
    }

    #[tokio::test]
    async fn fork_is_independent_of_the_parent() {
        let mut parent = handle();
        parent.apply_action(&int64_action(0)).await.unwrap();

        let mut child = parent.fork().await.unwrap();
        child.apply_action(&int64_action(1)).await.unwrap();

        let space = ObservationSpace::default();
        let parent_observed = parent.observe(&space).await.unwrap();
        let child_observed = child.observe(&space).await.unwrap();
        assert_eq!(parent_observed, int64_action(1));
        assert_eq!(child_observed, int64_action(2));
    }

    #[tokio::test]
    async fn replacement_action_space_updates_the_handle() {
        struct ShrinkingSession;

        #[async_trait]
        impl CompilationSession for ShrinkingSession {
            async fn apply_action(&mut self, _action: &Event) -> Result<StepOutcome> {
                Ok(StepOutcome {
                    new_action_space: Some(discrete_action_space(1)),
                    ..Default::default()
                })
            }

            async fn observe(&self, _space: &ObservationSpace) -> Result<Event> {
                Ok(int64_action(0))
            }
        }

        let mut handle =
            SessionHandle::new(Box::new(ShrinkingSession), discrete_action_space(3));
        handle.activate();

        let outcome = handle.apply_action(&int64_action(2)).await.unwrap();
        assert!(outcome.new_action_space.is_some());

        // index 2 was legal before the replacement shrank the space
        let err = handle.apply_action(&int64_action(2)).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::OutOfRangeAction { index: 2, size: 1 }
        ));
    }
}
