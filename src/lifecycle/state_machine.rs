use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AgentState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Start,
    Stop,
    Pause,
    Resume,
    RestartBegun,
    RestartSucceeded,
    RestartFailed { previous: AgentState },
    Reset,
    Fault,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid state transition from {from} with event {event:?}")]
pub struct TransitionError {
    pub from: AgentState,
    pub event: LifecycleEvent,
}

pub struct AgentStateMachine;

impl AgentStateMachine {
    /// Next state for `event`. Every event is accepted from every state
    /// except a second `RestartBegun` while restarting and restart
    /// completions outside of a restart.
    pub fn transition(
        current: AgentState,
        event: LifecycleEvent,
    ) -> Result<AgentState, TransitionError> {
        let next = match (current, event) {
            (AgentState::Restarting, LifecycleEvent::RestartBegun) => {
                return Err(TransitionError { from: current, event });
            }
            (_, LifecycleEvent::RestartBegun) => AgentState::Restarting,

            (AgentState::Restarting, LifecycleEvent::RestartSucceeded) => AgentState::Running,
            (AgentState::Restarting, LifecycleEvent::RestartFailed { previous }) => previous,
            (_, LifecycleEvent::RestartSucceeded | LifecycleEvent::RestartFailed { .. }) => {
                return Err(TransitionError { from: current, event });
            }

            (_, LifecycleEvent::Start | LifecycleEvent::Resume) => AgentState::Running,
            (_, LifecycleEvent::Stop) => AgentState::Stopped,
            (_, LifecycleEvent::Pause) => AgentState::Paused,
            (_, LifecycleEvent::Reset) => AgentState::NotStarted,
            (_, LifecycleEvent::Fault) => AgentState::Error,
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [AgentState; 6] = [
        AgentState::NotStarted,
        AgentState::Running,
        AgentState::Paused,
        AgentState::Stopped,
        AgentState::Restarting,
        AgentState::Error,
    ];

    #[test]
    fn test_plain_transitions_accepted_from_any_state() {
        for state in ALL_STATES {
            assert_eq!(
                AgentStateMachine::transition(state, LifecycleEvent::Start),
                Ok(AgentState::Running)
            );
            assert_eq!(
                AgentStateMachine::transition(state, LifecycleEvent::Stop),
                Ok(AgentState::Stopped)
            );
            assert_eq!(
                AgentStateMachine::transition(state, LifecycleEvent::Pause),
                Ok(AgentState::Paused)
            );
            assert_eq!(
                AgentStateMachine::transition(state, LifecycleEvent::Resume),
                Ok(AgentState::Running)
            );
            assert_eq!(
                AgentStateMachine::transition(state, LifecycleEvent::Reset),
                Ok(AgentState::NotStarted)
            );
        }
    }

    #[test]
    fn test_restart_is_not_reentrant() {
        let state =
            AgentStateMachine::transition(AgentState::Running, LifecycleEvent::RestartBegun)
                .unwrap();
        assert_eq!(state, AgentState::Restarting);

        let result = AgentStateMachine::transition(state, LifecycleEvent::RestartBegun);
        assert!(result.is_err());
    }

    #[test]
    fn test_restart_failure_restores_previous() {
        let result = AgentStateMachine::transition(
            AgentState::Restarting,
            LifecycleEvent::RestartFailed {
                previous: AgentState::Paused,
            },
        );
        assert_eq!(result, Ok(AgentState::Paused));
    }

    #[test]
    fn test_restart_completion_requires_restarting() {
        let result =
            AgentStateMachine::transition(AgentState::Running, LifecycleEvent::RestartSucceeded);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_only_from_fault() {
        for state in ALL_STATES {
            for event in [
                LifecycleEvent::Start,
                LifecycleEvent::Stop,
                LifecycleEvent::Pause,
                LifecycleEvent::Resume,
                LifecycleEvent::Reset,
            ] {
                assert_ne!(
                    AgentStateMachine::transition(state, event),
                    Ok(AgentState::Error)
                );
            }
        }
        assert_eq!(
            AgentStateMachine::transition(AgentState::Running, LifecycleEvent::Fault),
            Ok(AgentState::Error)
        );
    }
}
