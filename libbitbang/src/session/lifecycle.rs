use log::debug;
use rust_fsm::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SessionState {
    Inactive,
    Activating,
    Active,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SessionInput {
    Activate,
    Activated,
    Failed,
    Deactivate,
}

#[derive(Debug)]
pub struct SessionLifecycle;

impl StateMachineImpl for SessionLifecycle {
    type Input = SessionInput;
    type State = SessionState;
    type Output = ();

    const INITIAL_STATE: Self::State = SessionState::Inactive;

    fn transition(state: &Self::State, input: &Self::Input) -> Option<Self::State> {
        let res = match (state, input) {
            (SessionState::Inactive, SessionInput::Activate) => Some(SessionState::Activating),
            (SessionState::Activating, SessionInput::Activated) => Some(SessionState::Active),
            (SessionState::Activating, SessionInput::Failed) => Some(SessionState::Inactive),
            (SessionState::Active, SessionInput::Deactivate) => Some(SessionState::Inactive),
            (SessionState::Inactive, SessionInput::Deactivate) => Some(SessionState::Inactive),
            _ => None,
        };
        debug!("session state change: {:?} --{:?}--> {:?}", state, input, res);
        res
    }

    fn output(_state: &Self::State, _input: &Self::Input) -> Option<Self::Output> {
        None
    }
}
