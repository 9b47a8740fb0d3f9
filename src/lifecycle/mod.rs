pub mod controller;
pub mod state_machine;

pub use controller::{LifecycleController, LifecycleError};
pub use state_machine::{AgentStateMachine, LifecycleEvent, TransitionError};
