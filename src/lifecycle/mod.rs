//! Client side request lifecycle: input, pending countdown, reveal, error and reset.

pub mod controller;
pub mod driver;
pub mod reveal;
pub mod state;

pub use controller::{transition, Controller, ControllerSettings, PROMPT_REQUIRED_NOTICE};
pub use driver::{session, SessionDriver, SessionHandle, ViewUpdate};
pub use reveal::{RevealAnimator, RevealFrame};
pub use state::{Effect, Event, LifecycleState, SessionToken, Transition};
