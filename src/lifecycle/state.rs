use std::fmt;
use uuid::Uuid;

use crate::error::{ErrorKind, GenerationFailure};
use crate::models::GenerationRequest;

/// Tags one outstanding generation call. Results carrying a stale token are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(Uuid);

impl SessionToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    Idle,
    Pending {
        deadline_ticks: u32,
        token: SessionToken,
    },
    Revealing {
        image_ref: String,
        elapsed_ms: u64,
        /// Set by the first `ImageRendered`; loading is over from then on.
        rendered: bool,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Pending { .. } => "pending",
            LifecycleState::Revealing { .. } => "revealing",
            LifecycleState::Error { .. } => "error",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, LifecycleState::Idle)
    }

    /// The countdown shown while pending.
    pub fn countdown(&self) -> Option<u32> {
        match self {
            LifecycleState::Pending { deadline_ticks, .. } => Some(*deadline_ticks),
            _ => None,
        }
    }

    /// True while a generation call is outstanding and the UI shows the countdown.
    pub fn is_loading(&self) -> bool {
        matches!(self, LifecycleState::Pending { .. })
            || matches!(self, LifecycleState::Revealing { rendered: false, .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Submit(String),
    ProviderSucceeded {
        token: SessionToken,
        image_ref: String,
    },
    ProviderFailed {
        token: SessionToken,
        failure: GenerationFailure,
    },
    TimerTick,
    ImageRendered,
    Reset,
}

/// Side effects requested by a transition. The driver executes them in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Submission refused because the prompt was empty.
    RequirePrompt,
    IssueGeneration {
        token: SessionToken,
        request: GenerationRequest,
    },
    StartCountdown,
    StopCountdown,
    StartReveal,
    CancelReveal,
    ClearInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: LifecycleState,
    pub effects: Vec<Effect>,
    /// False when the state does not define the event; `next` is then unchanged.
    pub accepted: bool,
}

impl Transition {
    pub fn to(next: LifecycleState, effects: Vec<Effect>) -> Self {
        Self {
            next,
            effects,
            accepted: true,
        }
    }

    pub fn ignored(current: &LifecycleState) -> Self {
        Self {
            next: current.clone(),
            effects: Vec::new(),
            accepted: false,
        }
    }
}
