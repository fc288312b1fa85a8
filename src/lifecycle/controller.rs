use std::time::Duration;

use crate::config::ClientConfig;
use crate::lifecycle::reveal::{RevealAnimator, RevealFrame};
use crate::lifecycle::state::{Effect, Event, LifecycleState, SessionToken, Transition};
use crate::models::{GenerationRequest, ImageSize};

pub const PROMPT_REQUIRED_NOTICE: &str = "Please enter a prompt";

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub countdown_secs: u32,
    pub prompt_prefix: String,
    pub size: ImageSize,
    pub animator: RevealAnimator,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for ControllerSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            countdown_secs: config.countdown_secs,
            prompt_prefix: config.prompt_prefix.clone(),
            size: config.size,
            animator: RevealAnimator::new(config.reveal_duration, config.max_blur),
        }
    }
}

/// Pure transition function over the lifecycle states.
///
/// Only `Submit` mints anything new (the session token of the call it issues).
/// Events a state does not define leave it untouched.
pub fn transition(state: &LifecycleState, event: Event, settings: &ControllerSettings) -> Transition {
    match (state, event) {
        (LifecycleState::Idle, Event::Submit(text)) => {
            let text = text.trim();
            let prompt = format!("{}{}", settings.prompt_prefix, text);
            match GenerationRequest::new(prompt, settings.size) {
                Some(request) if !text.is_empty() => {
                    let token = SessionToken::new();
                    Transition::to(
                        LifecycleState::Pending {
                            deadline_ticks: settings.countdown_secs,
                            token,
                        },
                        vec![
                            Effect::IssueGeneration { token, request },
                            Effect::StartCountdown,
                        ],
                    )
                }
                _ => Transition::to(LifecycleState::Idle, vec![Effect::RequirePrompt]),
            }
        }

        (
            LifecycleState::Pending {
                deadline_ticks,
                token,
            },
            Event::TimerTick,
        ) => Transition::to(
            LifecycleState::Pending {
                deadline_ticks: deadline_ticks.saturating_sub(1),
                token: *token,
            },
            Vec::new(),
        ),

        (LifecycleState::Pending { token, .. }, Event::ProviderSucceeded { token: tag, image_ref })
            if *token == tag =>
        {
            Transition::to(
                LifecycleState::Revealing {
                    image_ref,
                    elapsed_ms: 0,
                    rendered: false,
                },
                vec![Effect::StopCountdown],
            )
        }

        (LifecycleState::Pending { token, .. }, Event::ProviderFailed { token: tag, failure })
            if *token == tag =>
        {
            Transition::to(
                LifecycleState::Error {
                    kind: failure.kind,
                    message: failure.message,
                },
                vec![Effect::StopCountdown],
            )
        }

        (
            LifecycleState::Revealing {
                image_ref,
                elapsed_ms,
                rendered,
            },
            Event::ImageRendered,
        ) => {
            if *rendered {
                // later renders of the same image do not restart the reveal
                Transition::to(state.clone(), Vec::new())
            } else {
                Transition::to(
                    LifecycleState::Revealing {
                        image_ref: image_ref.clone(),
                        elapsed_ms: *elapsed_ms,
                        rendered: true,
                    },
                    vec![Effect::StartReveal],
                )
            }
        }

        (_, Event::Reset) => {
            let mut effects = match state {
                LifecycleState::Pending { .. } => vec![Effect::StopCountdown],
                LifecycleState::Revealing { .. } => vec![Effect::CancelReveal],
                LifecycleState::Idle | LifecycleState::Error { .. } => Vec::new(),
            };
            effects.push(Effect::ClearInput);
            Transition::to(LifecycleState::Idle, effects)
        }

        _ => Transition::ignored(state),
    }
}

/// Owns the single live lifecycle state plus the input buffer.
#[derive(Debug, Clone)]
pub struct Controller {
    state: LifecycleState,
    input: String,
    settings: ControllerSettings,
}

impl Controller {
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            state: LifecycleState::Idle,
            input: String::new(),
            settings,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Submits whatever is in the input buffer.
    pub fn submit_input(&mut self) -> Transition {
        let text = self.input.clone();
        self.handle(Event::Submit(text))
    }

    pub fn handle(&mut self, event: Event) -> Transition {
        let label = event_label(&event);
        let outcome = transition(&self.state, event, &self.settings);

        if outcome.accepted {
            if outcome.next.name() != self.state.name() {
                log::debug!(
                    "Lifecycle {} -> {} on {}",
                    self.state.name(),
                    outcome.next.name(),
                    label
                );
            }
            self.state = outcome.next.clone();
            if outcome.effects.contains(&Effect::ClearInput) {
                self.input.clear();
            }
        } else {
            log::debug!("Ignoring {} while {}", label, self.state.name());
        }

        outcome
    }

    /// Advances the reveal to `elapsed` and returns the frame to draw.
    ///
    /// Returns `None` unless the image is rendered and the state is still
    /// `Revealing`, which makes stray frame callbacks after a reset harmless.
    pub fn advance_reveal(&mut self, elapsed: Duration) -> Option<RevealFrame> {
        match &mut self.state {
            LifecycleState::Revealing {
                elapsed_ms,
                rendered: true,
                ..
            } => {
                let sampled = elapsed.as_millis().min(u64::MAX as u128) as u64;
                *elapsed_ms = (*elapsed_ms).max(sampled);
                Some(
                    self.settings
                        .animator
                        .frame(Duration::from_millis(*elapsed_ms)),
                )
            }
            _ => None,
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(ControllerSettings::default())
    }
}

fn event_label(event: &Event) -> &'static str {
    match event {
        Event::Submit(_) => "submit",
        Event::ProviderSucceeded { .. } => "provider-succeeded",
        Event::ProviderFailed { .. } => "provider-failed",
        Event::TimerTick => "tick",
        Event::ImageRendered => "image-rendered",
        Event::Reset => "reset",
    }
}
