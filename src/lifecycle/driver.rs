//! Runs a [`Controller`] against real time.
//!
//! The driver is the only place timers live. Events from the UI (through a
//! [`SessionHandle`]), results of generation calls, countdown ticks and animation
//! frames are all funnelled through one `select!` loop, so the controller sees them
//! strictly one at a time and in arrival order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::client::GenerationApi;
use crate::lifecycle::controller::{Controller, ControllerSettings, PROMPT_REQUIRED_NOTICE};
use crate::lifecycle::reveal::RevealFrame;
use crate::lifecycle::state::{Effect, Event, LifecycleState, Transition};

pub const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);
pub const FRAME_PERIOD: Duration = Duration::from_millis(16);

/// What the UI needs to redraw.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    State(LifecycleState),
    Notice(&'static str),
    Reveal(RevealFrame),
    /// The input field should be emptied.
    InputCleared,
}

#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Event>,
}

impl SessionHandle {
    /// Returns false once the driver has stopped.
    pub fn send(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Places `text` in the controller's input buffer and submits it.
    pub fn submit(&self, text: impl Into<String>) -> bool {
        self.send(Event::Submit(text.into()))
    }

    pub fn image_rendered(&self) -> bool {
        self.send(Event::ImageRendered)
    }

    pub fn reset(&self) -> bool {
        self.send(Event::Reset)
    }
}

struct RevealClock {
    started: Instant,
    frames: Interval,
}

pub struct SessionDriver<A: GenerationApi + 'static> {
    controller: Controller,
    api: Arc<A>,
    commands: mpsc::UnboundedReceiver<Event>,
    results_tx: mpsc::UnboundedSender<Event>,
    results_rx: mpsc::UnboundedReceiver<Event>,
    updates: mpsc::UnboundedSender<ViewUpdate>,
    countdown: Option<Interval>,
    reveal: Option<RevealClock>,
}

/// Creates a driver plus the handle that feeds it and the stream of view updates.
pub fn session<A: GenerationApi + 'static>(
    api: Arc<A>,
    settings: ControllerSettings,
) -> (
    SessionDriver<A>,
    SessionHandle,
    mpsc::UnboundedReceiver<ViewUpdate>,
) {
    let (command_tx, commands) = mpsc::unbounded_channel();
    let (results_tx, results_rx) = mpsc::unbounded_channel();
    let (updates, updates_rx) = mpsc::unbounded_channel();

    let driver = SessionDriver {
        controller: Controller::new(settings),
        api,
        commands,
        results_tx,
        results_rx,
        updates,
        countdown: None,
        reveal: None,
    };

    (driver, SessionHandle { tx: command_tx }, updates_rx)
}

impl<A: GenerationApi + 'static> SessionDriver<A> {
    /// Runs until every [`SessionHandle`] is dropped, then hands back the controller.
    pub async fn run(mut self) -> Controller {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(event) => self.on_command(event),
                    None => break,
                },
                Some(result) = self.results_rx.recv() => self.dispatch(result),
                _ = next_tick(&mut self.countdown) => self.dispatch(Event::TimerTick),
                _ = next_frame(&mut self.reveal) => self.on_frame(),
            }
        }

        self.countdown = None;
        self.reveal = None;
        log::debug!("Session driver stopped in state {}", self.controller.state().name());
        self.controller
    }

    fn on_command(&mut self, event: Event) {
        match event {
            Event::Submit(text) => {
                self.controller.set_input(text);
                let outcome = self.controller.submit_input();
                self.settle(outcome);
            }
            other => self.dispatch(other),
        }
    }

    fn dispatch(&mut self, event: Event) {
        let outcome = self.controller.handle(event);
        self.settle(outcome);
    }

    fn settle(&mut self, outcome: Transition) {
        for effect in outcome.effects {
            self.apply(effect);
        }
        if outcome.accepted {
            self.publish(ViewUpdate::State(self.controller.state().clone()));
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::RequirePrompt => self.publish(ViewUpdate::Notice(PROMPT_REQUIRED_NOTICE)),
            Effect::IssueGeneration { token, request } => {
                log::info!("Submitting generation request (session {})", token);
                let api = Arc::clone(&self.api);
                let results = self.results_tx.clone();
                tokio::spawn(async move {
                    let event = match api.generate(request).await {
                        Ok(image_ref) => Event::ProviderSucceeded { token, image_ref },
                        Err(failure) => Event::ProviderFailed { token, failure },
                    };
                    // the driver may already be gone; the result is moot then
                    let _ = results.send(event);
                });
            }
            Effect::StartCountdown => {
                let mut interval =
                    time::interval_at(Instant::now() + COUNTDOWN_PERIOD, COUNTDOWN_PERIOD);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.countdown = Some(interval);
            }
            Effect::StopCountdown => self.countdown = None,
            Effect::StartReveal => {
                let mut frames = time::interval(FRAME_PERIOD);
                frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.reveal = Some(RevealClock {
                    started: Instant::now(),
                    frames,
                });
            }
            Effect::CancelReveal => self.reveal = None,
            Effect::ClearInput => self.publish(ViewUpdate::InputCleared),
        }
    }

    fn on_frame(&mut self) {
        let Some(clock) = &self.reveal else {
            return;
        };
        let elapsed = clock.started.elapsed();
        match self.controller.advance_reveal(elapsed) {
            Some(frame) => {
                if frame.is_finished() {
                    self.reveal = None;
                }
                self.publish(ViewUpdate::Reveal(frame));
            }
            None => self.reveal = None,
        }
    }

    fn publish(&self, update: ViewUpdate) {
        if self.updates.send(update).is_err() {
            log::trace!("View update dropped; no listener");
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) -> Instant {
    match interval {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}

async fn next_frame(clock: &mut Option<RevealClock>) -> Instant {
    match clock {
        Some(clock) => clock.frames.tick().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, GenerationFailure};
    use crate::lifecycle::reveal::RevealAnimator;
    use crate::models::{GenerationRequest, ImageSize};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeApi {
        delay: Duration,
        outcome: Result<String, GenerationFailure>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn new(delay: Duration, outcome: Result<String, GenerationFailure>) -> Arc<Self> {
            Arc::new(Self {
                delay,
                outcome,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationApi for FakeApi {
        async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.prompt);
            if !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            self.outcome.clone()
        }
    }

    fn settings() -> ControllerSettings {
        ControllerSettings {
            countdown_secs: 30,
            prompt_prefix: "emoji of a ".into(),
            size: ImageSize::Square1024,
            animator: RevealAnimator::default(),
        }
    }

    async fn next_state(updates: &mut mpsc::UnboundedReceiver<ViewUpdate>) -> LifecycleState {
        loop {
            match updates.recv().await {
                Some(ViewUpdate::State(state)) => return state,
                Some(_) => continue,
                None => panic!("driver stopped"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_reveals_the_image_to_full_clarity() {
        let api = FakeApi::new(Duration::ZERO, Ok("https://x/y.png".into()));
        let (driver, handle, mut updates) = session(api.clone(), settings());
        let task = tokio::spawn(driver.run());

        handle.submit("fox");
        assert_eq!(next_state(&mut updates).await.countdown(), Some(30));
        assert_eq!(
            next_state(&mut updates).await,
            LifecycleState::Revealing {
                image_ref: "https://x/y.png".into(),
                elapsed_ms: 0,
                rendered: false,
            }
        );

        handle.image_rendered();
        let mut frames = Vec::new();
        loop {
            match updates.recv().await {
                Some(ViewUpdate::Reveal(frame)) => {
                    frames.push(frame);
                    if frame.is_finished() {
                        break;
                    }
                }
                Some(_) => continue,
                None => panic!("driver stopped"),
            }
        }

        assert!(frames.len() > 1);
        assert!(frames.windows(2).all(|w| w[1].blur <= w[0].blur));
        assert!(frames.iter().all(|f| f.opacity == 1.0));
        assert!(frames.last().unwrap().blur.abs() < 1e-3);
        assert_eq!(api.calls(), 1);
        assert_eq!(api.prompts.lock().unwrap()[0], "emoji of a fox");

        drop(handle);
        let controller = task.await.unwrap();
        assert!(matches!(controller.state(), LifecycleState::Revealing { rendered: true, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_runs_down_and_holds_at_zero_until_the_result() {
        let api = FakeApi::new(Duration::from_secs(40), Ok("https://x/y.png".into()));
        let (driver, handle, mut updates) = session(api.clone(), settings());
        let task = tokio::spawn(driver.run());

        handle.submit("fox");
        let mut countdowns = Vec::new();
        let final_state = loop {
            let state = next_state(&mut updates).await;
            match state.countdown() {
                Some(value) => countdowns.push(value),
                None => break state,
            }
        };

        assert_eq!(countdowns.first(), Some(&30));
        assert!(countdowns.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(countdowns.last(), Some(&0));
        assert!(countdowns.len() > 31);
        assert!(matches!(final_state, LifecycleState::Revealing { .. }));
        assert_eq!(api.calls(), 1);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failure_lands_in_error_and_reset_returns_to_idle() {
        let failure = GenerationFailure::new(ErrorKind::Provider, "No image data returned from API");
        let api = FakeApi::new(Duration::from_millis(500), Err(failure));
        let (driver, handle, mut updates) = session(api, settings());
        let task = tokio::spawn(driver.run());

        handle.submit("fox");
        next_state(&mut updates).await;
        assert_eq!(
            next_state(&mut updates).await,
            LifecycleState::Error {
                kind: ErrorKind::Provider,
                message: "No image data returned from API".into(),
            }
        );

        handle.reset();
        assert_eq!(next_state(&mut updates).await, LifecycleState::Idle);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn result_arriving_after_reset_is_discarded() {
        let api = FakeApi::new(Duration::from_secs(5), Ok("https://x/y.png".into()));
        let (driver, handle, mut updates) = session(api.clone(), settings());
        let task = tokio::spawn(driver.run());

        handle.submit("fox");
        handle.reset();
        time::sleep(Duration::from_secs(10)).await;

        drop(handle);
        let controller = task.await.unwrap();
        assert_eq!(controller.state(), &LifecycleState::Idle);
        assert_eq!(api.calls(), 1);

        let mut seen = Vec::new();
        while let Ok(update) = updates.try_recv() {
            seen.push(update);
        }
        assert!(!seen
            .iter()
            .any(|u| matches!(u, ViewUpdate::State(LifecycleState::Revealing { .. }))));
        assert!(matches!(seen.last(), Some(ViewUpdate::State(LifecycleState::Idle))));
    }

    #[tokio::test(start_paused = true)]
    async fn submitted_text_stays_in_the_buffer_until_reset() {
        let api = FakeApi::new(Duration::ZERO, Ok("https://x/y.png".into()));
        let (driver, handle, mut updates) = session(api.clone(), settings());
        let task = tokio::spawn(driver.run());

        handle.submit("fox");
        next_state(&mut updates).await;
        next_state(&mut updates).await;
        drop(handle);
        let controller = task.await.unwrap();
        assert_eq!(controller.input(), "fox");

        let (driver, handle, mut updates) = session(api, settings());
        let task = tokio::spawn(driver.run());

        handle.submit("fox");
        next_state(&mut updates).await;
        next_state(&mut updates).await;
        handle.reset();
        assert_eq!(updates.recv().await, Some(ViewUpdate::InputCleared));
        assert_eq!(next_state(&mut updates).await, LifecycleState::Idle);

        drop(handle);
        let controller = task.await.unwrap();
        assert_eq!(controller.input(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_prompt_raises_a_notice_without_a_call() {
        let api = FakeApi::new(Duration::ZERO, Ok("https://x/y.png".into()));
        let (driver, handle, mut updates) = session(api.clone(), settings());
        let task = tokio::spawn(driver.run());

        handle.submit("");
        assert_eq!(
            updates.recv().await,
            Some(ViewUpdate::Notice(PROMPT_REQUIRED_NOTICE))
        );
        assert_eq!(next_state(&mut updates).await, LifecycleState::Idle);

        drop(handle);
        task.await.unwrap();
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_resubmission_issues_one_call() {
        let api = FakeApi::new(Duration::from_secs(2), Ok("https://x/y.png".into()));
        let (driver, handle, _updates) = session(api.clone(), settings());
        let task = tokio::spawn(driver.run());

        for _ in 0..5 {
            handle.submit("fox");
        }
        time::sleep(Duration::from_secs(3)).await;

        drop(handle);
        task.await.unwrap();
        assert_eq!(api.calls(), 1);
    }
}
