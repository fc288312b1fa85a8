//! Blur-to-clear reveal of a freshly generated image.
//!
//! The animation is a pure function of the time elapsed since it started, so any
//! clock can drive it: a frame timer, a test clock, or repeated calls with the same
//! instant (which yield the same frame).

use std::time::Duration;

pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);
pub const DEFAULT_MAX_BLUR: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealFrame {
    /// Blur radius in pixels.
    pub blur: f32,
    pub opacity: f32,
    /// Fraction of the animation completed, in `0.0..=1.0`.
    pub progress: f32,
}

impl RevealFrame {
    pub fn is_finished(&self) -> bool {
        self.progress >= 1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealAnimator {
    duration: Duration,
    max_blur: f32,
}

impl Default for RevealAnimator {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION, DEFAULT_MAX_BLUR)
    }
}

impl RevealAnimator {
    pub fn new(duration: Duration, max_blur: f32) -> Self {
        Self {
            duration,
            max_blur: max_blur.max(0.0),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn max_blur(&self) -> f32 {
        self.max_blur
    }

    pub fn progress(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn blur(&self, elapsed: Duration) -> f32 {
        self.max_blur * (1.0 - ease_out_cubic(self.progress(elapsed)))
    }

    pub fn frame(&self, elapsed: Duration) -> RevealFrame {
        RevealFrame {
            blur: self.blur(elapsed),
            opacity: 1.0,
            progress: self.progress(elapsed),
        }
    }
}

pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}
