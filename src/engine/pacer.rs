//! Randomized, interruptible cooldown between outbound actions.

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::core::config::MAX_ALLOWED_COOLDOWN;

const MAX_COOLDOWN: Duration = Duration::from_secs(MAX_ALLOWED_COOLDOWN as u64);

fn clamp_secs(secs: f64) -> f64 {
    if secs.is_nan() {
        0.0
    } else {
        secs.clamp(0.0, MAX_ALLOWED_COOLDOWN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacer {
    min_secs: f64,
    max_secs: f64,
}

impl Pacer {
    /// Out-of-range bounds are clamped into `[0, MAX_ALLOWED_COOLDOWN]`: NaN
    /// becomes 0, infinity becomes the cap, and a maximum below the minimum is
    /// raised to it.
    #[must_use]
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        let min_secs = clamp_secs(min_secs);
        let max_secs = clamp_secs(max_secs).max(min_secs);
        Self { min_secs, max_secs }
    }

    #[must_use]
    pub fn bounds(&self) -> (f64, f64) {
        (self.min_secs, self.max_secs)
    }

    /// Draw a cooldown uniformly from `[min, max]`.
    #[must_use]
    pub fn draw(&self) -> Duration {
        let secs = if self.max_secs <= self.min_secs {
            self.min_secs
        } else {
            rand::thread_rng().gen_range(self.min_secs..=self.max_secs)
        };
        Duration::try_from_secs_f64(secs).unwrap_or(MAX_COOLDOWN)
    }

    /// Sleep for a random cooldown.
    ///
    /// Returns `false` as soon as `cancel` fires (including when it already has),
    /// `true` once the whole cooldown elapsed.
    pub async fn wait(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        let cooldown = self.draw();
        tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(cooldown) => true,
        }
    }
}
