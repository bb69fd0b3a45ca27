use rand::Rng;
use std::time::Duration;

/// Longest pause a pacing produces, in seconds
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Randomized pause between page loads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    min_secs: f64,
    max_secs: f64,
}

impl Pacing {
    /// Uniformly random delay in `[min_secs, max_secs]`; bounds may be given in either order.
    ///
    /// Bounds are clamped to `[0, MAX_DELAY_SECS]`, NaN counting as zero.
    pub fn between(min_secs: f64, max_secs: f64) -> Self {
        let min_secs = clamp_secs(min_secs);
        let max_secs = clamp_secs(max_secs);
        if min_secs <= max_secs {
            Self { min_secs, max_secs }
        } else {
            Self { min_secs: max_secs, max_secs: min_secs }
        }
    }

    pub fn fixed(secs: f64) -> Self {
        Self::between(secs, secs)
    }

    pub fn none() -> Self {
        Self::fixed(0.0)
    }

    pub fn min_secs(&self) -> f64 {
        self.min_secs
    }

    pub fn max_secs(&self) -> f64 {
        self.max_secs
    }

    pub fn sample(&self) -> Duration {
        if self.max_secs <= self.min_secs {
            return Duration::from_secs_f64(self.min_secs);
        }
        let secs = rand::rng().random_range(self.min_secs..=self.max_secs);
        Duration::from_secs_f64(secs)
    }

    pub async fn wait(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn clamp_secs(secs: f64) -> f64 {
    if secs.is_nan() {
        0.0
    } else {
        secs.clamp(0.0, MAX_DELAY_SECS)
    }
}
