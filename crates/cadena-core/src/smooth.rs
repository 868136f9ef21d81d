//! One-pole parameter smoothing.
//!
//! Jumping a gain value between blocks produces an audible click. A
//! [`SmoothedParam`] instead eases the running value toward its target
//! with a one-pole lowpass, advanced once per sample.

/// Exponentially smoothed parameter value.
#[derive(Debug, Clone, Copy)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    smoothing_time_ms: f32,
}

impl SmoothedParam {
    /// Default smoothing window in milliseconds.
    pub const DEFAULT_SMOOTHING_MS: f32 = 10.0;

    /// Targets within this distance of the running value count as settled.
    const SETTLE_EPSILON: f32 = 1e-6;

    /// Creates a smoother resting at `initial` with the default window.
    #[must_use]
    pub fn new(initial: f32, sample_rate: f32) -> Self {
        Self::with_time(initial, sample_rate, Self::DEFAULT_SMOOTHING_MS)
    }

    /// Creates a smoother resting at `initial` with an explicit window.
    ///
    /// A window of zero milliseconds disables smoothing entirely and
    /// every [`advance`](Self::advance) lands on the target.
    #[must_use]
    pub fn with_time(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate,
            smoothing_time_ms: smoothing_time_ms.max(0.0),
        };
        param.recalculate_coeff();
        param
    }

    /// Moves the running value one sample toward the target and returns it.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Sets a new target to ease toward.
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jumps both the running value and the target, bypassing the ramp.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Current (smoothed) value without advancing.
    #[must_use]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// The value being eased toward.
    #[must_use]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True once the running value has effectively reached the target.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        (self.target - self.current).abs() < Self::SETTLE_EPSILON
    }

    /// Forces the running value onto the target.
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    /// Updates the sample rate and rederives the ramp coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    /// Updates the smoothing window and rederives the ramp coefficient.
    pub fn set_smoothing_time_ms(&mut self, smoothing_time_ms: f32) {
        self.smoothing_time_ms = smoothing_time_ms.max(0.0);
        self.recalculate_coeff();
    }

    /// Smoothing window in milliseconds.
    #[must_use]
    pub fn smoothing_time_ms(&self) -> f32 {
        self.smoothing_time_ms
    }

    // coeff = 1 - e^(-1/tau) with tau in samples, so the value covers
    // ~63% of the remaining distance per window.
    fn recalculate_coeff(&mut self) {
        let tau_samples = self.smoothing_time_ms * 0.001 * self.sample_rate;
        self.coeff = if tau_samples > 0.0 {
            1.0 - libm::expf(-1.0 / tau_samples)
        } else {
            1.0
        };
    }
}
