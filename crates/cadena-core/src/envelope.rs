//! Peak envelope follower driving the compressor's level detector.

/// Tracks the peak level of a signal with separate attack and release ramps.
///
/// Rising input is followed with the attack coefficient, falling input
/// with the release coefficient. An attack or release of zero seconds
/// makes the corresponding edge instantaneous.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    sample_rate: f32,
    attack_sec: f32,
    release_sec: f32,
}

impl EnvelopeFollower {
    /// Creates a follower with the given ramp times in seconds.
    #[must_use]
    pub fn new(attack_sec: f32, release_sec: f32, sample_rate: f32) -> Self {
        let mut follower = Self {
            envelope: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            sample_rate,
            attack_sec: attack_sec.max(0.0),
            release_sec: release_sec.max(0.0),
        };
        follower.recalculate_coeffs();
        follower
    }

    /// Feeds one sample and returns the updated envelope.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let level = input.abs();
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = coeff * self.envelope + (1.0 - coeff) * level;
        self.envelope
    }

    /// Current envelope value without feeding a sample.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.envelope
    }

    /// Resets the envelope to silence.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    /// Sets the attack time in seconds.
    pub fn set_attack_sec(&mut self, attack_sec: f32) {
        self.attack_sec = attack_sec.max(0.0);
        self.recalculate_coeffs();
    }

    /// Sets the release time in seconds.
    pub fn set_release_sec(&mut self, release_sec: f32) {
        self.release_sec = release_sec.max(0.0);
        self.recalculate_coeffs();
    }

    /// Attack time in seconds.
    #[must_use]
    pub fn attack_sec(&self) -> f32 {
        self.attack_sec
    }

    /// Release time in seconds.
    #[must_use]
    pub fn release_sec(&self) -> f32 {
        self.release_sec
    }

    /// Updates the sample rate and rederives both coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeffs();
    }

    // A time of zero gives expf(-inf) == 0, collapsing the ramp to a
    // single sample rather than dividing by zero.
    fn recalculate_coeffs(&mut self) {
        self.attack_coeff = libm::expf(-1.0 / (self.attack_sec * self.sample_rate));
        self.release_coeff = libm::expf(-1.0 / (self.release_sec * self.sample_rate));
    }
}
