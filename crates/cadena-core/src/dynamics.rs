//! Feed-forward dynamic range compression.
//!
//! The compressor detects level with an [`EnvelopeFollower`], maps the
//! detected level through a soft-knee gain curve, and applies the
//! resulting reduction to the signal. Parameter setters clamp through
//! [`ParamKey`] ranges, so a compressor never runs with an illegal
//! configuration.

use crate::envelope::EnvelopeFollower;
use crate::math;
use crate::params::{CompressorParams, ParamKey};

/// Static gain curve: detected level in, gain change out.
#[derive(Debug, Clone, Copy)]
struct GainComputer {
    threshold_db: f32,
    knee_db: f32,
    ratio: f32,
}

impl GainComputer {
    /// Gain to apply in dB (zero or negative) for a detected level.
    ///
    /// Below the knee the curve is flat, above it the slope is
    /// `1 - 1/ratio`, and inside the knee a quadratic blends the two.
    /// A zero-width knee never reaches the quadratic branch, so the
    /// division by `knee_db` is safe.
    fn gain_db(&self, level_db: f32) -> f32 {
        let overshoot = level_db - self.threshold_db;
        let half_knee = self.knee_db / 2.0;
        let slope = 1.0 - 1.0 / self.ratio;
        if overshoot <= -half_knee {
            0.0
        } else if overshoot > half_knee {
            -overshoot * slope
        } else {
            let blend = (overshoot + half_knee) / self.knee_db;
            -(blend * blend * half_knee * slope)
        }
    }
}

/// Mono feed-forward compressor.
///
/// Freshly constructed compressors use a gentle broadcast-style profile;
/// chains that want the stored tunables call [`configure`](Self::configure)
/// right after creation.
#[derive(Debug, Clone)]
pub struct DynamicsCompressor {
    follower: EnvelopeFollower,
    computer: GainComputer,
    reduction_db: f32,
}

impl DynamicsCompressor {
    /// Creates a compressor at `sample_rate` with the stock profile
    /// (-24 dB threshold, 30 dB knee, 12:1, 3 ms attack, 250 ms release).
    #[must_use]
    pub fn new(sample_rate: f32) -> Self {
        Self {
            follower: EnvelopeFollower::new(0.003, 0.25, sample_rate),
            computer: GainComputer {
                threshold_db: -24.0,
                knee_db: 30.0,
                ratio: 12.0,
            },
            reduction_db: 0.0,
        }
    }

    /// Applies the five compressor tunables from a parameter set.
    ///
    /// `output_gain` is not consumed here; gain is a separate stage.
    pub fn configure(&mut self, params: &CompressorParams) {
        self.set_threshold_db(params.threshold_db);
        self.set_knee_db(params.knee_db);
        self.set_ratio(params.ratio);
        self.set_attack_sec(params.attack_sec);
        self.set_release_sec(params.release_sec);
    }

    /// Sets the threshold in dB, clamped to its legal range.
    pub fn set_threshold_db(&mut self, threshold_db: f32) {
        self.computer.threshold_db = ParamKey::Threshold.clamp(threshold_db);
    }

    /// Sets the knee width in dB, clamped to its legal range.
    pub fn set_knee_db(&mut self, knee_db: f32) {
        self.computer.knee_db = ParamKey::Knee.clamp(knee_db);
    }

    /// Sets the ratio, clamped to its legal range.
    pub fn set_ratio(&mut self, ratio: f32) {
        self.computer.ratio = ParamKey::Ratio.clamp(ratio);
    }

    /// Sets the attack time in seconds, clamped to its legal range.
    pub fn set_attack_sec(&mut self, attack_sec: f32) {
        self.follower.set_attack_sec(ParamKey::Attack.clamp(attack_sec));
    }

    /// Sets the release time in seconds, clamped to its legal range.
    pub fn set_release_sec(&mut self, release_sec: f32) {
        self.follower.set_release_sec(ParamKey::Release.clamp(release_sec));
    }

    /// Threshold in dB.
    #[must_use]
    pub fn threshold_db(&self) -> f32 {
        self.computer.threshold_db
    }

    /// Knee width in dB.
    #[must_use]
    pub fn knee_db(&self) -> f32 {
        self.computer.knee_db
    }

    /// Ratio as N in N:1.
    #[must_use]
    pub fn ratio(&self) -> f32 {
        self.computer.ratio
    }

    /// Attack time in seconds.
    #[must_use]
    pub fn attack_sec(&self) -> f32 {
        self.follower.attack_sec()
    }

    /// Release time in seconds.
    #[must_use]
    pub fn release_sec(&self) -> f32 {
        self.follower.release_sec()
    }

    /// Gain reduction currently applied, in positive dB.
    #[must_use]
    pub fn reduction_db(&self) -> f32 {
        self.reduction_db
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let envelope = self.follower.process(input);
        let gain_db = self.computer.gain_db(math::linear_to_db(envelope));
        self.reduction_db = -gain_db;
        input * math::db_to_linear(gain_db)
    }

    /// Processes a block in place.
    pub fn process_block(&mut self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Updates the sample rate, keeping attack and release times.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.follower.set_sample_rate(sample_rate);
    }

    /// Clears detector state and the reduction meter.
    pub fn reset(&mut self) {
        self.follower.reset();
        self.reduction_db = 0.0;
    }
}
