//! Compressor tunables, their legal ranges, and clamping.
//!
//! Every write path funnels through [`ParamKey::clamp`], so a value that
//! reaches the processing graph is always inside its legal range. Callers
//! never see a rejection for an out-of-range value; they see the clamped
//! result.

/// Inclusive legal range for one tunable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    /// Lowest accepted value.
    pub min: f32,
    /// Highest accepted value.
    pub max: f32,
}

impl ParamRange {
    /// Creates a range. `min` must not exceed `max`.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamps `value` into the range. Non-finite input lands on `min`.
    #[must_use]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

/// Identifies one of the six tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    /// Level above which compression engages, in dB.
    Threshold,
    /// Width of the soft transition around the threshold, in dB.
    Knee,
    /// Input/output slope above the threshold, as N in N:1.
    Ratio,
    /// Time to react to rising level, in seconds.
    Attack,
    /// Time to recover after the level falls, in seconds.
    Release,
    /// Linear output gain applied after the (optional) compressor.
    OutputGain,
}

impl ParamKey {
    /// All keys in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Threshold,
        Self::Knee,
        Self::Ratio,
        Self::Attack,
        Self::Release,
        Self::OutputGain,
    ];

    /// Stable lowercase identifier, usable on a command line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::Knee => "knee",
            Self::Ratio => "ratio",
            Self::Attack => "attack",
            Self::Release => "release",
            Self::OutputGain => "gain",
        }
    }

    /// Looks a key up by its [`name`](Self::name).
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    /// Display suffix for the key's unit.
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Self::Threshold | Self::Knee => " dB",
            Self::Ratio => ":1",
            Self::Attack | Self::Release => " s",
            Self::OutputGain => "x",
        }
    }

    /// Legal range for this key.
    #[must_use]
    pub fn range(self) -> ParamRange {
        match self {
            Self::Threshold => ParamRange::new(-100.0, 0.0),
            Self::Knee => ParamRange::new(0.0, 40.0),
            Self::Ratio => ParamRange::new(1.0, 20.0),
            Self::Attack => ParamRange::new(0.0, 0.25),
            Self::Release => ParamRange::new(0.0, 2.0),
            Self::OutputGain => ParamRange::new(0.0, 3.0),
        }
    }

    /// Default value for this key.
    #[must_use]
    pub fn default_value(self) -> f32 {
        match self {
            Self::Threshold => -60.0,
            Self::Knee => 0.0,
            Self::Ratio => 20.0,
            Self::Attack => 0.0,
            Self::Release => 1.0,
            Self::OutputGain => 1.0,
        }
    }

    /// Clamps `value` into this key's range.
    #[must_use]
    pub fn clamp(self, value: f32) -> f32 {
        self.range().clamp(value)
    }
}

/// Full set of tunables for one compression chain.
///
/// The default profile is a hard limiter: everything above -60 dB is
/// flattened at 20:1 with an instant attack and a one second release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    /// Level above which compression engages, in dB.
    pub threshold_db: f32,
    /// Soft-knee width in dB. Zero gives a hard knee.
    pub knee_db: f32,
    /// Compression ratio as N in N:1.
    pub ratio: f32,
    /// Attack time in seconds.
    pub attack_sec: f32,
    /// Release time in seconds.
    pub release_sec: f32,
    /// Linear gain applied at the end of the chain.
    pub output_gain: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: ParamKey::Threshold.default_value(),
            knee_db: ParamKey::Knee.default_value(),
            ratio: ParamKey::Ratio.default_value(),
            attack_sec: ParamKey::Attack.default_value(),
            release_sec: ParamKey::Release.default_value(),
            output_gain: ParamKey::OutputGain.default_value(),
        }
    }
}

impl CompressorParams {
    /// Reads the field addressed by `key`.
    #[must_use]
    pub fn value(&self, key: ParamKey) -> f32 {
        match key {
            ParamKey::Threshold => self.threshold_db,
            ParamKey::Knee => self.knee_db,
            ParamKey::Ratio => self.ratio,
            ParamKey::Attack => self.attack_sec,
            ParamKey::Release => self.release_sec,
            ParamKey::OutputGain => self.output_gain,
        }
    }

    /// Writes the field addressed by `key`, clamping into its range.
    ///
    /// Returns the value actually stored.
    pub fn set_value(&mut self, key: ParamKey, value: f32) -> f32 {
        let clamped = key.clamp(value);
        match key {
            ParamKey::Threshold => self.threshold_db = clamped,
            ParamKey::Knee => self.knee_db = clamped,
            ParamKey::Ratio => self.ratio = clamped,
            ParamKey::Attack => self.attack_sec = clamped,
            ParamKey::Release => self.release_sec = clamped,
            ParamKey::OutputGain => self.output_gain = clamped,
        }
        clamped
    }

    /// Returns a copy with every field clamped into its range.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        for key in ParamKey::ALL {
            let raw = self.value(key);
            self.set_value(key, raw);
        }
        self
    }
}
