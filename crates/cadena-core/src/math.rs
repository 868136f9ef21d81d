//! Decibel conversions shared by the dynamics and routing code.

/// Natural log of 10, used to express `10^x` through [`libm::expf`].
const LN_10: f32 = core::f32::consts::LN_10;

/// Converts a decibel value to linear amplitude.
///
/// `0 dB` maps to `1.0`, `-20 dB` to `0.1`, `+6 dB` to roughly `2.0`.
///
/// # Examples
///
/// ```
/// use cadena_core::math::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
/// assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
/// ```
#[must_use]
pub fn db_to_linear(db: f32) -> f32 {
    libm::expf(db * LN_10 / 20.0)
}

/// Converts linear amplitude to decibels.
///
/// Input is floored at `1e-10` so silence comes back as `-200 dB`
/// instead of negative infinity.
///
/// # Examples
///
/// ```
/// use cadena_core::math::linear_to_db;
///
/// assert!(linear_to_db(1.0).abs() < 1e-4);
/// assert!((linear_to_db(0.1) + 20.0).abs() < 1e-4);
/// ```
#[must_use]
pub fn linear_to_db(linear: f32) -> f32 {
    libm::logf(linear.max(1e-10)) * 20.0 / LN_10
}
