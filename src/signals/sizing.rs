//! Fractional-Kelly sizing shared by all detectors.

/// Maximum fraction of bankroll a single signal may recommend.
const MAX_FRACTION: f64 = 0.10;

/// Quarter-Kelly stake as a fraction of bankroll.
///
/// Confidence maps linearly onto [0, 1] edge above a 0.5 coin flip, scaled
/// to a quarter Kelly and hard-capped at 10% of bankroll.
pub fn kelly_fraction(confidence: f64) -> f64 {
    let edge = ((confidence - 0.5) / 0.5).clamp(0.0, 1.0);
    (edge * 0.25).min(MAX_FRACTION)
}
