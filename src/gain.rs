//! Decibel conversion.
//!
//! The host stores volume-like properties as linear gain; user-facing APIs
//! speak dB. Conversion happens exactly once, in the entity wrappers, using
//! these helpers.

/// `10 ^ (db / 20)`
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// `20 * log10(linear)`; negative infinity for silence.
pub fn linear_to_db(linear: f64) -> f64 {
    20.0 * linear.log10()
}
