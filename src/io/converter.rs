//! Pitch and loudness conversions used when turning score events into voices.

/// Dynamic range, in dB, that MIDI velocity 1..=127 spans.
pub const VELOCITY_RANGE_DB: f32 = 60.0;

/// Convert a (fractional) MIDI key to Hz. Key 69 = A4 = 440 Hz.
#[inline]
pub fn key_to_frequency(key: f32) -> f32 {
    440.0 * 2.0_f32.powf((key - 69.0) / 12.0)
}

/// Inverse of [`key_to_frequency`].
#[inline]
pub fn frequency_to_key(frequency: f32) -> f32 {
    69.0 + 12.0 * (frequency.max(f32::MIN_POSITIVE) / 440.0).log2()
}

/// Map MIDI velocity onto a linear gain in [0, 1] spanning `range_db`.
///
/// Quadratic law: velocity 127 is unity, velocity 1 sits `range_db` below it,
/// and the curve in between is smooth in perceived loudness.
pub fn velocity_to_amplitude(velocity: f32, range_db: f32) -> f32 {
    let velocity = velocity.clamp(0.0, 127.0);
    let r = 10.0_f32.powf(range_db / 20.0);
    let b = 127.0 / (126.0 * r.sqrt()) - 1.0 / 126.0;
    let m = (1.0 - b) / 127.0;
    let v = m * velocity + b;
    v * v
}

/// Peak amplitude of a note for an instrument whose raw output peaks near
/// `measure` at full velocity.
///
/// An instrument at velocity 127 lands at 80 dB on a 120 dB full scale, i.e.
/// `100 / measure` before the velocity curve.
pub fn note_amplitude(velocity: f32, measure: f32) -> f32 {
    velocity_to_amplitude(velocity, VELOCITY_RANGE_DB) * 100.0 / measure.max(f32::MIN_POSITIVE)
}

#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Shift a MIDI velocity by `db` along the velocity curve, staying in 0..=127.
pub fn offset_velocity(velocity: f32, db: f32, range_db: f32) -> f32 {
    if db == 0.0 {
        return velocity;
    }
    let target = (velocity_to_amplitude(velocity, range_db) * db_to_gain(db)).sqrt();
    let r = 10.0_f32.powf(range_db / 20.0);
    let b = 127.0 / (126.0 * r.sqrt()) - 1.0 / 126.0;
    let m = (1.0 - b) / 127.0;
    ((target - b) / m).clamp(0.0, 127.0)
}
