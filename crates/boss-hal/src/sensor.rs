//! Input-side hardware traits: quadrature encoders, the gyro, digital
//! switches and raw analog sources.

/// A resettable quadrature encoder.
pub trait QuadEncoder: Send + Sync {
    fn id(&self) -> &str;

    /// Raw tick count since the last reset.
    fn count(&self) -> i32;

    /// Distance travelled since the last reset, in the encoder's
    /// distance-per-pulse units.
    fn distance(&self) -> f64;

    /// Zero the tick count.
    fn reset(&mut self);
}

/// A yaw-rate gyro integrated into a heading in degrees.
pub trait Gyro: Send + Sync {
    /// Accumulated heading in degrees.  Not wrapped.
    fn angle(&self) -> f32;

    /// Re-zero the heading.
    fn reset(&mut self);
}

/// A digital input such as a pressure switch or a selector DIP switch.
pub trait DigitalInput: Send + Sync {
    fn id(&self) -> &str;

    fn get(&self) -> bool;
}

/// A raw analog channel read by the background sampler.
///
/// Sources are owned by the sampling task, never by the control core; the
/// core only sees the last stored value in the
/// [`AnalogBank`][crate::analog::AnalogBank].
pub trait AnalogSource: Send {
    /// Index of the bank slot this source writes.
    fn channel(&self) -> usize;

    /// Read the scaled voltage, or `None` if the channel is unavailable.
    fn sample(&mut self) -> Option<f32>;
}
