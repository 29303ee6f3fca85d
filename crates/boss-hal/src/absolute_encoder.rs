//! Unwrapping for absolute encoders whose output voltage wraps around.
//!
//! An absolute encoder reports shaft position as a voltage in
//! `[0, max_voltage)`, jumping from the top of the range back to the bottom
//! (or vice versa) once per revolution.  [`AbsoluteEncoder`] watches for
//! those jumps and keeps an accumulator of whole revolutions so callers can
//! work with a continuous *incremental* reading.
//!
//! A jump is recognised when two successive samples differ by more than
//! half the range.  This is only sound while the shaft moves less than half
//! a revolution between samples, so the encoder must be polled faster than
//! the mechanism can spin; a missed wrap silently shifts the accumulator.

use crate::analog::AnalogBank;

#[derive(Debug, Clone, PartialEq)]
pub struct AbsoluteEncoder {
    channel: usize,
    max_voltage: f32,
    accumulator: f32,
    last: Option<f32>,
}

impl AbsoluteEncoder {
    /// Encoder read from `channel` of the analog bank, wrapping every
    /// `max_voltage` volts.
    pub fn new(channel: usize, max_voltage: f32) -> Self {
        Self {
            channel,
            max_voltage,
            accumulator: 0.0,
            last: None,
        }
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn max_voltage(&self) -> f32 {
        self.max_voltage
    }

    /// Feed a raw sample and return the incremental reading.
    ///
    /// The first sample after construction is taken as the reference and
    /// never counts as a wrap.
    pub fn update(&mut self, raw: f32) -> f32 {
        if let Some(last) = self.last {
            if (raw - last).abs() > self.max_voltage / 2.0 {
                if raw > last {
                    // low → high: ran backwards through zero
                    self.accumulator -= self.max_voltage;
                } else {
                    self.accumulator += self.max_voltage;
                }
            }
        }
        self.last = Some(raw);
        self.incremental()
    }

    /// Sample the encoder's channel and return the incremental reading.
    pub fn poll(&mut self, bank: &AnalogBank) -> f32 {
        self.update(bank.voltage(self.channel))
    }

    /// Most recent raw voltage.
    pub fn absolute(&self) -> f32 {
        self.last.unwrap_or(0.0)
    }

    /// `accumulator + absolute`.
    pub fn incremental(&self) -> f32 {
        self.accumulator + self.absolute()
    }

    /// Redefine the current position as a fresh reference.  The last raw
    /// sample is kept for wrap detection.
    pub fn reset_accumulator(&mut self) {
        self.accumulator = 0.0;
    }
}
