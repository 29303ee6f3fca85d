//! Last-known analog readings and the background task that refreshes them.
//!
//! Raw analog reads are slow relative to the control period, so a dedicated
//! thread polls every [`AnalogSource`] at a fixed rate and stores the
//! results in a shared [`AnalogBank`].  The control core only ever reads
//! the bank; a failed sample leaves the previous value in place.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use boss_types::BossError;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::sensor::AnalogSource;

/// Two analog modules of eight channels each.
pub const ANALOG_CHANNELS: usize = 16;

/// Shared table of the last good voltage seen on each channel.
///
/// Cloning yields another handle to the same table.
#[derive(Clone, Default)]
pub struct AnalogBank {
    readings: Arc<RwLock<[f32; ANALOG_CHANNELS]>>,
}

impl AnalogBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last good voltage on `channel`; `0.0` for unknown channels.
    pub fn voltage(&self, channel: usize) -> f32 {
        self.readings.read().get(channel).copied().unwrap_or(0.0)
    }

    /// Record a reading.  Non-finite values and unknown channels are
    /// ignored so a glitch never overwrites a good reading.
    pub fn store(&self, channel: usize, voltage: f32) {
        if !voltage.is_finite() {
            return;
        }
        if let Some(slot) = self.readings.write().get_mut(channel) {
            *slot = voltage;
        }
    }

    pub fn snapshot(&self) -> [f32; ANALOG_CHANNELS] {
        *self.readings.read()
    }
}

impl std::fmt::Debug for AnalogBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AnalogBank").field(&self.snapshot()).finish()
    }
}

/// Poll each source once and store whatever it produced.
///
/// Returns the number of sources that yielded a reading.
pub fn sample_once(sources: &mut [Box<dyn AnalogSource>], bank: &AnalogBank) -> usize {
    let mut stored = 0;
    for source in sources.iter_mut() {
        match source.sample() {
            Some(voltage) if voltage.is_finite() => {
                bank.store(source.channel(), voltage);
                stored += 1;
            }
            _ => trace!(channel = source.channel(), "analog sample unavailable"),
        }
    }
    stored
}

/// Background thread refreshing an [`AnalogBank`] at a fixed rate.
///
/// The thread stops when [`AnalogSampler::stop`] is called or the sampler
/// is dropped.
pub struct AnalogSampler {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AnalogSampler {
    /// Spawn the sampling thread.
    ///
    /// # Errors
    ///
    /// Returns [`BossError::Io`] if the OS refuses to create the thread.
    pub fn spawn(
        mut sources: Vec<Box<dyn AnalogSource>>,
        bank: AnalogBank,
        period: Duration,
    ) -> Result<Self, BossError> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        debug!(sources = sources.len(), period_ms = period.as_millis() as u64, "starting analog sampler");
        let handle = thread::Builder::new()
            .name("analog-sampler".to_string())
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    sample_once(&mut sources, &bank);
                    thread::sleep(period);
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Signal the thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("analog sampler stopped");
        }
    }
}

impl Drop for AnalogSampler {
    fn drop(&mut self) {
        self.stop();
    }
}
