//! Real-time frequency analysis over the shared audio tap.
//!
//! Reproduces the byte-snapshot contract of a browser analyser node: a
//! Blackman-windowed FFT over the most recent `fft_size` samples,
//! exponential time smoothing, and a dB mapping of [-100, -30] onto
//! [0, 255]. The snapshot is a fixed buffer refreshed in place once per
//! render tick; no per-call allocation.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::{Arc, Mutex};

use crate::audio::AudioError;
use crate::settings::{AnalyzerTopology, VisualizerSettings};

/// dB floor of the byte mapping (maps to 0)
pub const MIN_DECIBELS: f32 = -100.0;
/// dB ceiling of the byte mapping (maps to 255)
pub const MAX_DECIBELS: f32 = -30.0;

/// Analyzer configuration, frozen at connect time
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// FFT window size (power of two; bin count is half)
    pub fft_size: usize,

    /// Time-smoothing constant in [0, 1); higher means slower-changing
    /// magnitudes
    pub smoothing: f32,

    /// Optional low-pass cutoff (Hz) applied before analysis
    pub lowpass: Option<f32>,

    /// Optional high-pass cutoff (Hz) applied before analysis
    pub highpass: Option<f32>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing: 0.8,
            lowpass: None,
            highpass: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_settings(settings: &VisualizerSettings) -> Self {
        Self {
            fft_size: settings.fft_size,
            smoothing: settings.smoothing,
            lowpass: settings.enable_lowpass.then_some(settings.lowpass_freq),
            highpass: settings.enable_highpass.then_some(settings.highpass_freq),
        }
    }

    pub fn from_topology(topology: &AnalyzerTopology) -> Self {
        Self {
            fft_size: topology.fft_size,
            smoothing: topology.smoothing(),
            lowpass: topology.enable_lowpass.then(|| topology.lowpass_freq()),
            highpass: topology.enable_highpass.then(|| topology.highpass_freq()),
        }
    }

    fn validate(&self) -> Result<(), AudioError> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(AudioError::InvalidAnalyzerConfig(format!(
                "fft_size must be a power of two in [32, 32768], got {}",
                self.fft_size
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(AudioError::InvalidAnalyzerConfig(format!(
                "smoothing must be in [0, 1), got {}",
                self.smoothing
            )));
        }
        Ok(())
    }
}

/// Chamberlin state-variable filter section (one per cutoff)
#[derive(Debug, Clone, Default)]
struct StateVariable {
    f: f32,
    damp: f32,
    low: f32,
    band: f32,
    high: f32,
}

impl StateVariable {
    fn new(cutoff_hz: f32, sample_rate: f32) -> Self {
        let fc = cutoff_hz.clamp(20.0, 20000.0).min(sample_rate * 0.45);
        Self {
            f: 2.0 * (PI * fc / sample_rate).sin(),
            // damp = 1/Q at Butterworth Q
            damp: std::f32::consts::SQRT_2,
            low: 0.0,
            band: 0.0,
            high: 0.0,
        }
    }

    fn process(&mut self, input: f32) -> (f32, f32) {
        self.high = input - self.low - self.damp * self.band;
        self.band += self.f * self.high;
        self.low += self.f * self.band;
        (self.low, self.high)
    }
}

/// Owns the snapshot buffer and the connection to the audio tap.
///
/// At most one analyzer is connected to a tap at a time; reconnecting to a
/// new audio source requires `disconnect` on the old analyzer first.
pub struct FrequencyAnalyzer {
    tap: Option<Arc<Mutex<Vec<f32>>>>,
    sample_rate: u32,
    config: AnalyzerConfig,

    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,

    /// Ring of the most recent `fft_size` (filtered) samples
    ring: Vec<f32>,
    write_pos: usize,
    total_samples: u64,

    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,

    lowpass: Option<StateVariable>,
    highpass: Option<StateVariable>,
}

impl FrequencyAnalyzer {
    /// Connect to an audio tap. The caller must hold off until audio exists
    /// (no tap, no analyzer); `sample_rate` is the tap's rate.
    pub fn new(
        tap: Arc<Mutex<Vec<f32>>>,
        sample_rate: u32,
        config: AnalyzerConfig,
    ) -> Result<Self, AudioError> {
        config.validate()?;

        let fft_size = config.fft_size;
        let bins = fft_size / 2;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window = (0..fft_size).map(|i| blackman_window(i, fft_size)).collect();
        let sr = sample_rate as f32;
        let lowpass = config.lowpass.map(|fc| StateVariable::new(fc, sr));
        let highpass = config.highpass.map(|fc| StateVariable::new(fc, sr));

        tracing::debug!(
            fft_size,
            bins,
            smoothing = config.smoothing,
            "frequency analyzer connected"
        );

        Ok(Self {
            tap: Some(tap),
            sample_rate,
            config,
            fft,
            window,
            ring: vec![0.0; fft_size],
            write_pos: 0,
            total_samples: 0,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; bins],
            bytes: vec![0; bins],
            lowpass,
            highpass,
        })
    }

    /// Number of frequency bins in the snapshot (`fft_size / 2`)
    pub fn bin_count(&self) -> usize {
        self.bytes.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_connected(&self) -> bool {
        self.tap.is_some()
    }

    /// Refresh the snapshot from the tap and return the backing buffer.
    ///
    /// Callable once per render tick. Until `fft_size` samples have been
    /// observed the snapshot stays all-zero (silence).
    pub fn snapshot(&mut self) -> &[u8] {
        self.drain_tap();

        if self.total_samples < self.config.fft_size as u64 {
            return &self.bytes;
        }

        let n = self.config.fft_size;

        // Window the ring in chronological order
        for i in 0..n {
            let sample = self.ring[(self.write_pos + i) % n];
            self.scratch[i] = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let tau = self.config.smoothing;
        let scale = 1.0 / n as f32;
        let db_span = MAX_DECIBELS - MIN_DECIBELS;
        for (k, (smoothed, byte)) in self
            .smoothed
            .iter_mut()
            .zip(self.bytes.iter_mut())
            .enumerate()
        {
            let magnitude = self.scratch[k].norm() * scale;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;

            *byte = if *smoothed > 0.0 {
                let db = 20.0 * smoothed.log10();
                let normalized = (db - MIN_DECIBELS) / db_span;
                (normalized.clamp(0.0, 1.0) * 255.0) as u8
            } else {
                0
            };
        }

        &self.bytes
    }

    /// Detach from the tap and clear analysis state. Idempotent; a
    /// disconnected analyzer keeps returning a silent snapshot.
    pub fn disconnect(&mut self) {
        if self.tap.take().is_some() {
            self.ring.fill(0.0);
            self.smoothed.fill(0.0);
            self.bytes.fill(0);
            self.write_pos = 0;
            self.total_samples = 0;
            tracing::debug!("frequency analyzer disconnected");
        }
    }

    fn drain_tap(&mut self) {
        let Some(tap) = &self.tap else {
            return;
        };

        let mut incoming = match tap.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let n = self.config.fft_size;
        for &raw in incoming.iter() {
            let mut sample = raw;
            if let Some(filter) = &mut self.lowpass {
                sample = filter.process(sample).0;
            }
            if let Some(filter) = &mut self.highpass {
                sample = filter.process(sample).1;
            }
            self.ring[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % n;
            self.total_samples += 1;
        }
        incoming.clear();
    }
}

impl Drop for FrequencyAnalyzer {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Blackman window coefficient
fn blackman_window(index: usize, size: usize) -> f32 {
    let x = 2.0 * PI * index as f32 / (size as f32 - 1.0);
    0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
}

/// Mean byte magnitude across the whole snapshot
pub fn spectrum_average(snapshot: &[u8]) -> f32 {
    if snapshot.is_empty() {
        return 0.0;
    }
    snapshot.iter().map(|&b| b as f32).sum::<f32>() / snapshot.len() as f32
}

/// Low-band energy: sum of bins [0, 4) normalized to [0, 1]
pub fn bass_level(snapshot: &[u8]) -> f32 {
    let end = snapshot.len().min(4);
    snapshot[..end].iter().map(|&b| b as f32).sum::<f32>() / 1024.0
}

/// Mid-band (snare) energy: sum of bins [10, 20) normalized to [0, 1]
pub fn snare_level(snapshot: &[u8]) -> f32 {
    let start = snapshot.len().min(10);
    let end = snapshot.len().min(20);
    snapshot[start..end].iter().map(|&b| b as f32).sum::<f32>() / 2560.0
}
