//! Visualizer settings with documented ranges and structural-change keys.
//!
//! Every numeric field has a closed range and a default; enum fields are
//! closed sets. The pipeline only ever reads a settings reference at tick
//! time — all mutation happens in the settings owner (CLI/keyboard layer).

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings validation / preset-loading errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{field} = {value} outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("fft_size must be a power of two in [32, 32768], got {0}")]
    BadFftSize(usize),

    #[error("failed to read settings preset: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings preset: {0}")]
    Json(#[from] serde_json::Error),
}

/// The closed set of visual styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleKind {
    #[default]
    Default,
    Circular,
    Wave,
    Blocks,
    Particles,
    ParticleBurst,
    Ripple,
    Grid,
    Pattern,
}

impl StyleKind {
    /// All styles in selection order (keyboard keys 1-9)
    pub const ALL: [StyleKind; 9] = [
        StyleKind::Default,
        StyleKind::Circular,
        StyleKind::Wave,
        StyleKind::Blocks,
        StyleKind::Particles,
        StyleKind::ParticleBurst,
        StyleKind::Ripple,
        StyleKind::Grid,
        StyleKind::Pattern,
    ];

    /// Parse a style identifier. Unknown identifiers fall back to `Default`
    /// rather than erroring.
    pub fn parse(name: &str) -> StyleKind {
        match name.to_lowercase().as_str() {
            "default" => StyleKind::Default,
            "circular" => StyleKind::Circular,
            "wave" => StyleKind::Wave,
            "blocks" => StyleKind::Blocks,
            "particles" => StyleKind::Particles,
            "particleburst" | "burst" => StyleKind::ParticleBurst,
            "ripple" => StyleKind::Ripple,
            "grid" => StyleKind::Grid,
            "pattern" => StyleKind::Pattern,
            other => {
                tracing::debug!("unknown style '{}', falling back to default", other);
                StyleKind::Default
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StyleKind::Default => "default",
            StyleKind::Circular => "circular",
            StyleKind::Wave => "wave",
            StyleKind::Blocks => "blocks",
            StyleKind::Particles => "particles",
            StyleKind::ParticleBurst => "particleburst",
            StyleKind::Ripple => "ripple",
            StyleKind::Grid => "grid",
            StyleKind::Pattern => "pattern",
        }
    }
}

impl fmt::Display for StyleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Waveform generator used by the Wave style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveKind {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Material base-color selection shared by all styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Default,
    Neon,
    Mono,
    Warm,
}

impl ColorScheme {
    /// Base material color as linear RGB
    pub fn rgb(&self) -> [f32; 3] {
        match self {
            // 0x9b87f5
            ColorScheme::Default => [0.608, 0.529, 0.961],
            // 0x39ff14
            ColorScheme::Neon => [0.224, 1.0, 0.078],
            ColorScheme::Mono => [1.0, 1.0, 1.0],
            // 0xff8c42
            ColorScheme::Warm => [1.0, 0.549, 0.259],
        }
    }
}

/// Grid cell density for the Grid style (structural: changing it recreates
/// the instance)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GridDensity {
    #[serde(rename = "8x8")]
    D8,
    #[default]
    #[serde(rename = "16x16")]
    D16,
    #[serde(rename = "24x24")]
    D24,
    #[serde(rename = "32x32")]
    D32,
}

impl GridDensity {
    /// Cells per side
    pub fn side(&self) -> usize {
        match self {
            GridDensity::D8 => 8,
            GridDensity::D16 => 16,
            GridDensity::D24 => 24,
            GridDensity::D32 => 32,
        }
    }
}

/// The full settings record consumed by every visual style.
///
/// Continuous fields (intensity, speed, colors, ...) are read fresh each
/// frame; structural fields (particle counts, grid density, analyzer FFT
/// setup) require instance recreation, detected via [`StyleTopology`] /
/// [`AnalyzerTopology`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerSettings {
    /// Active visual style
    pub style: StyleKind,

    /// Audio-response strength (0..1)
    pub intensity: f32,

    /// Animation speed multiplier (0..1)
    pub speed: f32,

    /// Global jitter amount (0..1, 0 disables the glitch step entirely)
    pub glitch_amount: f32,

    /// Waveform generator for the Wave style
    pub wave_type: WaveKind,

    /// Material base-color selection
    pub color_scheme: ColorScheme,

    /// Render-surface size hints in pixels (50..2000)
    pub size_x: f32,
    pub size_y: f32,

    /// Ripple zoom oscillator rate (0..1)
    pub zoom_speed: f32,

    /// Ripple zoom oscillator depth (0..1)
    pub zoom_intensity: f32,

    /// Low-band response weight (0..1)
    pub bass_response: f32,

    /// Mid-band (snare) response weight (0..1)
    pub snare_response: f32,

    /// Grid scale response to bass+wave (0..2)
    pub bass_response_intensity: f32,

    /// Sphere count for the Particles style (structural, 1..4096)
    pub particle_count: usize,

    /// Sprite count for the ParticleBurst style (structural, 1..16384)
    pub burst_count: usize,

    /// Point sprite size in world units (0.01..1)
    pub particle_size: f32,

    /// Grid cell density (structural)
    pub grid_density: GridDensity,

    /// Overlay text content (reserved for a text style)
    pub text_content: String,

    /// Overlay text size in points (8..128)
    pub text_size: f32,

    /// Whether shape styles accumulate rotation
    pub shape_rotation: bool,

    /// Insert a low-pass section before analysis
    pub enable_lowpass: bool,

    /// Insert a high-pass section before analysis
    pub enable_highpass: bool,

    /// Low-pass cutoff in Hz (20..20000)
    pub lowpass_freq: f32,

    /// High-pass cutoff in Hz (20..20000)
    pub highpass_freq: f32,

    /// Analyser time-smoothing constant (0..1, exclusive of 1; higher means
    /// slower-changing magnitudes)
    pub smoothing: f32,

    /// Analyser FFT window size (power of two, 32..32768; bin count is half)
    pub fft_size: usize,
}

impl Default for VisualizerSettings {
    fn default() -> Self {
        Self {
            style: StyleKind::Default,
            intensity: 0.5,
            speed: 0.5,
            glitch_amount: 0.0,
            wave_type: WaveKind::Sine,
            color_scheme: ColorScheme::Default,
            size_x: 500.0,
            size_y: 500.0,
            zoom_speed: 0.5,
            zoom_intensity: 0.3,
            bass_response: 0.5,
            snare_response: 0.5,
            bass_response_intensity: 0.5,
            particle_count: 50,
            burst_count: 1000,
            particle_size: 0.05,
            grid_density: GridDensity::D16,
            text_content: "WAVE".to_string(),
            text_size: 32.0,
            shape_rotation: true,
            enable_lowpass: false,
            enable_highpass: false,
            lowpass_freq: 8000.0,
            highpass_freq: 60.0,
            smoothing: 0.8,
            fft_size: 256,
        }
    }
}

/// (field, value, min, max) range rows used by both clamp and validate
macro_rules! f32_ranges {
    ($s:expr) => {
        [
            ("intensity", &mut $s.intensity, 0.0, 1.0),
            ("speed", &mut $s.speed, 0.0, 1.0),
            ("glitch_amount", &mut $s.glitch_amount, 0.0, 1.0),
            ("size_x", &mut $s.size_x, 50.0, 2000.0),
            ("size_y", &mut $s.size_y, 50.0, 2000.0),
            ("zoom_speed", &mut $s.zoom_speed, 0.0, 1.0),
            ("zoom_intensity", &mut $s.zoom_intensity, 0.0, 1.0),
            ("bass_response", &mut $s.bass_response, 0.0, 1.0),
            ("snare_response", &mut $s.snare_response, 0.0, 1.0),
            (
                "bass_response_intensity",
                &mut $s.bass_response_intensity,
                0.0,
                2.0,
            ),
            ("particle_size", &mut $s.particle_size, 0.01, 1.0),
            ("text_size", &mut $s.text_size, 8.0, 128.0),
            ("lowpass_freq", &mut $s.lowpass_freq, 20.0, 20000.0),
            ("highpass_freq", &mut $s.highpass_freq, 20.0, 20000.0),
            ("smoothing", &mut $s.smoothing, 0.0, 0.999),
        ]
    };
}

impl VisualizerSettings {
    /// Force every numeric field into its documented range.
    pub fn clamp(&mut self) {
        for (_, value, min, max) in f32_ranges!(self) {
            // Non-finite input degrades to the range floor
            *value = if value.is_finite() {
                value.clamp(min, max)
            } else {
                min
            };
        }
        self.particle_count = self.particle_count.clamp(1, 4096);
        self.burst_count = self.burst_count.clamp(1, 16384);
        if !(32..=32768).contains(&self.fft_size) || !self.fft_size.is_power_of_two() {
            self.fft_size = 256;
        }
    }

    /// Check every field against its documented range without mutating.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut probe = self.clone();
        for (field, value, min, max) in f32_ranges!(probe) {
            if !(*value >= min && *value <= max) {
                return Err(SettingsError::OutOfRange {
                    field,
                    value: *value as f64,
                    min: min as f64,
                    max: max as f64,
                });
            }
        }
        if !(1..=4096).contains(&self.particle_count) {
            return Err(SettingsError::OutOfRange {
                field: "particle_count",
                value: self.particle_count as f64,
                min: 1.0,
                max: 4096.0,
            });
        }
        if !(1..=16384).contains(&self.burst_count) {
            return Err(SettingsError::OutOfRange {
                field: "burst_count",
                value: self.burst_count as f64,
                min: 1.0,
                max: 16384.0,
            });
        }
        if !(32..=32768).contains(&self.fft_size) || !self.fft_size.is_power_of_two() {
            return Err(SettingsError::BadFftSize(self.fft_size));
        }
        Ok(())
    }

    /// Load a JSON settings preset. Missing fields take their defaults;
    /// numeric fields are clamped into range after parsing.
    pub fn load_preset(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        let mut settings: VisualizerSettings = serde_json::from_str(&text)?;
        settings.clamp();
        Ok(settings)
    }
}

/// The subset of settings that determines a style instance's buffer
/// topology. A change here means dispose-and-recreate, never a live patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleTopology {
    pub style: StyleKind,
    pub particle_count: usize,
    pub burst_count: usize,
    pub grid_density: GridDensity,
}

impl StyleTopology {
    pub fn of(settings: &VisualizerSettings) -> Self {
        Self {
            style: settings.style,
            particle_count: settings.particle_count,
            burst_count: settings.burst_count,
            grid_density: settings.grid_density,
        }
    }
}

/// The subset of settings baked into the analyzer at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerTopology {
    pub fft_size: usize,
    smoothing_bits: u32,
    pub enable_lowpass: bool,
    pub enable_highpass: bool,
    lowpass_bits: u32,
    highpass_bits: u32,
}

impl AnalyzerTopology {
    pub fn of(settings: &VisualizerSettings) -> Self {
        Self {
            fft_size: settings.fft_size,
            smoothing_bits: settings.smoothing.to_bits(),
            enable_lowpass: settings.enable_lowpass,
            enable_highpass: settings.enable_highpass,
            lowpass_bits: settings.lowpass_freq.to_bits(),
            highpass_bits: settings.highpass_freq.to_bits(),
        }
    }

    pub fn smoothing(&self) -> f32 {
        f32::from_bits(self.smoothing_bits)
    }

    pub fn lowpass_freq(&self) -> f32 {
        f32::from_bits(self.lowpass_bits)
    }

    pub fn highpass_freq(&self) -> f32 {
        f32::from_bits(self.highpass_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = VisualizerSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.style, StyleKind::Default);
        assert_eq!(settings.fft_size, 256);
    }

    #[test]
    fn test_clamp_forces_ranges() {
        let mut settings = VisualizerSettings::default();
        settings.intensity = 7.0;
        settings.speed = -2.0;
        settings.particle_count = 0;
        settings.fft_size = 300; // not a power of two
        settings.clamp();

        assert_eq!(settings.intensity, 1.0);
        assert_eq!(settings.speed, 0.0);
        assert_eq!(settings.particle_count, 1);
        assert_eq!(settings.fft_size, 256);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut settings = VisualizerSettings::default();
        settings.glitch_amount = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::OutOfRange { field: "glitch_amount", .. })
        ));

        let mut settings = VisualizerSettings::default();
        settings.fft_size = 257;
        assert!(matches!(settings.validate(), Err(SettingsError::BadFftSize(257))));
    }

    #[test]
    fn test_unknown_style_falls_back_to_default() {
        assert_eq!(StyleKind::parse("spiral-madness"), StyleKind::Default);
        assert_eq!(StyleKind::parse("RIPPLE"), StyleKind::Ripple);
        assert_eq!(StyleKind::parse("burst"), StyleKind::ParticleBurst);
    }

    #[test]
    fn test_style_topology_detects_structural_change() {
        let a = VisualizerSettings::default();
        let mut b = a.clone();
        b.intensity = 0.9; // continuous: no topology change
        assert_eq!(StyleTopology::of(&a), StyleTopology::of(&b));

        b.particle_count = 200;
        assert_ne!(StyleTopology::of(&a), StyleTopology::of(&b));
    }

    #[test]
    fn test_analyzer_topology_tracks_filter_setup() {
        let a = VisualizerSettings::default();
        let mut b = a.clone();
        assert_eq!(AnalyzerTopology::of(&a), AnalyzerTopology::of(&b));

        b.enable_lowpass = true;
        assert_ne!(AnalyzerTopology::of(&a), AnalyzerTopology::of(&b));
        assert_eq!(AnalyzerTopology::of(&b).lowpass_freq(), 8000.0);
    }

    #[test]
    fn test_preset_round_trip() {
        let settings = VisualizerSettings {
            style: StyleKind::Grid,
            grid_density: GridDensity::D32,
            ..VisualizerSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: VisualizerSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);

        // Partial presets take defaults for missing fields
        let partial: VisualizerSettings =
            serde_json::from_str(r#"{"style":"ripple","intensity":0.9}"#).unwrap();
        assert_eq!(partial.style, StyleKind::Ripple);
        assert_eq!(partial.intensity, 0.9);
        assert_eq!(partial.fft_size, 256);
    }
}
