//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

use crate::audio::AudioSource;
use crate::settings::{SettingsError, StyleKind, VisualizerSettings};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Wavescene")]
#[command(about = "Audio-reactive 3D visual player", long_about = None)]
pub struct Args {
    /// WAV file to play; the built-in composition plays when omitted
    pub audio: Option<PathBuf>,

    /// Initial visual style (see --list-styles)
    #[arg(long, value_name = "STYLE", default_value = "default")]
    pub style: String,

    /// Audio-response strength (0..1)
    #[arg(long, value_name = "AMOUNT")]
    pub intensity: Option<f32>,

    /// Animation speed (0..1)
    #[arg(long, value_name = "AMOUNT")]
    pub speed: Option<f32>,

    /// Glitch jitter amount (0..1)
    #[arg(long, value_name = "AMOUNT")]
    pub glitch: Option<f32>,

    /// JSON settings preset file
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// List available styles and exit
    #[arg(long)]
    pub list_styles: bool,
}

impl Args {
    /// Resolve the audio source from the positional argument
    pub fn audio_source(&self) -> AudioSource {
        match &self.audio {
            Some(path) => AudioSource::File(path.clone()),
            None => AudioSource::Tone,
        }
    }

    /// Build the initial settings record: preset file first, then
    /// flag overrides, then a final clamp into documented ranges.
    pub fn build_settings(&self) -> Result<VisualizerSettings, SettingsError> {
        let mut settings = match &self.settings {
            Some(path) => VisualizerSettings::load_preset(path)?,
            None => VisualizerSettings::default(),
        };

        let style = StyleKind::parse(&self.style);
        if !self.style.eq_ignore_ascii_case(style.name()) {
            eprintln!("Warning: unknown style '{}', using default", self.style);
        }
        settings.style = style;

        if let Some(intensity) = self.intensity {
            settings.intensity = intensity;
        }
        if let Some(speed) = self.speed {
            settings.speed = speed;
        }
        if let Some(glitch) = self.glitch {
            settings.glitch_amount = glitch;
        }

        settings.clamp();
        Ok(settings)
    }
}
