//! The audio-reactive pipeline: analyzer, active style, glitch step.
//!
//! One tick = snapshot refresh, structural-change check, style update,
//! glitch displacement. Rendering happens afterwards in the caller, so
//! within a tick the snapshot strictly precedes the update, which strictly
//! precedes the draw.

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

use crate::analyzer::{AnalyzerConfig, FrequencyAnalyzer};
use crate::audio::{AudioError, AudioSystem};
use crate::settings::{AnalyzerTopology, StyleTopology, VisualizerSettings};
use crate::styles::{create_style, StyleNode, VisualStyle};

pub struct VisualizerPipeline {
    analyzer: FrequencyAnalyzer,
    style: Box<dyn VisualStyle>,

    style_topology: StyleTopology,
    analyzer_topology: AnalyzerTopology,

    /// Kept to rebuild the analyzer when its structural settings change
    tap: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,

    elapsed: f32,
    rng: SmallRng,
    disposed: bool,
}

impl VisualizerPipeline {
    /// Build the pipeline over a running audio system. The analyzer is
    /// only ever constructed here, after audio exists.
    pub fn new(
        audio: &AudioSystem,
        settings: &VisualizerSettings,
    ) -> Result<Self, AudioError> {
        Self::with_tap(audio.tap(), audio.sample_rate(), settings)
    }

    /// Build the pipeline over a bare sample tap (tests, alternative
    /// audio frontends).
    pub fn with_tap(
        tap: Arc<Mutex<Vec<f32>>>,
        sample_rate: u32,
        settings: &VisualizerSettings,
    ) -> Result<Self, AudioError> {
        let analyzer = FrequencyAnalyzer::new(
            Arc::clone(&tap),
            sample_rate,
            AnalyzerConfig::from_settings(settings),
        )?;
        let style = create_style(settings.style, settings);

        Ok(Self {
            analyzer,
            style,
            style_topology: StyleTopology::of(settings),
            analyzer_topology: AnalyzerTopology::of(settings),
            tap,
            sample_rate,
            elapsed: 0.0,
            rng: SmallRng::from_entropy(),
            disposed: false,
        })
    }

    pub fn style(&self) -> &dyn VisualStyle {
        self.style.as_ref()
    }

    pub fn analyzer(&self) -> &FrequencyAnalyzer {
        &self.analyzer
    }

    pub fn node(&self) -> &StyleNode {
        self.style.node()
    }

    /// Mutable access for the renderer (dirty-flag clearing on upload)
    pub fn node_mut(&mut self) -> &mut StyleNode {
        self.style.node_mut()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advance one frame and return the node to draw. `dt` is the time
    /// since the previous tick in seconds.
    pub fn tick(&mut self, settings: &VisualizerSettings, dt: f32) -> &StyleNode {
        if self.disposed {
            return self.style.node();
        }

        self.apply_structural_changes(settings);

        self.elapsed += dt.max(0.0);

        // Snapshot refresh strictly precedes the style update
        let snapshot = self.analyzer.snapshot();
        self.style.update(snapshot, settings, self.elapsed);

        // Shared glitch displacement, set (not accumulated) per frame
        let node = self.style.node_mut();
        node.glitch_offset = if settings.glitch_amount > 0.0 {
            Vec2::new(
                (self.rng.gen::<f32>() - 0.5) * settings.glitch_amount * 0.1,
                (self.rng.gen::<f32>() - 0.5) * settings.glitch_amount * 0.1,
            )
        } else {
            Vec2::ZERO
        };

        self.style.node()
    }

    /// Recreate the style and/or analyzer when a structural setting
    /// changed. Continuous settings never reach this path.
    fn apply_structural_changes(&mut self, settings: &VisualizerSettings) {
        let style_topology = StyleTopology::of(settings);
        if style_topology != self.style_topology {
            tracing::info!(
                from = %self.style_topology.style,
                to = %style_topology.style,
                "recreating style instance"
            );
            self.style.dispose();
            self.style = create_style(settings.style, settings);
            self.style_topology = style_topology;
        }

        let analyzer_topology = AnalyzerTopology::of(settings);
        if analyzer_topology != self.analyzer_topology {
            // Disconnect the old analyzer before connecting a new one;
            // at most one lives on the tap at a time
            self.analyzer.disconnect();
            match FrequencyAnalyzer::new(
                Arc::clone(&self.tap),
                self.sample_rate,
                AnalyzerConfig::from_topology(&analyzer_topology),
            ) {
                Ok(analyzer) => {
                    self.analyzer = analyzer;
                    self.analyzer_topology = analyzer_topology;
                }
                Err(e) => {
                    tracing::warn!("keeping previous analyzer: {}", e);
                }
            }
        }
    }

    /// Disconnect the analyzer from the audio tap. Idempotent.
    pub fn disconnect_analyzer(&mut self) {
        self.analyzer.disconnect();
    }

    /// Dispose the active style instance. Idempotent; the pipeline stops
    /// ticking afterwards.
    pub fn dispose_style(&mut self) {
        self.style.dispose();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
