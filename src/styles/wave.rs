//! Wave style: a polyline animated by a selectable waveform generator.

use std::f32::consts::PI;

use super::{apply_scheme, average_value, Material, MeshPart, StyleNode, VisualStyle};
use crate::geometry::build_polyline;
use crate::settings::{StyleKind, VisualizerSettings, WaveKind};

/// Vertices in the polyline, spanning x in [-5, 4.9]
const SEGMENTS: usize = 100;

pub struct WaveStyle {
    node: StyleNode,
    disposed: bool,
}

impl WaveStyle {
    pub fn new(settings: &VisualizerSettings) -> Self {
        let mut node = StyleNode::new();
        node.parts.push(MeshPart::new(
            build_polyline(SEGMENTS, -5.0, 0.1),
            Material::with_color(settings.color_scheme.rgb()),
        ));
        Self {
            node,
            disposed: false,
        }
    }
}

/// Evaluate one waveform generator at time `t`
fn generate_waveform(kind: WaveKind, t: f32, frequency: f32, amplitude: f32) -> f32 {
    match kind {
        WaveKind::Sine => (frequency * t).sin() * amplitude,
        WaveKind::Square => {
            if (frequency * t).sin() >= 0.0 {
                amplitude
            } else {
                -amplitude
            }
        }
        WaveKind::Sawtooth => (((t * frequency).rem_euclid(2.0 * PI)) / PI - 1.0) * amplitude,
        WaveKind::Triangle => {
            ((((t * frequency).rem_euclid(2.0 * PI)) / PI - 1.0).abs() * 2.0 - 1.0) * amplitude
        }
    }
}

impl VisualStyle for WaveStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Wave
    }

    fn node(&self) -> &StyleNode {
        &self.node
    }

    fn node_mut(&mut self) -> &mut StyleNode {
        &mut self.node
    }

    fn update(&mut self, snapshot: &[u8], settings: &VisualizerSettings, elapsed: f32) {
        if self.disposed {
            return;
        }

        let average = average_value(snapshot, settings.intensity);
        let frequency = 2.0 + settings.speed * 3.0;
        let amplitude = 0.5 + average * 0.01;

        let part = &mut self.node.parts[0];
        for (i, vertex) in part.geometry.vertices.iter_mut().enumerate() {
            let t = elapsed + (i as f32 / SEGMENTS as f32) * 2.0 * PI;
            vertex.position[1] = generate_waveform(settings.wave_type, t, frequency, amplitude);
        }
        part.geometry.mark_dirty();

        self.node.transform.rotation.z += 0.001 * settings.speed;

        apply_scheme(&mut self.node, settings.color_scheme);
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.node.parts.clear();
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_keeps_amplitude_floor() {
        // With silence the amplitude floor is 0.5, not zero: y = sin(t*2)*0.5
        let mut settings = VisualizerSettings::default();
        settings.speed = 0.0;
        settings.wave_type = WaveKind::Sine;

        let snapshot = vec![0u8; 128];
        let mut style = WaveStyle::new(&settings);

        for frame in 0..10 {
            let elapsed = frame as f32 * 0.016;
            style.update(&snapshot, &settings, elapsed);

            let vertices = &style.node().parts[0].geometry.vertices;
            let mut peak = 0.0f32;
            for (i, vertex) in vertices.iter().enumerate() {
                let t = elapsed + (i as f32 / SEGMENTS as f32) * 2.0 * PI;
                let expected = (2.0 * t).sin() * 0.5;
                assert!((vertex.position[1] - expected).abs() < 1e-5);
                peak = peak.max(vertex.position[1].abs());
            }
            // The waveform is visibly non-degenerate
            assert!(peak > 0.4);
        }
    }

    #[test]
    fn test_square_wave_clamps_to_amplitude() {
        let mut settings = VisualizerSettings::default();
        settings.wave_type = WaveKind::Square;
        settings.intensity = 0.0;

        let snapshot = vec![0u8; 128];
        let mut style = WaveStyle::new(&settings);
        style.update(&snapshot, &settings, 1.0);

        for vertex in &style.node().parts[0].geometry.vertices {
            assert!((vertex.position[1].abs() - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_generators_stay_in_band() {
        for kind in [
            WaveKind::Sine,
            WaveKind::Square,
            WaveKind::Sawtooth,
            WaveKind::Triangle,
        ] {
            for i in 0..500 {
                let t = i as f32 * 0.037;
                let y = generate_waveform(kind, t, 3.5, 1.0);
                assert!(y.is_finite());
                assert!(y.abs() <= 1.0 + 1e-5, "{:?} out of band at t={}", kind, t);
            }
        }
    }

    #[test]
    fn test_update_marks_geometry_dirty() {
        let settings = VisualizerSettings::default();
        let snapshot = vec![0u8; 128];
        let mut style = WaveStyle::new(&settings);
        style.node_mut().parts[0].geometry.dirty = false;
        style.update(&snapshot, &settings, 0.5);
        assert!(style.node().parts[0].geometry.dirty);
    }
}
