//! Ripple style: a subdivided plane carrying a decaying radial wave, with
//! a slow zoom oscillation layered on top.

use glam::Vec3;

use super::{apply_scheme, bass_value, Material, MeshPart, StyleNode, VisualStyle};
use crate::geometry::build_plane_grid;
use crate::settings::{StyleKind, VisualizerSettings};

const PLANE_SIZE: f32 = 4.0;
const PLANE_SEGMENTS: usize = 64;

pub struct RippleStyle {
    node: StyleNode,
    phase: f32,
    zoom_phase: f32,
    disposed: bool,
}

impl RippleStyle {
    pub fn new(settings: &VisualizerSettings) -> Self {
        let mut node = StyleNode::new();
        let mut material = Material::with_color(settings.color_scheme.rgb());
        material.opacity = 0.8;
        node.parts
            .push(MeshPart::new(build_plane_grid(PLANE_SIZE, PLANE_SEGMENTS), material));

        Self {
            node,
            phase: 0.0,
            zoom_phase: 0.0,
            disposed: false,
        }
    }
}

impl VisualStyle for RippleStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Ripple
    }

    fn node(&self) -> &StyleNode {
        &self.node
    }

    fn node_mut(&mut self) -> &mut StyleNode {
        &mut self.node
    }

    fn update(&mut self, snapshot: &[u8], settings: &VisualizerSettings, _elapsed: f32) {
        if self.disposed {
            return;
        }

        let bass = bass_value(snapshot, settings.intensity);
        self.phase += 0.03 * settings.speed;
        self.zoom_phase += 0.01 * settings.zoom_speed;

        let zoom_effect = self.zoom_phase.sin() * settings.zoom_intensity;
        let envelope = 0.2 + bass * 0.3 + zoom_effect;

        let part = &mut self.node.parts[0];
        for vertex in part.geometry.vertices.iter_mut() {
            let x = vertex.position[0];
            let z = vertex.position[2];
            let distance = (x * x + z * z).sqrt();

            vertex.position[1] =
                (distance * 2.0 - self.phase).sin() * envelope * (-distance * 0.5).exp();
        }
        part.geometry.mark_dirty();

        self.node.transform.rotation.z += 0.005 * settings.speed;
        let zoom_scale = 1.0 + self.zoom_phase.sin() * settings.zoom_intensity * 0.2;
        self.node.transform.scale = Vec3::splat(zoom_scale);

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
    fn test_heights_decay_with_distance() {
        let mut settings = VisualizerSettings::default();
        settings.zoom_intensity = 0.0;
        settings.speed = 1.0;

        let snapshot = vec![0u8; 128];
        let mut style = RippleStyle::new(&settings);
        style.update(&snapshot, &settings, 0.0);

        // The exponential falloff bounds every height by 0.2 * exp(-d/2)
        for vertex in &style.node().parts[0].geometry.vertices {
            let x = vertex.position[0];
            let z = vertex.position[2];
            let distance = (x * x + z * z).sqrt();
            let bound = 0.2 * (-distance * 0.5).exp() + 1e-5;
            assert!(vertex.position[1].abs() <= bound);
        }
    }

    #[test]
    fn test_zoom_oscillates_uniform_scale() {
        let mut settings = VisualizerSettings::default();
        settings.zoom_speed = 1.0;
        settings.zoom_intensity = 1.0;

        let snapshot = vec![0u8; 128];
        let mut style = RippleStyle::new(&settings);
        for _ in 0..50 {
            style.update(&snapshot, &settings, 0.0);
        }

        let scale = style.node().transform.scale;
        assert_eq!(scale.x, scale.y);
        assert_eq!(scale.y, scale.z);
        // zoom_phase = 0.5 -> scale = 1 + sin(0.5) * 0.2
        assert!((scale.x - (1.0 + 0.5f32.sin() * 0.2)).abs() < 1e-4);
    }

    #[test]
    fn test_phase_accumulates_per_frame() {
        let mut settings = VisualizerSettings::default();
        settings.speed = 1.0;
        let snapshot = vec![0u8; 128];

        let mut style = RippleStyle::new(&settings);
        for _ in 0..10 {
            style.update(&snapshot, &settings, 0.0);
        }
        assert!((style.phase - 0.3).abs() < 1e-5);
    }
}
