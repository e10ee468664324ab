//! Grid style: a lattice of cubes carrying a radial wave, with bass-driven
//! scale, snare-driven emissive pulses, and opacity-faked motion blur.

use glam::Vec3;

use super::{Material, MeshPart, StyleNode, VisualStyle};
use crate::analyzer::{bass_level, snare_level};
use crate::geometry::build_box;
use crate::settings::{StyleKind, VisualizerSettings};

pub struct GridStyle {
    node: StyleNode,
    side: usize,
    phase: f32,
    disposed: bool,
}

impl GridStyle {
    pub fn new(settings: &VisualizerSettings) -> Self {
        let side = settings.grid_density.side();
        let spacing = 4.0 / side as f32;
        let half = side as f32 / 2.0;

        let mut node = StyleNode::new();
        for x in 0..side {
            for y in 0..side {
                // White base material so the emissive pulse reads cleanly
                let mut material = Material::with_color([1.0, 1.0, 1.0]);
                material.opacity = 0.8;
                let mut part = MeshPart::new(build_box(0.2, 0.2, 0.2), material);
                part.transform.position =
                    Vec3::new((x as f32 - half) * spacing, (y as f32 - half) * spacing, 0.0);
                node.parts.push(part);
            }
        }

        Self {
            node,
            side,
            phase: 0.0,
            disposed: false,
        }
    }
}

impl VisualStyle for GridStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Grid
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

        let bass = bass_level(snapshot);
        let snare = snare_level(snapshot);
        self.phase += 0.03 * settings.speed;

        let center = self.side as f32 / 2.0;
        for (index, part) in self.node.parts.iter_mut().enumerate() {
            let gx = (index / self.side) as f32;
            let gy = (index % self.side) as f32;

            let distance = ((gx - center).powi(2) + (gy - center).powi(2)).sqrt();
            let wave = (distance * 0.5 + self.phase).sin() * settings.intensity;
            let scale = 1.0 + (wave + bass) * settings.bass_response_intensity;
            part.transform.scale = Vec3::splat(scale);

            if settings.speed > 0.0 {
                part.transform.rotation.x += settings.speed * 0.01;
                part.transform.rotation.y += settings.speed * 0.01;
            }

            if snare > 0.5 {
                part.material.emissive = [snare, snare, snare];
                part.material.emissive_intensity = snare * settings.snare_response;
            } else {
                part.material.emissive_intensity = 0.0;
            }

            // Fake motion blur: faster cells go more transparent
            part.material.opacity = (0.8 - wave.abs() * 0.3).max(0.4);
        }
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
    use crate::settings::GridDensity;

    #[test]
    fn test_density_is_structural() {
        let mut settings = VisualizerSettings::default();
        settings.grid_density = GridDensity::D8;
        assert_eq!(GridStyle::new(&settings).node().parts.len(), 64);

        settings.grid_density = GridDensity::D32;
        assert_eq!(GridStyle::new(&settings).node().parts.len(), 1024);
    }

    #[test]
    fn test_opacity_floor_holds() {
        let mut settings = VisualizerSettings::default();
        settings.intensity = 1.0;
        settings.bass_response_intensity = 2.0;

        let snapshot = vec![255u8; 128];
        let mut style = GridStyle::new(&settings);
        for _ in 0..30 {
            style.update(&snapshot, &settings, 0.0);
        }

        for part in &style.node().parts {
            assert!(part.material.opacity >= 0.4);
            assert!(part.material.opacity <= 0.8);
        }
    }

    #[test]
    fn test_snare_pulse_gates_on_threshold() {
        let mut settings = VisualizerSettings::default();
        settings.snare_response = 1.0;

        // All mid bins maxed: snare = 255*10/2560 ≈ 0.996 > 0.5
        let mut snapshot = vec![0u8; 128];
        for byte in snapshot[10..20].iter_mut() {
            *byte = 255;
        }

        let mut style = GridStyle::new(&settings);
        style.update(&snapshot, &settings, 0.0);
        assert!(style.node().parts[0].material.emissive_intensity > 0.9);

        // Silence drops the pulse again
        let silence = vec![0u8; 128];
        style.update(&silence, &settings, 0.0);
        assert_eq!(style.node().parts[0].material.emissive_intensity, 0.0);
    }

    #[test]
    fn test_zero_speed_freezes_rotation() {
        let mut settings = VisualizerSettings::default();
        settings.speed = 0.0;

        let snapshot = vec![100u8; 128];
        let mut style = GridStyle::new(&settings);
        for _ in 0..10 {
            style.update(&snapshot, &settings, 0.0);
        }
        for part in &style.node().parts {
            assert_eq!(part.transform.rotation, Vec3::ZERO);
        }
    }
}
