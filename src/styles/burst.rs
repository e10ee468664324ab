//! ParticleBurst style: a point cloud expanding from a disk, pulled back
//! inward when it wanders too far.

use std::f32::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{apply_scheme, bass_value, Material, MeshPart, StyleNode, VisualStyle};
use crate::geometry::build_point_cloud;
use crate::settings::{StyleKind, VisualizerSettings};

/// Distance from origin past which a particle implodes
const OVERFLOW_DISTANCE: f32 = 3.0;

pub struct ParticleBurstStyle {
    node: StyleNode,
    velocities: Vec<[f32; 3]>,
    disposed: bool,
}

impl ParticleBurstStyle {
    pub fn new(settings: &VisualizerSettings) -> Self {
        let count = settings.burst_count;
        let mut rng = SmallRng::from_entropy();

        let mut geometry = build_point_cloud(count);
        let mut velocities = Vec::with_capacity(count);
        for vertex in geometry.vertices.iter_mut() {
            let angle = rng.gen::<f32>() * 2.0 * PI;
            let radius = rng.gen::<f32>() * 2.0;
            vertex.position = [
                angle.cos() * radius,
                angle.sin() * radius,
                (rng.gen::<f32>() - 0.5) * 2.0,
            ];
            velocities.push([
                (rng.gen::<f32>() - 0.5) * 0.02,
                (rng.gen::<f32>() - 0.5) * 0.02,
                (rng.gen::<f32>() - 0.5) * 0.02,
            ]);
        }

        let mut node = StyleNode::new();
        node.parts.push(MeshPart::new(
            geometry,
            Material::with_color(settings.color_scheme.rgb()),
        ));

        Self {
            node,
            velocities,
            disposed: false,
        }
    }
}

impl VisualStyle for ParticleBurstStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::ParticleBurst
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
        let gain = settings.speed * (1.0 + bass);

        let part = &mut self.node.parts[0];
        for (vertex, velocity) in part.geometry.vertices.iter_mut().zip(&self.velocities) {
            for axis in 0..3 {
                vertex.position[axis] += velocity[axis] * gain;
            }

            let distance = (vertex.position[0].powi(2)
                + vertex.position[1].powi(2)
                + vertex.position[2].powi(2))
            .sqrt();

            // Implosion rule: pull back to 10% of the current position,
            // not a respawn at origin
            if distance > OVERFLOW_DISTANCE {
                for axis in 0..3 {
                    vertex.position[axis] *= 0.1;
                }
            }
        }
        part.geometry.mark_dirty();

        self.node.transform.rotation.y += 0.001 * settings.speed;

        apply_scheme(&mut self.node, settings.color_scheme);
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.node.parts.clear();
        self.velocities.clear();
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_distance(style: &ParticleBurstStyle) -> f32 {
        style.node().parts[0]
            .geometry
            .vertices
            .iter()
            .map(|v| {
                (v.position[0].powi(2) + v.position[1].powi(2) + v.position[2].powi(2)).sqrt()
            })
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_burst_count_is_structural() {
        let mut settings = VisualizerSettings::default();
        settings.burst_count = 64;
        let style = ParticleBurstStyle::new(&settings);
        assert_eq!(style.node().parts[0].geometry.vertices.len(), 64);
        assert_eq!(style.velocities.len(), 64);
    }

    #[test]
    fn test_no_particle_escapes_after_update() {
        let mut settings = VisualizerSettings::default();
        settings.intensity = 1.0;
        settings.speed = 1.0;

        let snapshot = vec![255u8; 128];
        let mut style = ParticleBurstStyle::new(&settings);

        // Many loud frames: the implosion rule must hold after every update
        for frame in 0..600 {
            style.update(&snapshot, &settings, frame as f32 / 60.0);
            assert!(max_distance(&style) <= OVERFLOW_DISTANCE + 1e-4);
        }
    }

    #[test]
    fn test_zero_speed_freezes_positions() {
        let mut settings = VisualizerSettings::default();
        settings.speed = 0.0;

        let snapshot = vec![255u8; 128];
        let mut style = ParticleBurstStyle::new(&settings);
        let before: Vec<[f32; 3]> = style.node().parts[0]
            .geometry
            .vertices
            .iter()
            .map(|v| v.position)
            .collect();

        style.update(&snapshot, &settings, 0.0);

        let after: Vec<[f32; 3]> = style.node().parts[0]
            .geometry
            .vertices
            .iter()
            .map(|v| v.position)
            .collect();
        assert_eq!(before, after);
        assert_eq!(style.node().transform.rotation.y, 0.0);
    }
}
