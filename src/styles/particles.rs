//! Particles style: drifting spheres bobbing with per-bin magnitudes.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{apply_scheme, Material, MeshPart, StyleNode, VisualStyle};
use crate::geometry::build_sphere;
use crate::settings::{StyleKind, VisualizerSettings};

pub struct ParticlesStyle {
    node: StyleNode,
    disposed: bool,
}

impl ParticlesStyle {
    pub fn new(settings: &VisualizerSettings) -> Self {
        let mut rng = SmallRng::from_entropy();
        let mut node = StyleNode::new();

        // particle_count is structural: the part list is sized here and
        // never grows during updates
        for _ in 0..settings.particle_count {
            let mut part = MeshPart::new(
                build_sphere(0.1, 8, 8),
                Material::with_color(settings.color_scheme.rgb()),
            );
            part.transform.position = Vec3::new(
                (rng.gen::<f32>() - 0.5) * 10.0,
                (rng.gen::<f32>() - 0.5) * 10.0,
                (rng.gen::<f32>() - 0.5) * 10.0,
            );
            node.parts.push(part);
        }

        Self {
            node,
            disposed: false,
        }
    }
}

impl VisualStyle for ParticlesStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Particles
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

        let bins = snapshot.len().max(1);
        for (i, part) in self.node.parts.iter_mut().enumerate() {
            let magnitude = snapshot.get(i % bins).copied().unwrap_or(0) as f32;
            part.transform.position.y = (elapsed * settings.speed + i as f32).sin()
                * (1.0 + magnitude * settings.intensity * 0.01);
            part.transform.rotation.x += 0.01 * settings.speed;
        }

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
