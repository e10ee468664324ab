//! Pattern style: a floor of cubes rippling under two interfering waves.

use glam::Vec3;

use super::{apply_scheme, Material, MeshPart, StyleNode, VisualStyle};
use crate::geometry::build_box;
use crate::settings::{StyleKind, VisualizerSettings};

/// Cubes span [-GRID_EXTENT, GRID_EXTENT) on both axes
const GRID_EXTENT: i32 = 8;
const SPACING: f32 = 0.5;

pub struct PatternStyle {
    node: StyleNode,
    time: f32,
    disposed: bool,
}

impl PatternStyle {
    pub fn new(settings: &VisualizerSettings) -> Self {
        let mut node = StyleNode::new();
        node.transform.position = Vec3::new(0.0, 0.0, -2.0);

        for x in -GRID_EXTENT..GRID_EXTENT {
            for z in -GRID_EXTENT..GRID_EXTENT {
                let mut material = Material::with_color(settings.color_scheme.rgb());
                material.opacity = 0.8;
                let mut part = MeshPart::new(build_box(0.3, 0.3, 0.3), material);
                part.transform.position =
                    Vec3::new(x as f32 * SPACING, 0.0, z as f32 * SPACING);
                node.parts.push(part);
            }
        }

        Self {
            node,
            time: 0.0,
            disposed: false,
        }
    }
}

impl VisualStyle for PatternStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Pattern
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

        // Bass here is the raw mean of the first four bins, then normalized
        let end = snapshot.len().min(4);
        let bass_raw = if end > 0 {
            snapshot[..end].iter().map(|&b| b as f32).sum::<f32>() / 4.0
        } else {
            0.0
        };
        let bass = bass_raw / 255.0 * settings.intensity;

        self.time += 0.01 * settings.speed;

        for part in self.node.parts.iter_mut() {
            let x = part.transform.position.x;
            let z = part.transform.position.z;
            let distance = (x * x + z * z).sqrt();

            part.transform.position.y = (distance * 0.5 - self.time).sin()
                * (distance * 0.3 - self.time * 0.7).cos()
                * (0.2 + bass * 0.8);

            part.transform.scale = Vec3::splat(1.0 + bass * 0.5);
            part.transform.rotation.x += 0.01 * settings.speed;
            part.transform.rotation.y += 0.01 * settings.speed;
        }

        self.node.transform.rotation.y += 0.005 * settings.speed;

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
