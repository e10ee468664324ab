//! Default style: a single bass-reactive cube.

use glam::Vec3;

use super::{apply_scheme, bass_value, Material, MeshPart, StyleNode, VisualStyle};
use crate::geometry::build_box;
use crate::settings::{StyleKind, VisualizerSettings};

pub struct DefaultStyle {
    node: StyleNode,
    disposed: bool,
}

impl DefaultStyle {
    pub fn new(settings: &VisualizerSettings) -> Self {
        let mut node = StyleNode::new();
        node.parts.push(MeshPart::new(
            build_box(1.0, 1.0, 1.0),
            Material::with_color(settings.color_scheme.rgb()),
        ));
        Self {
            node,
            disposed: false,
        }
    }
}

impl VisualStyle for DefaultStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Default
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
        self.node.transform.scale = Vec3::splat(1.0 + bass * 0.5);
        self.node.transform.rotation.x += 0.01 * settings.speed;
        self.node.transform.rotation.y += 0.01 * settings.speed;

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
