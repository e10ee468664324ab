//! Circular style: a torus scaled by the average spectrum magnitude.

use super::{apply_scheme, average_value, Material, MeshPart, StyleNode, VisualStyle};
use crate::geometry::build_torus;
use crate::settings::{StyleKind, VisualizerSettings};

pub struct CircularStyle {
    node: StyleNode,
    disposed: bool,
}

impl CircularStyle {
    pub fn new(settings: &VisualizerSettings) -> Self {
        let mut node = StyleNode::new();
        node.parts.push(MeshPart::new(
            build_torus(2.0, 0.5, 16, 100),
            Material::with_color(settings.color_scheme.rgb()),
        ));
        Self {
            node,
            disposed: false,
        }
    }
}

impl VisualStyle for CircularStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Circular
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

        // Raw byte mean, not normalized: the 0.003 factor expects 0..255
        let average = average_value(snapshot, settings.intensity);
        let transform = &mut self.node.transform;
        transform.scale.x = 1.0 + average * 0.003;
        transform.scale.y = 1.0 + average * 0.003;
        transform.scale.z = 1.0;
        transform.rotation.z += 0.01 * settings.speed;

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
    fn test_average_scales_xy_only() {
        let mut settings = VisualizerSettings::default();
        settings.intensity = 1.0;

        let snapshot = vec![200u8; 128];
        let mut style = CircularStyle::new(&settings);
        style.update(&snapshot, &settings, 0.0);

        let scale = style.node().transform.scale;
        assert!((scale.x - 1.6).abs() < 1e-4); // 1 + 200 * 0.003
        assert_eq!(scale.x, scale.y);
        assert_eq!(scale.z, 1.0);
    }

    #[test]
    fn test_spin_axis_is_z() {
        let mut settings = VisualizerSettings::default();
        settings.speed = 1.0;
        let snapshot = vec![0u8; 128];

        let mut style = CircularStyle::new(&settings);
        style.update(&snapshot, &settings, 0.0);

        let rotation = style.node().transform.rotation;
        assert_eq!(rotation.x, 0.0);
        assert_eq!(rotation.y, 0.0);
        assert_eq!(rotation.z, 0.01);
    }
}
