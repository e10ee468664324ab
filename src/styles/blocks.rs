//! Blocks style: a row of eight boxes, each tied to one frequency bin.

use glam::Vec3;

use super::{apply_scheme, Material, MeshPart, StyleNode, VisualStyle};
use crate::geometry::build_box;
use crate::settings::{StyleKind, VisualizerSettings};

const BLOCK_COUNT: usize = 8;

pub struct BlocksStyle {
    node: StyleNode,
    disposed: bool,
}

impl BlocksStyle {
    pub fn new(settings: &VisualizerSettings) -> Self {
        let mut node = StyleNode::new();
        for i in 0..BLOCK_COUNT {
            let mut part = MeshPart::new(
                build_box(0.5, 0.5, 0.5),
                Material::with_color(settings.color_scheme.rgb()),
            );
            part.transform.position = Vec3::new(i as f32 - 4.0, 0.0, 0.0);
            node.parts.push(part);
        }
        Self {
            node,
            disposed: false,
        }
    }
}

impl VisualStyle for BlocksStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Blocks
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

        for (i, part) in self.node.parts.iter_mut().enumerate() {
            let bin = snapshot.get(i * 4).copied().unwrap_or(0) as f32;
            part.transform.scale.y = 1.0 + bin * settings.intensity * 0.01;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_line_up_on_x() {
        let settings = VisualizerSettings::default();
        let style = BlocksStyle::new(&settings);
        assert_eq!(style.node().parts.len(), BLOCK_COUNT);
        assert_eq!(style.node().parts[0].transform.position.x, -4.0);
        assert_eq!(style.node().parts[7].transform.position.x, 3.0);
    }

    #[test]
    fn test_each_block_reads_every_fourth_bin() {
        let mut settings = VisualizerSettings::default();
        settings.intensity = 1.0;

        let mut snapshot = vec![0u8; 128];
        snapshot[8] = 100; // drives block 2 only

        let mut style = BlocksStyle::new(&settings);
        style.update(&snapshot, &settings, 0.0);

        let parts = &style.node().parts;
        assert!((parts[2].transform.scale.y - 2.0).abs() < 1e-5);
        assert_eq!(parts[0].transform.scale.y, 1.0);
        assert_eq!(parts[3].transform.scale.y, 1.0);
    }

    #[test]
    fn test_short_snapshot_reads_as_silence() {
        let settings = VisualizerSettings::default();
        let mut style = BlocksStyle::new(&settings);
        style.update(&[10, 20], &settings, 0.0);
        // Blocks past the snapshot length fall back to zero magnitude
        assert_eq!(style.node().parts[7].transform.scale.y, 1.0);
    }
}
