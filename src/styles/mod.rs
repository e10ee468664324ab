//! The visual style family.
//!
//! Each style is a self-contained simulation owning a renderable
//! [`StyleNode`] and mutating it in place every frame from the current
//! frequency snapshot and settings. Styles form a closed set selected by
//! [`StyleKind`]; [`create_style`] is the only constructor the pipeline
//! uses and never fails (unknown identifiers resolve to Default upstream).

mod blocks;
mod burst;
mod circular;
mod default;
mod grid;
mod particles;
mod pattern;
mod ripple;
mod wave;

pub use blocks::BlocksStyle;
pub use burst::ParticleBurstStyle;
pub use circular::CircularStyle;
pub use default::DefaultStyle;
pub use grid::GridStyle;
pub use particles::ParticlesStyle;
pub use pattern::PatternStyle;
pub use ripple::RippleStyle;
pub use wave::WaveStyle;

use glam::{EulerRot, Mat4, Vec2, Vec3};

use crate::geometry::Geometry;
use crate::settings::{ColorScheme, StyleKind, VisualizerSettings};

/// Position / Euler rotation / scale of a scene-graph node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_euler(
                EulerRot::XYZ,
                self.rotation.x,
                self.rotation.y,
                self.rotation.z,
            )
            * Mat4::from_scale(self.scale)
    }
}

/// Per-part surface parameters
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub color: [f32; 3],
    pub opacity: f32,
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
}

impl Material {
    pub fn with_color(color: [f32; 3]) -> Self {
        Self {
            color,
            opacity: 1.0,
            emissive: [0.0; 3],
            emissive_intensity: 0.0,
        }
    }
}

/// One renderable piece of a style: local transform + geometry + material
#[derive(Debug, Clone)]
pub struct MeshPart {
    pub transform: Transform,
    pub geometry: Geometry,
    pub material: Material,
}

impl MeshPart {
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            transform: Transform::default(),
            geometry,
            material,
        }
    }
}

/// The scene-graph node a style owns: a root transform, the pipeline's
/// glitch offset, and the flat part list
#[derive(Debug, Clone, Default)]
pub struct StyleNode {
    pub transform: Transform,
    /// Set by the pipeline's glitch step each frame; never accumulated
    pub glitch_offset: Vec2,
    pub parts: Vec<MeshPart>,
}

impl StyleNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root model matrix with the glitch displacement applied
    pub fn root_matrix(&self) -> Mat4 {
        let mut displaced = self.transform;
        displaced.position.x += self.glitch_offset.x;
        displaced.position.y += self.glitch_offset.y;
        displaced.matrix()
    }
}

/// Uniform shape every style exposes to the pipeline
pub trait VisualStyle {
    fn kind(&self) -> StyleKind;

    fn node(&self) -> &StyleNode;

    fn node_mut(&mut self) -> &mut StyleNode;

    /// Advance one frame. `snapshot` is the current frequency snapshot,
    /// `elapsed` the wall-clock seconds since the pipeline started. Must
    /// not allocate in steady state.
    fn update(&mut self, snapshot: &[u8], settings: &VisualizerSettings, elapsed: f32);

    /// Release owned buffers. Idempotent; a disposed instance ignores
    /// further `update` calls.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}

/// Instantiate a style with buffers sized from the structural settings
pub fn create_style(
    kind: StyleKind,
    settings: &VisualizerSettings,
) -> Box<dyn VisualStyle> {
    match kind {
        StyleKind::Default => Box::new(DefaultStyle::new(settings)),
        StyleKind::Circular => Box::new(CircularStyle::new(settings)),
        StyleKind::Wave => Box::new(WaveStyle::new(settings)),
        StyleKind::Blocks => Box::new(BlocksStyle::new(settings)),
        StyleKind::Particles => Box::new(ParticlesStyle::new(settings)),
        StyleKind::ParticleBurst => Box::new(ParticleBurstStyle::new(settings)),
        StyleKind::Ripple => Box::new(RippleStyle::new(settings)),
        StyleKind::Grid => Box::new(GridStyle::new(settings)),
        StyleKind::Pattern => Box::new(PatternStyle::new(settings)),
    }
}

/// `snapshot[0] / 255 * intensity`, the shared bass response
pub(crate) fn bass_value(snapshot: &[u8], intensity: f32) -> f32 {
    snapshot.first().copied().unwrap_or(0) as f32 / 255.0 * intensity
}

/// `mean(snapshot) * intensity` over raw byte magnitudes
pub(crate) fn average_value(snapshot: &[u8], intensity: f32) -> f32 {
    crate::analyzer::spectrum_average(snapshot) * intensity
}

/// Refresh every part's base color from the color scheme (continuous
/// setting, applied live)
pub(crate) fn apply_scheme(node: &mut StyleNode, scheme: ColorScheme) {
    let color = scheme.rgb();
    for part in &mut node.parts {
        part.material.color = color;
    }
}
