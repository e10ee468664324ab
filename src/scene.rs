//! Scene host: camera, lights, the single attached style node, and the
//! GPU backend behind them.

use glam::{Mat4, Vec3};
use std::sync::Arc;
use winit::window::Window;

use crate::rendering::{RenderError, RenderSystem};
use crate::styles::StyleNode;

/// Perspective camera looking down -Z from z = 5
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            fov_y_degrees: 75.0,
            aspect: aspect.max(1e-3),
            z_near: 0.1,
            z_far: 1000.0,
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect.max(1e-3);
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target, Vec3::Y);
        let proj = Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.z_near,
            self.z_far,
        );
        proj * view
    }
}

/// Exactly one ambient and one directional light, created once per mount
#[derive(Debug, Clone)]
pub struct Lighting {
    pub ambient: [f32; 3],
    pub directional: [f32; 3],
    /// Direction *toward* the light
    pub direction: [f32; 3],
}

impl Default for Lighting {
    fn default() -> Self {
        let direction = Vec3::new(1.0, 1.0, 1.0).normalize();
        Self {
            // 0x404040 ambient, white directional
            ambient: [0.251, 0.251, 0.251],
            directional: [1.0, 1.0, 1.0],
            direction: direction.to_array(),
        }
    }
}

/// Owns the scene graph state and the render surface.
///
/// Created once per mount; `create` defers (returns `Ok(None)`) when no
/// window is attached yet. `dispose` is idempotent and safe after the
/// window is gone.
pub struct SceneHost {
    camera: Camera,
    lighting: Lighting,
    renderer: Option<RenderSystem>,
    attached: bool,
}

impl SceneHost {
    /// Set up the scene for a window. Returns `Ok(None)` when the window
    /// is not available yet; the caller retries on the next lifecycle
    /// event.
    pub fn create(window: Option<Arc<Window>>) -> Result<Option<Self>, RenderError> {
        let Some(window) = window else {
            return Ok(None);
        };

        let size = window.inner_size();
        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        let renderer = pollster::block_on(RenderSystem::new(window))?;

        Ok(Some(Self {
            camera: Camera::new(aspect),
            lighting: Lighting::default(),
            renderer: Some(renderer),
            attached: false,
        }))
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Attach a style's node. The host holds at most one; attaching again
    /// replaces the previous attachment.
    pub fn attach(&mut self) {
        if let Some(renderer) = &mut self.renderer {
            renderer.clear_parts();
        }
        self.attached = true;
    }

    /// Detach the current node, if any. Idempotent.
    pub fn detach(&mut self) {
        if self.attached {
            if let Some(renderer) = &mut self.renderer {
                renderer.clear_parts();
            }
            self.attached = false;
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Event-driven viewport resize: updates camera aspect and surface
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera.set_aspect(width as f32 / height as f32);
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(width, height);
        }
    }

    /// Draw the attached node. Cheap; no side effects beyond the GPU
    /// submission.
    pub fn render(&mut self, node: &mut StyleNode) -> Result<(), RenderError> {
        let Some(renderer) = &mut self.renderer else {
            return Ok(());
        };
        renderer.render(node, &self.camera, &self.lighting)
    }

    /// Free the GPU context. Idempotent; tolerates an already-gone window.
    pub fn dispose(&mut self) {
        self.detach();
        if self.renderer.take().is_some() {
            tracing::debug!("scene host disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.renderer.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_without_window_defers() {
        // Missing container is "not ready", not an error
        let host = SceneHost::create(None).unwrap();
        assert!(host.is_none());
    }

    #[test]
    fn test_camera_matrix_is_well_formed() {
        let camera = Camera::new(16.0 / 9.0);
        let matrix = camera.view_proj();
        assert_ne!(matrix, Mat4::IDENTITY);
        assert_ne!(matrix, Mat4::ZERO);
        assert!(matrix.to_cols_array().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_camera_aspect_guard() {
        let mut camera = Camera::new(0.0);
        assert!(camera.aspect > 0.0);
        camera.set_aspect(-1.0);
        assert!(camera.aspect > 0.0);
        assert!(camera.view_proj().to_cols_array().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_lighting_defaults() {
        let lighting = Lighting::default();
        let len = (lighting.direction[0].powi(2)
            + lighting.direction[1].powi(2)
            + lighting.direction[2].powi(2))
        .sqrt();
        assert!((len - 1.0).abs() < 1e-5);
        assert!(lighting.ambient.iter().all(|&c| c > 0.0 && c < 1.0));
    }
}
