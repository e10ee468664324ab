//! CPU-side geometry used by the visual styles.
//!
//! Styles mutate these buffers every frame (arena-style, pre-allocated at
//! create time); the renderer re-uploads a geometry only when its dirty
//! flag is set.

use bytemuck::{Pod, Zeroable};
use std::f32::consts::PI;

/// Vertex data shared by every pipeline (position + normal)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Primitive topology of a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    TriangleList,
    LineStrip,
    PointList,
}

/// A mutable vertex/index buffer pair with upload tracking
#[derive(Debug, Clone)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    /// Empty for LineStrip / PointList
    pub indices: Vec<u32>,
    pub topology: Topology,
    /// Set by styles after mutating `vertices`; cleared by the renderer
    pub dirty: bool,
}

impl Geometry {
    fn new(vertices: Vec<Vertex>, indices: Vec<u32>, topology: Topology) -> Self {
        Self {
            vertices,
            indices,
            topology,
            dirty: true,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

/// Axis-aligned box centered at the origin
pub fn build_box(width: f32, height: f32, depth: f32) -> Geometry {
    let (hw, hh, hd) = (width / 2.0, height / 2.0, depth / 2.0);

    // 6 faces, 4 vertices each, per-face normals
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [
                [-hw, -hh, hd],
                [hw, -hh, hd],
                [hw, hh, hd],
                [-hw, hh, hd],
            ],
        ),
        (
            [0.0, 0.0, -1.0],
            [
                [hw, -hh, -hd],
                [-hw, -hh, -hd],
                [-hw, hh, -hd],
                [hw, hh, -hd],
            ],
        ),
        (
            [1.0, 0.0, 0.0],
            [
                [hw, -hh, hd],
                [hw, -hh, -hd],
                [hw, hh, -hd],
                [hw, hh, hd],
            ],
        ),
        (
            [-1.0, 0.0, 0.0],
            [
                [-hw, -hh, -hd],
                [-hw, -hh, hd],
                [-hw, hh, hd],
                [-hw, hh, -hd],
            ],
        ),
        (
            [0.0, 1.0, 0.0],
            [
                [-hw, hh, hd],
                [hw, hh, hd],
                [hw, hh, -hd],
                [-hw, hh, -hd],
            ],
        ),
        (
            [0.0, -1.0, 0.0],
            [
                [-hw, -hh, -hd],
                [hw, -hh, -hd],
                [hw, -hh, hd],
                [-hw, -hh, hd],
            ],
        ),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        for position in corners {
            vertices.push(Vertex { position, normal });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Geometry::new(vertices, indices, Topology::TriangleList)
}

/// Torus in the XY plane (ring radius + tube radius)
pub fn build_torus(
    radius: f32,
    tube: f32,
    radial_segments: usize,
    tubular_segments: usize,
) -> Geometry {
    let mut vertices = Vec::with_capacity((radial_segments + 1) * (tubular_segments + 1));
    let mut indices = Vec::with_capacity(radial_segments * tubular_segments * 6);

    for j in 0..=radial_segments {
        let v = j as f32 / radial_segments as f32 * 2.0 * PI;
        for i in 0..=tubular_segments {
            let u = i as f32 / tubular_segments as f32 * 2.0 * PI;

            let cx = radius * u.cos();
            let cy = radius * u.sin();
            let position = [
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            ];
            let normal_raw = [position[0] - cx, position[1] - cy, position[2]];
            let len =
                (normal_raw[0].powi(2) + normal_raw[1].powi(2) + normal_raw[2].powi(2)).sqrt();
            let normal = if len > 0.0 {
                [normal_raw[0] / len, normal_raw[1] / len, normal_raw[2] / len]
            } else {
                [0.0, 0.0, 1.0]
            };

            vertices.push(Vertex { position, normal });
        }
    }

    for j in 0..radial_segments {
        for i in 0..tubular_segments {
            let a = (j * (tubular_segments + 1) + i) as u32;
            let b = a + 1;
            let c = ((j + 1) * (tubular_segments + 1) + i) as u32;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    Geometry::new(vertices, indices, Topology::TriangleList)
}

/// UV sphere centered at the origin
pub fn build_sphere(radius: f32, segments: usize, rings: usize) -> Geometry {
    let mut vertices = Vec::with_capacity((rings + 1) * (segments + 1));
    let mut indices = Vec::with_capacity(rings * segments * 6);

    for r in 0..=rings {
        let phi = r as f32 / rings as f32 * PI;
        for s in 0..=segments {
            let theta = s as f32 / segments as f32 * 2.0 * PI;
            let normal = [
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            ];
            vertices.push(Vertex {
                position: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                normal,
            });
        }
    }

    for r in 0..rings {
        for s in 0..segments {
            let a = (r * (segments + 1) + s) as u32;
            let b = a + 1;
            let c = ((r + 1) * (segments + 1) + s) as u32;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    Geometry::new(vertices, indices, Topology::TriangleList)
}

/// Flat grid in the XZ plane, `size` world units per side, `segments`
/// subdivisions per side. Counter-clockwise winding, normals up.
pub fn build_plane_grid(size: f32, segments: usize) -> Geometry {
    let half = size / 2.0;
    let step = size / segments as f32;

    let mut vertices = Vec::with_capacity((segments + 1) * (segments + 1));
    let mut indices = Vec::with_capacity(segments * segments * 6);

    for z in 0..=segments {
        for x in 0..=segments {
            vertices.push(Vertex {
                position: [x as f32 * step - half, 0.0, z as f32 * step - half],
                normal: [0.0, 1.0, 0.0],
            });
        }
    }

    for z in 0..segments {
        for x in 0..segments {
            let top_left = (z * (segments + 1) + x) as u32;
            let top_right = top_left + 1;
            let bottom_left = ((z + 1) * (segments + 1) + x) as u32;
            let bottom_right = bottom_left + 1;

            indices.extend_from_slice(&[
                top_left,
                bottom_left,
                top_right,
                top_right,
                bottom_left,
                bottom_right,
            ]);
        }
    }

    Geometry::new(vertices, indices, Topology::TriangleList)
}

/// Horizontal polyline of `count` vertices starting at `x0`, spaced `dx`
pub fn build_polyline(count: usize, x0: f32, dx: f32) -> Geometry {
    let vertices = (0..count)
        .map(|i| Vertex {
            position: [x0 + i as f32 * dx, 0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        })
        .collect();

    Geometry::new(vertices, Vec::new(), Topology::LineStrip)
}

/// Point cloud of `count` vertices at the origin (positions seeded by the
/// owning style)
pub fn build_point_cloud(count: usize) -> Geometry {
    let vertices = vec![
        Vertex {
            position: [0.0; 3],
            normal: [0.0, 0.0, 1.0],
        };
        count
    ];

    Geometry::new(vertices, Vec::new(), Topology::PointList)
}
