//! Animated Mario mesh written by the engine each tick
//!
//! The engine emits a non-indexed triangle soup into caller-owned arrays.
//! The arrays are allocated once at the maximum size and overwritten
//! wholesale by every tick; `triangle_count` says how much of them is live.

use sm64_common::{Sm64Vec2, Sm64Vec3};

/// Maximum triangles the engine emits per tick
pub const MAX_TRIANGLES: usize = 1024;
/// Maximum vertices the engine emits per tick
pub const MAX_VERTICES: usize = 3 * MAX_TRIANGLES;

/// Vertex arrays handed to the engine
///
/// Always `MAX_VERTICES` long; the slices handed out can be written but
/// never resized.
#[derive(Debug, Clone)]
pub struct MeshBuffers {
    positions: Vec<Sm64Vec3>,
    normals: Vec<Sm64Vec3>,
    colors: Vec<Sm64Vec3>,
    uvs: Vec<Sm64Vec2>,
}

impl MeshBuffers {
    pub fn new() -> Self {
        Self {
            positions: vec![Sm64Vec3::ZERO; MAX_VERTICES],
            normals: vec![Sm64Vec3::ZERO; MAX_VERTICES],
            colors: vec![Sm64Vec3::ZERO; MAX_VERTICES],
            uvs: vec![Sm64Vec2::default(); MAX_VERTICES],
        }
    }

    pub fn positions(&self) -> &[Sm64Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Sm64Vec3] {
        &self.normals
    }

    pub fn colors(&self) -> &[Sm64Vec3] {
        &self.colors
    }

    pub fn uvs(&self) -> &[Sm64Vec2] {
        &self.uvs
    }

    pub fn positions_mut(&mut self) -> &mut [Sm64Vec3] {
        &mut self.positions
    }

    pub fn normals_mut(&mut self) -> &mut [Sm64Vec3] {
        &mut self.normals
    }

    pub fn colors_mut(&mut self) -> &mut [Sm64Vec3] {
        &mut self.colors
    }

    pub fn uvs_mut(&mut self) -> &mut [Sm64Vec2] {
        &mut self.uvs
    }

    /// Panics unless every array can take a full engine tick
    pub fn assert_capacity(&self) {
        let shortest = self
            .positions
            .len()
            .min(self.normals.len())
            .min(self.colors.len())
            .min(self.uvs.len());
        assert!(
            shortest >= MAX_VERTICES,
            "mesh buffers hold {} vertices, a tick writes up to {}",
            shortest,
            MAX_VERTICES
        );
    }
}

impl Default for MeshBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// One engine-space vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub position: Sm64Vec3,
    pub normal: Sm64Vec3,
    pub color: Sm64Vec3,
    pub uv: Sm64Vec2,
}

/// Mesh of one character
#[derive(Debug, Clone, Default)]
pub struct MarioMesh {
    buffers: MeshBuffers,
    triangle_count: usize,
}

impl MarioMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers for the engine to write into
    pub fn buffers_mut(&mut self) -> &mut MeshBuffers {
        &mut self.buffers
    }

    /// Record how many triangles the last tick produced
    pub fn set_triangle_count(&mut self, count: usize) {
        self.triangle_count = count.min(MAX_TRIANGLES);
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    pub fn vertex_count(&self) -> usize {
        self.triangle_count * 3
    }

    pub fn positions(&self) -> &[Sm64Vec3] {
        &self.buffers.positions[..self.vertex_count()]
    }

    pub fn normals(&self) -> &[Sm64Vec3] {
        &self.buffers.normals[..self.vertex_count()]
    }

    pub fn colors(&self) -> &[Sm64Vec3] {
        &self.buffers.colors[..self.vertex_count()]
    }

    pub fn uvs(&self) -> &[Sm64Vec2] {
        &self.buffers.uvs[..self.vertex_count()]
    }

    /// Live vertices, three per triangle
    pub fn vertices(&self) -> impl Iterator<Item = MeshVertex> + '_ {
        (0..self.vertex_count()).map(move |i| MeshVertex {
            position: self.buffers.positions[i],
            normal: self.buffers.normals[i],
            color: self.buffers.colors[i],
            uv: self.buffers.uvs[i],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffers_sized_for_max_triangles() {
        let mut buffers = MeshBuffers::new();
        assert_eq!(buffers.positions().len(), MAX_VERTICES);
        assert_eq!(buffers.normals().len(), MAX_VERTICES);
        assert_eq!(buffers.colors().len(), MAX_VERTICES);
        assert_eq!(buffers.uvs().len(), MAX_VERTICES);
        buffers.assert_capacity();

        // Writable in place, length fixed
        buffers.uvs_mut()[MAX_VERTICES - 1] = Sm64Vec2::new(1.0, 1.0);
        assert_eq!(buffers.uvs_mut().len(), MAX_VERTICES);
        assert_eq!(buffers.uvs()[MAX_VERTICES - 1], Sm64Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_triangle_count_clamped() {
        let mut mesh = MarioMesh::new();
        mesh.set_triangle_count(MAX_TRIANGLES + 50);
        assert_eq!(mesh.triangle_count(), MAX_TRIANGLES);
        assert_eq!(mesh.positions().len(), MAX_VERTICES);
    }

    #[test]
    fn test_vertices_follow_live_count() {
        let mut mesh = MarioMesh::new();
        mesh.buffers_mut().positions_mut()[4] = Sm64Vec3::new(1.0, 2.0, 3.0);
        mesh.set_triangle_count(2);
        let vertices: Vec<_> = mesh.vertices().collect();
        assert_eq!(vertices.len(), 6);
        assert_eq!(vertices[4].position, Sm64Vec3::new(1.0, 2.0, 3.0));

        mesh.set_triangle_count(0);
        assert_eq!(mesh.vertices().count(), 0);
    }
}
