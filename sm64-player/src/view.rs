//! Host-space view of the engine mesh

use sm64_common::{space, Vec2, Vec3};
use sm64_engine::MarioMesh;

/// One vertex ready for the host renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostVertex {
    /// Host units, +Z up
    pub position: Vec3,
    /// Unit normal in host axes
    pub normal: Vec3,
    /// Linear RGB
    pub color: Vec3,
    /// Texture coordinate into the Mario texture atlas
    pub uv: Vec2,
}

/// Live vertices of `mesh` in host space, three per triangle
pub fn host_vertices(mesh: &MarioMesh) -> impl Iterator<Item = HostVertex> + '_ {
    mesh.vertices().map(|v| HostVertex {
        position: space::to_host_position(v.position),
        normal: space::engine_axes_to_host(v.normal),
        color: Vec3::from(v.color),
        uv: Vec2::new(v.uv.x, v.uv.y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sm64_common::{Sm64Vec2, Sm64Vec3};

    #[test]
    fn test_vertices_converted_to_host_space() {
        let mut mesh = MarioMesh::new();
        {
            let buffers = mesh.buffers_mut();
            buffers.positions_mut()[0] = Sm64Vec3::new(100.0, 200.0, 300.0);
            buffers.normals_mut()[0] = Sm64Vec3::new(0.0, 1.0, 0.0);
            buffers.colors_mut()[0] = Sm64Vec3::new(0.5, 0.25, 1.0);
            buffers.uvs_mut()[0] = Sm64Vec2::new(0.75, 0.5);
        }
        mesh.set_triangle_count(1);

        let vertices: Vec<_> = host_vertices(&mesh).collect();
        assert_eq!(vertices.len(), 3);

        let v = vertices[0];
        assert!((v.position.x - 7.5).abs() < 1e-4);
        assert!((v.position.y + 22.5).abs() < 1e-4);
        assert!((v.position.z - 15.0).abs() < 1e-4);
        assert_eq!(v.normal, Vec3::Z);
        assert_eq!(v.color, Vec3::new(0.5, 0.25, 1.0));
        assert_eq!(v.uv, Vec2::new(0.75, 0.5));
    }
}
