//! Collision geometry for the engine
//!
//! Static geometry is a single triangle soup loaded before any character is
//! created. Dynamic meshes are engine surface objects that can be moved
//! every frame and are deleted when dropped. A dynamic mesh that outlives
//! its context is left alone; the engine already released it.

use crate::context::EngineHandle;
use crate::engine::Engine;
use crate::sys::{ObjectTransform, Surface};
use sm64_common::{space, GroundBounds, Sm64Result, Sm64Vec3, Vec3};
use tracing::{debug, info, warn};

/// Collision behaviour of a surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SurfaceType(pub i16);

impl SurfaceType {
    pub const DEFAULT: Self = Self(0x0000);
    pub const BURNING: Self = Self(0x0001);
    pub const HANGABLE: Self = Self(0x0005);
    pub const SLOW: Self = Self(0x0009);
    pub const DEATH_PLANE: Self = Self(0x000A);
    pub const CLOSE_CAMERA: Self = Self(0x000B);
    pub const WATER: Self = Self(0x000D);
    pub const FLOWING_WATER: Self = Self(0x000E);
    pub const INTANGIBLE: Self = Self(0x0012);
    pub const VERY_SLIPPERY: Self = Self(0x0013);
    pub const SLIPPERY: Self = Self(0x0014);
    pub const NOT_SLIPPERY: Self = Self(0x0015);
    pub const SHALLOW_QUICKSAND: Self = Self(0x0021);
    pub const DEEP_QUICKSAND: Self = Self(0x0022);
    pub const INSTANT_QUICKSAND: Self = Self(0x0023);
    pub const NOISE_DEFAULT: Self = Self(0x0029);
    pub const ICE: Self = Self(0x002E);
    pub const HARD: Self = Self(0x0030);
    pub const VERTICAL_WIND: Self = Self(0x0038);
    pub const VANISH_CAP_WALLS: Self = Self(0x007B);
}

/// Footstep and landing sound family of a surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TerrainType(pub u16);

impl TerrainType {
    pub const GRASS: Self = Self(0x0000);
    pub const STONE: Self = Self(0x0001);
    pub const SNOW: Self = Self(0x0002);
    pub const SAND: Self = Self(0x0003);
    pub const SPOOKY: Self = Self(0x0004);
    pub const WATER: Self = Self(0x0005);
    pub const SLIDE: Self = Self(0x0006);
}

/// Death plane margin around the level bounds, host units
pub const DEATH_PLANE_INFLATE: f32 = 100.0;
/// Distance of the engine death plane below the host one, host units
pub const DEATH_PLANE_DROP: f32 = 1000.0;

/// Engine transform for an object at a host-space position
pub fn host_transform(position: Vec3) -> ObjectTransform {
    ObjectTransform {
        position: space::to_engine_position(position),
        euler_rotation: Sm64Vec3::ZERO,
    }
}

fn to_engine_vertex(v: Sm64Vec3) -> [i32; 3] {
    [v.x as i32, v.y as i32, v.z as i32]
}

/// Accumulates surfaces in engine space
#[derive(Debug, Clone, Default)]
pub struct CollisionMeshBuilder {
    surfaces: Vec<Surface>,
}

impl CollisionMeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(triangles: usize) -> Self {
        Self {
            surfaces: Vec::with_capacity(triangles),
        }
    }

    /// Add one engine-space triangle; vertices are truncated to integers
    pub fn add_triangle(
        &mut self,
        surface_type: SurfaceType,
        terrain: TerrainType,
        v0: Sm64Vec3,
        v1: Sm64Vec3,
        v2: Sm64Vec3,
    ) -> &mut Self {
        self.surfaces.push(Surface {
            surface_type: surface_type.0,
            force: 0,
            terrain: terrain.0,
            vertices: [to_engine_vertex(v0), to_engine_vertex(v1), to_engine_vertex(v2)],
        });
        self
    }

    /// Add a quad as the triangles (v0, v1, v2) and (v3, v2, v1)
    pub fn add_quad(
        &mut self,
        surface_type: SurfaceType,
        terrain: TerrainType,
        v0: Sm64Vec3,
        v1: Sm64Vec3,
        v2: Sm64Vec3,
        v3: Sm64Vec3,
    ) -> &mut Self {
        self.add_triangle(surface_type, terrain, v0, v1, v2);
        self.add_triangle(surface_type, terrain, v3, v2, v1)
    }

    /// Add a host-space triangle
    pub fn add_host_triangle(
        &mut self,
        surface_type: SurfaceType,
        terrain: TerrainType,
        a: Vec3,
        b: Vec3,
        c: Vec3,
    ) -> &mut Self {
        self.add_triangle(
            surface_type,
            terrain,
            space::to_engine_position(a),
            space::to_engine_position(b),
            space::to_engine_position(c),
        )
    }

    /// Add a death plane under the whole level
    ///
    /// `bounds` is the host ground-plane extent of the level and
    /// `death_plane_z` the host height below which the character dies.
    pub fn add_death_plane(&mut self, bounds: GroundBounds, death_plane_z: f32) -> &mut Self {
        let k = space::HOST_TO_SM64;
        let min_x = (bounds.min.x - DEATH_PLANE_INFLATE) * k;
        let max_x = (bounds.max.x + DEATH_PLANE_INFLATE) * k;
        // host +Y is engine -Z
        let min_z = -(bounds.max.y + DEATH_PLANE_INFLATE) * k;
        let max_z = -(bounds.min.y - DEATH_PLANE_INFLATE) * k;
        let y = (death_plane_z - DEATH_PLANE_DROP) * k;

        self.add_quad(
            SurfaceType::DEATH_PLANE,
            TerrainType::GRASS,
            Sm64Vec3::new(min_x, y, max_z),
            Sm64Vec3::new(max_x, y, max_z),
            Sm64Vec3::new(min_x, y, min_z),
            Sm64Vec3::new(max_x, y, min_z),
        )
    }

    /// Contiguous view handed to the engine
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Replace the engine's static geometry with these surfaces
    pub fn build_static(&self, engine: &dyn Engine) -> usize {
        engine.static_surfaces_load(&self.surfaces);
        info!("Loaded {} static surfaces", self.surfaces.len());
        self.surfaces.len()
    }

    /// Create a movable surface object from these surfaces
    pub fn build_dynamic(&self, engine: EngineHandle, transform: ObjectTransform) -> Sm64Result<DynamicCollisionMesh> {
        let object_id = engine.get()?.surface_object_create(&transform, &self.surfaces);
        debug!(
            "Created surface object {} with {} surfaces",
            object_id,
            self.surfaces.len()
        );
        Ok(DynamicCollisionMesh {
            engine,
            object_id,
            transform,
            surface_count: self.surfaces.len(),
        })
    }
}

/// Engine surface object; deleted on drop
pub struct DynamicCollisionMesh {
    engine: EngineHandle,
    object_id: u32,
    transform: ObjectTransform,
    surface_count: usize,
}

impl DynamicCollisionMesh {
    pub fn id(&self) -> u32 {
        self.object_id
    }

    pub fn transform(&self) -> ObjectTransform {
        self.transform
    }

    pub fn surface_count(&self) -> usize {
        self.surface_count
    }

    /// Whether the engine still holds this object
    pub fn is_live(&self) -> bool {
        self.engine.is_live()
    }

    /// Fails with `Disposed` once the context is gone
    pub fn move_to(&mut self, transform: ObjectTransform) -> Sm64Result<()> {
        self.engine.get()?.surface_object_move(self.object_id, &transform);
        self.transform = transform;
        Ok(())
    }

    /// Move to a host-space position, keeping the rotation
    pub fn move_to_host(&mut self, position: Vec3) -> Sm64Result<()> {
        self.move_to(ObjectTransform {
            position: space::to_engine_position(position),
            euler_rotation: self.transform.euler_rotation,
        })
    }
}

impl Drop for DynamicCollisionMesh {
    fn drop(&mut self) {
        match self.engine.get() {
            Ok(engine) => {
                engine.surface_object_delete(self.object_id);
                debug!("Deleted surface object {}", self.object_id);
            }
            Err(_) => warn!(
                "Surface object {} outlived its context, nothing to delete",
                self.object_id
            ),
        }
    }
}

impl std::fmt::Debug for DynamicCollisionMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicCollisionMesh")
            .field("object_id", &self.object_id)
            .field("transform", &self.transform)
            .field("surface_count", &self.surface_count)
            .finish()
    }
}
