//! Common types used across bridge components

use serde::{Deserialize, Serialize};

/// Host-space vectors (+Z up)
pub use glam::{Vec2, Vec3};

/// 2D vector in engine space, laid out as libsm64's `float[2]`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Sm64Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Sm64Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 3D vector in engine space (+Y up), laid out as libsm64's `float[3]`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Sm64Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Sm64Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Same components, no axis change
impl From<Vec3> for Sm64Vec3 {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Same components, no axis change
impl From<Sm64Vec3> for Vec3 {
    fn from(v: Sm64Vec3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl std::fmt::Display for Sm64Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.1}, {:.1}, {:.1}]", self.x, self.y, self.z)
    }
}

/// Host controls sampled for one host frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostInput {
    /// Movement stick, host convention
    pub stick: Vec2,
    /// Jump button (engine A)
    pub jump: bool,
    /// Dash button (engine B)
    pub dash: bool,
    /// Climb button (engine Z)
    pub climb: bool,
}

/// Host camera for one host frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraState {
    /// Camera eye position
    pub position: Vec3,
    /// Point the camera looks at
    pub look_at: Vec3,
}

impl CameraState {
    pub const fn new(position: Vec3, look_at: Vec3) -> Self {
        Self { position, look_at }
    }
}

/// Axis-aligned host-space bounds on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl GroundBounds {
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Grow the bounds to include a point
    pub fn include(&mut self, p: Vec2) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }
}

impl Default for GroundBounds {
    fn default() -> Self {
        Self::new(Vec2::ZERO, Vec2::ZERO)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Audio stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Initial queue capacity in samples
    pub queue_capacity: usize,
    /// Stereo frames the engine tries to keep queued
    pub desired_queued_frames: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 32000,
            channels: 2,
            queue_capacity: 16384,
            desired_queued_frames: 1100,
        }
    }
}

/// Character behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Duration of a cap power-up in engine frames
    pub cap_time: u16,
    /// Negate the stick again while flying with the wing cap
    pub invert_flying_stick: bool,
    /// Play cap music when a cap is picked up
    pub cap_music: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            cap_time: 600, // 20s at 30Hz
            invert_flying_stick: true,
            cap_music: true,
        }
    }
}
