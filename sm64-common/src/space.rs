//! Conversion between host space and engine space
//!
//! The host is +Z up, measures distance in host units and velocity per second,
//! and measures angles counter-clockwise with 0 along +X.
//! The engine is +Y up, measures distance in engine units and velocity per
//! engine frame (30Hz), and measures facing clockwise (seen from above) with 0
//! along +Z.
//!
//! Axis map: `host = (e.x, -e.z, e.y)`, `engine = (h.x, h.z, -h.y)`.
//! Every function here has an exact inverse; the two directions must only
//! ever be changed together.

use crate::types::{CameraState, Sm64Vec2, Sm64Vec3, Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, TAU};

/// Size of one engine unit in host units
pub const SM64_TO_HOST: f32 = 0.075;
/// Size of one host unit in engine units
pub const HOST_TO_SM64: f32 = 1.0 / SM64_TO_HOST;

/// Engine simulation rate
pub const ENGINE_TICK_HZ: f32 = 30.0;
/// Host update rate
pub const HOST_FRAME_HZ: f32 = 60.0;

/// Engine units per engine frame to host units per second
pub const SM64_TO_HOST_VEL: f32 = SM64_TO_HOST * ENGINE_TICK_HZ;
/// Host units per second to engine units per engine frame
pub const HOST_TO_SM64_VEL: f32 = HOST_TO_SM64 / ENGINE_TICK_HZ;

/// Permute engine axes into host axes without scaling
pub fn engine_axes_to_host(v: Sm64Vec3) -> Vec3 {
    Vec3::new(v.x, -v.z, v.y)
}

/// Permute host axes into engine axes without scaling
pub fn host_axes_to_engine(v: Vec3) -> Sm64Vec3 {
    Sm64Vec3::new(v.x, v.z, -v.y)
}

pub fn to_host_position(v: Sm64Vec3) -> Vec3 {
    engine_axes_to_host(v) * SM64_TO_HOST
}

pub fn to_engine_position(v: Vec3) -> Sm64Vec3 {
    let p = host_axes_to_engine(v);
    Sm64Vec3::new(p.x * HOST_TO_SM64, p.y * HOST_TO_SM64, p.z * HOST_TO_SM64)
}

pub fn to_host_velocity(v: Sm64Vec3) -> Vec3 {
    engine_axes_to_host(v) * SM64_TO_HOST_VEL
}

pub fn to_engine_velocity(v: Vec3) -> Sm64Vec3 {
    let p = host_axes_to_engine(v);
    Sm64Vec3::new(
        p.x * HOST_TO_SM64_VEL,
        p.y * HOST_TO_SM64_VEL,
        p.z * HOST_TO_SM64_VEL,
    )
}

/// Wrap an angle into `[0, 2pi)`
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly TAU
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Engine facing angle to host facing angle
pub fn to_host_angle(engine: f32) -> f32 {
    wrap_angle(engine - FRAC_PI_2)
}

/// Host facing angle to engine facing angle
pub fn to_engine_angle(host: f32) -> f32 {
    wrap_angle(host + FRAC_PI_2)
}

/// Smallest absolute difference between two angles
pub fn angle_distance(a: f32, b: f32) -> f32 {
    let d = wrap_angle(a - b);
    d.min(TAU - d)
}

/// Unit vector the engine considers "forward" for a facing angle
pub fn engine_forward(engine_angle: f32) -> Sm64Vec3 {
    Sm64Vec3::new(engine_angle.sin(), 0.0, engine_angle.cos())
}

/// Host movement stick to engine stick axes
pub fn to_engine_stick(stick: Vec2) -> Sm64Vec2 {
    Sm64Vec2::new(-stick.x, -stick.y)
}

/// Reduce the host camera to the engine's ground-plane look vector (x, z)
pub fn camera_look(camera: &CameraState) -> Sm64Vec2 {
    let delta = camera.position - camera.look_at;
    Sm64Vec2::new(delta.x, -delta.y)
}
