//! Low-level bindings for libsm64
//!
//! This module mirrors the libsm64 C ABI:
//! - Fixed-layout structs shared with the engine (inputs, state, surfaces)
//! - Geometry buffer and surface object descriptors that carry raw pointers
//! - The `extern "C"` entry points (only with the `native` feature)
//!
//! Struct sizes are checked at compile time; a mismatch means the engine
//! build and these bindings disagree.
#![allow(dead_code)]

use sm64_common::{Sm64Vec2, Sm64Vec3};
use std::ffi::c_char;

/// One collision triangle in engine units
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Surface {
    pub surface_type: i16,
    pub force: i16,
    pub terrain: u16,
    pub vertices: [[i32; 3]; 3],
}

/// Controller state for one engine tick
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarioInputs {
    pub cam_look_x: f32,
    pub cam_look_z: f32,
    pub stick_x: f32,
    pub stick_y: f32,
    pub button_a: u8,
    pub button_b: u8,
    pub button_z: u8,
}

/// Character state written by the engine every tick
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarioState {
    pub position: Sm64Vec3,
    pub velocity: Sm64Vec3,
    pub face_angle: f32,
    pub health: i16,
    pub action: u32,
    pub flags: u32,
    pub particle_flags: u32,
    pub invinc_timer: i16,
}

/// Caller-owned vertex arrays the engine writes the animated mesh into
#[repr(C)]
#[derive(Debug)]
pub struct MarioGeometryBuffers {
    pub position: *mut f32,
    pub normal: *mut f32,
    pub color: *mut f32,
    pub uv: *mut f32,
    pub num_triangles_used: u16,
}

/// Placement of a dynamic surface object
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObjectTransform {
    pub position: Sm64Vec3,
    pub euler_rotation: Sm64Vec3,
}

#[repr(C)]
#[derive(Debug)]
pub struct SurfaceObject {
    pub transform: ObjectTransform,
    pub surface_count: u32,
    pub surfaces: *const Surface,
}

pub type DebugPrintFn = extern "C" fn(message: *const c_char);
pub type PlaySoundFn = extern "C" fn(sound_bits: u32, position: *mut f32);

/// Returned by `sm64_mario_create` when no floor exists below the spawn point
pub const INVALID_MARIO_ID: i32 = -1;

const _: () = assert!(std::mem::size_of::<Surface>() == 44);
const _: () = assert!(std::mem::size_of::<MarioInputs>() == 20);
const _: () = assert!(std::mem::size_of::<MarioState>() == 48);
const _: () = assert!(std::mem::size_of::<ObjectTransform>() == 24);
const _: () = assert!(std::mem::size_of::<Sm64Vec2>() == 8);
#[cfg(target_pointer_width = "64")]
const _: () = assert!(std::mem::size_of::<MarioGeometryBuffers>() == 40);
#[cfg(target_pointer_width = "64")]
const _: () = assert!(std::mem::size_of::<SurfaceObject>() == 40);

#[cfg(feature = "native")]
#[link(name = "sm64")]
extern "C" {
    pub fn sm64_register_debug_print_function(debug_print: DebugPrintFn);
    pub fn sm64_register_play_sound_function(play_sound: PlaySoundFn);

    pub fn sm64_global_init(rom: *const u8, out_texture: *mut u8);
    pub fn sm64_global_terminate();

    pub fn sm64_audio_init(rom: *const u8);
    pub fn sm64_audio_tick(num_queued_samples: u32, num_desired_samples: u32, audio_buffer: *mut i16) -> u32;

    pub fn sm64_static_surfaces_load(surfaces: *const Surface, num_surfaces: u32);

    pub fn sm64_mario_create(x: f32, y: f32, z: f32) -> i32;
    pub fn sm64_mario_tick(
        mario_id: i32,
        inputs: *const MarioInputs,
        out_state: *mut MarioState,
        out_buffers: *mut MarioGeometryBuffers,
    );
    pub fn sm64_mario_delete(mario_id: i32);

    pub fn sm64_set_mario_action(mario_id: i32, action: u32);
    pub fn sm64_set_mario_action_arg(mario_id: i32, action: u32, action_arg: u32);
    pub fn sm64_set_mario_position(mario_id: i32, x: f32, y: f32, z: f32);
    pub fn sm64_set_mario_faceangle(mario_id: i32, y: f32);
    pub fn sm64_set_mario_velocity(mario_id: i32, x: f32, y: f32, z: f32);
    pub fn sm64_set_mario_forward_velocity(mario_id: i32, vel: f32);
    pub fn sm64_mario_take_damage(mario_id: i32, damage: u32, subtype: u32, x: f32, y: f32, z: f32);
    pub fn sm64_mario_kill(mario_id: i32);
    pub fn sm64_mario_interact_cap(mario_id: i32, cap_flag: u32, cap_time: u16, play_music: u8);
    pub fn sm64_mario_extend_cap(mario_id: i32, cap_time: u16);
    pub fn sm64_set_mario_health(mario_id: i32, health: u16);
    pub fn sm64_mario_heal(mario_id: i32, heal_counter: u8);
    pub fn sm64_set_mario_invincibility(mario_id: i32, timer: i16);
    pub fn sm64_mario_attack(mario_id: i32, x: f32, y: f32, z: f32, hitbox_height: f32) -> bool;
    pub fn sm64_set_mario_water_level(mario_id: i32, level: i32);
    pub fn sm64_set_mario_gas_level(mario_id: i32, level: i32);

    pub fn sm64_surface_object_create(surface_object: *const SurfaceObject) -> u32;
    pub fn sm64_surface_object_move(object_id: u32, transform: *const ObjectTransform);
    pub fn sm64_surface_object_delete(object_id: u32);

    pub fn sm64_play_sound_global(sound_bits: i32);
    pub fn sm64_play_sound(sound_bits: i32, pos: *mut f32);
}
