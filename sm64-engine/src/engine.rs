//! The engine call contract
//!
//! `Engine` is the safe seam between the bridge and libsm64. Every call the
//! bridge makes goes through it, which keeps all `unsafe` in `NativeEngine`
//! and lets the rest of the workspace run against `StubEngine`.
//!
//! libsm64 keeps global mutable state and is not re-entrant: implementations
//! may only be driven from the host simulation thread.

use sm64_common::Sm64Vec3;

use crate::context::TEXTURE_BYTES;
use crate::mesh::MeshBuffers;
use crate::sys::{DebugPrintFn, MarioInputs, MarioState, ObjectTransform, PlaySoundFn, Surface};

/// Most frames one audio tick writes
pub const AUDIO_TICK_MAX_FRAMES: usize = 544;
/// Samples per audio frame: two interleaved stereo sub-frames
pub const SAMPLES_PER_AUDIO_FRAME: usize = 2 * 2;
pub const AUDIO_TICK_MAX_SAMPLES: usize = AUDIO_TICK_MAX_FRAMES * SAMPLES_PER_AUDIO_FRAME;

/// Panics unless `out` can take the largest audio tick
pub fn assert_audio_capacity(out: &[i16]) {
    assert!(
        out.len() >= AUDIO_TICK_MAX_SAMPLES,
        "audio buffer holds {} samples, a tick writes up to {}",
        out.len(),
        AUDIO_TICK_MAX_SAMPLES
    );
}

/// Panics unless `texture` can take the whole atlas
pub fn assert_texture_capacity(texture: &[u8]) {
    assert!(
        texture.len() >= TEXTURE_BYTES,
        "texture buffer holds {} bytes, the atlas needs {}",
        texture.len(),
        TEXTURE_BYTES
    );
}

pub trait Engine: Send + Sync {
    /// Whether `global_init` needs a verified ROM image
    fn requires_rom(&self) -> bool;

    fn register_callbacks(&self, debug_print: DebugPrintFn, play_sound: PlaySoundFn);

    /// Initialize global state; writes the RGBA texture atlas into `texture`.
    /// Panics if `texture` is shorter than `TEXTURE_BYTES`.
    fn global_init(&self, rom: &[u8], texture: &mut [u8]);
    fn global_terminate(&self);

    fn audio_init(&self, rom: &[u8]);

    /// Generate audio into `out`; returns the number of frames written.
    /// Each returned frame is two interleaved stereo sub-frames (4 samples).
    /// Panics if `out` is shorter than `AUDIO_TICK_MAX_SAMPLES`.
    fn audio_tick(&self, queued_frames: u32, desired_frames: u32, out: &mut [i16]) -> u32;

    /// Replace the static collision geometry
    fn static_surfaces_load(&self, surfaces: &[Surface]);

    fn surface_object_create(&self, transform: &ObjectTransform, surfaces: &[Surface]) -> u32;
    fn surface_object_move(&self, object_id: u32, transform: &ObjectTransform);
    fn surface_object_delete(&self, object_id: u32);

    /// Create a character; returns `INVALID_MARIO_ID` when there is no floor below
    fn mario_create(&self, position: Sm64Vec3) -> i32;

    /// Advance one engine frame; returns the number of mesh triangles written
    fn mario_tick(&self, mario_id: i32, inputs: &MarioInputs, state: &mut MarioState, buffers: &mut MeshBuffers) -> u16;

    fn mario_delete(&self, mario_id: i32);

    fn set_mario_action(&self, mario_id: i32, action: u32);
    fn set_mario_action_arg(&self, mario_id: i32, action: u32, arg: u32);
    fn set_mario_position(&self, mario_id: i32, position: Sm64Vec3);
    fn set_mario_face_angle(&self, mario_id: i32, angle: f32);
    fn set_mario_velocity(&self, mario_id: i32, velocity: Sm64Vec3);
    fn set_mario_forward_velocity(&self, mario_id: i32, velocity: f32);
    fn mario_take_damage(&self, mario_id: i32, damage: u32, subtype: u32, source: Sm64Vec3);
    fn mario_kill(&self, mario_id: i32);
    fn mario_interact_cap(&self, mario_id: i32, cap: u32, cap_time: u16, play_music: bool);
    /// Add `cap_time` frames to an active cap power-up
    fn mario_extend_cap(&self, mario_id: i32, cap_time: u16);

    fn set_mario_health(&self, mario_id: i32, health: u16);
    /// Restore a quarter wedge on each of the next `heal_counter` frames
    fn mario_heal(&self, mario_id: i32, heal_counter: u8);
    /// Ignore damage for `timer` frames
    fn set_mario_invincibility(&self, mario_id: i32, timer: i16);

    /// Whether the character's current attack hits an object standing at
    /// `position` with the given hitbox height
    fn mario_attack(&self, mario_id: i32, position: Sm64Vec3, hitbox_height: f32) -> bool;

    fn set_mario_water_level(&self, mario_id: i32, level: i32);
    fn set_mario_gas_level(&self, mario_id: i32, level: i32);

    fn play_sound_global(&self, sound_bits: i32);
    fn play_sound(&self, sound_bits: i32, position: Sm64Vec3);
}

#[cfg(feature = "native")]
pub use native::NativeEngine;

#[cfg(feature = "native")]
mod native {
    use super::*;
    use crate::sys::{self, MarioGeometryBuffers, SurfaceObject};

    /// libsm64 linked into the process
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NativeEngine;

    impl NativeEngine {
        pub fn new() -> Self {
            Self
        }
    }

    impl Engine for NativeEngine {
        fn requires_rom(&self) -> bool {
            true
        }

        fn register_callbacks(&self, debug_print: DebugPrintFn, play_sound: PlaySoundFn) {
            unsafe {
                sys::sm64_register_debug_print_function(debug_print);
                sys::sm64_register_play_sound_function(play_sound);
            }
        }

        fn global_init(&self, rom: &[u8], texture: &mut [u8]) {
            assert_texture_capacity(texture);
            // SAFETY: the engine copies what it needs out of the ROM during
            // init and writes exactly TEXTURE_BYTES into `texture`, checked
            // above.
            unsafe { sys::sm64_global_init(rom.as_ptr(), texture.as_mut_ptr()) }
        }

        fn global_terminate(&self) {
            unsafe { sys::sm64_global_terminate() }
        }

        fn audio_init(&self, rom: &[u8]) {
            unsafe { sys::sm64_audio_init(rom.as_ptr()) }
        }

        fn audio_tick(&self, queued_frames: u32, desired_frames: u32, out: &mut [i16]) -> u32 {
            assert_audio_capacity(out);
            // SAFETY: `out` holds AUDIO_TICK_MAX_SAMPLES, the most one tick
            // writes.
            unsafe { sys::sm64_audio_tick(queued_frames, desired_frames, out.as_mut_ptr()) }
        }

        fn static_surfaces_load(&self, surfaces: &[Surface]) {
            unsafe { sys::sm64_static_surfaces_load(surfaces.as_ptr(), surfaces.len() as u32) }
        }

        fn surface_object_create(&self, transform: &ObjectTransform, surfaces: &[Surface]) -> u32 {
            let object = SurfaceObject {
                transform: *transform,
                surface_count: surfaces.len() as u32,
                surfaces: surfaces.as_ptr(),
            };
            // SAFETY: the engine copies the surfaces before returning.
            unsafe { sys::sm64_surface_object_create(&object) }
        }

        fn surface_object_move(&self, object_id: u32, transform: &ObjectTransform) {
            unsafe { sys::sm64_surface_object_move(object_id, transform) }
        }

        fn surface_object_delete(&self, object_id: u32) {
            unsafe { sys::sm64_surface_object_delete(object_id) }
        }

        fn mario_create(&self, position: Sm64Vec3) -> i32 {
            unsafe { sys::sm64_mario_create(position.x, position.y, position.z) }
        }

        fn mario_tick(&self, mario_id: i32, inputs: &MarioInputs, state: &mut MarioState, buffers: &mut MeshBuffers) -> u16 {
            buffers.assert_capacity();

            let mut geometry = MarioGeometryBuffers {
                position: buffers.positions_mut().as_mut_ptr().cast(),
                normal: buffers.normals_mut().as_mut_ptr().cast(),
                color: buffers.colors_mut().as_mut_ptr().cast(),
                uv: buffers.uvs_mut().as_mut_ptr().cast(),
                num_triangles_used: 0,
            };
            // SAFETY: every array holds MAX_VERTICES packed float vectors,
            // the most the engine writes in one tick, and stays borrowed for
            // the duration of the call.
            unsafe { sys::sm64_mario_tick(mario_id, inputs, state, &mut geometry) };
            geometry.num_triangles_used
        }

        fn mario_delete(&self, mario_id: i32) {
            unsafe { sys::sm64_mario_delete(mario_id) }
        }

        fn set_mario_action(&self, mario_id: i32, action: u32) {
            unsafe { sys::sm64_set_mario_action(mario_id, action) }
        }

        fn set_mario_action_arg(&self, mario_id: i32, action: u32, arg: u32) {
            unsafe { sys::sm64_set_mario_action_arg(mario_id, action, arg) }
        }

        fn set_mario_position(&self, mario_id: i32, position: Sm64Vec3) {
            unsafe { sys::sm64_set_mario_position(mario_id, position.x, position.y, position.z) }
        }

        fn set_mario_face_angle(&self, mario_id: i32, angle: f32) {
            unsafe { sys::sm64_set_mario_faceangle(mario_id, angle) }
        }

        fn set_mario_velocity(&self, mario_id: i32, velocity: Sm64Vec3) {
            unsafe { sys::sm64_set_mario_velocity(mario_id, velocity.x, velocity.y, velocity.z) }
        }

        fn set_mario_forward_velocity(&self, mario_id: i32, velocity: f32) {
            unsafe { sys::sm64_set_mario_forward_velocity(mario_id, velocity) }
        }

        fn mario_take_damage(&self, mario_id: i32, damage: u32, subtype: u32, source: Sm64Vec3) {
            unsafe { sys::sm64_mario_take_damage(mario_id, damage, subtype, source.x, source.y, source.z) }
        }

        fn mario_kill(&self, mario_id: i32) {
            unsafe { sys::sm64_mario_kill(mario_id) }
        }

        fn mario_interact_cap(&self, mario_id: i32, cap: u32, cap_time: u16, play_music: bool) {
            unsafe { sys::sm64_mario_interact_cap(mario_id, cap, cap_time, play_music as u8) }
        }

        fn mario_extend_cap(&self, mario_id: i32, cap_time: u16) {
            unsafe { sys::sm64_mario_extend_cap(mario_id, cap_time) }
        }

        fn set_mario_health(&self, mario_id: i32, health: u16) {
            unsafe { sys::sm64_set_mario_health(mario_id, health) }
        }

        fn mario_heal(&self, mario_id: i32, heal_counter: u8) {
            unsafe { sys::sm64_mario_heal(mario_id, heal_counter) }
        }

        fn set_mario_invincibility(&self, mario_id: i32, timer: i16) {
            unsafe { sys::sm64_set_mario_invincibility(mario_id, timer) }
        }

        fn mario_attack(&self, mario_id: i32, position: Sm64Vec3, hitbox_height: f32) -> bool {
            unsafe { sys::sm64_mario_attack(mario_id, position.x, position.y, position.z, hitbox_height) }
        }

        fn set_mario_water_level(&self, mario_id: i32, level: i32) {
            unsafe { sys::sm64_set_mario_water_level(mario_id, level) }
        }

        fn set_mario_gas_level(&self, mario_id: i32, level: i32) {
            unsafe { sys::sm64_set_mario_gas_level(mario_id, level) }
        }

        fn play_sound_global(&self, sound_bits: i32) {
            unsafe { sys::sm64_play_sound_global(sound_bits) }
        }

        fn play_sound(&self, sound_bits: i32, position: Sm64Vec3) {
            let mut raw = [position.x, position.y, position.z];
            // SAFETY: the engine reads three floats and does not keep the pointer.
            unsafe { sys::sm64_play_sound(sound_bits, raw.as_mut_ptr()) }
        }
    }
}
