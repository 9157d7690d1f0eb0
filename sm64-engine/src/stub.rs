//! Deterministic stand-in for libsm64
//!
//! `StubEngine` honours the engine contract closely enough to drive the
//! bridge without the native library or a ROM: creation needs a floor,
//! characters fall under gravity and land on upward-facing surfaces, every
//! tick writes a mesh, and the audio tick emits a known sample ramp.
//! Surface object rotation is ignored.

use crate::action::{self, ActionFlags, MarioFlags, FULL_HEALTH};
use crate::collision::SurfaceType;
use crate::engine::{assert_audio_capacity, assert_texture_capacity, Engine, SAMPLES_PER_AUDIO_FRAME};
use crate::mesh::MeshBuffers;
use crate::sys::{
    DebugPrintFn, MarioInputs, MarioState, ObjectTransform, PlaySoundFn, Surface, INVALID_MARIO_ID,
};
use glam::Vec3;
use parking_lot::Mutex;
use sm64_common::{Sm64Vec2, Sm64Vec3};
use std::collections::HashMap;
use std::ffi::CString;

pub const STUB_GRAVITY: f32 = 4.0;
pub const STUB_TERMINAL_VELOCITY: f32 = 75.0;
pub const STUB_JUMP_VELOCITY: f32 = 42.0;
pub const STUB_RUN_SPEED: f32 = 32.0;
pub const STUB_MESH_TRIANGLES: u16 = 4;
/// Frames per audio tick while the host queue is below the desired level
pub const STUB_AUDIO_FRAMES: u32 = 544;
/// Frames per audio tick once the desired level is reached
pub const STUB_AUDIO_FRAMES_SATURATED: u32 = 528;
pub const STUB_JUMP_SOUND: u32 = 0x2400_8081;
/// Fall speed cap below the water line
pub const STUB_SINK_VELOCITY: f32 = 8.0;
/// Health lost per tick inside gas
pub const STUB_GAS_DAMAGE: i16 = 4;
/// Horizontal reach of an attack
pub const STUB_ATTACK_RADIUS: f32 = 120.0;
pub const STUB_MARIO_HEIGHT: f32 = 160.0;
/// Health left after a death
pub const EMPTY_HEALTH: i16 = 0xff;
/// Liquid level of a fresh character, below any floor
pub const NO_LIQUID_LEVEL: i32 = -11000;

const FLOOR_SEARCH_ABOVE: f32 = 100.0;
const STEP_DOWN: f32 = 20.0;
const HEAL_STEP: i16 = 0x40;
/// Depth below the water line at which the character swims
const SUBMERGED_DEPTH: f32 = 80.0;
/// Depth below the gas level at which the character breathes it
const GAS_DEPTH: f32 = 100.0;

/// Sample `index` of the stub audio stream
pub fn stub_sample(index: u32) -> i16 {
    ((index % 512) as i16 - 256) * 64
}

/// Call counters recorded by the stub
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StubStats {
    pub global_inits: u32,
    pub global_terminates: u32,
    pub audio_inits: u32,
    pub audio_ticks: u64,
    pub static_loads: u32,
    pub static_surfaces: usize,
    pub objects_created: u32,
    pub objects_moved: u32,
    pub objects_deleted: u32,
    pub marios_created: u32,
    pub marios_deleted: u32,
    pub mario_ticks: u64,
    pub live_marios: usize,
}

#[derive(Debug, Clone)]
struct StubMario {
    position: Sm64Vec3,
    velocity: Sm64Vec3,
    face_angle: f32,
    health: i16,
    action: u32,
    flags: MarioFlags,
    cap_timer: u16,
    on_ground: bool,
    heal_counter: u8,
    invinc_timer: i16,
    water_level: i32,
    gas_level: i32,
}

impl StubMario {
    fn spawn(position: Sm64Vec3) -> Self {
        Self {
            position,
            velocity: Sm64Vec3::ZERO,
            face_angle: 0.0,
            health: FULL_HEALTH,
            action: action::ACT_IDLE,
            flags: MarioFlags::NORMAL_CAP | MarioFlags::CAP_ON_HEAD,
            cap_timer: 0,
            on_ground: true,
            heal_counter: 0,
            invinc_timer: 0,
            water_level: NO_LIQUID_LEVEL,
            gas_level: NO_LIQUID_LEVEL,
        }
    }

    fn is_dead(&self) -> bool {
        action::is_dead_health(self.health)
    }

    fn die(&mut self) {
        self.health = EMPTY_HEALTH;
        self.action = action::ACT_STANDING_DEATH;
    }

    fn is_submerged(&self) -> bool {
        self.position.y < self.water_level as f32 - SUBMERGED_DEPTH
    }

    fn in_gas(&self) -> bool {
        self.position.y < self.gas_level as f32 - GAS_DEPTH
    }

    /// Health regen, gas and timers, once per tick
    fn update_health(&mut self) {
        if self.invinc_timer > 0 {
            self.invinc_timer -= 1;
        }
        if self.is_dead() {
            return;
        }
        if self.heal_counter > 0 {
            self.health = (self.health + HEAL_STEP).min(FULL_HEALTH);
            self.heal_counter -= 1;
        }
        if self.in_gas() && !self.flags.contains(MarioFlags::METAL_CAP) {
            self.health -= STUB_GAS_DAMAGE;
            if self.is_dead() {
                self.die();
            }
        }
    }
}

#[derive(Debug)]
struct SurfaceObjectEntry {
    transform: ObjectTransform,
    surfaces: Vec<Surface>,
}

#[derive(Debug, Clone, Copy)]
struct Floor {
    height: f32,
    surface_type: i16,
}

#[derive(Default)]
struct StubState {
    stats: StubStats,
    static_surfaces: Vec<Surface>,
    objects: HashMap<u32, SurfaceObjectEntry>,
    next_object_id: u32,
    marios: HashMap<i32, StubMario>,
    next_mario_id: i32,
    debug_print: Option<DebugPrintFn>,
    play_sound: Option<PlaySoundFn>,
    audio_cursor: u32,
}

impl StubState {
    /// Highest floor under (x, z) at or below `y_max`
    fn find_floor(&self, x: f32, y_max: f32, z: f32) -> Option<Floor> {
        let statics = self.static_surfaces.iter().map(|s| (s, Vec3::ZERO));
        let objects = self
            .objects
            .values()
            .flat_map(|o| o.surfaces.iter().map(move |s| (s, Vec3::from(o.transform.position))));

        statics
            .chain(objects)
            .filter_map(|(surface, offset)| {
                floor_height(surface, offset, x, z).map(|height| Floor {
                    height,
                    surface_type: surface.surface_type,
                })
            })
            .filter(|floor| floor.height <= y_max)
            .max_by(|a, b| a.height.total_cmp(&b.height))
    }

    fn step(&self, mario: &mut StubMario, inputs: &MarioInputs, sounds: &mut Vec<(u32, Option<Sm64Vec3>)>) {
        if mario.cap_timer > 0 {
            mario.cap_timer -= 1;
            if mario.cap_timer == 0 {
                mario.flags.remove(MarioFlags::SPECIAL_CAPS);
            }
        }
        mario.update_health();
        mario.flags.remove(MarioFlags::PUNCHING | MarioFlags::KICKING | MarioFlags::TRIPPING);

        let locked = mario.is_dead() || action::is_cutscene(mario.action);
        if locked {
            mario.velocity.x = 0.0;
            mario.velocity.z = 0.0;
        } else {
            let stick = Sm64Vec2::new(inputs.stick_x, inputs.stick_y);
            mario.velocity.x = stick.x * STUB_RUN_SPEED;
            mario.velocity.z = stick.y * STUB_RUN_SPEED;
            if stick.x.abs() > 0.01 || stick.y.abs() > 0.01 {
                mario.face_angle = mario.velocity.x.atan2(mario.velocity.z);
            }

            if inputs.button_a != 0 && mario.on_ground {
                mario.velocity.y = STUB_JUMP_VELOCITY;
                mario.on_ground = false;
                mario.action = action::ACT_JUMP;
                sounds.push((STUB_JUMP_SOUND, Some(mario.position)));
            } else if inputs.button_b != 0 && mario.on_ground {
                mario.flags.insert(MarioFlags::PUNCHING);
            }
        }

        if !mario.on_ground {
            let limit = if mario.is_submerged() {
                STUB_SINK_VELOCITY
            } else {
                STUB_TERMINAL_VELOCITY
            };
            mario.velocity.y = (mario.velocity.y - STUB_GRAVITY).max(-limit);
        }

        let previous_y = mario.position.y;
        mario.position.x += mario.velocity.x;
        mario.position.y += mario.velocity.y;
        mario.position.z += mario.velocity.z;

        let floor = self.find_floor(mario.position.x, previous_y + FLOOR_SEARCH_ABOVE, mario.position.z);
        match floor {
            Some(floor)
                if mario.position.y <= floor.height
                    || (mario.on_ground && mario.position.y - floor.height < STEP_DOWN) =>
            {
                mario.position.y = floor.height;
                mario.velocity.y = 0.0;
                mario.on_ground = true;

                if floor.surface_type == SurfaceType::DEATH_PLANE.0 {
                    mario.die();
                } else if !locked {
                    let moving = mario.velocity.x != 0.0 || mario.velocity.z != 0.0;
                    mario.action = if moving { action::ACT_WALKING } else { action::ACT_IDLE };
                }
            }
            _ => {
                if mario.on_ground {
                    mario.on_ground = false;
                    if !locked {
                        mario.action = action::ACT_FREEFALL;
                    }
                } else if mario.action == action::ACT_JUMP && mario.velocity.y <= 0.0 {
                    mario.action = action::ACT_FREEFALL;
                }
            }
        }
    }
}

fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

/// Height of a floor triangle at (x, z), if it covers the point
fn floor_height(surface: &Surface, offset: Vec3, x: f32, z: f32) -> Option<f32> {
    let [a, b, c] = surface
        .vertices
        .map(|p| Vec3::new(p[0] as f32, p[1] as f32, p[2] as f32) + offset);

    let n = face_normal(a, b, c);
    if n.y <= 0.01 {
        return None;
    }

    let edge = |p: Vec3, q: Vec3| (q.x - p.x) * (z - p.z) - (q.z - p.z) * (x - p.x);
    let (d0, d1, d2) = (edge(a, b), edge(b, c), edge(c, a));
    let inside = (d0 >= 0.0 && d1 >= 0.0 && d2 >= 0.0) || (d0 <= 0.0 && d1 <= 0.0 && d2 <= 0.0);
    if !inside {
        return None;
    }

    Some(a.y - (n.x * (x - a.x) + n.z * (z - a.z)) / n.y)
}

fn write_mesh(position: Sm64Vec3, buffers: &mut MeshBuffers) -> u16 {
    let origin = Vec3::from(position);
    let at = |x: f32, y: f32, z: f32| origin + Vec3::new(x, y, z);
    let apex = at(0.0, STUB_MARIO_HEIGHT, 0.0);
    let base = [
        at(-40.0, 0.0, -40.0),
        at(40.0, 0.0, -40.0),
        at(40.0, 0.0, 40.0),
        at(-40.0, 0.0, 40.0),
    ];
    let uvs = [Sm64Vec2::new(0.0, 0.0), Sm64Vec2::new(1.0, 0.0), Sm64Vec2::new(0.5, 1.0)];

    for side in 0..STUB_MESH_TRIANGLES as usize {
        let triangle = [base[(side + 1) % 4], base[side], apex];
        let normal: Sm64Vec3 = face_normal(triangle[0], triangle[1], triangle[2]).into();
        let color = if side % 2 == 0 {
            Sm64Vec3::new(1.0, 0.0, 0.0)
        } else {
            Sm64Vec3::new(0.0, 0.0, 1.0)
        };

        for (corner, vertex) in triangle.iter().enumerate() {
            let i = side * 3 + corner;
            buffers.positions_mut()[i] = (*vertex).into();
            buffers.normals_mut()[i] = normal;
            buffers.colors_mut()[i] = color;
            buffers.uvs_mut()[i] = uvs[corner];
        }
    }
    STUB_MESH_TRIANGLES
}

/// In-process engine used by tests and the demo
#[derive(Default)]
pub struct StubEngine {
    state: Mutex<StubState>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> StubStats {
        let state = self.state.lock();
        StubStats {
            live_marios: state.marios.len(),
            ..state.stats.clone()
        }
    }

    fn debug_print(&self, message: &str) {
        let callback = self.state.lock().debug_print;
        if let (Some(print), Ok(text)) = (callback, CString::new(message)) {
            print(text.as_ptr());
        }
    }

    fn emit_sounds(&self, sounds: Vec<(u32, Option<Sm64Vec3>)>) {
        let callback = self.state.lock().play_sound;
        let Some(play) = callback else {
            return;
        };
        for (bits, position) in sounds {
            match position {
                Some(p) => {
                    let mut raw = [p.x, p.y, p.z];
                    play(bits, raw.as_mut_ptr());
                }
                None => play(bits, std::ptr::null_mut()),
            }
        }
    }

    fn with_mario(&self, mario_id: i32, f: impl FnOnce(&mut StubMario)) {
        if let Some(mario) = self.state.lock().marios.get_mut(&mario_id) {
            f(mario);
        }
    }
}

impl Engine for StubEngine {
    fn requires_rom(&self) -> bool {
        false
    }

    fn register_callbacks(&self, debug_print: DebugPrintFn, play_sound: PlaySoundFn) {
        let mut state = self.state.lock();
        state.debug_print = Some(debug_print);
        state.play_sound = Some(play_sound);
    }

    fn global_init(&self, _rom: &[u8], texture: &mut [u8]) {
        assert_texture_capacity(texture);
        for (i, byte) in texture.iter_mut().enumerate() {
            *byte = if i % 4 == 3 { 0xff } else { (i / 4 % 256) as u8 };
        }
        self.state.lock().stats.global_inits += 1;
        self.debug_print("stub engine initialized");
    }

    /// Drops everything; ids restart from zero like the engine's pools
    fn global_terminate(&self) {
        let mut state = self.state.lock();
        state.stats.global_terminates += 1;
        state.marios.clear();
        state.objects.clear();
        state.static_surfaces.clear();
        state.next_mario_id = 0;
        state.next_object_id = 0;
    }

    fn audio_init(&self, _rom: &[u8]) {
        self.state.lock().stats.audio_inits += 1;
    }

    fn audio_tick(&self, queued_frames: u32, desired_frames: u32, out: &mut [i16]) -> u32 {
        assert_audio_capacity(out);
        let frames = if queued_frames >= desired_frames {
            STUB_AUDIO_FRAMES_SATURATED
        } else {
            STUB_AUDIO_FRAMES
        };

        let mut state = self.state.lock();
        state.stats.audio_ticks += 1;
        for sample in out.iter_mut().take(frames as usize * SAMPLES_PER_AUDIO_FRAME) {
            *sample = stub_sample(state.audio_cursor);
            state.audio_cursor = state.audio_cursor.wrapping_add(1);
        }
        frames
    }

    fn static_surfaces_load(&self, surfaces: &[Surface]) {
        let mut state = self.state.lock();
        state.static_surfaces = surfaces.to_vec();
        state.stats.static_loads += 1;
        state.stats.static_surfaces = surfaces.len();
    }

    fn surface_object_create(&self, transform: &ObjectTransform, surfaces: &[Surface]) -> u32 {
        let mut state = self.state.lock();
        let id = state.next_object_id;
        state.next_object_id += 1;
        state.objects.insert(
            id,
            SurfaceObjectEntry {
                transform: *transform,
                surfaces: surfaces.to_vec(),
            },
        );
        state.stats.objects_created += 1;
        id
    }

    fn surface_object_move(&self, object_id: u32, transform: &ObjectTransform) {
        let mut state = self.state.lock();
        if let Some(object) = state.objects.get_mut(&object_id) {
            object.transform = *transform;
            state.stats.objects_moved += 1;
        }
    }

    fn surface_object_delete(&self, object_id: u32) {
        let mut state = self.state.lock();
        if state.objects.remove(&object_id).is_some() {
            state.stats.objects_deleted += 1;
        }
    }

    fn mario_create(&self, position: Sm64Vec3) -> i32 {
        let created = {
            let mut state = self.state.lock();
            match state.find_floor(position.x, position.y + FLOOR_SEARCH_ABOVE, position.z) {
                Some(floor) => {
                    let id = state.next_mario_id;
                    state.next_mario_id += 1;
                    let spawn = Sm64Vec3::new(position.x, floor.height, position.z);
                    state.marios.insert(id, StubMario::spawn(spawn));
                    state.stats.marios_created += 1;
                    Some(id)
                }
                None => None,
            }
        };

        match created {
            Some(id) => id,
            None => {
                self.debug_print("Failed to create Mario: no floor below spawn point");
                INVALID_MARIO_ID
            }
        }
    }

    fn mario_tick(&self, mario_id: i32, inputs: &MarioInputs, out: &mut MarioState, buffers: &mut MeshBuffers) -> u16 {
        buffers.assert_capacity();
        let mut sounds = Vec::new();
        let triangles = {
            let mut state = self.state.lock();
            state.stats.mario_ticks += 1;

            let Some(mut mario) = state.marios.get(&mario_id).cloned() else {
                return 0;
            };
            state.step(&mut mario, inputs, &mut sounds);

            *out = MarioState {
                position: mario.position,
                velocity: mario.velocity,
                face_angle: mario.face_angle,
                health: mario.health,
                action: mario.action,
                flags: mario.flags.bits(),
                particle_flags: 0,
                invinc_timer: mario.invinc_timer,
            };
            let triangles = write_mesh(mario.position, buffers);
            state.marios.insert(mario_id, mario);
            triangles
        };

        self.emit_sounds(sounds);
        triangles
    }

    fn mario_delete(&self, mario_id: i32) {
        let mut state = self.state.lock();
        if state.marios.remove(&mario_id).is_some() {
            state.stats.marios_deleted += 1;
        }
    }

    fn set_mario_action(&self, mario_id: i32, next: u32) {
        self.set_mario_action_arg(mario_id, next, 0);
    }

    fn set_mario_action_arg(&self, mario_id: i32, next: u32, _arg: u32) {
        self.with_mario(mario_id, |mario| {
            mario.action = next;
            if action::action_flags(next).contains(ActionFlags::AIR) {
                mario.on_ground = false;
            }
        });
    }

    fn set_mario_position(&self, mario_id: i32, position: Sm64Vec3) {
        self.with_mario(mario_id, |mario| mario.position = position);
    }

    fn set_mario_face_angle(&self, mario_id: i32, angle: f32) {
        self.with_mario(mario_id, |mario| mario.face_angle = angle);
    }

    fn set_mario_velocity(&self, mario_id: i32, velocity: Sm64Vec3) {
        self.with_mario(mario_id, |mario| {
            mario.velocity = velocity;
            if velocity.y > 0.0 {
                mario.on_ground = false;
            }
        });
    }

    fn set_mario_forward_velocity(&self, mario_id: i32, velocity: f32) {
        self.with_mario(mario_id, |mario| {
            mario.velocity.x = velocity * mario.face_angle.sin();
            mario.velocity.z = velocity * mario.face_angle.cos();
        });
    }

    fn mario_take_damage(&self, mario_id: i32, damage: u32, _subtype: u32, _source: Sm64Vec3) {
        self.with_mario(mario_id, |mario| {
            if mario.invinc_timer > 0 || mario.is_dead() {
                return;
            }
            let loss = i32::try_from(damage)
                .unwrap_or(i32::MAX)
                .saturating_mul(action::HEALTH_WEDGE as i32);
            let health = (mario.health as i32).saturating_sub(loss).max(EMPTY_HEALTH as i32);
            mario.health = health as i16;
            if mario.is_dead() {
                mario.die();
            }
        });
    }

    fn mario_kill(&self, mario_id: i32) {
        self.with_mario(mario_id, StubMario::die);
    }

    fn mario_interact_cap(&self, mario_id: i32, cap: u32, cap_time: u16, _play_music: bool) {
        self.with_mario(mario_id, |mario| {
            let cap = MarioFlags::from_bits_truncate(cap);
            mario.flags.insert(cap | MarioFlags::CAP_ON_HEAD);
            if cap.has_cap_active() {
                mario.cap_timer = cap_time;
            }
        });
    }

    fn mario_extend_cap(&self, mario_id: i32, cap_time: u16) {
        self.with_mario(mario_id, |mario| {
            if mario.flags.has_cap_active() {
                mario.cap_timer = mario.cap_timer.saturating_add(cap_time);
            }
        });
    }

    fn set_mario_health(&self, mario_id: i32, health: u16) {
        self.with_mario(mario_id, |mario| {
            mario.health = i16::try_from(health).unwrap_or(i16::MAX);
            if mario.is_dead() {
                mario.action = action::ACT_STANDING_DEATH;
            }
        });
    }

    fn mario_heal(&self, mario_id: i32, heal_counter: u8) {
        self.with_mario(mario_id, |mario| {
            mario.heal_counter = mario.heal_counter.saturating_add(heal_counter);
        });
    }

    fn set_mario_invincibility(&self, mario_id: i32, timer: i16) {
        self.with_mario(mario_id, |mario| mario.invinc_timer = timer);
    }

    fn mario_attack(&self, mario_id: i32, position: Sm64Vec3, hitbox_height: f32) -> bool {
        let state = self.state.lock();
        let Some(mario) = state.marios.get(&mario_id) else {
            return false;
        };

        let reach = Vec3::from(position) - Vec3::from(mario.position);
        let in_range = reach.x.hypot(reach.z) <= STUB_ATTACK_RADIUS
            && reach.y <= STUB_MARIO_HEIGHT
            && reach.y + hitbox_height >= 0.0;
        let stomping = !mario.on_ground && mario.velocity.y < 0.0;
        in_range && (mario.flags.is_attacking() || stomping)
    }

    fn set_mario_water_level(&self, mario_id: i32, level: i32) {
        self.with_mario(mario_id, |mario| mario.water_level = level);
    }

    fn set_mario_gas_level(&self, mario_id: i32, level: i32) {
        self.with_mario(mario_id, |mario| mario.gas_level = level);
    }

    fn play_sound_global(&self, sound_bits: i32) {
        self.emit_sounds(vec![(sound_bits as u32, None)]);
    }

    fn play_sound(&self, sound_bits: i32, position: Sm64Vec3) {
        self.emit_sounds(vec![(sound_bits as u32, Some(position))]);
    }
}

impl std::fmt::Debug for StubEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubEngine").field("stats", &self.stats()).finish()
    }
}
