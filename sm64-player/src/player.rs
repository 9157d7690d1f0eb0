//! The 60Hz host actor wrapping one 30Hz engine character
//!
//! Every host frame stores fresh inputs; every other host frame ticks the
//! engine with them. Host-visible kinematics only change on tick frames and
//! hold flat in between.
//!
//! A player that outlives its context is abandoned on the next call: it goes
//! straight to `Disposed` without touching the engine.

use crate::input::{translate_input, InputMapping};
use crate::view::{host_vertices, HostVertex};
use sm64_audio::AudioProducer;
use sm64_common::{
    space, CameraState, HostInput, PlayerConfig, Sm64Error, Sm64Result, Sm64Vec3, Vec2, Vec3,
};
use sm64_engine::action::{self, MarioFlags};
use sm64_engine::{EngineHandle, MarioInputs, MarioMesh, MarioState, Sm64Context, INVALID_MARIO_ID};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created, nothing in the engine yet
    Uninitialized,
    /// Engine character created and ticked once
    Spawned,
    /// Receiving host frames
    Ticking,
    /// Engine character released
    Disposed,
}

/// Result of one host frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    /// The engine was ticked this frame
    pub ticked: bool,
}

pub struct MarioPlayer {
    engine: EngineHandle,
    config: PlayerConfig,
    lifecycle: Lifecycle,
    mario_id: i32,
    is_odd_frame: bool,
    pending: MarioInputs,
    state: MarioState,
    mesh: MarioMesh,
    position: Vec3,
    velocity: Vec3,
    facing: f32,
    ticks: u64,
    in_cutscene: bool,
    death_plane: Option<f32>,
    audio: Option<AudioProducer>,
}

impl MarioPlayer {
    /// Create an unspawned player on a live context
    pub fn new(context: &Sm64Context, config: PlayerConfig) -> Self {
        Self {
            engine: context.handle(),
            config,
            lifecycle: Lifecycle::Uninitialized,
            mario_id: INVALID_MARIO_ID,
            is_odd_frame: false,
            pending: MarioInputs::default(),
            state: MarioState::default(),
            mesh: MarioMesh::new(),
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            facing: 0.0,
            ticks: 0,
            in_cutscene: false,
            death_plane: None,
            audio: None,
        }
    }

    /// Run `producer` once per engine tick
    pub fn attach_audio(&mut self, producer: AudioProducer) {
        self.audio = Some(producer);
    }

    pub fn detach_audio(&mut self) -> Option<AudioProducer> {
        self.audio.take()
    }

    /// Host attach: create the engine character and tick it once
    ///
    /// Static collision with a floor under `position` must already be loaded.
    /// Until the first tick succeeds `position()` reports the spawn point.
    pub fn added(&mut self, position: Vec3) -> Sm64Result<()> {
        self.ensure_live()?;
        match self.lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Disposed => return Err(Sm64Error::Disposed),
            Lifecycle::Spawned | Lifecycle::Ticking => return Err(Sm64Error::AlreadySpawned),
        }

        self.position = position;
        let id = self.engine.get()?.mario_create(space::to_engine_position(position));
        if id == INVALID_MARIO_ID {
            return Err(Sm64Error::NoFloor {
                x: position.x,
                y: position.y,
                z: position.z,
            });
        }

        self.mario_id = id;
        self.lifecycle = Lifecycle::Spawned;
        self.tick()?;

        info!("Spawned Mario {} at {}", id, self.position);
        Ok(())
    }

    /// Host frame: store inputs and tick on every other call
    pub fn update(&mut self, input: &HostInput, camera: &CameraState) -> Sm64Result<FrameOutcome> {
        self.ensure_live()?;
        match self.lifecycle {
            Lifecycle::Uninitialized => return Err(Sm64Error::NotSpawned),
            Lifecycle::Disposed => return Err(Sm64Error::Disposed),
            Lifecycle::Spawned => self.lifecycle = Lifecycle::Ticking,
            Lifecycle::Ticking => {}
        }

        let mapping = InputMapping {
            invert_stick: self.config.invert_flying_stick && self.state.action == action::ACT_FLYING,
        };
        self.pending = translate_input(input, camera, mapping);

        let ticked = self.is_odd_frame;
        if ticked {
            self.tick()?;
            self.check_death_plane()?;
        }
        self.is_odd_frame = !self.is_odd_frame;

        Ok(FrameOutcome { ticked })
    }

    fn tick(&mut self) -> Sm64Result<()> {
        let engine = self.engine.get()?;
        let triangles = engine.mario_tick(self.mario_id, &self.pending, &mut self.state, self.mesh.buffers_mut());
        self.mesh.set_triangle_count(triangles as usize);

        self.position = space::to_host_position(self.state.position);
        self.velocity = space::to_host_velocity(self.state.velocity);
        self.facing = space::to_host_angle(self.state.face_angle);
        self.ticks += 1;

        if let Some(audio) = self.audio.as_mut() {
            audio.produce(engine);
        }

        trace!(
            "Tick {}: pos {} action {:#010x} triangles {}",
            self.ticks,
            self.position,
            self.state.action,
            triangles
        );
        Ok(())
    }

    fn check_death_plane(&mut self) -> Sm64Result<()> {
        if let Some(z) = self.death_plane {
            if self.position.z < z && !self.is_dead() {
                debug!("Mario fell below the death plane ({:.1} < {:.1})", self.position.z, z);
                self.engine.get()?.mario_kill(self.mario_id);
            }
        }
        Ok(())
    }

    /// Host teardown; safe to call any number of times
    pub fn dispose(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        if self.mario_id != INVALID_MARIO_ID {
            match self.engine.get() {
                Ok(engine) => {
                    engine.mario_delete(self.mario_id);
                    info!("Disposed Mario {}", self.mario_id);
                }
                Err(_) => debug!("Mario {} went with its context", self.mario_id),
            }
        }
        self.release();
    }

    fn release(&mut self) {
        self.mario_id = INVALID_MARIO_ID;
        self.lifecycle = Lifecycle::Disposed;
        self.mesh.set_triangle_count(0);
    }

    /// Abandon the character if its context is gone
    fn ensure_live(&mut self) -> Sm64Result<()> {
        if self.engine.is_live() {
            return Ok(());
        }
        if self.lifecycle != Lifecycle::Disposed {
            warn!("Mario {} outlived its context, abandoning it", self.mario_id);
            self.release();
        }
        Err(Sm64Error::Disposed)
    }

    fn live_id(&mut self) -> Sm64Result<i32> {
        self.ensure_live()?;
        match self.lifecycle {
            Lifecycle::Spawned | Lifecycle::Ticking => Ok(self.mario_id),
            Lifecycle::Uninitialized => Err(Sm64Error::NotSpawned),
            Lifecycle::Disposed => Err(Sm64Error::Disposed),
        }
    }

    // ------------------------------------------------------------------------
    // Controls
    // ------------------------------------------------------------------------

    /// Track host cutscenes; the character waits while one is active
    pub fn set_cutscene(&mut self, active: bool) -> Sm64Result<()> {
        let id = self.live_id()?;
        if active == self.in_cutscene {
            return Ok(());
        }

        let next = if active {
            action::ACT_WAITING_FOR_DIALOG
        } else {
            action::ACT_IDLE
        };
        self.engine.get()?.set_mario_action(id, next);
        self.in_cutscene = active;
        debug!("Cutscene {}", if active { "started" } else { "ended" });
        Ok(())
    }

    pub fn interact_cap(&mut self, cap: MarioFlags) -> Sm64Result<()> {
        let id = self.live_id()?;
        self.engine
            .get()?
            .mario_interact_cap(id, cap.bits(), self.config.cap_time, self.config.cap_music);
        Ok(())
    }

    pub fn kill(&mut self) -> Sm64Result<()> {
        let id = self.live_id()?;
        self.engine.get()?.mario_kill(id);
        Ok(())
    }

    /// Apply `damage` health wedges from a host-space source
    pub fn take_damage(&mut self, damage: u32, source: Vec3) -> Sm64Result<()> {
        let id = self.live_id()?;
        self.engine
            .get()?
            .mario_take_damage(id, damage, 0, space::to_engine_position(source));
        Ok(())
    }

    /// Launch upwards at `speed` host units per second
    pub fn spring(&mut self, speed: f32) -> Sm64Result<()> {
        let id = self.live_id()?;
        let engine = self.engine.get()?;
        engine.set_mario_action(id, action::ACT_TWIRLING);
        let velocity = Sm64Vec3::new(
            self.state.velocity.x,
            speed * space::HOST_TO_SM64_VEL,
            self.state.velocity.z,
        );
        engine.set_mario_velocity(id, velocity);
        Ok(())
    }

    /// Cancel all motion and drop
    pub fn stop(&mut self) -> Sm64Result<()> {
        let id = self.live_id()?;
        let engine = self.engine.get()?;
        engine.set_mario_action(id, action::ACT_FREEFALL);
        engine.set_mario_velocity(id, Sm64Vec3::ZERO);
        engine.set_mario_forward_velocity(id, 0.0);
        Ok(())
    }

    /// Teleport; visible after the next tick
    pub fn set_position(&mut self, position: Vec3) -> Sm64Result<()> {
        let id = self.live_id()?;
        self.engine
            .get()?
            .set_mario_position(id, space::to_engine_position(position));
        Ok(())
    }

    /// Face a host angle; visible after the next tick
    pub fn set_facing(&mut self, angle: f32) -> Sm64Result<()> {
        let id = self.live_id()?;
        self.engine.get()?.set_mario_face_angle(id, space::to_engine_angle(angle));
        Ok(())
    }

    /// Start the star-collection sequence at `position`
    pub fn collect_star(&mut self, position: Vec3, exit_level: bool) -> Sm64Result<()> {
        let id = self.live_id()?;
        let engine = self.engine.get()?;
        engine.set_mario_position(id, space::to_engine_position(position));
        engine.set_mario_action_arg(
            id,
            action::ACT_FALL_AFTER_STAR_GRAB,
            if exit_level { 0 } else { 1 },
        );
        Ok(())
    }

    /// Restore a quarter wedge of health on each of the next `heal_counter`
    /// engine frames
    pub fn heal(&mut self, heal_counter: u8) -> Sm64Result<()> {
        let id = self.live_id()?;
        self.engine.get()?.mario_heal(id, heal_counter);
        Ok(())
    }

    /// Set raw health; `action::FULL_HEALTH` is eight wedges
    pub fn set_health(&mut self, health: u16) -> Sm64Result<()> {
        let id = self.live_id()?;
        self.engine.get()?.set_mario_health(id, health);
        Ok(())
    }

    /// Ignore damage for `frames` engine frames
    pub fn set_invincibility(&mut self, frames: i16) -> Sm64Result<()> {
        let id = self.live_id()?;
        self.engine.get()?.set_mario_invincibility(id, frames);
        Ok(())
    }

    /// Lengthen an active cap power-up by `frames` engine frames
    pub fn extend_cap(&mut self, frames: u16) -> Sm64Result<()> {
        let id = self.live_id()?;
        self.engine.get()?.mario_extend_cap(id, frames);
        Ok(())
    }

    /// Whether the character's current attack hits a host object standing
    /// at `target` that is `height` host units tall
    pub fn attack(&mut self, target: Vec3, height: f32) -> Sm64Result<bool> {
        let id = self.live_id()?;
        let hit = self.engine.get()?.mario_attack(
            id,
            space::to_engine_position(target),
            height * space::HOST_TO_SM64,
        );
        Ok(hit)
    }

    /// Water surface at host height `z`
    pub fn set_water_level(&mut self, z: f32) -> Sm64Result<()> {
        let id = self.live_id()?;
        self.engine.get()?.set_mario_water_level(id, engine_height(z));
        Ok(())
    }

    /// Poison gas surface at host height `z`
    pub fn set_gas_level(&mut self, z: f32) -> Sm64Result<()> {
        let id = self.live_id()?;
        self.engine.get()?.set_mario_gas_level(id, engine_height(z));
        Ok(())
    }

    /// Kill the character once its host position drops below `z`
    pub fn set_death_plane(&mut self, z: Option<f32>) {
        self.death_plane = z;
    }

    // ------------------------------------------------------------------------
    // Read-outs
    // ------------------------------------------------------------------------

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Engine handle, `INVALID_MARIO_ID` unless spawned
    pub fn mario_id(&self) -> i32 {
        self.mario_id
    }

    /// Host-space position as of the last tick
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Host units per second as of the last tick
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Host facing angle in `[0, 2pi)`
    pub fn facing(&self) -> f32 {
        self.facing
    }

    pub fn facing_vector(&self) -> Vec2 {
        Vec2::from_angle(self.facing)
    }

    pub fn health(&self) -> i16 {
        self.state.health
    }

    pub fn is_dead(&self) -> bool {
        self.lifecycle != Lifecycle::Uninitialized && action::is_dead_health(self.state.health)
    }

    pub fn action(&self) -> u32 {
        self.state.action
    }

    pub fn flags(&self) -> MarioFlags {
        MarioFlags::from_bits_truncate(self.state.flags)
    }

    pub fn is_star_dancing(&self) -> bool {
        action::is_star_dance(self.state.action)
    }

    pub fn in_cutscene(&self) -> bool {
        self.in_cutscene
    }

    /// Engine ticks performed, the spawn tick included
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Raw engine state from the last tick
    pub fn state(&self) -> &MarioState {
        &self.state
    }

    /// Engine-space mesh from the last tick
    pub fn mesh(&self) -> &MarioMesh {
        &self.mesh
    }

    pub fn host_vertices(&self) -> impl Iterator<Item = HostVertex> + '_ {
        host_vertices(&self.mesh)
    }

    pub fn audio(&self) -> Option<&AudioProducer> {
        self.audio.as_ref()
    }
}

/// Engine liquid level for a host height
fn engine_height(z: f32) -> i32 {
    (z * space::HOST_TO_SM64) as i32
}

impl Drop for MarioPlayer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for MarioPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarioPlayer")
            .field("lifecycle", &self.lifecycle)
            .field("mario_id", &self.mario_id)
            .field("position", &self.position)
            .field("ticks", &self.ticks)
            .finish()
    }
}
