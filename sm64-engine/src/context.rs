//! Global engine context
//!
//! libsm64 keeps one set of globals per process. `Sm64Context` owns them
//! from `global_init` to `global_terminate` and is the only way to reach an
//! engine handle, so nothing can run against an uninitialized engine.
//! Handles go stale when their context is dropped.

use crate::engine::Engine;
use crate::registry::{self, RegistryHandle, SoundEvent};
use crossbeam_channel::{bounded, Receiver};
use md5::{Digest, Md5};
use sm64_common::{space, Sm64Error, Sm64Result, Vec3};
use std::sync::Arc;
use tracing::{debug, info};

/// MD5 of the USA big-endian (.z64) ROM
pub const ROM_MD5: &str = "20b854b239203baf6c961b850a4a51a2";

/// Mario texture atlas dimensions (11 tiles of 64x64, RGBA)
pub const TEXTURE_WIDTH: usize = 64 * 11;
pub const TEXTURE_HEIGHT: usize = 64;
pub const TEXTURE_BYTES: usize = 4 * TEXTURE_WIDTH * TEXTURE_HEIGHT;

const SOUND_QUEUE_DEPTH: usize = 256;

/// Check a ROM image against the expected checksum
pub fn verify_rom(rom: &[u8]) -> Sm64Result<()> {
    let actual = format!("{:x}", Md5::digest(rom));
    if actual != ROM_MD5 {
        return Err(Sm64Error::RomChecksum {
            expected: ROM_MD5.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Engine access tied to the context that issued it
///
/// Stays stale once that context is dropped, even while a newer context is
/// live on the same engine.
#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<dyn Engine>,
    generation: u64,
}

impl EngineHandle {
    pub fn is_live(&self) -> bool {
        registry::is_generation_live(self.generation)
    }

    /// The engine, or `Disposed` once the issuing context is gone
    pub fn get(&self) -> Sm64Result<&dyn Engine> {
        if self.is_live() {
            Ok(self.engine.as_ref())
        } else {
            Err(Sm64Error::Disposed)
        }
    }

    /// Registry generation of the issuing context
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("generation", &self.generation)
            .field("live", &self.is_live())
            .finish()
    }
}

pub struct Sm64Context {
    engine: Arc<dyn Engine>,
    texture: Vec<u8>,
    registration: RegistryHandle,
    sounds: Receiver<SoundEvent>,
}

impl Sm64Context {
    /// Verify the ROM and initialize the engine globals
    pub fn init(engine: Arc<dyn Engine>, rom: &[u8]) -> Sm64Result<Self> {
        verify_rom(rom)?;
        Self::start(engine, rom)
    }

    /// Initialize an engine that carries its own assets
    pub fn init_headless(engine: Arc<dyn Engine>) -> Sm64Result<Self> {
        if engine.requires_rom() {
            return Err(Sm64Error::Engine(
                "this engine needs a ROM image; use Sm64Context::init".to_string(),
            ));
        }
        Self::start(engine, &[])
    }

    fn start(engine: Arc<dyn Engine>, rom: &[u8]) -> Sm64Result<Self> {
        let (tx, sounds) = bounded(SOUND_QUEUE_DEPTH);
        let registration = registry::register(tx)?;

        engine.register_callbacks(registry::debug_print_trampoline, registry::play_sound_trampoline);

        let mut texture = vec![0u8; TEXTURE_BYTES];
        engine.global_init(rom, &mut texture);
        engine.audio_init(rom);

        info!(
            "Engine initialized ({}x{} texture, registry generation {})",
            TEXTURE_WIDTH,
            TEXTURE_HEIGHT,
            registration.generation()
        );

        Ok(Self {
            engine,
            texture,
            registration,
            sounds,
        })
    }

    /// The engine for calls made while the context is borrowed
    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    /// Engine access for characters and meshes that outlive a borrow
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            engine: Arc::clone(&self.engine),
            generation: self.registration.generation(),
        }
    }

    /// RGBA texture atlas written by `global_init`
    pub fn texture(&self) -> &[u8] {
        &self.texture
    }

    pub fn play_sound_global(&self, sound_bits: i32) {
        self.engine.play_sound_global(sound_bits);
    }

    /// Play a sound from a host-space position
    pub fn play_sound(&self, sound_bits: i32, position: Vec3) {
        self.engine.play_sound(sound_bits, space::to_engine_position(position));
    }

    /// Sounds the engine requested since the last drain
    pub fn drain_sounds(&self) -> Vec<SoundEvent> {
        self.sounds.try_iter().collect()
    }
}

impl Drop for Sm64Context {
    fn drop(&mut self) {
        self.engine.global_terminate();
        registry::unregister(&self.registration);
        debug!("Engine terminated");
    }
}

impl std::fmt::Debug for Sm64Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sm64Context")
            .field("registration", &self.registration)
            .field("texture_bytes", &self.texture.len())
            .finish()
    }
}
