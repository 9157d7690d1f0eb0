//! SM64 Engine - Safe access to libsm64
//!
//! Provides everything between the bridge and the native character engine:
//! - FFI layout and raw bindings (`sys`)
//! - The `Engine` trait with native and stub implementations
//! - The ROM-checked global context and callback routing
//! - Collision meshes, mesh buffers, action ids and flags

pub mod action;
pub mod collision;
pub mod context;
pub mod engine;
pub mod mesh;
pub mod registry;
pub mod stub;
pub mod sys;

pub use action::{ActionFlags, MarioFlags};
pub use collision::*;
pub use context::*;
pub use engine::*;
pub use mesh::*;
pub use registry::SoundEvent;
pub use stub::{StubEngine, StubStats};
pub use sys::{MarioInputs, MarioState, ObjectTransform, Surface, INVALID_MARIO_ID};

#[cfg(test)]
pub(crate) mod test_support {
    use parking_lot::{Mutex, MutexGuard};

    static SERIAL: Mutex<()> = parking_lot::const_mutex(());

    /// Serialize tests that claim the process-wide callback slot
    pub fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock()
    }
}
