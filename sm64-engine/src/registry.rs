//! Routing for engine callbacks
//!
//! libsm64 callbacks carry no user data, so the live context parks its
//! sound sink in a single process-wide slot. The `extern "C"` trampolines
//! resolve the slot on every call. Each registration gets a fresh
//! generation; a handle from an earlier registration never matches again.

use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;
use sm64_common::{Sm64Error, Sm64Result, Sm64Vec3};
use std::ffi::{c_char, CStr};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// A sound the engine asked the host to play
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundEvent {
    /// Packed sound id (bank, id, priority, flags)
    pub bits: u32,
    /// Engine-space source position, if the sound is positional
    pub position: Option<Sm64Vec3>,
}

impl SoundEvent {
    /// Sound bank in the top nibble
    pub fn bank(&self) -> u8 {
        (self.bits >> 28) as u8
    }

    /// Sound id within the bank
    pub fn id(&self) -> u8 {
        (self.bits >> 16) as u8
    }
}

/// Registration of the live context in the callback slot
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RegistryHandle(u64);

impl RegistryHandle {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

struct Sink {
    generation: u64,
    sounds: Sender<SoundEvent>,
}

static SLOT: Mutex<Option<Sink>> = parking_lot::const_mutex(None);
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Claim the callback slot for a new context
pub fn register(sounds: Sender<SoundEvent>) -> Sm64Result<RegistryHandle> {
    let mut slot = SLOT.lock();
    if slot.is_some() {
        return Err(Sm64Error::AlreadyInitialized);
    }

    let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
    *slot = Some(Sink { generation, sounds });
    debug!("Callback registry claimed (generation {})", generation);
    Ok(RegistryHandle(generation))
}

/// Release the slot if `handle` still owns it
pub fn unregister(handle: &RegistryHandle) -> bool {
    let mut slot = SLOT.lock();
    match slot.as_ref() {
        Some(sink) if sink.generation == handle.0 => {
            *slot = None;
            debug!("Callback registry released (generation {})", handle.0);
            true
        }
        _ => false,
    }
}

/// Whether `handle` is the current registration
pub fn is_live(handle: &RegistryHandle) -> bool {
    is_generation_live(handle.0)
}

/// Whether `generation` is the current registration
pub fn is_generation_live(generation: u64) -> bool {
    SLOT.lock().as_ref().map_or(false, |sink| sink.generation == generation)
}

fn dispatch_sound(event: SoundEvent) {
    let slot = SLOT.lock();
    let Some(sink) = slot.as_ref() else {
        trace!("Sound {:#010x} with no live context", event.bits);
        return;
    };

    match sink.sounds.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => trace!("Sound queue full, dropping {:#010x}", event.bits),
        Err(TrySendError::Disconnected(_)) => trace!("Sound receiver gone"),
    }
}

/// Debug-print callback handed to the engine
pub extern "C" fn debug_print_trampoline(message: *const c_char) {
    if message.is_null() {
        return;
    }
    // SAFETY: the engine passes a NUL-terminated string that outlives the call.
    let text = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    debug!(target: "libsm64", "{}", text.trim_end());
}

/// Play-sound callback handed to the engine
pub extern "C" fn play_sound_trampoline(sound_bits: u32, position: *mut f32) {
    let position = if position.is_null() {
        None
    } else {
        // SAFETY: a non-null position points at the engine's float[3].
        let p = unsafe { std::slice::from_raw_parts(position, 3) };
        Some(Sm64Vec3::new(p[0], p[1], p[2]))
    };
    dispatch_sound(SoundEvent { bits: sound_bits, position });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_sound_event_fields() {
        let event = SoundEvent { bits: 0x2400_8081, position: None };
        assert_eq!(event.bank(), 2);
        assert_eq!(event.id(), 0x00);

        let event = SoundEvent { bits: 0x2412_8081, position: None };
        assert_eq!(event.id(), 0x12);
    }

    #[test]
    fn test_register_route_unregister() {
        let _guard = crate::test_support::serial();

        let (tx, rx) = bounded(8);
        let handle = register(tx).unwrap();
        assert!(is_live(&handle));

        let (tx2, _rx2) = bounded(8);
        assert!(matches!(register(tx2), Err(Sm64Error::AlreadyInitialized)));

        let mut pos = [1.0f32, 2.0, 3.0];
        play_sound_trampoline(0x2400_8081, pos.as_mut_ptr());
        play_sound_trampoline(0x2410_8081, std::ptr::null_mut());

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].position, Some(Sm64Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(events[1].position, None);

        assert!(unregister(&handle));
        assert!(!unregister(&handle));
        assert!(!is_live(&handle));

        // Nothing routes once released
        play_sound_trampoline(0x2400_8081, std::ptr::null_mut());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stale_handle_never_resolves() {
        let _guard = crate::test_support::serial();

        let (tx, _rx) = bounded(1);
        let old = register(tx).unwrap();
        assert!(unregister(&old));

        let (tx, _rx) = bounded(1);
        let new = register(tx).unwrap();
        assert_ne!(old, new);
        assert!(!is_live(&old));
        assert!(!is_generation_live(old.generation()));
        assert!(is_generation_live(new.generation()));
        assert!(!unregister(&old));
        assert!(unregister(&new));
    }

    #[test]
    fn test_debug_print_tolerates_null() {
        debug_print_trampoline(std::ptr::null());
        let message = b"hello from the engine\n\0";
        debug_print_trampoline(message.as_ptr().cast());
    }
}
