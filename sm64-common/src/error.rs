//! Error types for the Mario bridge

use thiserror::Error;

/// Main error type for bridge operations
#[derive(Error, Debug)]
pub enum Sm64Error {
    #[error("ROM checksum mismatch (expected {expected}, got {actual}); use the .z64 (big-endian) USA ROM")]
    RomChecksum { expected: String, actual: String },

    #[error("Engine already initialized")]
    AlreadyInitialized,

    #[error("Failed to create Mario at ({x}, {y}, {z}): no floor has been loaded under the spawn point")]
    NoFloor { x: f32, y: f32, z: f32 },

    #[error("Character not spawned")]
    NotSpawned,

    #[error("Character already spawned")]
    AlreadySpawned,

    #[error("Character already disposed")]
    Disposed,

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AudioError> for Sm64Error {
    fn from(e: AudioError) -> Self {
        Sm64Error::Audio(e.to_string())
    }
}

/// Result type alias for bridge operations
pub type Sm64Result<T> = Result<T, Sm64Error>;

/// Audio-specific errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio device not found")]
    DeviceNotFound,

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Audio playback error: {0}")]
    Playback(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_converts() {
        let err: Sm64Error = AudioError::DeviceNotFound.into();
        assert!(matches!(err, Sm64Error::Audio(ref msg) if msg == "Audio device not found"));
    }

    #[test]
    fn test_no_floor_message_names_position() {
        let err = Sm64Error::NoFloor { x: 0.0, y: 1000.0, z: 0.0 };
        assert!(err.to_string().contains("(0, 1000, 0)"));
    }
}
