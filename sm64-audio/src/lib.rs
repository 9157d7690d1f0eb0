//! SM64 Audio - Bridge between the engine audio tick and an output device
//!
//! - A circular sample queue shared under one lock by both threads
//! - The producer, driven once per engine tick on the simulation thread
//! - The consumer callback that pads shortfalls with silence
//! - Playback through cpal (`device` feature)

pub mod playback;
pub mod producer;
pub mod queue;

pub use playback::*;
pub use producer::*;
pub use queue::*;

use sm64_common::AudioConfig;

/// Interleaved samples for a duration in milliseconds
pub fn samples_for_ms(config: &AudioConfig, ms: u32) -> usize {
    config.sample_rate as usize * config.channels as usize * ms as usize / 1000
}

/// Playback time represented by a number of interleaved samples
pub fn queued_latency_ms(config: &AudioConfig, samples: usize) -> f64 {
    let frames = samples as f64 / config.channels.max(1) as f64;
    frames / config.sample_rate as f64 * 1000.0
}
