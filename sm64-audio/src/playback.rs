//! Consumer side of the audio bridge
//!
//! The output callback pulls from the shared queue and pads any shortfall
//! with silence. With the `device` feature the queue is played through the
//! default cpal output device.

use crate::queue::AudioQueue;
use parking_lot::Mutex;
use sm64_common::AudioConfig;
use std::sync::Arc;

/// Audio playback configuration
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Device buffer size in frames; `None` lets the backend choose
    pub buffer_size: Option<u32>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: 32000,
            channels: 2,
            buffer_size: None,
        }
    }
}

impl From<&AudioConfig> for PlaybackConfig {
    fn from(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            ..Default::default()
        }
    }
}

/// Playback statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub callbacks: u64,
    pub samples_played: u64,
    /// Callbacks that had to pad with silence
    pub underruns: u64,
    /// Samples left in the queue after the last callback
    pub buffer_level: usize,
}

/// Fill an output buffer from the queue, padding with silence
///
/// Returns the number of real samples written.
pub fn fill_output(queue: &AudioQueue, out: &mut [i16], stats: &mut PlaybackStats) -> usize {
    let (copied, level) = {
        let mut queue = queue.lock();
        let copied = queue.dequeue(out);
        (copied, queue.len())
    };

    out[copied..].fill(0);

    stats.callbacks += 1;
    stats.samples_played += copied as u64;
    stats.buffer_level = level;
    if copied < out.len() {
        stats.underruns += 1;
    }
    copied
}

/// Pull side of the queue for hosts that own their own output stream
#[derive(Debug, Clone)]
pub struct AudioConsumer {
    queue: AudioQueue,
    stats: Arc<Mutex<PlaybackStats>>,
}

impl AudioConsumer {
    pub fn new(queue: AudioQueue) -> Self {
        Self {
            queue,
            stats: Arc::new(Mutex::new(PlaybackStats::default())),
        }
    }

    /// Output callback body
    pub fn fill(&self, out: &mut [i16]) -> usize {
        fill_output(&self.queue, out, &mut self.stats.lock())
    }

    pub fn stats(&self) -> PlaybackStats {
        self.stats.lock().clone()
    }

    pub fn queue(&self) -> &AudioQueue {
        &self.queue
    }
}

#[cfg(feature = "device")]
pub use device::AudioPlayer;

#[cfg(feature = "device")]
mod device {
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use sm64_common::{AudioError, Sm64Result};
    use tracing::{debug, error, info};

    /// Audio player using cpal
    pub struct AudioPlayer {
        config: PlaybackConfig,
        consumer: AudioConsumer,
        stream: Option<cpal::Stream>,
    }

    impl AudioPlayer {
        pub fn new(config: PlaybackConfig, queue: AudioQueue) -> Self {
            Self {
                config,
                consumer: AudioConsumer::new(queue),
                stream: None,
            }
        }

        /// List available audio output devices
        pub fn list_devices() -> Sm64Result<Vec<String>> {
            let host = cpal::default_host();
            let devices = host
                .output_devices()
                .map_err(|e| AudioError::Stream(format!("Failed to enumerate devices: {}", e)))?
                .filter_map(|d| d.name().ok())
                .collect();
            Ok(devices)
        }

        /// Start audio playback
        pub fn start(&mut self) -> Sm64Result<()> {
            if self.stream.is_some() {
                return Ok(());
            }

            info!(
                "Starting audio playback: {}Hz, {} channels",
                self.config.sample_rate, self.config.channels
            );

            let host = cpal::default_host();
            let device = host.default_output_device().ok_or(AudioError::DeviceNotFound)?;
            debug!("Using audio device: {:?}", device.name());

            let stream_config = cpal::StreamConfig {
                channels: self.config.channels,
                sample_rate: cpal::SampleRate(self.config.sample_rate),
                buffer_size: match self.config.buffer_size {
                    Some(frames) => cpal::BufferSize::Fixed(frames),
                    None => cpal::BufferSize::Default,
                },
            };

            let consumer = self.consumer.clone();
            let stream = device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        consumer.fill(data);
                    },
                    move |err| {
                        error!("Audio playback error: {}", err);
                    },
                    None,
                )
                .map_err(|e| AudioError::Stream(format!("Failed to build stream: {}", e)))?;

            stream
                .play()
                .map_err(|e| AudioError::Playback(format!("Failed to start stream: {}", e)))?;

            self.stream = Some(stream);
            info!("Audio playback started");
            Ok(())
        }

        /// Stop audio playback
        pub fn stop(&mut self) {
            if let Some(stream) = self.stream.take() {
                info!("Stopping audio playback");
                drop(stream);
            }
        }

        /// Stop, discard queued samples and start again
        pub fn restart(&mut self) -> Sm64Result<()> {
            self.stop();
            self.consumer.queue().clear();
            self.start()
        }

        /// Get playback statistics
        pub fn stats(&self) -> PlaybackStats {
            self.consumer.stats()
        }

        pub fn is_running(&self) -> bool {
            self.stream.is_some()
        }
    }

    impl Drop for AudioPlayer {
        fn drop(&mut self) {
            self.stop();
        }
    }
}
