//! Engine side of the audio bridge
//!
//! Runs on the simulation thread, once per engine tick.

use crate::queue::AudioQueue;
use sm64_common::AudioConfig;
use sm64_engine::{Engine, AUDIO_TICK_MAX_SAMPLES, SAMPLES_PER_AUDIO_FRAME};
use tracing::trace;

pub struct AudioProducer {
    queue: AudioQueue,
    scratch: Vec<i16>,
    channels: usize,
    desired_frames: u32,
    ticks: u64,
    samples_produced: u64,
}

impl AudioProducer {
    pub fn new(queue: AudioQueue, config: &AudioConfig) -> Self {
        Self {
            queue,
            scratch: vec![0; AUDIO_TICK_MAX_SAMPLES],
            channels: config.channels.max(1) as usize,
            desired_frames: config.desired_queued_frames,
            ticks: 0,
            samples_produced: 0,
        }
    }

    /// Run one engine audio tick and queue its output
    ///
    /// Returns the number of samples queued.
    pub fn produce(&mut self, engine: &dyn Engine) -> usize {
        let queued_frames = (self.queue.len() / self.channels) as u32;
        let written = engine.audio_tick(queued_frames, self.desired_frames, &mut self.scratch) as usize;
        let count = (written * SAMPLES_PER_AUDIO_FRAME).min(self.scratch.len());

        self.queue.enqueue(&self.scratch[..count]);
        self.ticks += 1;
        self.samples_produced += count as u64;

        trace!("Audio tick: {} queued frames, {} samples added", queued_frames, count);
        count
    }

    pub fn queue(&self) -> &AudioQueue {
        &self.queue
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn samples_produced(&self) -> u64 {
        self.samples_produced
    }
}

impl std::fmt::Debug for AudioProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioProducer")
            .field("channels", &self.channels)
            .field("desired_frames", &self.desired_frames)
            .field("ticks", &self.ticks)
            .field("samples_produced", &self.samples_produced)
            .finish()
    }
}
