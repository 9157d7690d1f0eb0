//! SM64 Demo - Headless host loop
//!
//! Runs a Mario inside a 60Hz frame loop:
//! - Loads a flat level with a death plane and one moving platform
//! - Steers the character around a circle and jumps periodically
//! - Feeds engine audio into the sample queue (and a device with `device`)

use anyhow::{Context, Result};
use clap::Parser;
use sm64_audio::{queued_latency_ms, AudioConsumer, AudioProducer, AudioQueue};
use sm64_common::{
    space, AudioConfig, CameraState, GroundBounds, HostInput, PlayerConfig, Vec2, Vec3,
};
use sm64_engine::{
    host_transform, CollisionMeshBuilder, DynamicCollisionMesh, Sm64Context, StubEngine, SurfaceType,
    TerrainType,
};
use sm64_player::MarioPlayer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const HOST_FRAME: Duration = Duration::from_micros(16_667);
const DEATH_PLANE_Z: f32 = -50.0;

#[derive(Parser, Debug)]
#[command(name = "sm64-demo")]
#[command(about = "Drive a libsm64 Mario from a 60Hz host loop", long_about = None)]
struct Args {
    /// Super Mario 64 (US) ROM; without one the stub engine is used
    #[arg(short, long)]
    rom: Option<PathBuf>,

    /// How long to run, in seconds
    #[arg(short, long, default_value_t = 10.0)]
    seconds: f32,

    /// Spawn height above the floor, in host units
    #[arg(long, default_value_t = 20.0)]
    spawn_height: f32,

    /// Half extent of the square floor, in host units
    #[arg(long, default_value_t = 150.0)]
    floor_size: f32,

    /// Don't produce audio
    #[arg(long)]
    no_audio: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn create_context(rom: Option<&Path>) -> Result<Sm64Context> {
    match rom {
        #[cfg(feature = "native")]
        Some(path) => {
            let rom = std::fs::read(path).with_context(|| format!("Failed to read ROM {}", path.display()))?;
            let context = Sm64Context::init(Arc::new(sm64_engine::NativeEngine::new()), &rom)?;
            info!("Using native libsm64");
            Ok(context)
        }
        #[cfg(not(feature = "native"))]
        Some(path) => {
            warn!("Built without the native feature, ignoring ROM {}", path.display());
            Ok(Sm64Context::init_headless(Arc::new(StubEngine::new()))?)
        }
        None => {
            info!("No ROM given, using the stub engine");
            Ok(Sm64Context::init_headless(Arc::new(StubEngine::new()))?)
        }
    }
}

/// Square floor at host z = 0 plus a death plane under it
fn load_level(context: &Sm64Context, half: f32) -> usize {
    let corners = [
        Vec3::new(-half, -half, 0.0),
        Vec3::new(half, -half, 0.0),
        Vec3::new(-half, half, 0.0),
        Vec3::new(half, half, 0.0),
    ];

    let mut builder = CollisionMeshBuilder::with_capacity(4);
    builder
        .add_host_triangle(SurfaceType::DEFAULT, TerrainType::GRASS, corners[0], corners[1], corners[2])
        .add_host_triangle(SurfaceType::DEFAULT, TerrainType::GRASS, corners[3], corners[2], corners[1])
        .add_death_plane(
            GroundBounds::new(Vec2::new(-half, -half), Vec2::new(half, half)),
            DEATH_PLANE_Z,
        );
    builder.build_static(context.engine())
}

/// Small raised platform that slides back and forth
fn create_platform(context: &Sm64Context, at: Vec3) -> Result<DynamicCollisionMesh> {
    let s = 15.0;
    let mut builder = CollisionMeshBuilder::with_capacity(2);
    builder
        .add_host_triangle(
            SurfaceType::DEFAULT,
            TerrainType::STONE,
            Vec3::new(-s, -s, 0.0),
            Vec3::new(s, -s, 0.0),
            Vec3::new(-s, s, 0.0),
        )
        .add_host_triangle(
            SurfaceType::DEFAULT,
            TerrainType::STONE,
            Vec3::new(s, s, 0.0),
            Vec3::new(-s, s, 0.0),
            Vec3::new(s, -s, 0.0),
        );
    let platform = builder.build_dynamic(context.handle(), host_transform(at))?;
    Ok(platform)
}

/// Host controls for one frame: walk a circle, jump every three seconds
fn scripted_input(frame: u64) -> HostInput {
    let t = frame as f32 / space::HOST_FRAME_HZ;
    HostInput {
        stick: Vec2::from_angle(t),
        jump: frame % 180 == 90,
        ..Default::default()
    }
}

fn chase_camera(player: &MarioPlayer) -> CameraState {
    let target = player.position();
    let behind = player.facing_vector();
    let position = Vec3::new(target.x - behind.x * 40.0, target.y - behind.y * 40.0, target.z + 20.0);
    CameraState::new(position, target)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("SM64 Demo starting...");
    info!("  Duration: {}s", args.seconds);
    info!("  Floor: {0}x{0} host units", args.floor_size * 2.0);
    info!("  Audio: {}", if args.no_audio { "off" } else { "on" });

    let context = create_context(args.rom.as_deref())?;
    let surfaces = load_level(&context, args.floor_size);
    info!("Loaded {} static surfaces", surfaces);

    let platform_home = Vec3::new(args.floor_size * 0.5, 0.0, 10.0);
    let mut platform = create_platform(&context, platform_home)?;

    let audio_config = AudioConfig::default();
    let queue = AudioQueue::from(&audio_config);

    let mut player = MarioPlayer::new(&context, PlayerConfig::default());
    if !args.no_audio {
        player.attach_audio(AudioProducer::new(queue.clone(), &audio_config));
    }
    player.set_death_plane(Some(DEATH_PLANE_Z));
    player
        .added(Vec3::new(0.0, 0.0, args.spawn_height))
        .context("Failed to spawn Mario")?;

    #[cfg(feature = "device")]
    let mut device = if args.no_audio {
        None
    } else {
        let mut device = sm64_audio::AudioPlayer::new((&audio_config).into(), queue.clone());
        match device.start() {
            Ok(()) => Some(device),
            Err(e) => {
                warn!("Audio output unavailable: {}", e);
                None
            }
        }
    };
    #[cfg(feature = "device")]
    let drain_locally = device.is_none();
    #[cfg(not(feature = "device"))]
    let drain_locally = true;

    // Without a device, pull one host frame of samples per frame
    let consumer = AudioConsumer::new(queue.clone());
    let samples_per_frame =
        (audio_config.sample_rate as f32 * audio_config.channels as f32 / space::HOST_FRAME_HZ) as usize;
    let mut sink = vec![0i16; samples_per_frame];

    let total_frames = (args.seconds * space::HOST_FRAME_HZ) as u64;
    let start = Instant::now();
    let mut next_frame = start;

    for frame in 0..total_frames {
        let t = frame as f32 / space::HOST_FRAME_HZ;
        platform.move_to_host(platform_home + Vec3::new(0.0, (t * 0.8).sin() * 40.0, 0.0))?;

        let input = scripted_input(frame);
        let camera = chase_camera(&player);
        player.update(&input, &camera)?;

        for sound in context.drain_sounds() {
            debug!(
                "Sound {:#010x} (bank {}, id {:#04x}) at {:?}",
                sound.bits,
                sound.bank(),
                sound.id(),
                sound.position.map(space::to_host_position)
            );
        }

        if !args.no_audio && drain_locally {
            consumer.fill(&mut sink);
        }

        if frame % 60 == 0 {
            info!(
                "t={:>5.1}s pos {} facing {:.2} action {:#010x} health {:#06x} audio {:.0}ms",
                t,
                player.position(),
                player.facing(),
                player.action(),
                player.health(),
                queued_latency_ms(&audio_config, queue.len())
            );
        }

        if player.is_dead() {
            warn!("Mario died at {}", player.position());
            break;
        }

        next_frame += HOST_FRAME;
        let now = Instant::now();
        if next_frame > now {
            std::thread::sleep(next_frame - now);
        } else {
            next_frame = now;
        }
    }

    let elapsed = start.elapsed();
    info!(
        "Ran {} engine ticks in {:.1}s",
        player.ticks(),
        elapsed.as_secs_f32()
    );

    #[cfg(feature = "device")]
    if let Some(device) = device.as_mut() {
        let stats = device.stats();
        info!(
            "Playback: {} callbacks, {} samples, {} underruns",
            stats.callbacks, stats.samples_played, stats.underruns
        );
        device.stop();
    }
    if drain_locally {
        let stats = consumer.stats();
        info!(
            "Drained {} samples in {} pulls ({} underruns)",
            stats.samples_played, stats.callbacks, stats.underruns
        );
    }

    // Characters and meshes go before the context
    player.dispose();
    drop(player);
    drop(platform);
    drop(context);

    info!("Demo finished");
    Ok(())
}
