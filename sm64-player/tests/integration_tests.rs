//! Rate adapter scenarios against the stub engine

use parking_lot::{Mutex, MutexGuard};
use sm64_audio::{AudioProducer, AudioQueue};
use sm64_common::{space, AudioConfig, CameraState, HostInput, PlayerConfig, Sm64Error, Sm64Vec3, Vec2, Vec3};
use sm64_engine::action::{self, MarioFlags};
use sm64_engine::stub::{StubEngine, STUB_GAS_DAMAGE, STUB_JUMP_SOUND, STUB_MESH_TRIANGLES, STUB_SINK_VELOCITY};
use sm64_engine::{CollisionMeshBuilder, Engine, Sm64Context, SurfaceType, TerrainType, INVALID_MARIO_ID};
use sm64_player::{Lifecycle, MarioPlayer};
use std::sync::Arc;

static SERIAL: Mutex<()> = parking_lot::const_mutex(());

/// One live context at a time per process
fn setup() -> (MutexGuard<'static, ()>, Arc<StubEngine>, Sm64Context) {
    let guard = SERIAL.lock();
    let engine = Arc::new(StubEngine::new());
    let context = Sm64Context::init_headless(engine.clone()).unwrap();
    (guard, engine, context)
}

fn load_floor(engine: &dyn Engine, half: f32) {
    let mut builder = CollisionMeshBuilder::new();
    builder.add_quad(
        SurfaceType::DEFAULT,
        TerrainType::GRASS,
        Sm64Vec3::new(-half, 0.0, half),
        Sm64Vec3::new(half, 0.0, half),
        Sm64Vec3::new(-half, 0.0, -half),
        Sm64Vec3::new(half, 0.0, -half),
    );
    builder.build_static(engine);
}

fn spawned(context: &Sm64Context, engine: &StubEngine) -> MarioPlayer {
    load_floor(engine, 5000.0);
    let mut player = MarioPlayer::new(context, PlayerConfig::default());
    player.added(Vec3::new(0.0, 0.0, 10.0)).unwrap();
    player
}

fn idle() -> HostInput {
    HostInput::default()
}

fn camera() -> CameraState {
    CameraState::new(Vec3::new(0.0, -30.0, 20.0), Vec3::ZERO)
}

fn run(player: &mut MarioPlayer, input: &HostInput, frames: usize) {
    for _ in 0..frames {
        player.update(input, &camera()).unwrap();
    }
}

#[test]
fn test_spawn_stands_on_single_floor_triangle() {
    let (_guard, engine, context) = setup();

    let mut builder = CollisionMeshBuilder::new();
    builder.add_triangle(
        SurfaceType::DEFAULT,
        TerrainType::GRASS,
        Sm64Vec3::new(-1000.0, 0.0, 1000.0),
        Sm64Vec3::new(2000.0, 0.0, 1000.0),
        Sm64Vec3::new(-1000.0, 0.0, -2000.0),
    );
    builder.build_static(engine.as_ref());

    let mut player = MarioPlayer::new(&context, PlayerConfig::default());
    let spawn = space::to_host_position(Sm64Vec3::new(0.0, 1000.0, 0.0));
    player.added(spawn).unwrap();

    assert_eq!(player.lifecycle(), Lifecycle::Spawned);
    assert_eq!(player.ticks(), 1);
    let floor_z = 0.0;
    let z = player.position().z;
    assert!(z >= floor_z && z <= floor_z + 0.01, "host z {} not on floor", z);
    assert_eq!(engine.stats().mario_ticks, 1);
}

#[test]
fn test_spawn_without_floor_is_fatal() {
    let (_guard, engine, context) = setup();

    let mut player = MarioPlayer::new(&context, PlayerConfig::default());
    let err = player.added(Vec3::new(0.0, 0.0, 75.0)).unwrap_err();
    assert!(matches!(err, Sm64Error::NoFloor { .. }));
    assert_eq!(player.lifecycle(), Lifecycle::Uninitialized);
    assert_eq!(player.position(), Vec3::new(0.0, 0.0, 75.0));
    assert_eq!(engine.stats().mario_ticks, 0);

    assert!(matches!(player.update(&idle(), &camera()), Err(Sm64Error::NotSpawned)));
}

#[test]
fn test_tick_parity_alternates() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);

    let frames = 101;
    let mut outcomes = Vec::new();
    for _ in 0..frames {
        outcomes.push(player.update(&idle(), &camera()).unwrap().ticked);
    }

    assert_eq!(player.lifecycle(), Lifecycle::Ticking);
    // The spawn tick counts as a tick, so the first host frame skips
    assert!(!outcomes[0]);
    for pair in outcomes.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
    let ticked = outcomes.iter().filter(|&&t| t).count();
    assert_eq!(ticked, frames / 2);
    assert_eq!(player.ticks(), 1 + ticked as u64);
    assert_eq!(engine.stats().mario_ticks, player.ticks());
}

#[test]
fn test_skip_frames_hold_kinematics() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);

    let input = HostInput {
        stick: Vec2::new(1.0, 0.0),
        ..Default::default()
    };
    let mut last = player.position();
    for _ in 0..20 {
        let outcome = player.update(&input, &camera()).unwrap();
        if outcome.ticked {
            assert_ne!(player.position(), last);
        } else {
            assert_eq!(player.position(), last);
        }
        last = player.position();
    }
}

#[test]
fn test_velocity_carries_engine_time_base() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);

    let input = HostInput {
        stick: Vec2::new(0.0, 1.0),
        ..Default::default()
    };
    run(&mut player, &input, 4);
    let before = player.position();
    run(&mut player, &input, 2);
    let step = player.position() - before;

    // One engine tick of travel is 1/30 s at the reported velocity
    let expected = player.velocity() * (1.0 / 30.0);
    assert!((step - expected).length() < 1e-3, "{} vs {}", step, expected);
    assert!(player.velocity().length() > 1.0);
}

#[test]
fn test_dispose_releases_handle_once() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);
    run(&mut player, &idle(), 3);

    player.dispose();
    player.dispose();
    assert_eq!(player.lifecycle(), Lifecycle::Disposed);
    assert_eq!(engine.stats().marios_deleted, 1);
    assert_eq!(engine.stats().live_marios, 0);

    assert!(matches!(player.update(&idle(), &camera()), Err(Sm64Error::Disposed)));
    assert!(matches!(player.kill(), Err(Sm64Error::Disposed)));
    assert!(matches!(player.added(Vec3::ZERO), Err(Sm64Error::Disposed)));
    assert_eq!(player.host_vertices().count(), 0);

    drop(player);
    assert_eq!(engine.stats().marios_deleted, 1);
}

#[test]
fn test_drop_disposes() {
    let (_guard, engine, context) = setup();
    let player = spawned(&context, &engine);
    assert_eq!(engine.stats().live_marios, 1);
    drop(player);
    assert_eq!(engine.stats().marios_deleted, 1);
}

#[test]
fn test_second_spawn_rejected() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);
    assert!(matches!(player.added(Vec3::ZERO), Err(Sm64Error::AlreadySpawned)));
    assert_eq!(engine.stats().marios_created, 1);
}

#[test]
fn test_mesh_rewritten_in_host_space() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);

    assert_eq!(player.mesh().triangle_count(), STUB_MESH_TRIANGLES as usize);
    let apex = |p: &MarioPlayer| p.host_vertices().nth(2).map(|v| v.position);
    let first = apex(&player).unwrap();
    assert!((first.z - (player.position().z + 12.0)).abs() < 1e-3);

    let input = HostInput {
        stick: Vec2::new(1.0, 0.0),
        ..Default::default()
    };
    run(&mut player, &input, 2);
    let moved = apex(&player).unwrap();
    assert_ne!(first, moved);
    assert!((moved.x - player.position().x).abs() < 1e-3);
    assert_eq!(player.host_vertices().count(), STUB_MESH_TRIANGLES as usize * 3);
}

#[test]
fn test_audio_produced_on_tick_frames_only() {
    let (_guard, engine, context) = setup();
    load_floor(engine.as_ref(), 5000.0);

    let config = AudioConfig::default();
    let queue = AudioQueue::from(&config);
    let mut player = MarioPlayer::new(&context, PlayerConfig::default());
    player.attach_audio(AudioProducer::new(queue.clone(), &config));
    player.added(Vec3::ZERO).unwrap();

    let mut produced_ticks = vec![];
    for _ in 0..10 {
        let outcome = player.update(&idle(), &camera()).unwrap();
        produced_ticks.push((outcome.ticked, player.audio().map(|a| a.ticks())));
    }

    let producer = player.audio().unwrap();
    assert_eq!(producer.ticks(), player.ticks());
    assert_eq!(queue.len() as u64, producer.samples_produced());
    for (ticked, audio_ticks) in produced_ticks.windows(2).map(|w| (w[1].0, (w[0].1, w[1].1))) {
        let (before, after) = audio_ticks;
        assert_eq!(after.unwrap() - before.unwrap(), ticked as u64);
    }
}

#[test]
fn test_cutscene_edges() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);

    player.set_cutscene(true).unwrap();
    assert!(player.in_cutscene());
    let input = HostInput {
        stick: Vec2::new(1.0, 1.0),
        ..Default::default()
    };
    let start = player.position();
    run(&mut player, &input, 2);
    assert_eq!(player.action(), action::ACT_WAITING_FOR_DIALOG);
    assert_eq!(player.position(), start);

    // Repeating the same state is not an edge
    player.set_cutscene(true).unwrap();
    run(&mut player, &idle(), 2);
    assert_eq!(player.action(), action::ACT_WAITING_FOR_DIALOG);

    player.set_cutscene(false).unwrap();
    run(&mut player, &idle(), 2);
    assert_eq!(player.action(), action::ACT_IDLE);
    assert!(!player.in_cutscene());
}

#[test]
fn test_spring_then_stop() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);

    player.spring(30.0).unwrap();
    run(&mut player, &idle(), 2);
    assert_eq!(player.action(), action::ACT_TWIRLING);
    assert!(player.position().z > 0.0);
    assert!(player.velocity().z > 0.0);

    player.stop().unwrap();
    run(&mut player, &idle(), 2);
    assert_eq!(player.action(), action::ACT_FREEFALL);
    assert!(player.velocity().z <= 0.0);
    assert_eq!(player.velocity().truncate(), Vec2::ZERO);

    run(&mut player, &idle(), 60);
    assert_eq!(player.action(), action::ACT_IDLE);
    assert_eq!(player.position().z, 0.0);
}

#[test]
fn test_flight_inverts_stick() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);
    let input = HostInput {
        stick: Vec2::new(1.0, 0.0),
        ..Default::default()
    };

    run(&mut player, &input, 2);
    let walking = player.velocity().x;
    assert!(walking != 0.0);

    player.set_position(Vec3::new(0.0, 0.0, 500.0)).unwrap();
    engine.set_mario_action(player.mario_id(), action::ACT_FLYING);
    run(&mut player, &input, 2);
    assert_eq!(player.action(), action::ACT_FLYING);

    run(&mut player, &input, 2);
    let flying = player.velocity().x;
    assert_eq!(flying, -walking);
}

#[test]
fn test_death_plane_and_damage() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);

    let full = player.health();
    player.take_damage(2, Vec3::new(1.0, 0.0, 0.0)).unwrap();
    run(&mut player, &idle(), 2);
    assert_eq!(player.health(), full - 0x200);
    assert!(!player.is_dead());

    player.set_death_plane(Some(5.0));
    run(&mut player, &idle(), 4);
    assert!(player.is_dead());
}

#[test]
fn test_caps_facing_and_teleport() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);

    player.interact_cap(MarioFlags::WING_CAP).unwrap();
    player.set_facing(1.0).unwrap();
    player.set_position(Vec3::new(10.0, -20.0, 0.0)).unwrap();
    run(&mut player, &idle(), 2);

    assert!(player.flags().contains(MarioFlags::WING_CAP));
    assert!(space::angle_distance(player.facing(), 1.0) < 1e-4);
    let p = player.position();
    assert!((p - Vec3::new(10.0, -20.0, 0.0)).length() < 1e-3, "{}", p);
}

#[test]
fn test_star_grab_enters_dance() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);

    player.collect_star(Vec3::new(0.0, 0.0, 3.0), true).unwrap();
    run(&mut player, &idle(), 2);
    assert!(player.is_star_dancing());

    // Input is ignored during the sequence
    let input = HostInput {
        stick: Vec2::new(1.0, 0.0),
        ..Default::default()
    };
    run(&mut player, &input, 2);
    assert_eq!(player.velocity().truncate(), Vec2::ZERO);
}

#[test]
fn test_engine_sounds_reach_the_host() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);
    context.drain_sounds();

    let jump = HostInput {
        jump: true,
        ..Default::default()
    };
    run(&mut player, &jump, 2);

    let sounds = context.drain_sounds();
    assert_eq!(sounds.len(), 1);
    assert_eq!(sounds[0].bits, STUB_JUMP_SOUND);
    assert!(sounds[0].position.is_some());
    assert_eq!(player.action(), action::ACT_JUMP);
}

#[test]
fn test_player_outliving_context_is_abandoned() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);
    run(&mut player, &idle(), 2);
    let ticks = engine.stats().mario_ticks;

    drop(context);
    assert!(matches!(player.update(&idle(), &camera()), Err(Sm64Error::Disposed)));
    assert_eq!(player.lifecycle(), Lifecycle::Disposed);
    assert_eq!(player.mario_id(), INVALID_MARIO_ID);
    assert_eq!(player.mesh().triangle_count(), 0);
    assert!(matches!(player.kill(), Err(Sm64Error::Disposed)));

    drop(player);
    assert_eq!(engine.stats().mario_ticks, ticks);
    assert_eq!(engine.stats().marios_deleted, 0);
}

#[test]
fn test_stale_player_leaves_next_context_alone() {
    let (_guard, engine, first) = setup();
    let mut stale = spawned(&first, &engine);
    let stale_id = stale.mario_id();
    drop(first);

    let second = Sm64Context::init_headless(engine.clone()).unwrap();
    let mut live = spawned(&second, &engine);
    assert_eq!(live.mario_id(), stale_id);

    stale.dispose();
    drop(stale);
    assert_eq!(engine.stats().live_marios, 1);
    assert_eq!(engine.stats().marios_deleted, 0);

    run(&mut live, &idle(), 2);
    drop(live);
    assert_eq!(engine.stats().marios_deleted, 1);
}

#[test]
fn test_health_controls() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);

    player.take_damage(3, Vec3::ZERO).unwrap();
    player.heal(4).unwrap();
    run(&mut player, &idle(), 2);
    assert_eq!(player.health(), action::FULL_HEALTH - 0x300 + 0x40);
    run(&mut player, &idle(), 6);
    assert_eq!(player.health(), action::FULL_HEALTH - 0x200);

    player.set_invincibility(10).unwrap();
    player.take_damage(8, Vec3::ZERO).unwrap();
    run(&mut player, &idle(), 2);
    assert_eq!(player.health(), action::FULL_HEALTH - 0x200);
    assert_eq!(player.state().invinc_timer, 9);

    player.set_health(0x80).unwrap();
    run(&mut player, &idle(), 2);
    assert!(player.is_dead());
}

#[test]
fn test_cap_extension() {
    let (_guard, engine, context) = setup();
    load_floor(engine.as_ref(), 5000.0);
    let config = PlayerConfig {
        cap_time: 2,
        ..Default::default()
    };
    let mut player = MarioPlayer::new(&context, config);
    player.added(Vec3::new(0.0, 0.0, 10.0)).unwrap();

    player.interact_cap(MarioFlags::WING_CAP).unwrap();
    player.extend_cap(2).unwrap();
    run(&mut player, &idle(), 6);
    assert!(player.flags().contains(MarioFlags::WING_CAP));
    run(&mut player, &idle(), 2);
    assert!(!player.flags().has_cap_active());
}

#[test]
fn test_attack_reaches_nearby_objects() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);
    let near = Vec3::new(3.0, 0.0, 0.0);

    run(&mut player, &idle(), 2);
    assert!(!player.attack(near, 5.0).unwrap());

    let punch = HostInput {
        dash: true,
        ..Default::default()
    };
    run(&mut player, &punch, 2);
    assert!(player.attack(near, 5.0).unwrap());
    assert!(!player.attack(Vec3::new(30.0, 0.0, 0.0), 5.0).unwrap());
}

#[test]
fn test_water_and_gas_levels() {
    let (_guard, engine, context) = setup();
    let mut player = spawned(&context, &engine);

    player.set_water_level(200.0).unwrap();
    player.set_position(Vec3::new(0.0, 0.0, 100.0)).unwrap();
    let sink = space::to_host_velocity(Sm64Vec3::new(0.0, -STUB_SINK_VELOCITY, 0.0)).z;
    for _ in 0..10 {
        run(&mut player, &idle(), 2);
        assert!(player.velocity().z >= sink - 1e-3, "{}", player.velocity());
    }

    player.set_position(Vec3::ZERO).unwrap();
    player.set_water_level(-1000.0).unwrap();
    player.set_gas_level(50.0).unwrap();
    let before = player.health();
    run(&mut player, &idle(), 2);
    assert_eq!(player.health(), before - STUB_GAS_DAMAGE);
}
