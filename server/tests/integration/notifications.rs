// fps_bot_core/server/tests/integration/notifications.rs
mod common;

use common::Arena;
use fps_bot_core::core::config::{BehaviorTuning, BotManagerConfig, BotTuning};
use fps_bot_core::core::constants::ATTACK_TIME_FROM_EVENT_MS;
use fps_bot_core::core::types::{EntityHandle, EntityKind, EventKind, NoticeEvent, Team, Vec3};
use fps_bot_core::systems::ai::states::BotStateKind;
use fps_bot_core::world::WorldQuery;
use fps_bot_core::TickPhase;
use tracing::info;

const WEAPON_FIRE_RADIUS: f32 = 2048.0;

fn dispatch(arena: &mut Arena) -> usize {
    arena.manager.dispatch_notifications(&arena.world, &mut arena.host)
}

/// Repeats a broadcast until `done` holds; hearing is probabilistic.
fn broadcast_until(
    arena: &mut Arena,
    position: Vec3,
    kind: EventKind,
    originator: EntityHandle,
    radius: f32,
    mut done: impl FnMut(&Arena) -> bool,
) -> bool {
    for attempt in 0..30 {
        arena.manager.notifier().broadcast(position, kind, originator, radius);
        dispatch(arena);
        if done(arena) {
            info!("[Test] {:?} noticed after {} broadcasts", kind, attempt + 1);
            return true;
        }
    }
    false
}

#[test]
fn test_far_minor_event_is_ignored() {
    let mut arena = Arena::new(1);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.5);
    let noise = arena.world.spawn(EntityKind::Other, Vec3::new(2000.0, 0.0, 0.0));

    for _ in 0..20 {
        arena.manager.notifier().notice(
            bot,
            NoticeEvent {
                position: Vec3::new(2000.0, 0.0, 0.0),
                kind: EventKind::Misc,
                originator: noise,
                distance_squared: 2000.0 * 2000.0,
                radius_squared: 1000.0 * 1000.0,
            },
        );
    }
    assert_eq!(dispatch(&mut arena), 20);
    assert!(arena.bot(bot).perception().curiosity().is_none());
    assert!(arena.bot(bot).perception().enemy_handle().is_none());
}

#[test]
fn test_weapon_fire_behind_cover_engages_the_shooter() {
    let mut arena = Arena::new(2);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.5);
    let shooter = arena.add_dummy(Team::Axis, Vec3::new(500.0, 0.0, 0.0));
    arena.world.set_sight_blocked(bot, shooter, true);

    let engaged = broadcast_until(&mut arena, Vec3::new(500.0, 0.0, 0.0), EventKind::WeaponFire, shooter, WEAPON_FIRE_RADIUS, |a| {
        a.bot(bot).perception().enemy_handle().is_some()
    });
    assert!(engaged, "shooter was never heard");
    assert_eq!(arena.bot(bot).perception().enemy_handle(), Some(shooter));
    assert_eq!(
        arena.bot(bot).perception().attack_active_until(),
        Some(arena.now() + ATTACK_TIME_FROM_EVENT_MS)
    );

    arena.tick();
    assert_eq!(arena.bot(bot).state(), Some(BotStateKind::Attack));
}

#[test]
fn test_teammate_fire_is_ignored() {
    let mut arena = Arena::new(3);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.5);
    let mate = arena.add_dummy(Team::Allies, Vec3::new(300.0, 0.0, 0.0));

    for _ in 0..20 {
        arena.manager.notifier().broadcast(Vec3::new(300.0, 0.0, 0.0), EventKind::WeaponFire, mate, WEAPON_FIRE_RADIUS);
    }
    dispatch(&mut arena);
    assert!(arena.bot(bot).perception().enemy_handle().is_none());
    assert!(arena.bot(bot).perception().curiosity().is_none());
}

#[test]
fn test_curiosity_walks_to_the_noise_then_settles() {
    let mut arena = Arena::new(4);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.5);
    let target = Vec3::new(400.0, 0.0, 0.0);
    let noise = arena.world.spawn(EntityKind::Other, target);

    let curious = broadcast_until(&mut arena, target, EventKind::Misc, noise, 2000.0, |a| {
        a.bot(bot).perception().curiosity().is_some()
    });
    assert!(curious, "noise was never heard");

    arena.tick();
    assert_eq!(arena.bot(bot).state(), Some(BotStateKind::Curious));

    let arrived = arena.run_until(200, |a| a.bot(bot).perception().curiosity().is_none());
    assert!(arrived, "agent never reached the noise");
    let origin = arena.world.entity(bot).expect("bot entity").origin;
    assert!(origin.distance_squared(target) <= 48.0 * 48.0, "stopped at {:?}", origin);

    let settled = arena.run_until(40, |a| a.bot(bot).state() == Some(BotStateKind::Idle));
    assert!(settled);
}

#[test]
fn test_death_and_respawn_lifecycle() {
    let mut arena = Arena::new(5);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.5);
    let killer = arena.add_dummy(Team::Axis, Vec3::new(300.0, 0.0, 0.0));
    arena.tick();
    assert_eq!(arena.bot(bot).perception().enemy_handle(), Some(killer));

    let own_origin = arena.world.entity(bot).expect("bot entity").origin;
    arena.world.set_dead(bot, true);
    arena.manager.notifier().killed(bot, Some(killer));
    dispatch(&mut arena);

    let death_pos = arena.bot(bot).last_death_pos().expect("death point recorded");
    assert!(death_pos == own_origin || death_pos == Vec3::new(300.0, 0.0, 0.0));
    assert!(arena.host.primary_requests.contains(&bot));

    let outputs = arena.tick();
    assert_eq!(Arena::output_for(&outputs, bot).phase, TickPhase::Dead);

    arena.world.set_dead(bot, false);
    arena.manager.notifier().spawned(bot);
    dispatch(&mut arena);
    let controller = arena.bot(bot);
    assert!(controller.perception().enemy_handle().is_none());
    assert!(controller.perception().curiosity().is_none());
    assert_eq!(controller.command().buttons, 0);
    assert_eq!(controller.last_death_pos(), Some(death_pos));
}

#[test]
fn test_kill_credit_taunts_once_per_delay() {
    let config = BotManagerConfig {
        rng_seed: Some(6),
        tuning: BotTuning {
            behavior: BehaviorTuning { taunt_chance: 1.0, ..BehaviorTuning::default() },
            ..BotTuning::default()
        },
        ..BotManagerConfig::default()
    };
    let mut arena = Arena::with_config(config);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.5);
    let victim = arena.add_dummy(Team::Axis, Vec3::new(300.0, 0.0, 0.0));
    arena.tick();

    arena.manager.notifier().got_kill(bot, victim);
    arena.manager.notifier().got_kill(bot, victim);
    dispatch(&mut arena);

    assert!(arena.bot(bot).perception().enemy_handle().is_none());
    assert_eq!(arena.host.messages.len(), 1);
    let (sender, text) = &arena.host.messages[0];
    assert_eq!(*sender, bot);
    assert!(arena.manager.config().taunts.contains(text));
}

#[test]
fn test_stuffed_text_only_reaches_console_commands() {
    let mut arena = Arena::new(7);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.5);
    arena.host.failing_commands.insert("kill".to_string());

    let notifier = arena.manager.notifier();
    notifier.stuff_text(bot, "say \"hold the bridge\" now");
    notifier.stuff_text(bot, "noclip");
    notifier.stuff_text(bot, "fly_away");
    notifier.stuff_text(bot, "say \"unterminated");
    notifier.stuff_text(bot, "kill");
    assert_eq!(dispatch(&mut arena), 5);

    assert_eq!(arena.host.console_commands_for(bot), vec!["say"]);
    let (_, _, args) = &arena.host.console_log[0];
    assert_eq!(args, &vec!["hold the bridge".to_string(), "now".to_string()]);
}

#[test]
fn test_notifications_from_other_threads_are_applied_next_frame() {
    let mut arena = Arena::new(8);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.5);
    let noise = arena.world.spawn(EntityKind::Other, Vec3::new(9000.0, 0.0, 0.0));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let notifier = arena.manager.notifier();
            std::thread::spawn(move || {
                for _ in 0..10 {
                    notifier.broadcast(Vec3::new(9000.0, 0.0, 0.0), EventKind::MiscLoud, noise, 500.0);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("notifier thread panicked");
    }

    assert_eq!(arena.manager.notifier().pending(), 40);
    arena.tick();
    assert_eq!(arena.manager.notifier().pending(), 0);
    assert!(arena.bot(bot).perception().curiosity().is_none());
}
