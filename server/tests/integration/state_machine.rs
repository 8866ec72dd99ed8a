// fps_bot_core/server/tests/integration/state_machine.rs
mod common;

use common::Arena;
use fps_bot_core::core::constants::{ATTACK_STATE_TRANSITION_DELAY_MS, MIN_STATE_TRANSITION_TIME_MS};
use fps_bot_core::core::types::{EntityHandle, Team, TimeMs, Vec3, COMBAT_BUTTONS};
use fps_bot_core::systems::ai::states::BotStateKind;
use fps_bot_core::TickPhase;
use tracing::info;

fn duel(seed: u64) -> (Arena, EntityHandle, EntityHandle) {
    let mut arena = Arena::new(seed);
    let allies = arena.add_bot(Team::Allies, Vec3::ZERO, 0.5);
    let axis = arena.add_bot(Team::Axis, Vec3::new(400.0, 0.0, 0.0), 0.5);
    info!("[Test Setup] Duel {} vs {} with seed {}", allies, axis, seed);
    (arena, allies, axis)
}

#[test]
fn test_attack_is_held_for_exit_delay_after_enemy_vanishes() {
    let mut arena = Arena::new(21);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.5);
    let enemy = arena.add_dummy(Team::Axis, Vec3::new(300.0, 0.0, 0.0));

    arena.tick();
    assert_eq!(arena.bot(bot).state(), Some(BotStateKind::Attack));
    let entered = arena.bot(bot).state_machine().last_transition().expect("attack was entered");
    assert_eq!(entered, arena.now());

    arena.tick();
    assert!(arena.world.remove(enemy));

    while arena.now() + 50 < entered + ATTACK_STATE_TRANSITION_DELAY_MS {
        arena.tick();
        assert_eq!(arena.bot(bot).state(), Some(BotStateKind::Attack), "left attack early at {}", arena.now());
        assert!(arena.bot(bot).perception().enemy_handle().is_none());
    }

    arena.tick();
    assert_eq!(arena.now(), entered + ATTACK_STATE_TRANSITION_DELAY_MS);
    assert_eq!(arena.bot(bot).state(), Some(BotStateKind::Idle));
}

#[test]
fn test_lost_enemy_is_dropped_and_stance_resets() {
    let mut arena = Arena::new(5);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.5);
    let enemy = arena.add_dummy(Team::Axis, Vec3::new(300.0, 0.0, 0.0));

    arena.tick();
    let entered = arena.bot(bot).state_machine().last_transition().expect("attack was entered");
    for _ in 0..20 {
        arena.tick();
    }
    assert_eq!(arena.bot(bot).state(), Some(BotStateKind::Attack));

    // Out of vision range: the agent walks to the last known position,
    // finds nothing and gives up.
    arena.world.set_origin(enemy, Vec3::new(20_000.0, 0.0, 0.0));
    let reached_idle = arena.run_until(400, |a| a.bot(bot).state() == Some(BotStateKind::Idle));
    assert!(reached_idle, "agent never gave up on its enemy");

    let controller = arena.bot(bot);
    assert!(controller.perception().enemy_handle().is_none());
    assert!(controller.perception().attack_active_until().is_none());
    let left = controller.state_machine().last_transition().expect("idle was entered");
    assert!(left >= entered + ATTACK_STATE_TRANSITION_DELAY_MS);
    assert!(!controller.movement().is_crouched());

    let (_, cmd, _) = arena.host.last_think(bot).expect("bot submitted").clone();
    assert_eq!(cmd.up_move, 0);
    assert!(!cmd.has(COMBAT_BUTTONS));
}

#[test]
fn test_non_attack_ticks_never_carry_combat_inputs() {
    for seed in [1, 2, 3] {
        let (mut arena, allies, axis) = duel(seed);
        for frame in 0..600u32 {
            // Break line of sight now and then so engagements start and end.
            if frame % 150 == 75 {
                arena.world.set_sight_blocked(allies, axis, true);
                arena.world.set_sight_blocked(axis, allies, true);
            } else if frame % 150 == 0 {
                arena.world.set_sight_blocked(allies, axis, false);
                arena.world.set_sight_blocked(axis, allies, false);
            }

            let outputs = arena.tick();
            for (handle, output) in outputs {
                assert!(output.state.is_some(), "bot {} has no state", handle);
                if output.phase != TickPhase::Live || output.state == Some(BotStateKind::Attack) {
                    continue;
                }
                assert_eq!(output.cmd.up_move, 0, "seed {} frame {}: crouched outside attack", seed, frame);
                assert!(!output.cmd.has(COMBAT_BUTTONS), "seed {} frame {}: firing outside attack", seed, frame);
                assert!(!arena.bot(handle).movement().is_crouched());
            }
        }
    }
}

#[test]
fn test_state_changes_respect_hysteresis() {
    for seed in [7, 8] {
        let mut arena = Arena::new(seed);
        let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.4);
        let enemy = arena.add_dummy(Team::Axis, Vec3::new(300.0, 0.0, 0.0));
        let mut seen: Option<(BotStateKind, Option<TimeMs>)> = None;
        let mut changes = 0;

        for frame in 0..800u32 {
            // The target keeps leaving vision range and coming back.
            let origin = if (frame / 200) % 2 == 0 {
                Vec3::new(300.0, 0.0, 0.0)
            } else {
                Vec3::new(20_000.0, 0.0, 0.0)
            };
            arena.world.set_origin(enemy, origin);
            arena.tick();

            let controller = arena.bot(bot);
            let state = controller.state().expect("exactly one state");
            let at = controller.state_machine().last_transition();
            if let Some((previous, previous_at)) = seen {
                if previous != state {
                    changes += 1;
                    let now = at.expect("changed states record their time");
                    if let Some(previous_at) = previous_at {
                        let dwell = now - previous_at;
                        assert!(dwell >= MIN_STATE_TRANSITION_TIME_MS, "{} -> {} after {}ms", previous, state, dwell);
                        if previous == BotStateKind::Attack {
                            assert!(dwell >= ATTACK_STATE_TRANSITION_DELAY_MS, "left attack after {}ms", dwell);
                        }
                    }
                }
            }
            seen = Some((state, at));
        }
        assert!(changes > 0, "seed {}: no state changes happened", seed);
    }
}
