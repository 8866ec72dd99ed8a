// fps_bot_core/server/tests/integration/combat.rs
mod common;

use common::Arena;
use fps_bot_core::core::config::PerceptionTuning;
use fps_bot_core::core::constants::TICK_DURATION_MS;
use fps_bot_core::core::types::{EntityHandle, Skill, Team, TimeMs, Vec3, WeaponStats, BUTTON_ATTACK_PRIMARY, COMBAT_BUTTONS};
use fps_bot_core::systems::ai::fire_control::BurstPhase;
use fps_bot_core::systems::ai::perception::reaction_delay_ms;
use fps_bot_core::systems::ai::states::BotStateKind;
use fps_bot_core::world::sim::{automatic_rifle, semi_auto_rifle};

/// Ticks until the bot presses primary attack. Returns the press time.
fn first_shot(arena: &mut Arena, bot: EntityHandle, max_ticks: usize) -> Option<TimeMs> {
    for _ in 0..max_ticks {
        let outputs = arena.tick();
        if Arena::output_for(&outputs, bot).cmd.has(BUTTON_ATTACK_PRIMARY) {
            return Some(arena.now());
        }
    }
    None
}

fn reaction_case(seed: u64, skill: f32, distance: f32) -> (TimeMs, TimeMs) {
    let mut arena = Arena::new(seed);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, skill);
    arena.add_dummy(Team::Axis, Vec3::new(distance, 0.0, 0.0));

    let outputs = arena.tick();
    let appeared = arena.now();
    assert_eq!(Arena::output_for(&outputs, bot).state, Some(BotStateKind::Attack));
    assert!(!Arena::output_for(&outputs, bot).cmd.has(BUTTON_ATTACK_PRIMARY), "fired before reacting");

    let fired = first_shot(&mut arena, bot, 200).expect("bot never fired");
    (appeared, fired)
}

#[test]
fn test_top_skill_reacts_within_fixed_delay() {
    let tuning = PerceptionTuning::default();
    let distance = 150.0;
    let delay = reaction_delay_ms(&tuning, Skill::new(1.0), distance * distance, 0.0) as TimeMs;
    for seed in 0..5 {
        let (appeared, fired) = reaction_case(seed, 1.0, distance);
        let elapsed = fired - appeared;
        assert!(elapsed >= delay, "seed {}: fired after {}ms, delay {}ms", seed, elapsed, delay);
        assert!(elapsed <= delay + TICK_DURATION_MS, "seed {}: fired after {}ms", seed, elapsed);
    }
}

#[test]
fn test_lowest_skill_holds_fire_much_longer() {
    let tuning = PerceptionTuning::default();
    let distance = 150.0;
    let fastest = reaction_delay_ms(&tuning, Skill::new(0.0), distance * distance, 0.0) as TimeMs;
    let slowest = reaction_delay_ms(&tuning, Skill::new(0.0), distance * distance, tuning.reaction_variance_ms);
    assert!(fastest >= 900);
    for seed in 0..5 {
        let (appeared, fired) = reaction_case(seed, 0.0, distance);
        let elapsed = fired - appeared;
        assert!(elapsed >= fastest, "seed {}: fired after {}ms", seed, elapsed);
        assert!((elapsed as f32) <= slowest + TICK_DURATION_MS as f32, "seed {}: fired after {}ms", seed, elapsed);
    }
}

#[test]
fn test_skilled_bot_fires_semi_auto_rifle_at_medium_range() {
    let mut arena = Arena::new(9);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.9);
    let enemy = arena.add_dummy(Team::Axis, Vec3::new(300.0, 0.0, 0.0));
    arena.world.set_weapon(bot, Some(semi_auto_rifle()));

    let mut presses = 0;
    let mut released_between = false;
    let mut previous = false;
    for _ in 0..80 {
        let outputs = arena.tick();
        let pressed = Arena::output_for(&outputs, bot).cmd.has(BUTTON_ATTACK_PRIMARY);
        if pressed && !previous {
            presses += 1;
        }
        if !pressed && presses > 0 {
            released_between = true;
        }
        previous = pressed;
    }

    let controller = arena.bot(bot);
    assert_eq!(controller.state(), Some(BotStateKind::Attack));
    assert_eq!(controller.perception().enemy_handle(), Some(enemy));
    assert!(presses >= 2, "semi-auto trigger pressed {} times", presses);
    assert!(released_between, "semi-auto trigger was never released");
    assert!(controller.fire_control().last_fire_time().is_some());
}

/// Fights a stationary target for 15s. Returns how many rests were taken.
fn burst_rest_case(seed: u64, weapon: Option<WeaponStats>) -> usize {
    let mut arena = Arena::new(seed);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 0.0);
    arena.add_dummy(Team::Axis, Vec3::new(300.0, 0.0, 0.0));
    if let Some(weapon) = weapon {
        arena.world.set_weapon(bot, Some(weapon));
    }

    let mut rests = 0;
    let mut was_resting = false;
    for _ in 0..300 {
        let outputs = arena.tick();
        let now = arena.now();
        let cmd = Arena::output_for(&outputs, bot).cmd;
        match arena.bot(bot).fire_control().phase() {
            BurstPhase::Resting { since, .. } => {
                assert!(!cmd.has(COMBAT_BUTTONS), "attack input at {} while resting since {}", now, since);
                if !was_resting {
                    rests += 1;
                }
                was_resting = true;
            }
            BurstPhase::Firing { continuous_ms, max_continuous_ms } => {
                if let Some(max) = max_continuous_ms {
                    assert!(continuous_ms <= max);
                }
                was_resting = false;
            }
        }
    }
    rests
}

#[test]
fn test_burst_rest_keeps_trigger_released() {
    let rests = burst_rest_case(13, None);
    assert!(rests >= 2, "only {} rests in 15s of fire", rests);
}

#[test]
fn test_burst_rest_releases_zoom_of_scoped_rifle() {
    let scoped = WeaponStats { has_zoom: true, ..semi_auto_rifle() };
    let rests = burst_rest_case(14, Some(scoped));
    assert!(rests >= 1, "scoped rifle never rested");
}

#[test]
fn test_target_beyond_range_floor_is_not_fired_upon() {
    let mut arena = Arena::new(17);
    arena.world.run_speed = 100.0;
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 1.0);
    arena.add_dummy(Team::Axis, Vec3::new(3000.0, 0.0, 0.0));
    let short_range = WeaponStats { primary_range: 1000.0, ..automatic_rifle() };
    arena.world.set_weapon(bot, Some(short_range));
    arena.world.with_client(bot, |client| client.zoomed = true);

    for _ in 0..60 {
        let outputs = arena.tick();
        assert!(!Arena::output_for(&outputs, bot).cmd.has(BUTTON_ATTACK_PRIMARY));
    }
    assert_eq!(arena.bot(bot).state(), Some(BotStateKind::Attack));
    assert!(arena.host.zoom_offs.contains(&bot));
}

#[test]
fn test_target_inside_range_floor_is_fired_upon() {
    let mut arena = Arena::new(17);
    let bot = arena.add_bot(Team::Allies, Vec3::ZERO, 1.0);
    arena.add_dummy(Team::Axis, Vec3::new(1800.0, 0.0, 0.0));
    // Nominal range is short, but the floor still covers 1800 units.
    let short_range = WeaponStats { primary_range: 1000.0, ..automatic_rifle() };
    arena.world.set_weapon(bot, Some(short_range));

    assert!(first_shot(&mut arena, bot, 80).is_some());
    assert!(arena.host.zoom_offs.is_empty());
}
