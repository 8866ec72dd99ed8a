// fps_bot_core/server/src/systems/ai/mod.rs
pub mod aiming;
pub mod combat_movement;
pub mod commands;
pub mod controller;
pub mod fire_control;
pub mod perception;
pub mod states;

use rand::Rng;

/// Uniform in `[0, scale)`; zero for non-positive scales.
pub(crate) fn random(rng: &mut impl Rng, scale: f32) -> f32 {
    if scale > 0.0 {
        rng.gen_range(0.0..scale)
    } else {
        0.0
    }
}

/// Uniform in `[-scale, scale]`; zero for non-positive scales.
pub(crate) fn crandom(rng: &mut impl Rng, scale: f32) -> f32 {
    if scale > 0.0 {
        rng.gen_range(-scale..=scale)
    } else {
        0.0
    }
}

pub(crate) fn chance(rng: &mut impl Rng, probability: f32) -> bool {
    rng.gen::<f32>() < probability
}
