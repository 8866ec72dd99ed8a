// fps_bot_core/server/src/systems/ai/aiming.rs
use super::{chance, crandom, random};
use crate::core::config::AimTuning;
use crate::core::types::{EntityView, Skill, TimeMs, Vec3};
use rand::Rng;

/// Per-tick facts the inaccuracy model depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimInputs {
    pub skill: Skill,
    pub distance_squared: f32,
    pub own_speed: f32,
    pub crouching: bool,
    pub wants_to_run: bool,
    pub weapon_spread: Option<f32>,
    pub continuous_fire_ms: u64,
    pub target_speed: f32,
    pub firing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AimRegion {
    Head,
    Body,
    /// No eye reference on the target model; offset is relative to its origin.
    Origin,
}

/// Combined inaccuracy scalar. Every factor is >= its neutral value, except
/// the stance modifier which tightens aim while crouched or walking.
pub fn inaccuracy(tuning: &AimTuning, inputs: &AimInputs) -> f32 {
    let base = tuning.inaccuracy_base - inputs.skill.value() * tuning.inaccuracy_skill;
    let distance_factor = 1.0 + inputs.distance_squared.max(0.0).sqrt() / tuning.distance_divisor;
    let movement_penalty = 1.0 + inputs.own_speed / tuning.movement_divisor;

    let stance_modifier = if inputs.crouching {
        tuning.crouch_modifier
    } else if !inputs.wants_to_run {
        tuning.walk_modifier
    } else {
        1.0
    };

    let spread_factor = inputs.weapon_spread.map_or(1.0, |spread| 1.0 + spread * tuning.spread_multiplier);
    let burst_penalty = if inputs.continuous_fire_ms > 0 {
        1.0 + (inputs.continuous_fire_ms as f32 / tuning.burst_time_divisor) * tuning.burst_multiplier
    } else {
        1.0
    };
    let target_penalty = 1.0 + inputs.target_speed / tuning.target_movement_divisor;

    base * distance_factor * movement_penalty * stance_modifier * spread_factor * burst_penalty * target_penalty
}

/// Cached aim error for the tracked enemy, refreshed on a fixed cadence
/// rather than every tick.
#[derive(Debug, Clone)]
pub struct AimingModel {
    offset: Vec3,
    region: Option<AimRegion>,
    last_update: Option<TimeMs>,
}

impl Default for AimingModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AimingModel {
    pub fn new() -> Self {
        AimingModel { offset: Vec3::ZERO, region: None, last_update: None }
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn region(&self) -> Option<AimRegion> {
        self.region
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_due(&self, now: TimeMs, tuning: &AimTuning) -> bool {
        self.last_update.map_or(true, |last| now >= last + tuning.update_interval_ms)
    }

    /// Returns the offset to add to the resolved aim point, recomputing it
    /// when the update interval has elapsed.
    pub fn update(
        &mut self,
        now: TimeMs,
        tuning: &AimTuning,
        inputs: &AimInputs,
        target: &EntityView,
        eye_resolved: bool,
        rng: &mut impl Rng,
    ) -> Vec3 {
        if !self.is_due(now, tuning) {
            return self.offset;
        }

        let spread = inaccuracy(tuning, inputs);
        let aim_for_head = chance(rng, inputs.skill.value() * tuning.head_chance_skill);
        let width = target.maxs.x - target.mins.x;
        let depth = target.maxs.y - target.mins.y;

        let (region, mut offset) = if eye_resolved && aim_for_head {
            let offset = Vec3::new(
                crandom(rng, width * 0.3),
                crandom(rng, depth * 0.3),
                -random(rng, target.maxs.z * 0.3) + crandom(rng, spread * tuning.head_spread),
            );
            (AimRegion::Head, offset)
        } else if eye_resolved {
            let offset = Vec3::new(
                crandom(rng, width * 0.5),
                crandom(rng, depth * 0.5),
                -random(rng, target.maxs.z * 0.7) + crandom(rng, spread * tuning.body_spread),
            );
            (AimRegion::Body, offset)
        } else {
            let offset = Vec3::new(
                crandom(rng, width * 0.5),
                crandom(rng, depth * 0.5),
                16.0 + random(rng, target.view_height - 16.0) + crandom(rng, spread * tuning.origin_spread),
            );
            (AimRegion::Origin, offset)
        };

        if inputs.firing && inputs.continuous_fire_ms > tuning.drift_after_ms {
            let drift = inputs.skill.inverse() * tuning.drift_skill;
            offset.x += crandom(rng, drift);
            offset.y += crandom(rng, drift);
        }

        self.offset = offset;
        self.region = Some(region);
        self.last_update = Some(now);
        offset
    }
}
