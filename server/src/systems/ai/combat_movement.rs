// fps_bot_core/server/src/systems/ai/combat_movement.rs
use super::{chance, crandom, random};
use crate::core::config::{StanceTuning, StrafeTuning};
use crate::core::constants::*;
use crate::core::types::*;
use crate::world::BotMover;
use rand::Rng;
use tracing::trace;

/// Probability of running rather than walking during an engagement.
/// `distance` is `None` when no enemy distance is known.
pub fn running_chance(tuning: &StanceTuning, skill: Skill, distance: Option<f32>) -> f32 {
    let mut chance = tuning.running_base - skill.value() * tuning.running_skill;
    if let Some(distance) = distance {
        if (OPTIMAL_FIRING_RANGE_MIN..=OPTIMAL_FIRING_RANGE_MAX).contains(&distance) {
            chance *= RUNNING_CHANCE_DISTANCE_MULTIPLIER_MEDIUM;
        } else if distance > OPTIMAL_FIRING_RANGE_MAX {
            chance *= RUNNING_CHANCE_DISTANCE_MULTIPLIER_LONG;
        }
    }
    if skill.value() > RUNNING_CHANCE_HIGH_SKILL_THRESHOLD {
        chance *= RUNNING_CHANCE_SKILL_MULTIPLIER_HIGH;
    }
    chance.clamp(0.0, 1.0)
}

/// Probability of dropping into a crouch at the next stance check.
pub fn crouch_chance(tuning: &StanceTuning, skill: Skill, distance: Option<f32>) -> f32 {
    let distance = distance.unwrap_or(0.0);
    let mut chance = tuning.crouch_base + skill.value() * tuning.crouch_skill;
    if distance > OPTIMAL_FIRING_RANGE_MAX {
        chance += CROUCH_CHANCE_DISTANCE_BONUS_LONG;
    }
    if distance > LONG_FIRING_RANGE {
        chance += CROUCH_CHANCE_DISTANCE_BONUS_VERY_LONG;
    }
    if distance < CLOSE_COMBAT_RANGE {
        chance *= CROUCH_CHANCE_DISTANCE_MULTIPLIER_CLOSE;
    }
    if skill.value() > CROUCH_CHANCE_HIGH_SKILL_THRESHOLD {
        chance *= CROUCH_CHANCE_SKILL_MULTIPLIER_HIGH;
    }
    chance.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StancePhase {
    Standing,
    /// Just stood up; crouching again is blocked until `until`.
    StandHold { until: TimeMs },
    Crouched { until: TimeMs },
}

/// What combat movement needs to know about the current attack tick.
#[derive(Debug, Clone, Copy)]
pub struct CombatMoveInputs {
    pub now: TimeMs,
    pub skill: Skill,
    pub can_see: bool,
    pub aim_hold_active: bool,
    pub attacking: bool,
    pub firing: bool,
    pub melee: bool,
    pub no_move: bool,
    pub min_distance_squared: f32,
    pub distance_squared: f32,
    pub enemy_position: Vec3,
    pub enemy_moved: bool,
    pub last_fire_time: Option<TimeMs>,
    pub forward: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatMoveResult {
    Continue { moving: bool },
    /// Reached the last known position without regaining sight.
    EnemyLost,
}

#[derive(Debug, Clone)]
pub struct CombatMovementController {
    stance: StancePhase,
    wants_to_run: bool,
    last_stance_eval: Option<TimeMs>,
    strafe_direction: i32,
    strafe_change_at: TimeMs,
}

impl Default for CombatMovementController {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatMovementController {
    pub fn new() -> Self {
        CombatMovementController {
            stance: StancePhase::Standing,
            wants_to_run: true,
            last_stance_eval: None,
            strafe_direction: 0,
            strafe_change_at: 0,
        }
    }

    pub fn stance(&self) -> StancePhase {
        self.stance
    }

    pub fn is_crouched(&self) -> bool {
        matches!(self.stance, StancePhase::Crouched { .. })
    }

    pub fn wants_to_run(&self) -> bool {
        self.wants_to_run
    }

    pub fn strafe_direction(&self) -> i32 {
        self.strafe_direction
    }

    /// Standing, running, combat buttons released.
    pub fn reset_to_baseline(&mut self, cmd: &mut IntentCommand) {
        self.stance = StancePhase::Standing;
        self.wants_to_run = true;
        cmd.reset_to_baseline();
    }

    /// Forgets every strafe and stance timer.
    pub fn clear(&mut self, cmd: &mut IntentCommand) {
        self.reset_to_baseline(cmd);
        self.last_stance_eval = None;
        self.strafe_direction = 0;
        self.strafe_change_at = 0;
    }

    pub fn perform(
        &mut self,
        stance_tuning: &StanceTuning,
        strafe_tuning: &StrafeTuning,
        inputs: &CombatMoveInputs,
        mover: &mut dyn BotMover,
        cmd: &mut IntentCommand,
        rng: &mut impl Rng,
    ) -> CombatMoveResult {
        if inputs.no_move {
            mover.clear_move();
            return CombatMoveResult::Continue { moving: false };
        }

        if (inputs.can_see || inputs.aim_hold_active) && inputs.attacking {
            self.update_stance(stance_tuning, inputs, cmd, rng);
        } else {
            self.reset_to_baseline(cmd);
        }

        let d2 = inputs.distance_squared;
        let skill = inputs.skill.value();
        let crouched = self.is_crouched();

        let mut stand_still = inputs.can_see
            && inputs.firing
            && (d2 >= STAND_STILL_DISTANCE_MEDIUM * STAND_STILL_DISTANCE_MEDIUM
                || crouched
                || (!self.wants_to_run && skill > 0.5)
                || (d2 >= STAND_STILL_DISTANCE_LONG * STAND_STILL_DISTANCE_LONG
                    && chance(rng, STAND_STILL_LONG_RANGE_CHANCE)));
        if !stand_still
            && inputs.can_see
            && inputs.firing
            && skill > STAND_STILL_HIGH_SKILL_THRESHOLD
            && chance(rng, STAND_STILL_HIGH_SKILL_CHANCE)
        {
            stand_still = true;
        }
        if stand_still {
            mover.clear_move();
        }

        if inputs.can_see && !inputs.melee && !stand_still {
            if !crouched {
                cmd.press(BUTTON_RUN);
            }
            let recently_fired = inputs
                .last_fire_time
                .map_or(false, |t| inputs.now.saturating_sub(t) < STRAFE_RECENT_FIRE_MS);
            if inputs.firing
                || recently_fired
                || d2 < STRAFE_CLOSE_DISTANCE * STRAFE_CLOSE_DISTANCE
                || self.wants_to_run
            {
                self.strafe(strafe_tuning, inputs, cmd, rng);
            }
        }

        if !stand_still
            && ((!mover.move_to_best_attractive_point(ATTACK_ATTRACT_MIN_PRIORITY) && !mover.is_moving())
                || (inputs.enemy_moved && !mover.move_done())
                || d2 < inputs.min_distance_squared)
        {
            if !crouched {
                cmd.press(BUTTON_RUN);
            }
            if !inputs.melee || !inputs.can_see {
                if d2 < inputs.min_distance_squared {
                    mover.avoid_path(
                        inputs.enemy_position,
                        inputs.min_distance_squared.sqrt(),
                        inputs.forward * AVOID_PREFERRED_DIR_DISTANCE,
                    );
                } else {
                    mover.move_to(inputs.enemy_position);
                }
                if !inputs.can_see && mover.move_done() {
                    return CombatMoveResult::EnemyLost;
                }
            } else {
                mover.move_to(inputs.enemy_position);
            }
        }

        CombatMoveResult::Continue { moving: mover.is_moving() }
    }

    fn strafe(&mut self, tuning: &StrafeTuning, inputs: &CombatMoveInputs, cmd: &mut IntentCommand, rng: &mut impl Rng) {
        let skill = inputs.skill.value();
        let crouched = self.is_crouched();

        let mut likelihood = tuning.likelihood_base + skill * tuning.likelihood_skill;
        if crouched {
            likelihood *= tuning.crouch_multiplier;
        }
        if rng.gen::<f32>() > likelihood {
            if chance(rng, STRAFE_RANDOM_MOVE_CHANCE) {
                cmd.set_right_move((crandom(rng, STRAFE_RANDOM_MOVE_INTENSITY) * skill) as i32);
            } else {
                cmd.set_right_move(0);
            }
            return;
        }

        if inputs.now >= self.strafe_change_at || self.strafe_direction == 0 {
            let roll: f32 = rng.gen();
            self.strafe_direction = if roll < STRAFE_DIRECTION_CHANGE_CHANCE_L {
                STRAFE_LEFT
            } else if roll < STRAFE_DIRECTION_CHANGE_CHANCE_R {
                STRAFE_RIGHT
            } else if roll < STRAFE_DIRECTION_CHANGE_CHANCE_QUICK {
                -self.strafe_direction
            } else {
                0
            };
            let min_ms = tuning.time_min_ms as f32 + inputs.skill.inverse() * tuning.time_min_spread_ms as f32;
            let max_ms = tuning.time_max_ms as f32 + inputs.skill.inverse() * tuning.time_max_spread_ms as f32;
            self.strafe_change_at = inputs.now + (min_ms + random(rng, max_ms - min_ms)) as u64;
            trace!("strafe direction {} until {}", self.strafe_direction, self.strafe_change_at);
        }

        let mut intensity = tuning.intensity_min + skill * (tuning.intensity_max - tuning.intensity_min);
        if crouched {
            intensity *= tuning.crouch_multiplier;
        }
        cmd.set_right_move((self.strafe_direction as f32 * intensity) as i32);

        if skill > STRAFE_DRIFT_SKILL_THRESHOLD && chance(rng, STRAFE_DRIFT_CHANCE) {
            let forward = if chance(rng, STRAFE_FORWARD_MOVE_CHANCE) {
                STRAFE_FORWARD_MOVE_INTENSITY * skill
            } else {
                STRAFE_BACKWARD_MOVE_INTENSITY * skill
            };
            cmd.set_forward_move(forward as i32);
        }

        if skill > STRAFE_UNPREDICTABLE_SKILL_THRESHOLD && chance(rng, STRAFE_UNPREDICTABLE_MOVE_CHANCE) {
            cmd.set_right_move((crandom(rng, MOVE_AXIS_MAX as f32) * STRAFE_UNPREDICTABLE_MOVE_INTENSITY_R) as i32);
            cmd.set_forward_move((crandom(rng, STRAFE_RANDOM_MOVE_INTENSITY) * STRAFE_UNPREDICTABLE_MOVE_INTENSITY_F) as i32);
        }
    }

    fn update_stance(&mut self, tuning: &StanceTuning, inputs: &CombatMoveInputs, cmd: &mut IntentCommand, rng: &mut impl Rng) {
        let now = inputs.now;
        let distance = inputs.distance_squared.max(0.0).sqrt();

        let due = self.last_stance_eval.map_or(true, |last| now >= last + tuning.check_interval_ms);
        if due {
            self.last_stance_eval = Some(now);
            self.wants_to_run =
                distance < CLOSE_COMBAT_RANGE || chance(rng, running_chance(tuning, inputs.skill, Some(distance)));

            let hold_blocks = matches!(self.stance, StancePhase::StandHold { until } if now < until);
            if !self.is_crouched() && !hold_blocks && chance(rng, crouch_chance(tuning, inputs.skill, Some(distance))) {
                let crouch_ms = tuning.crouch_min_ms + random(rng, (tuning.crouch_max_ms - tuning.crouch_min_ms) as f32) as u64;
                self.stance = StancePhase::Crouched { until: now + crouch_ms };
                trace!("crouching for {}ms", crouch_ms);
            } else if self.is_crouched() {
                self.stand_up(tuning, now, rng);
            }
        }

        match self.stance {
            StancePhase::Crouched { until } if now >= until => self.stand_up(tuning, now, rng),
            StancePhase::StandHold { until } if now >= until => self.stance = StancePhase::Standing,
            _ => {}
        }

        if self.is_crouched() {
            cmd.up_move = CROUCH_UP_MOVE;
            cmd.release(BUTTON_RUN);
        } else {
            cmd.up_move = 0;
            cmd.press(BUTTON_RUN);
        }
    }

    fn stand_up(&mut self, tuning: &StanceTuning, now: TimeMs, rng: &mut impl Rng) {
        let stand_ms = tuning.stand_min_ms + random(rng, (tuning.stand_max_ms - tuning.stand_min_ms) as f32) as u64;
        self.stance = StancePhase::StandHold { until: now + stand_ms };
    }
}
