// fps_bot_core/server/src/systems/ai/fire_control.rs
use super::random;
use crate::core::config::FireTuning;
use crate::core::types::*;
use rand::Rng;
use tracing::trace;

/// Facts about one attack tick against a visible, reaction-cleared enemy.
#[derive(Debug, Clone, Copy)]
pub struct FireInputs<'a> {
    pub now: TimeMs,
    pub frame_time_ms: u64,
    pub skill: Skill,
    pub distance_squared: f32,
    pub run_speed: f32,
    pub client: &'a ClientView,
    pub weapon: &'a WeaponStats,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireOutcome {
    pub firing: bool,
    pub melee: bool,
    /// The weapon wants the agent standing still this tick.
    pub no_move: bool,
    pub min_distance_squared: f32,
    pub zoom_off: bool,
    pub clear_move: bool,
    /// A firing decision was evaluated; attack and aim timers should be refreshed.
    pub engaged: bool,
}

impl FireOutcome {
    pub fn idle(tuning: &FireTuning) -> Self {
        FireOutcome {
            firing: false,
            melee: false,
            no_move: false,
            min_distance_squared: tuning.min_attack_distance * tuning.min_attack_distance,
            zoom_off: false,
            clear_move: false,
            engaged: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstPhase {
    Firing { continuous_ms: u64, max_continuous_ms: Option<u64> },
    Resting { since: TimeMs, rest_ms: u64 },
}

/// Fire control: range and ammo gating, semi/full auto handling, burst/rest
/// cycling and melee fallback.
#[derive(Debug, Clone)]
pub struct CombatDecisionEngine {
    phase: BurstPhase,
    last_fire_time: Option<TimeMs>,
}

impl Default for CombatDecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatDecisionEngine {
    pub fn new() -> Self {
        CombatDecisionEngine {
            phase: BurstPhase::Firing { continuous_ms: 0, max_continuous_ms: None },
            last_fire_time: None,
        }
    }

    pub fn phase(&self) -> BurstPhase {
        self.phase
    }

    pub fn continuous_fire_ms(&self) -> u64 {
        match self.phase {
            BurstPhase::Firing { continuous_ms, .. } => continuous_ms,
            BurstPhase::Resting { .. } => 0,
        }
    }

    pub fn is_resting(&self) -> bool {
        matches!(self.phase, BurstPhase::Resting { .. })
    }

    pub fn last_fire_time(&self) -> Option<TimeMs> {
        self.last_fire_time
    }

    pub fn reset(&mut self) {
        self.phase = BurstPhase::Firing { continuous_ms: 0, max_continuous_ms: None };
    }

    /// Ends the current burst without cutting a pending rest short.
    pub fn cease_fire(&mut self) {
        if let BurstPhase::Firing { .. } = self.phase {
            self.reset();
        }
    }

    fn roll_max_continuous(tuning: &FireTuning, fire_delay_ms: u64, skill: Skill, rng: &mut impl Rng) -> u64 {
        fire_delay_ms + tuning.continuous_fire_min_ms + random(rng, tuning.continuous_fire_skill_ms * skill.value()) as u64
    }

    fn roll_rest(tuning: &FireTuning, fire_delay_ms: u64, skill: Skill, rng: &mut impl Rng) -> u64 {
        fire_delay_ms + tuning.rest_min_ms + random(rng, tuning.rest_skill_ms * skill.inverse()) as u64
    }

    pub fn perform_attack(
        &mut self,
        tuning: &FireTuning,
        inputs: &FireInputs<'_>,
        cmd: &mut IntentCommand,
        rng: &mut impl Rng,
    ) -> FireOutcome {
        let weapon = inputs.weapon;
        let client = inputs.client;
        let mut outcome = FireOutcome::idle(tuning);
        outcome.engaged = true;

        let fire_delay_ms = (weapon.fire_delay_secs.max(0.0) * 1000.0) as u64;
        let primary_range = weapon.primary_range.max(tuning.min_firing_range);
        let secondary_range_sq = weapon.secondary_range * weapon.secondary_range;

        if weapon.max_fire_movement < 1.0 && weapon.has_ammo_in_clip && inputs.run_speed > 0.0 {
            let speed_fraction = client.velocity.length() / inputs.run_speed;
            if speed_fraction > weapon.max_fire_movement_mult {
                outcome.no_move = true;
                outcome.clear_move = true;
            }
        }

        let min_distance = primary_range.min(tuning.min_attack_distance_cap);
        outcome.min_distance_squared = min_distance * min_distance;

        if client.out_of_ammo() || inputs.distance_squared > primary_range * primary_range {
            cmd.release(COMBAT_BUTTONS);
            outcome.zoom_off = true;
        } else if weapon.semi_auto {
            if !client.view_model_idle {
                cmd.release(COMBAT_BUTTONS);
                outcome.zoom_off = true;
            } else if weapon.spread < tuning.semi_auto_max_spread {
                outcome.firing = true;
                cmd.toggle(BUTTON_ATTACK_PRIMARY);
                if weapon.has_zoom {
                    if client.zoomed {
                        cmd.release(BUTTON_ATTACK_SECONDARY);
                    } else {
                        cmd.press(BUTTON_ATTACK_SECONDARY);
                    }
                }
            } else {
                outcome.no_move = true;
                outcome.clear_move = true;
            }
        } else {
            outcome.firing = true;
            cmd.press(BUTTON_ATTACK_PRIMARY);
        }

        self.step_burst(tuning, inputs, fire_delay_ms, &mut outcome, cmd, rng);

        if outcome.firing {
            self.last_fire_time = Some(inputs.now);
        }

        // A forced rest holds melee too.
        if !self.is_resting() && weapon.secondary_melee && (client.out_of_ammo() || inputs.distance_squared <= secondary_range_sq) {
            outcome.melee = true;
            cmd.release(BUTTON_ATTACK_PRIMARY);
            if inputs.distance_squared <= secondary_range_sq {
                cmd.toggle(BUTTON_ATTACK_SECONDARY);
            } else {
                cmd.release(BUTTON_ATTACK_SECONDARY);
            }
            self.last_fire_time = Some(inputs.now);
        }

        outcome
    }

    fn step_burst(
        &mut self,
        tuning: &FireTuning,
        inputs: &FireInputs<'_>,
        fire_delay_ms: u64,
        outcome: &mut FireOutcome,
        cmd: &mut IntentCommand,
        rng: &mut impl Rng,
    ) {
        match self.phase {
            BurstPhase::Resting { since, rest_ms } => {
                if inputs.now > since + rest_ms {
                    self.phase = BurstPhase::Firing { continuous_ms: 0, max_continuous_ms: None };
                } else {
                    cmd.release(COMBAT_BUTTONS);
                    outcome.firing = false;
                }
            }
            BurstPhase::Firing { continuous_ms, max_continuous_ms } => {
                if !outcome.firing {
                    self.phase = BurstPhase::Firing { continuous_ms: 0, max_continuous_ms: None };
                    return;
                }
                let continuous_ms = continuous_ms + inputs.frame_time_ms;
                let max_continuous_ms = max_continuous_ms
                    .unwrap_or_else(|| Self::roll_max_continuous(tuning, fire_delay_ms, inputs.skill, rng));
                if continuous_ms > max_continuous_ms {
                    let rest_ms = Self::roll_rest(tuning, fire_delay_ms, inputs.skill, rng);
                    trace!("burst of {}ms exceeded {}ms, resting {}ms", continuous_ms, max_continuous_ms, rest_ms);
                    self.phase = BurstPhase::Resting { since: inputs.now, rest_ms };
                    cmd.release(COMBAT_BUTTONS);
                    outcome.firing = false;
                } else {
                    self.phase = BurstPhase::Firing { continuous_ms, max_continuous_ms: Some(max_continuous_ms) };
                }
            }
        }
    }
}
