// fps_bot_core/server/src/core/config.rs
// Bot tuning and manager configuration, loadable from YAML.

use super::constants::*;
use super::error::{BotError, BotResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateTuning {
    pub min_transition_ms: u64,
    pub attack_exit_delay_ms: u64,
    pub attack_stuck_ms: u64,
    pub curious_stuck_ms: u64,
}

impl Default for StateTuning {
    fn default() -> Self {
        StateTuning {
            min_transition_ms: MIN_STATE_TRANSITION_TIME_MS,
            attack_exit_delay_ms: ATTACK_STATE_TRANSITION_DELAY_MS,
            attack_stuck_ms: ATTACK_STATE_TIMEOUT_MS,
            curious_stuck_ms: CURIOUS_STATE_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionTuning {
    pub detection_angle: f32,
    pub far_plane_factor: f32,
    pub scan_interval_ms: u64,
    pub attack_active_ms: u64,
    pub attack_from_event_ms: u64,
    pub unseen_delay_ms: u64,
    pub curious_event_ms: u64,
    pub curious_minor_event_ms: u64,
    pub reaction_distance_max: f32,
    pub reaction_base_max_ms: f32,
    pub reaction_fixed_ms: f32,
    pub reaction_variance_ms: f32,
    pub reaction_multiplier_max: f32,
    pub reaction_multiplier_min: f32,
}

impl Default for PerceptionTuning {
    fn default() -> Self {
        PerceptionTuning {
            detection_angle: ENEMY_DETECTION_ANGLE,
            far_plane_factor: FAR_PLANE_VISION_FACTOR,
            scan_interval_ms: ENEMY_SCAN_INTERVAL_MS,
            attack_active_ms: ATTACK_ACTIVE_WINDOW_MS,
            attack_from_event_ms: ATTACK_TIME_FROM_EVENT_MS,
            unseen_delay_ms: LAST_SEEN_UNSEEN_DELAY_MS,
            curious_event_ms: CURIOUS_TIME_FROM_EVENT_MS,
            curious_minor_event_ms: CURIOUS_TIME_FROM_MINOR_EVENT_MS,
            reaction_distance_max: REACTION_DISTANCE_MAX,
            reaction_base_max_ms: REACTION_BASE_MAX_MS,
            reaction_fixed_ms: REACTION_FIXED_MS,
            reaction_variance_ms: REACTION_VARIANCE_MAX_MS,
            reaction_multiplier_max: REACTION_SKILL_MULTIPLIER_MAX,
            reaction_multiplier_min: REACTION_SKILL_MULTIPLIER_MIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireTuning {
    pub min_firing_range: f32,
    pub min_attack_distance: f32,
    pub min_attack_distance_cap: f32,
    pub semi_auto_max_spread: f32,
    pub continuous_fire_min_ms: u64,
    pub continuous_fire_skill_ms: f32,
    pub rest_min_ms: u64,
    pub rest_skill_ms: f32,
    pub aim_hold_ms: u64,
}

impl Default for FireTuning {
    fn default() -> Self {
        FireTuning {
            min_firing_range: MIN_FIRING_RANGE,
            min_attack_distance: MIN_ATTACK_DISTANCE,
            min_attack_distance_cap: MIN_ATTACK_DISTANCE_CAP,
            semi_auto_max_spread: SEMI_AUTO_MAX_SPREAD,
            continuous_fire_min_ms: CONTINUOUS_FIRE_TIME_MIN_MS,
            continuous_fire_skill_ms: CONTINUOUS_FIRE_TIME_SKILL_MS,
            rest_min_ms: BURST_REST_TIME_MIN_MS,
            rest_skill_ms: BURST_REST_TIME_SKILL_MS,
            aim_hold_ms: ATTACK_STOP_AIM_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimTuning {
    pub update_interval_ms: u64,
    pub inaccuracy_base: f32,
    pub inaccuracy_skill: f32,
    pub distance_divisor: f32,
    pub movement_divisor: f32,
    pub crouch_modifier: f32,
    pub walk_modifier: f32,
    pub spread_multiplier: f32,
    pub burst_time_divisor: f32,
    pub burst_multiplier: f32,
    pub target_movement_divisor: f32,
    pub head_chance_skill: f32,
    pub head_spread: f32,
    pub body_spread: f32,
    pub origin_spread: f32,
    pub drift_skill: f32,
    pub drift_after_ms: u64,
}

impl Default for AimTuning {
    fn default() -> Self {
        AimTuning {
            update_interval_ms: AIM_UPDATE_INTERVAL_MS,
            inaccuracy_base: AIM_INACCURACY_BASE,
            inaccuracy_skill: AIM_INACCURACY_SKILL_MULTIPLIER,
            distance_divisor: AIM_DISTANCE_FACTOR_DIVISOR,
            movement_divisor: AIM_MOVEMENT_PENALTY_DIVISOR,
            crouch_modifier: AIM_STANCE_MODIFIER_CROUCH,
            walk_modifier: AIM_STANCE_MODIFIER_WALK,
            spread_multiplier: AIM_WEAPON_SPREAD_FACTOR_MULTIPLIER,
            burst_time_divisor: AIM_BURST_PENALTY_TIME_DIVISOR,
            burst_multiplier: AIM_BURST_PENALTY_MULTIPLIER,
            target_movement_divisor: AIM_TARGET_MOVEMENT_PENALTY_DIVISOR,
            head_chance_skill: AIM_HEAD_CHANCE_SKILL_MULTIPLIER,
            head_spread: AIM_HEAD_SPREAD_MULTIPLIER,
            body_spread: AIM_BODY_SPREAD_MULTIPLIER,
            origin_spread: AIM_ORIGIN_SPREAD_MULTIPLIER,
            drift_skill: AIM_DRIFT_AMOUNT_SKILL_MULTIPLIER,
            drift_after_ms: AIM_DRIFT_SUSTAINED_FIRE_TIME_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StanceTuning {
    pub check_interval_ms: u64,
    pub crouch_base: f32,
    pub crouch_skill: f32,
    pub running_base: f32,
    pub running_skill: f32,
    pub crouch_min_ms: u64,
    pub crouch_max_ms: u64,
    pub stand_min_ms: u64,
    pub stand_max_ms: u64,
}

impl Default for StanceTuning {
    fn default() -> Self {
        StanceTuning {
            check_interval_ms: STANCE_CHECK_INTERVAL_MS,
            crouch_base: CROUCH_CHANCE_BASE,
            crouch_skill: CROUCH_CHANCE_SKILL_MULTIPLIER,
            running_base: RUNNING_CHANCE_BASE,
            running_skill: RUNNING_CHANCE_SKILL_MULTIPLIER,
            crouch_min_ms: CROUCH_TIME_MIN_MS,
            crouch_max_ms: CROUCH_TIME_MAX_MS,
            stand_min_ms: STAND_TIME_MIN_MS,
            stand_max_ms: STAND_TIME_MAX_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrafeTuning {
    pub likelihood_base: f32,
    pub likelihood_skill: f32,
    pub time_min_ms: u64,
    pub time_min_spread_ms: u64,
    pub time_max_ms: u64,
    pub time_max_spread_ms: u64,
    pub intensity_min: f32,
    pub intensity_max: f32,
    pub crouch_multiplier: f32,
}

impl Default for StrafeTuning {
    fn default() -> Self {
        StrafeTuning {
            likelihood_base: STRAFE_LIKELIHOOD_BASE,
            likelihood_skill: STRAFE_LIKELIHOOD_SKILL,
            time_min_ms: STRAFE_TIME_MIN_MS,
            time_min_spread_ms: STRAFE_TIME_MIN_SPREAD_MS,
            time_max_ms: STRAFE_TIME_MAX_MS,
            time_max_spread_ms: STRAFE_TIME_MAX_SPREAD_MS,
            intensity_min: STRAFE_INTENSITY_MIN,
            intensity_max: STRAFE_INTENSITY_MAX,
            crouch_multiplier: STRAFE_INTENSITY_CROUCH_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorTuning {
    pub reload_forget_base: f32,
    pub reload_forget_skill: f32,
    pub reload_delay_min_ms: u64,
    pub reload_delay_max_ms: u64,
    pub weapon_check_min_ms: u64,
    pub weapon_check_max_ms: u64,
    pub taunt_delay_ms: u64,
    pub taunt_chance: f64,
    pub idle_before_death_pos_ms: u64,
}

impl Default for BehaviorTuning {
    fn default() -> Self {
        BehaviorTuning {
            reload_forget_base: RELOAD_FORGET_CHANCE_BASE,
            reload_forget_skill: RELOAD_FORGET_CHANCE_SKILL_MULTIPLIER,
            reload_delay_min_ms: RELOAD_DELAY_MIN_MS,
            reload_delay_max_ms: RELOAD_DELAY_MAX_MS,
            weapon_check_min_ms: WEAPON_SWITCH_CHECK_DELAY_MIN_MS,
            weapon_check_max_ms: WEAPON_SWITCH_CHECK_DELAY_MAX_MS,
            taunt_delay_ms: TAUNT_DELAY_MS,
            taunt_chance: TAUNT_CHANCE,
            idle_before_death_pos_ms: IDLE_TIME_BEFORE_DEATH_POS_MS,
        }
    }
}

/// Every tunable threshold used by the decision core.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotTuning {
    pub state: StateTuning,
    pub perception: PerceptionTuning,
    pub fire: FireTuning,
    pub aim: AimTuning,
    pub stance: StanceTuning,
    pub strafe: StrafeTuning,
    pub behavior: BehaviorTuning,
}

impl BotTuning {
    pub fn from_yaml_str(text: &str) -> BotResult<Self> {
        let tuning: BotTuning = serde_yaml::from_str(text)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn load(path: impl AsRef<Path>) -> BotResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> BotResult<()> {
        let floats = [
            ("perception.detection_angle", self.perception.detection_angle),
            ("perception.far_plane_factor", self.perception.far_plane_factor),
            ("perception.reaction_distance_max", self.perception.reaction_distance_max),
            ("fire.min_firing_range", self.fire.min_firing_range),
            ("fire.min_attack_distance_cap", self.fire.min_attack_distance_cap),
            ("aim.distance_divisor", self.aim.distance_divisor),
            ("aim.movement_divisor", self.aim.movement_divisor),
            ("aim.burst_time_divisor", self.aim.burst_time_divisor),
            ("aim.target_movement_divisor", self.aim.target_movement_divisor),
        ];
        for (name, value) in floats {
            if !value.is_finite() || value <= 0.0 {
                return Err(BotError::Config(format!("{} must be a positive finite number, got {}", name, value)));
            }
        }

        let probabilities = [
            ("stance.crouch_base", self.stance.crouch_base),
            ("stance.running_base", self.stance.running_base),
            ("strafe.likelihood_base", self.strafe.likelihood_base),
            ("behavior.reload_forget_base", self.behavior.reload_forget_base),
            ("behavior.taunt_chance", self.behavior.taunt_chance as f32),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(BotError::Config(format!("{} must be a probability in [0, 1], got {}", name, value)));
            }
        }

        let windows = [
            ("stance.crouch", self.stance.crouch_min_ms, self.stance.crouch_max_ms),
            ("stance.stand", self.stance.stand_min_ms, self.stance.stand_max_ms),
            ("behavior.reload_delay", self.behavior.reload_delay_min_ms, self.behavior.reload_delay_max_ms),
            ("behavior.weapon_check", self.behavior.weapon_check_min_ms, self.behavior.weapon_check_max_ms),
        ];
        for (name, min, max) in windows {
            if min > max {
                return Err(BotError::Config(format!("{} window is inverted: min {} > max {}", name, min, max)));
            }
        }

        if self.perception.reaction_multiplier_min > self.perception.reaction_multiplier_max {
            return Err(BotError::Config("perception.reaction_multiplier_min exceeds reaction_multiplier_max".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotManagerConfig {
    pub skill_min: f32,
    pub skill_max: f32,
    /// Emit an all-zero intent instead of thinking.
    pub manual_move: bool,
    pub rng_seed: Option<u64>,
    pub taunts: Vec<String>,
    pub tuning: BotTuning,
}

impl Default for BotManagerConfig {
    fn default() -> Self {
        BotManagerConfig {
            skill_min: DEFAULT_SKILL_MIN,
            skill_max: DEFAULT_SKILL_MAX,
            manual_move: false,
            rng_seed: None,
            taunts: (1..=8).map(|i| format!("*5{}", i)).collect(),
            tuning: BotTuning::default(),
        }
    }
}

impl BotManagerConfig {
    pub fn from_yaml_str(text: &str) -> BotResult<Self> {
        let config: BotManagerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> BotResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> BotResult<()> {
        if !(BOT_MIN_SKILL..=BOT_MAX_SKILL).contains(&self.skill_min)
            || !(BOT_MIN_SKILL..=BOT_MAX_SKILL).contains(&self.skill_max)
            || self.skill_min > self.skill_max
        {
            return Err(BotError::Config(format!(
                "skill range {}..{} must lie within [{}, {}]",
                self.skill_min, self.skill_max, BOT_MIN_SKILL, BOT_MAX_SKILL
            )));
        }
        self.tuning.validate()
    }
}
