// fps_bot_core/server/src/core/constants.rs
// Default tuning values. Everything here can be overridden through `BotTuning`.

use std::time::Duration;

pub const SERVER_TICK_RATE: u64 = 20;
pub const TICK_DURATION_MS: u64 = 1000 / SERVER_TICK_RATE;
pub const TICK_DURATION: Duration = Duration::from_millis(TICK_DURATION_MS);

// Skill
pub const BOT_MIN_SKILL: f32 = 0.0;
pub const BOT_MAX_SKILL: f32 = 1.0;
pub const DEFAULT_SKILL_MIN: f32 = 0.01;
pub const DEFAULT_SKILL_MAX: f32 = 0.81;

// State machine
pub const MIN_STATE_TRANSITION_TIME_MS: u64 = 1000;
pub const ATTACK_STATE_TRANSITION_DELAY_MS: u64 = 2000;
pub const ATTACK_STATE_TIMEOUT_MS: u64 = 10_000;
pub const CURIOUS_STATE_TIMEOUT_MS: u64 = 30_000;

// Perception
pub const ENEMY_DETECTION_ANGLE: f32 = 90.0;
pub const FAR_PLANE_VISION_FACTOR: f32 = 1.2;
pub const ENEMY_SCAN_INTERVAL_MS: u64 = 250;
pub const ATTACK_ACTIVE_WINDOW_MS: u64 = 1000;
pub const ATTACK_TIME_FROM_EVENT_MS: u64 = 5000;
pub const LAST_SEEN_UNSEEN_DELAY_MS: u64 = 2000;
pub const CURIOUS_TIME_FROM_EVENT_MS: u64 = 15_000;
pub const CURIOUS_TIME_FROM_MINOR_EVENT_MS: u64 = 10_000;
pub const REACTION_DISTANCE_MAX: f32 = 1536.0;
pub const REACTION_BASE_MAX_MS: f32 = 1000.0;
pub const REACTION_FIXED_MS: f32 = 300.0;
pub const REACTION_VARIANCE_MAX_MS: f32 = 600.0;
pub const REACTION_SKILL_MULTIPLIER_MAX: f32 = 3.0;
pub const REACTION_SKILL_MULTIPLIER_MIN: f32 = 1.0;

// Fire control
pub const MIN_FIRING_RANGE: f32 = 2048.0;
pub const MIN_ATTACK_DISTANCE: f32 = 128.0;
pub const MIN_ATTACK_DISTANCE_CAP: f32 = 256.0;
pub const SEMI_AUTO_MAX_SPREAD: f32 = 0.25;
pub const CONTINUOUS_FIRE_TIME_MIN_MS: u64 = 500;
pub const CONTINUOUS_FIRE_TIME_SKILL_MS: f32 = 1500.0;
pub const BURST_REST_TIME_MIN_MS: u64 = 100;
pub const BURST_REST_TIME_SKILL_MS: f32 = 500.0;
pub const ATTACK_STOP_AIM_DELAY_MS: u64 = 3000;

// Aiming and accuracy
pub const AIM_UPDATE_INTERVAL_MS: u64 = 100;
pub const AIM_INACCURACY_BASE: f32 = 1.5;
pub const AIM_INACCURACY_SKILL_MULTIPLIER: f32 = 1.0;
pub const AIM_DISTANCE_FACTOR_DIVISOR: f32 = 512.0;
pub const AIM_MOVEMENT_PENALTY_DIVISOR: f32 = 200.0;
pub const AIM_STANCE_MODIFIER_CROUCH: f32 = 0.4;
pub const AIM_STANCE_MODIFIER_WALK: f32 = 0.7;
pub const AIM_WEAPON_SPREAD_FACTOR_MULTIPLIER: f32 = 2.0;
pub const AIM_BURST_PENALTY_TIME_DIVISOR: f32 = 1000.0;
pub const AIM_BURST_PENALTY_MULTIPLIER: f32 = 0.5;
pub const AIM_TARGET_MOVEMENT_PENALTY_DIVISOR: f32 = 300.0;
pub const AIM_HEAD_CHANCE_SKILL_MULTIPLIER: f32 = 0.4;
pub const AIM_HEAD_SPREAD_MULTIPLIER: f32 = 2.0;
pub const AIM_BODY_SPREAD_MULTIPLIER: f32 = 3.0;
pub const AIM_ORIGIN_SPREAD_MULTIPLIER: f32 = 4.0;
pub const AIM_DRIFT_AMOUNT_SKILL_MULTIPLIER: f32 = 8.0;
pub const AIM_DRIFT_SUSTAINED_FIRE_TIME_MS: u64 = 500;

// Combat movement
pub const STAND_STILL_DISTANCE_MEDIUM: f32 = 192.0;
pub const STAND_STILL_DISTANCE_LONG: f32 = 384.0;
pub const STAND_STILL_LONG_RANGE_CHANCE: f32 = 0.6;
pub const STAND_STILL_HIGH_SKILL_THRESHOLD: f32 = 0.7;
pub const STAND_STILL_HIGH_SKILL_CHANCE: f32 = 0.4;
pub const STRAFE_CLOSE_DISTANCE: f32 = 256.0;
pub const STRAFE_RECENT_FIRE_MS: u64 = 500;
pub const AVOID_PREFERRED_DIR_DISTANCE: f32 = 512.0;

// Strafing
pub const STRAFE_LEFT: i32 = -127;
pub const STRAFE_RIGHT: i32 = 127;
pub const STRAFE_LIKELIHOOD_BASE: f32 = 0.4;
pub const STRAFE_LIKELIHOOD_SKILL: f32 = 0.6;
pub const STRAFE_INTENSITY_CROUCH_MULTIPLIER: f32 = 0.8;
pub const STRAFE_INTENSITY_MIN: f32 = 0.6;
pub const STRAFE_INTENSITY_MAX: f32 = 1.0;
pub const STRAFE_TIME_MIN_MS: u64 = 300;
pub const STRAFE_TIME_MIN_SPREAD_MS: u64 = 700;
pub const STRAFE_TIME_MAX_MS: u64 = 800;
pub const STRAFE_TIME_MAX_SPREAD_MS: u64 = 1200;
pub const STRAFE_DIRECTION_CHANGE_CHANCE_L: f32 = 0.35;
pub const STRAFE_DIRECTION_CHANGE_CHANCE_R: f32 = 0.7;
pub const STRAFE_DIRECTION_CHANGE_CHANCE_QUICK: f32 = 0.85;
pub const STRAFE_RANDOM_MOVE_CHANCE: f32 = 0.3;
pub const STRAFE_RANDOM_MOVE_INTENSITY: f32 = 64.0;
pub const STRAFE_DRIFT_SKILL_THRESHOLD: f32 = 0.5;
pub const STRAFE_DRIFT_CHANCE: f32 = 0.3;
pub const STRAFE_FORWARD_MOVE_CHANCE: f32 = 0.7;
pub const STRAFE_FORWARD_MOVE_INTENSITY: f32 = 48.0;
pub const STRAFE_BACKWARD_MOVE_INTENSITY: f32 = -24.0;
pub const STRAFE_UNPREDICTABLE_SKILL_THRESHOLD: f32 = 0.7;
pub const STRAFE_UNPREDICTABLE_MOVE_CHANCE: f32 = 0.1;
pub const STRAFE_UNPREDICTABLE_MOVE_INTENSITY_R: f32 = 1.2;
pub const STRAFE_UNPREDICTABLE_MOVE_INTENSITY_F: f32 = 0.8;

// Stance
pub const STANCE_CHECK_INTERVAL_MS: u64 = 2000;
pub const CROUCH_CHANCE_BASE: f32 = 0.15;
pub const CROUCH_CHANCE_SKILL_MULTIPLIER: f32 = 0.2;
pub const RUNNING_CHANCE_BASE: f32 = 0.6;
pub const RUNNING_CHANCE_SKILL_MULTIPLIER: f32 = 0.2;
pub const OPTIMAL_FIRING_RANGE_MIN: f32 = 128.0;
pub const OPTIMAL_FIRING_RANGE_MAX: f32 = 512.0;
pub const LONG_FIRING_RANGE: f32 = 1024.0;
pub const CLOSE_COMBAT_RANGE: f32 = 256.0;
pub const RUNNING_CHANCE_DISTANCE_MULTIPLIER_MEDIUM: f32 = 0.7;
pub const RUNNING_CHANCE_DISTANCE_MULTIPLIER_LONG: f32 = 0.5;
pub const RUNNING_CHANCE_HIGH_SKILL_THRESHOLD: f32 = 0.6;
pub const RUNNING_CHANCE_SKILL_MULTIPLIER_HIGH: f32 = 0.8;
pub const CROUCH_CHANCE_DISTANCE_BONUS_LONG: f32 = 0.1;
pub const CROUCH_CHANCE_DISTANCE_BONUS_VERY_LONG: f32 = 0.1;
pub const CROUCH_CHANCE_DISTANCE_MULTIPLIER_CLOSE: f32 = 0.3;
pub const CROUCH_CHANCE_HIGH_SKILL_THRESHOLD: f32 = 0.7;
pub const CROUCH_CHANCE_SKILL_MULTIPLIER_HIGH: f32 = 0.7;
pub const CROUCH_TIME_MIN_MS: u64 = 800;
pub const CROUCH_TIME_MAX_MS: u64 = 1800;
pub const STAND_TIME_MIN_MS: u64 = 500;
pub const STAND_TIME_MAX_MS: u64 = 1300;
pub const CROUCH_UP_MOVE: i32 = -127;

// Behavior outside combat
pub const RELOAD_FORGET_CHANCE_BASE: f32 = 0.5;
pub const RELOAD_FORGET_CHANCE_SKILL_MULTIPLIER: f32 = 0.4;
pub const RELOAD_DELAY_MIN_MS: u64 = 1000;
pub const RELOAD_DELAY_MAX_MS: u64 = 3000;
pub const WEAPON_SWITCH_CHECK_DELAY_MIN_MS: u64 = 500;
pub const WEAPON_SWITCH_CHECK_DELAY_MAX_MS: u64 = 2000;
pub const TAUNT_DELAY_MS: u64 = 8000;
pub const TAUNT_CHANCE: f64 = 0.2;
pub const IDLE_TIME_BEFORE_DEATH_POS_MS: u64 = 5000;
pub const IDLE_AVOID_RADIUS_MIN: f32 = 512.0;
pub const IDLE_AVOID_RADIUS_SPREAD: f32 = 2048.0;
pub const IDLE_AVOID_PREFERRED_DIR_DISTANCE: f32 = 1024.0;
pub const IDLE_AVOID_JITTER: f32 = 16.0;
pub const LADDER_PITCH_LIMIT: f32 = 80.0;
pub const CURIOUS_ATTRACT_MIN_PRIORITY: i32 = 3;
pub const ATTACK_ATTRACT_MIN_PRIORITY: i32 = 5;
pub const TEAM_JOIN_STAGGER_DIVISOR: f32 = 20.0;
