// fps_bot_core/server/src/systems/ai/controller.rs
// Per-agent orchestration: one call to `think` per simulation frame.

use super::aiming::{AimInputs, AimingModel};
use super::combat_movement::{CombatMoveInputs, CombatMoveResult, CombatMovementController};
use super::commands::parse_command;
use super::fire_control::{CombatDecisionEngine, FireInputs, FireOutcome};
use super::perception::{is_valid_enemy, AgentIdentity, AttackCheck, CuriosityCheck, EnemyPerceptionTracker, NoticeOutcome};
use super::states::{BotStateKind, BotStateMachine, StateHooks};
use super::{chance, crandom, random};
use crate::core::config::BotTuning;
use crate::core::constants::*;
use crate::core::error::BotError;
use crate::core::types::*;
use crate::operational::monitoring::metrics::{
    BOT_COMMANDS_DROPPED_TOTAL, BOT_ENEMY_LOST_TOTAL, BOT_ENGAGEMENTS_TOTAL, BOT_SELF_HEAL_RESETS_TOTAL,
};
use crate::world::{BotMover, BotTurner, HostCommands, WorldQuery};
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// How far a tick got before it was handed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    /// The controlled entity has no client; nothing was submitted.
    NoClient,
    Manual,
    JoiningTeam,
    Dead,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    pub cmd: IntentCommand,
    pub eyes: EyeInfo,
    pub state: Option<BotStateKind>,
    pub phase: TickPhase,
}

/// Leaving combat must never leave the agent crouched or holding an attack button.
struct TransitionHooks<'a> {
    cmd: &'a mut IntentCommand,
    movement: &'a mut CombatMovementController,
}

impl StateHooks for TransitionHooks<'_> {
    fn on_exit(&mut self, state: BotStateKind) {
        if state == BotStateKind::Attack {
            self.movement.reset_to_baseline(self.cmd);
        }
    }

    fn on_enter(&mut self, state: BotStateKind) {
        if state != BotStateKind::Attack {
            self.movement.reset_to_baseline(self.cmd);
        }
    }
}

pub struct BotController {
    handle: EntityHandle,
    name: String,
    skill: Skill,
    tuning: Arc<BotTuning>,
    manual_move: bool,
    taunts: Arc<Vec<String>>,
    rng: StdRng,

    mover: Box<dyn BotMover + Send>,
    turner: Box<dyn BotTurner + Send>,

    states: BotStateMachine,
    perception: EnemyPerceptionTracker,
    aiming: AimingModel,
    fire: CombatDecisionEngine,
    movement: CombatMovementController,

    cmd: IntentCommand,
    eyes: EyeInfo,
    aim_hold_until: Option<TimeMs>,

    last_death_pos: Option<Vec3>,
    last_curious_target: Option<Vec3>,
    next_taunt_at: TimeMs,
    last_weapon_check: Option<TimeMs>,
    last_engagement_end: Option<TimeMs>,

    missing_client_logged: bool,
    missing_weapon_logged: bool,
}

impl BotController {
    pub fn new(
        handle: EntityHandle,
        name: impl Into<String>,
        skill: Skill,
        tuning: Arc<BotTuning>,
        mover: Box<dyn BotMover + Send>,
        turner: Box<dyn BotTurner + Send>,
        rng: StdRng,
    ) -> Self {
        BotController {
            handle,
            name: name.into(),
            skill,
            tuning,
            manual_move: false,
            taunts: Arc::new(Vec::new()),
            rng,
            mover,
            turner,
            states: BotStateMachine::with_initial(BotStateKind::Idle),
            perception: EnemyPerceptionTracker::new(),
            aiming: AimingModel::new(),
            fire: CombatDecisionEngine::new(),
            movement: CombatMovementController::new(),
            cmd: IntentCommand { buttons: BUTTON_RUN, ..IntentCommand::default() },
            eyes: EyeInfo::default(),
            aim_hold_until: None,
            last_death_pos: None,
            last_curious_target: None,
            next_taunt_at: 0,
            last_weapon_check: None,
            last_engagement_end: None,
            missing_client_logged: false,
            missing_weapon_logged: false,
        }
    }

    pub fn with_taunts(mut self, taunts: Arc<Vec<String>>) -> Self {
        self.taunts = taunts;
        self
    }

    pub fn with_manual_move(mut self, manual_move: bool) -> Self {
        self.manual_move = manual_move;
        self
    }

    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn skill(&self) -> Skill {
        self.skill
    }

    pub fn state(&self) -> Option<BotStateKind> {
        self.states.current()
    }

    pub fn state_machine(&self) -> &BotStateMachine {
        &self.states
    }

    pub fn perception(&self) -> &EnemyPerceptionTracker {
        &self.perception
    }

    pub fn movement(&self) -> &CombatMovementController {
        &self.movement
    }

    pub fn fire_control(&self) -> &CombatDecisionEngine {
        &self.fire
    }

    pub fn command(&self) -> &IntentCommand {
        &self.cmd
    }

    pub fn last_death_pos(&self) -> Option<Vec3> {
        self.last_death_pos
    }

    pub fn next_taunt_at(&self) -> TimeMs {
        self.next_taunt_at
    }

    fn output(&self, phase: TickPhase) -> TickOutput {
        TickOutput { cmd: self.cmd, eyes: self.eyes, state: self.states.current(), phase }
    }

    fn submit(&mut self, host: &mut dyn HostCommands, phase: TickPhase) -> TickOutput {
        host.client_think(self.handle, &self.cmd, &self.eyes);
        self.output(phase)
    }

    fn zero_axes(&mut self) {
        self.cmd.forward_move = 0;
        self.cmd.right_move = 0;
        self.cmd.up_move = 0;
    }

    /// Runs one decision tick and hands the resulting intent to the host.
    pub fn think(&mut self, world: &dyn WorldQuery, host: &mut dyn HostCommands) -> TickOutput {
        let now = world.now();
        let Some(client) = world.client_state(self.handle) else {
            if !self.missing_client_logged {
                warn!("[Bot {} ({})]: {}", self.name, self.handle, BotError::MissingEntity("no client, skipping ticks".into()));
                self.missing_client_logged = true;
            }
            return self.output(TickPhase::NoClient);
        };
        self.missing_client_logged = false;

        if self.manual_move {
            self.cmd = IntentCommand { server_time: now, ..IntentCommand::default() };
            self.eyes = EyeInfo::default();
            return self.submit(host, TickPhase::Manual);
        }

        self.cmd.server_time = now;

        if !client.has_primary_choice {
            host.request_primary_weapon(self.handle);
        }

        if !client.team.is_playing() {
            if !host.join_pending(self.handle) {
                let delay_secs = self.handle.index as f32 / TEAM_JOIN_STAGGER_DIVISOR;
                debug!("[Bot {} ({})]: Requesting team join in {:.2}s.", self.name, self.handle, delay_secs);
                host.auto_join_team(self.handle, delay_secs);
            }
            self.zero_axes();
            return self.submit(host, TickPhase::JoiningTeam);
        }

        if client.dead || client.spectator {
            // Pressing attack while dead asks the host for a respawn.
            self.cmd.toggle(BUTTON_ATTACK_PRIMARY);
            self.zero_axes();
            return self.submit(host, TickPhase::Dead);
        }

        self.cmd.press(BUTTON_RUN);
        self.zero_axes();

        let tuning = Arc::clone(&self.tuning);
        let me = AgentIdentity::from_client(self.handle, &client);

        self.validate_and_recover(world, &me, now, &tuning);
        self.update_states(world, &me, now, &tuning);

        let state = self.states.current().unwrap_or(BotStateKind::Idle);
        match state {
            BotStateKind::Attack => self.think_attack(world, host, &client, &me, now, &tuning),
            BotStateKind::Curious => self.think_curious(&client),
            BotStateKind::Idle => self.think_idle(world, host, &client, now, &tuning),
            BotStateKind::Grenade | BotStateKind::Weapon => {}
        }
        if state != BotStateKind::Attack {
            self.movement.reset_to_baseline(&mut self.cmd);
        }

        self.mover.move_think(world, self.handle, &mut self.cmd, self.skill);
        self.turner.turn_think(world, self.handle, &mut self.cmd, &mut self.eyes, self.skill);

        self.check_use(world, &client);
        self.check_valid_weapon(world, host, &client, now, &tuning);

        self.submit(host, TickPhase::Live)
    }

    // --- state selection ---

    fn request_state(&mut self, desired: BotStateKind, now: TimeMs, tuning: &BotTuning) {
        let mut hooks = TransitionHooks { cmd: &mut self.cmd, movement: &mut self.movement };
        if self.states.request(desired, now, &tuning.state, &mut hooks) {
            debug!("[Bot {} ({})]: Entered {} state.", self.name, self.handle, desired);
            if desired == BotStateKind::Attack {
                metrics::counter!(BOT_ENGAGEMENTS_TOTAL).increment(1);
            }
        }
    }

    fn recover_to_idle(&mut self, now: TimeMs, kind: &'static str) {
        let mut hooks = TransitionHooks { cmd: &mut self.cmd, movement: &mut self.movement };
        self.states.recover(BotStateKind::Idle, now, &mut hooks);
        metrics::counter!(BOT_SELF_HEAL_RESETS_TOTAL, "kind" => kind).increment(1);
    }

    /// Self-healing checks against inconsistent external state.
    fn validate_and_recover(&mut self, world: &dyn WorldQuery, me: &AgentIdentity, now: TimeMs, tuning: &BotTuning) {
        if self.states.current().is_none() {
            warn!("[Bot {} ({})]: No current state, recovering to idle.", self.name, self.handle);
            self.recover_to_idle(now, "missing_state");
        }

        if let Some(handle) = self.perception.enemy_handle() {
            let valid = world
                .entity(handle)
                .map_or(false, |view| is_valid_enemy(&view, me, world.team_play()));
            if !valid {
                debug!("[Bot {} ({})]: Tracked enemy {} is no longer valid.", self.name, self.handle, handle);
                self.clear_enemy(now);
            }
        }

        let last_transition = self.states.last_transition();
        let settled_for = |limit: u64| last_transition.map_or(true, |t| now > t + limit);
        match self.states.current() {
            Some(BotStateKind::Attack) => {
                let limit = tuning.state.attack_stuck_ms;
                let timer_stale = self.perception.attack_active_until().map_or(true, |until| now > until + limit);
                if timer_stale && settled_for(limit) {
                    warn!("[Bot {} ({})]: Attack state stuck, resetting to idle.", self.name, self.handle);
                    self.clear_enemy(now);
                    self.mover.clear_move();
                    self.recover_to_idle(now, "attack_stuck");
                }
            }
            Some(BotStateKind::Curious) => {
                let limit = tuning.state.curious_stuck_ms;
                if now > self.perception.curiosity_until() + limit && settled_for(limit) {
                    warn!("[Bot {} ({})]: Curious state stuck, resetting to idle.", self.name, self.handle);
                    self.perception.clear_curiosity();
                    self.last_curious_target = None;
                    self.mover.clear_move();
                    self.recover_to_idle(now, "curious_stuck");
                }
            }
            _ => {}
        }
    }

    fn update_states(&mut self, world: &dyn WorldQuery, me: &AgentIdentity, now: TimeMs, tuning: &BotTuning) {
        let attack = self.perception.check_attack(world, me, &tuning.perception);
        if attack == AttackCheck::Lapsed {
            debug!("[Bot {} ({})]: Attack window lapsed, enemy dropped.", self.name, self.handle);
            metrics::counter!(BOT_ENEMY_LOST_TOTAL).increment(1);
            self.mover.clear_move();
            self.clear_enemy(now);
        }

        let curious = self.perception.check_curious(now);
        if curious == CuriosityCheck::Expired {
            trace!("[Bot {} ({})]: Curiosity expired.", self.name, self.handle);
            self.last_curious_target = None;
            self.mover.clear_move();
        }

        let desired = if attack.is_attacking() {
            BotStateKind::Attack
        } else if curious == CuriosityCheck::Active {
            BotStateKind::Curious
        } else {
            BotStateKind::Idle
        };
        self.request_state(desired, now, tuning);
    }

    // --- attack ---

    fn think_attack(
        &mut self,
        world: &dyn WorldQuery,
        host: &mut dyn HostCommands,
        client: &ClientView,
        me: &AgentIdentity,
        now: TimeMs,
        tuning: &BotTuning,
    ) {
        let Some(record) = self.perception.enemy().copied() else {
            self.perception.disarm_attack();
            return;
        };
        let Some(enemy) = world.entity(record.handle).filter(|view| is_valid_enemy(view, me, world.team_play())) else {
            self.clear_enemy(now);
            return;
        };
        let Some(weapon) = world.active_weapon(self.handle) else {
            if !self.missing_weapon_logged {
                warn!("[Bot {} ({})]: {}", self.name, self.handle, BotError::NoActiveWeapon("attack skipped".into()));
                self.missing_weapon_logged = true;
            }
            self.cmd.release(COMBAT_BUTTONS);
            return;
        };
        self.missing_weapon_logged = false;

        self.perception.begin_attack_tick();
        let max_vision = EnemyPerceptionTracker::max_vision_distance(world, &tuning.perception);
        let can_see = world.can_see(self.handle, enemy.handle, tuning.perception.detection_angle, max_vision);
        let d2 = client.origin.distance_squared(enemy.origin);

        let mut outcome = FireOutcome::idle(&tuning.fire);
        if can_see {
            if self.perception.check_reaction(now, d2, self.skill, &tuning.perception, &mut self.rng) {
                let inputs = FireInputs {
                    now,
                    frame_time_ms: world.frame_time_ms(),
                    skill: self.skill,
                    distance_squared: d2,
                    run_speed: world.run_speed(),
                    client,
                    weapon: &weapon,
                };
                outcome = self.fire.perform_attack(&tuning.fire, &inputs, &mut self.cmd, &mut self.rng);
                if outcome.zoom_off && client.zoomed {
                    host.zoom_off(self.handle);
                }
                if outcome.clear_move {
                    self.mover.clear_move();
                }
                if outcome.engaged {
                    self.perception.refresh_engagement(now, enemy.origin, &tuning.perception);
                    self.aim_hold_until = Some(now + tuning.fire.aim_hold_ms);
                }
            } else {
                trace!("[Bot {} ({})]: Reacting to {}.", self.name, self.handle, enemy.handle);
                self.cmd.release(COMBAT_BUTTONS);
                self.fire.cease_fire();
            }
        } else {
            self.cmd.release(COMBAT_BUTTONS);
            self.fire.cease_fire();
            self.perception.note_unseen(now, &tuning.perception);
        }

        let aim_hold = self.aim_hold_until.map_or(false, |until| now < until);
        let last_position = self.perception.enemy().map_or(enemy.origin, |e| e.last_position);
        if can_see || aim_hold {
            let inputs = AimInputs {
                skill: self.skill,
                distance_squared: d2,
                own_speed: client.velocity.length(),
                crouching: self.movement.is_crouched(),
                wants_to_run: self.movement.wants_to_run(),
                weapon_spread: Some(weapon.spread),
                continuous_fire_ms: self.fire.continuous_fire_ms(),
                target_speed: enemy.velocity.length(),
                firing: outcome.firing,
            };
            self.aim_at_enemy(world, &enemy, can_see, last_position, &inputs, now, tuning);
        } else {
            self.aim_at_aim_node(client);
        }

        let move_inputs = CombatMoveInputs {
            now,
            skill: self.skill,
            can_see,
            aim_hold_active: aim_hold,
            attacking: true,
            firing: outcome.firing,
            melee: outcome.melee,
            no_move: outcome.no_move,
            min_distance_squared: outcome.min_distance_squared,
            distance_squared: d2,
            enemy_position: last_position,
            enemy_moved: self.perception.enemy_moved(),
            last_fire_time: self.fire.last_fire_time(),
            forward: client.forward,
        };
        let result = self.movement.perform(
            &tuning.stance,
            &tuning.strafe,
            &move_inputs,
            self.mover.as_mut(),
            &mut self.cmd,
            &mut self.rng,
        );
        match result {
            CombatMoveResult::EnemyLost => {
                debug!("[Bot {} ({})]: Lost track of {}.", self.name, self.handle, enemy.handle);
                metrics::counter!(BOT_ENEMY_LOST_TOTAL).increment(1);
                self.clear_enemy(now);
            }
            CombatMoveResult::Continue { moving: true } => {
                self.perception.extend_attack(now + tuning.perception.attack_active_ms);
            }
            CombatMoveResult::Continue { moving: false } => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn aim_at_enemy(
        &mut self,
        world: &dyn WorldQuery,
        enemy: &EntityView,
        can_see: bool,
        last_position: Vec3,
        inputs: &AimInputs,
        now: TimeMs,
        tuning: &BotTuning,
    ) {
        let eye_point = self
            .perception
            .resolve_eye_tag(world)
            .and_then(|tag| world.tag_origin(enemy.handle, tag));
        let offset = self.aiming.update(now, &tuning.aim, inputs, enemy, eye_point.is_some(), &mut self.rng);
        let base = if can_see {
            eye_point.unwrap_or(enemy.origin)
        } else {
            let eye_height = eye_point.map_or(0.0, |eye| eye.z - enemy.origin.z);
            last_position + Vec3::new(0.0, 0.0, eye_height)
        };
        self.turner.aim_at(base + offset);
    }

    /// Faces the current path heading while moving.
    fn aim_at_aim_node(&mut self, client: &ClientView) {
        if !self.mover.is_moving() {
            return;
        }
        let direction = self.mover.current_path_direction();
        if direction.is_zero() {
            return;
        }
        let mut angles = direction.to_angles();
        if client.on_ladder {
            angles.x = angles.x.clamp(-LADDER_PITCH_LIMIT, LADDER_PITCH_LIMIT);
        } else {
            angles.x = 0.0;
        }
        self.turner.set_target_angles(angles);
    }

    // --- curious ---

    fn think_curious(&mut self, client: &ClientView) {
        self.aim_at_aim_node(client);
        let Some(curiosity) = self.perception.curiosity() else { return };
        if self.mover.move_to_best_attractive_point(CURIOUS_ATTRACT_MIN_PRIORITY) {
            return;
        }
        let target_changed = self.last_curious_target != Some(curiosity.target);
        if !self.mover.is_moving() || target_changed {
            self.mover.move_to(curiosity.target);
            self.last_curious_target = Some(curiosity.target);
        }
        if self.mover.move_done() {
            trace!("[Bot {} ({})]: Reached point of interest.", self.name, self.handle);
            self.perception.clear_curiosity();
            self.last_curious_target = None;
        }
    }

    // --- idle ---

    fn think_idle(
        &mut self,
        world: &dyn WorldQuery,
        host: &mut dyn HostCommands,
        client: &ClientView,
        now: TimeMs,
        tuning: &BotTuning,
    ) {
        self.check_reload(world, host, now, tuning);
        self.aim_at_aim_node(client);

        if self.mover.move_to_best_attractive_point(0) || self.mover.is_moving() {
            return;
        }

        let rested = self
            .last_engagement_end
            .map_or(true, |end| now >= end + tuning.behavior.idle_before_death_pos_ms);
        match self.last_death_pos {
            Some(death_pos) if rested => {
                self.mover.move_to(death_pos);
                if self.mover.move_done() {
                    trace!("[Bot {} ({})]: Back at the death point.", self.name, self.handle);
                    self.last_death_pos = None;
                }
            }
            _ => {
                let jitter = Vec3::new(
                    crandom(&mut self.rng, IDLE_AVOID_JITTER),
                    crandom(&mut self.rng, IDLE_AVOID_JITTER),
                    0.0,
                );
                let radius = IDLE_AVOID_RADIUS_MIN + random(&mut self.rng, IDLE_AVOID_RADIUS_SPREAD);
                let forward_sign = if self.rng.gen_range(0..5) == 0 { -1.0 } else { 1.0 };
                let right_sign = if self.rng.gen_bool(0.5) { -1.0 } else { 1.0 };
                let preferred = client.forward * (IDLE_AVOID_PREFERRED_DIR_DISTANCE * forward_sign)
                    + client.right * (IDLE_AVOID_PREFERRED_DIR_DISTANCE * right_sign);
                self.mover.avoid_path(client.origin + jitter, radius, preferred);
            }
        }
    }

    fn check_reload(&mut self, world: &dyn WorldQuery, host: &mut dyn HostCommands, now: TimeMs, tuning: &BotTuning) {
        if self.cmd.has(BUTTON_ATTACK_PRIMARY) {
            return;
        }
        let Some(weapon) = world.active_weapon(self.handle) else { return };
        if !weapon.needs_reload {
            return;
        }
        let behavior = &tuning.behavior;
        let forget = behavior.reload_forget_base - self.skill.value() * behavior.reload_forget_skill;
        if chance(&mut self.rng, forget) {
            return;
        }
        let delay_ms = behavior.reload_delay_min_ms
            + (self.skill.inverse() * (behavior.reload_delay_max_ms - behavior.reload_delay_min_ms) as f32) as u64;
        if self.fire.last_fire_time().map_or(false, |last| now < last + delay_ms) {
            return;
        }
        self.send_command(host, "reload");
    }

    // --- per-tick housekeeping ---

    fn check_use(&mut self, world: &dyn WorldQuery, client: &ClientView) {
        match world.use_target(self.handle) {
            UseTarget::ClosedDoor | UseTarget::Ladder if !client.on_ladder => self.cmd.toggle(BUTTON_USE),
            _ => self.cmd.release(BUTTON_USE),
        }
    }

    fn check_valid_weapon(
        &mut self,
        world: &dyn WorldQuery,
        host: &mut dyn HostCommands,
        client: &ClientView,
        now: TimeMs,
        tuning: &BotTuning,
    ) {
        let active = world.active_weapon(self.handle);
        let needs_switch = match active {
            None => true,
            Some(weapon) => !weapon.has_primary_ammo && !client.weapon_switch_pending,
        };
        if !needs_switch {
            return;
        }

        let behavior = &tuning.behavior;
        let interval_ms = behavior.weapon_check_min_ms
            + (self.skill.inverse() * (behavior.weapon_check_max_ms - behavior.weapon_check_min_ms) as f32) as u64;
        if self.last_weapon_check.map_or(false, |last| now < last + interval_ms) {
            return;
        }
        self.last_weapon_check = Some(now);

        let inventory = world.inventory(self.handle);
        let Some(choice) = best_weapon(&inventory) else { return };
        if active.map_or(true, |weapon| weapon.id != choice) {
            debug!("[Bot {} ({})]: Switching to weapon {:?}.", self.name, self.handle, choice);
            host.use_weapon(self.handle, choice);
        }
    }

    // --- notifications ---

    pub fn spawned(&mut self, now: TimeMs) {
        self.clear_enemy(now);
        self.perception.clear_curiosity();
        self.last_curious_target = None;
        self.mover.clear_move();
        self.aiming.reset();
        self.fire.reset();
        self.cmd.buttons = 0;
        debug!("[Bot {} ({})]: Spawned.", self.name, self.handle);
    }

    pub fn killed(&mut self, world: &dyn WorldQuery, host: &mut dyn HostCommands, attacker: Option<EntityHandle>) {
        self.cmd.toggle(BUTTON_ATTACK_PRIMARY);
        self.eyes = EyeInfo::default();

        let attacker_origin = attacker.and_then(|a| world.entity(a)).map(|view| view.origin);
        let own_origin = world.entity(self.handle).map(|view| view.origin);
        self.last_death_pos = match attacker_origin {
            Some(origin) if self.rng.gen_bool(0.5) => Some(origin),
            _ => own_origin,
        };
        host.request_primary_weapon(self.handle);
        debug!("[Bot {} ({})]: Killed, will return to {:?}.", self.name, self.handle, self.last_death_pos);
    }

    pub fn got_kill(&mut self, now: TimeMs, host: &mut dyn HostCommands) {
        self.clear_enemy(now);
        self.perception.clear_curiosity();
        self.last_curious_target = None;

        if now < self.next_taunt_at || self.taunts.is_empty() {
            return;
        }
        if self.rng.gen_bool(self.tuning.behavior.taunt_chance) {
            let taunt = &self.taunts[self.rng.gen_range(0..self.taunts.len())];
            host.send_message(self.handle, taunt);
            self.next_taunt_at = now + self.tuning.behavior.taunt_delay_ms;
        }
    }

    pub fn stuff_text(&mut self, host: &mut dyn HostCommands, text: &str) -> bool {
        self.send_command(host, text)
    }

    pub fn notice_event(&mut self, world: &dyn WorldQuery, event: &NoticeEvent) -> NoticeOutcome {
        let Some(client) = world.client_state(self.handle) else {
            return NoticeOutcome::Ignored;
        };
        let me = AgentIdentity::from_client(self.handle, &client);
        let tuning = Arc::clone(&self.tuning);
        let outcome = self.perception.notice_event(world, &me, event, &tuning.perception, &mut self.rng);
        match outcome {
            NoticeOutcome::Engaged => self.mover.clear_move(),
            NoticeOutcome::Curious => {
                trace!("[Bot {} ({})]: Curious about {:?} event.", self.name, self.handle, event.kind)
            }
            NoticeOutcome::Ignored => {}
        }
        outcome
    }

    /// Issues console text as if typed by the agent. Failures never reach the caller.
    pub fn send_command(&mut self, host: &mut dyn HostCommands, text: &str) -> bool {
        let result = parse_command(text).and_then(|parsed| match host.lookup_command(&parsed.name) {
            None => Err(BotError::UnknownCommand(parsed.name)),
            Some(info) if !info.console => Err(BotError::NotConsoleCommand(parsed.name)),
            Some(_) => host.dispatch_console(self.handle, &parsed.name, &parsed.args),
        });
        match result {
            Ok(()) => true,
            Err(err @ BotError::CommandFailed(_)) => {
                warn!("[Bot {} ({})]: Command {:?} failed: {}", self.name, self.handle, text, err);
                metrics::counter!(BOT_COMMANDS_DROPPED_TOTAL).increment(1);
                false
            }
            Err(err) => {
                debug!("[Bot {} ({})]: Dropping command {:?}: {}", self.name, self.handle, text, err);
                metrics::counter!(BOT_COMMANDS_DROPPED_TOTAL).increment(1);
                false
            }
        }
    }

    /// Drops the engagement and returns movement to its baseline.
    fn clear_enemy(&mut self, now: TimeMs) {
        let was_engaged = self.perception.clear_enemy();
        self.movement.clear(&mut self.cmd);
        self.cmd.release(COMBAT_BUTTONS);
        self.fire.cease_fire();
        self.aim_hold_until = None;
        if was_engaged {
            self.last_engagement_end = Some(now);
        }
    }
}

/// Highest-ranked usable ranged weapon, else the best melee weapon. Later
/// entries win rank ties.
pub fn best_weapon(inventory: &[InventoryWeapon]) -> Option<WeaponId> {
    let pick = |filter: &dyn Fn(&InventoryWeapon) -> bool| {
        inventory
            .iter()
            .filter(|w| filter(w))
            .fold(None, |best: Option<&InventoryWeapon>, w| match best {
                Some(b) if b.rank > w.rank => Some(b),
                _ => Some(w),
            })
            .map(|w| w.id)
    };
    pick(&|w| !w.throwable && !w.inventory_item && w.has_primary_ammo)
        .or_else(|| pick(&|w| w.secondary_melee && !w.throwable && !w.inventory_item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::{SimHost, SimMover, SimTurner, SimWorld};
    use rand::SeedableRng;

    fn controller(world: &mut SimWorld, team: Team, skill: f32) -> BotController {
        let handle = world.spawn_player(team, Vec3::ZERO);
        BotController::new(
            handle,
            "Test",
            Skill::new(skill),
            Arc::new(BotTuning::default()),
            Box::new(SimMover::new()),
            Box::new(SimTurner::new()),
            StdRng::seed_from_u64(9),
        )
    }

    fn weapon(id: u32, rank: i32) -> InventoryWeapon {
        InventoryWeapon {
            id: WeaponId(id),
            rank,
            throwable: false,
            inventory_item: false,
            has_primary_ammo: true,
            secondary_melee: false,
        }
    }

    #[test]
    fn test_manual_move_emits_zero_intent() {
        let mut world = SimWorld::new();
        world.set_time(500);
        let mut host = SimHost::new();
        let mut bot = controller(&mut world, Team::Allies, 0.5).with_manual_move(true);
        let out = bot.think(&world, &mut host);
        assert_eq!(out.phase, TickPhase::Manual);
        assert_eq!(out.cmd, IntentCommand { server_time: 500, ..IntentCommand::default() });
        assert_eq!(host.thinks.len(), 1);
    }

    #[test]
    fn test_unassigned_agent_joins_with_stagger_once() {
        let mut world = SimWorld::new();
        for _ in 0..3 {
            world.spawn_player(Team::Allies, Vec3::new(5000.0, 0.0, 0.0));
        }
        let mut host = SimHost::new();
        let mut bot = controller(&mut world, Team::None, 0.5);
        world.with_client(bot.handle(), |c| c.has_primary_choice = false);

        assert_eq!(bot.think(&world, &mut host).phase, TickPhase::JoiningTeam);
        assert_eq!(bot.think(&world, &mut host).phase, TickPhase::JoiningTeam);
        assert_eq!(host.join_requests.len(), 1);
        assert!((host.join_requests[0].1 - 3.0 / 20.0).abs() < 1e-6);
        assert_eq!(host.primary_requests.len(), 2);
        assert_eq!(host.thinks.len(), 2);
    }

    #[test]
    fn test_dead_agent_toggles_respawn_input() {
        let mut world = SimWorld::new();
        let mut host = SimHost::new();
        let mut bot = controller(&mut world, Team::Allies, 0.5);
        world.set_dead(bot.handle(), true);
        let first = bot.think(&world, &mut host);
        let second = bot.think(&world, &mut host);
        assert_eq!(first.phase, TickPhase::Dead);
        assert_ne!(first.cmd.has(BUTTON_ATTACK_PRIMARY), second.cmd.has(BUTTON_ATTACK_PRIMARY));
    }

    #[test]
    fn test_missing_client_skips_submission() {
        let mut world = SimWorld::new();
        let mut host = SimHost::new();
        let mut bot = controller(&mut world, Team::Allies, 0.5);
        world.remove(bot.handle());
        assert_eq!(bot.think(&world, &mut host).phase, TickPhase::NoClient);
        assert!(host.thinks.is_empty());
    }

    #[test]
    fn test_command_channel_drops_bad_commands() {
        let mut world = SimWorld::new();
        let mut host = SimHost::new();
        host.failing_commands.insert("kill".into());
        let mut bot = controller(&mut world, Team::Allies, 0.5);

        assert!(bot.send_command(&mut host, "say \"good game\""));
        assert!(!bot.send_command(&mut host, "noclip"));
        assert!(!bot.send_command(&mut host, "teleport 1 2 3"));
        assert!(!bot.send_command(&mut host, "say \"unterminated"));
        assert!(!bot.send_command(&mut host, "kill"));
        assert_eq!(host.console_commands_for(bot.handle()), vec!["say"]);
        assert_eq!(host.console_log[0].2, vec!["good game".to_string()]);
    }

    #[test]
    fn test_best_weapon_prefers_rank_then_melee() {
        let mut melee = weapon(9, 1);
        melee.has_primary_ammo = false;
        melee.secondary_melee = true;
        let mut grenade = weapon(5, 50);
        grenade.throwable = true;
        let mut empty = weapon(6, 40);
        empty.has_primary_ammo = false;

        let inventory = vec![weapon(1, 10), grenade, weapon(2, 20), empty, weapon(3, 20), melee];
        assert_eq!(best_weapon(&inventory), Some(WeaponId(3)));
        assert_eq!(best_weapon(&[grenade, empty, melee]), Some(WeaponId(9)));
        assert_eq!(best_weapon(&[grenade]), None);
    }

    #[test]
    fn test_weapon_check_is_rate_limited_per_agent() {
        let mut world = SimWorld::new();
        let mut host = SimHost::new();
        let mut bot = controller(&mut world, Team::Allies, 0.0);
        let handle = bot.handle();
        world.set_weapon(handle, None);
        world.get_mut(handle).expect("bot").inventory = vec![weapon(4, 10)];

        bot.think(&world, &mut host);
        world.advance(1000);
        bot.think(&world, &mut host);
        assert_eq!(host.weapon_uses, vec![(handle, WeaponId(4))]);
        world.advance(1000);
        bot.think(&world, &mut host);
        assert_eq!(host.weapon_uses.len(), 2);
    }

    fn identity(world: &SimWorld, handle: EntityHandle) -> AgentIdentity {
        let client = world.client_state(handle).expect("bot client");
        AgentIdentity::from_client(handle, &client)
    }

    fn heard(position: Vec3, kind: EventKind, originator: EntityHandle) -> NoticeEvent {
        NoticeEvent { position, kind, originator, distance_squared: 0.0, radius_squared: 2048.0 * 2048.0 }
    }

    #[test]
    fn test_stuck_attack_is_reset_after_ceiling() {
        let mut world = SimWorld::new();
        let mut bot = controller(&mut world, Team::Allies, 0.5);
        let handle = bot.handle();
        let enemy = world.spawn_player(Team::Axis, Vec3::new(800.0, 0.0, 0.0));
        world.set_sight_blocked(handle, enemy, true);
        world.set_time(1000);

        let event = heard(Vec3::new(800.0, 0.0, 0.0), EventKind::WeaponFire, enemy);
        assert_eq!(bot.notice_event(&world, &event), NoticeOutcome::Engaged);
        // Attack entered outside the normal flow, with a move still queued.
        bot.states = BotStateMachine::with_initial(BotStateKind::Attack);
        bot.mover.move_to(Vec3::new(800.0, 0.0, 0.0));
        assert!(bot.mover.is_moving());

        let tuning = Arc::clone(&bot.tuning);
        let me = identity(&world, handle);
        let until = bot.perception().attack_active_until().expect("attack window armed");

        world.set_time(until + tuning.state.attack_stuck_ms);
        bot.validate_and_recover(&world, &me, world.now(), &tuning);
        assert_eq!(bot.state(), Some(BotStateKind::Attack));
        assert_eq!(bot.perception().enemy_handle(), Some(enemy));

        world.advance(50);
        bot.validate_and_recover(&world, &me, world.now(), &tuning);
        assert_eq!(bot.state(), Some(BotStateKind::Idle));
        assert_eq!(bot.state_machine().last_transition(), Some(world.now()));
        assert!(bot.perception().enemy_handle().is_none());
        assert!(bot.perception().attack_active_until().is_none());
        assert!(!bot.mover.is_moving());
        assert!(!bot.command().has(COMBAT_BUTTONS));
    }

    #[test]
    fn test_fresh_attack_without_timer_is_left_alone() {
        let mut world = SimWorld::new();
        let mut bot = controller(&mut world, Team::Allies, 0.5);
        let handle = bot.handle();
        world.set_time(60_000);
        let tuning = Arc::clone(&bot.tuning);
        let me = identity(&world, handle);

        let mut hooks = TransitionHooks { cmd: &mut bot.cmd, movement: &mut bot.movement };
        bot.states.recover(BotStateKind::Attack, world.now(), &mut hooks);
        world.advance(tuning.state.attack_stuck_ms);
        bot.validate_and_recover(&world, &me, world.now(), &tuning);
        assert_eq!(bot.state(), Some(BotStateKind::Attack));

        world.advance(50);
        bot.validate_and_recover(&world, &me, world.now(), &tuning);
        assert_eq!(bot.state(), Some(BotStateKind::Idle));
    }

    #[test]
    fn test_stuck_curiosity_is_reset_after_ceiling() {
        let mut world = SimWorld::new();
        let mut bot = controller(&mut world, Team::Allies, 0.5);
        let handle = bot.handle();
        let target = Vec3::new(3000.0, 0.0, 0.0);
        let noise = world.spawn(EntityKind::Other, target);
        world.set_time(1000);

        assert_eq!(bot.notice_event(&world, &heard(target, EventKind::Misc, noise)), NoticeOutcome::Curious);
        // The target is never reached and the state never left.
        bot.states = BotStateMachine::with_initial(BotStateKind::Curious);
        bot.last_curious_target = Some(target);
        bot.mover.move_to(target);

        let tuning = Arc::clone(&bot.tuning);
        let me = identity(&world, handle);
        let until = bot.perception().curiosity_until();
        assert_eq!(until, 1000 + tuning.perception.curious_minor_event_ms);

        world.set_time(until + tuning.state.curious_stuck_ms);
        bot.validate_and_recover(&world, &me, world.now(), &tuning);
        assert_eq!(bot.state(), Some(BotStateKind::Curious));

        world.advance(50);
        bot.validate_and_recover(&world, &me, world.now(), &tuning);
        assert_eq!(bot.state(), Some(BotStateKind::Idle));
        assert!(bot.perception().curiosity().is_none());
        assert_eq!(bot.perception().curiosity_target(), Vec3::ZERO);
        assert!(bot.last_curious_target.is_none());
        assert!(!bot.mover.is_moving());
    }

    #[test]
    fn test_idle_agent_reloads_only_when_needed() {
        let mut world = SimWorld::new();
        let mut host = SimHost::new();
        let mut bot = controller(&mut world, Team::Allies, 1.0);
        let handle = bot.handle();

        for _ in 0..5 {
            bot.think(&world, &mut host);
        }
        assert!(host.console_commands_for(handle).is_empty());

        let mut rifle = crate::world::sim::automatic_rifle();
        rifle.needs_reload = true;
        world.set_weapon(handle, Some(rifle));
        for _ in 0..5 {
            bot.think(&world, &mut host);
        }
        assert_eq!(bot.state(), Some(BotStateKind::Idle));
        assert!(host.console_commands_for(handle).contains(&"reload"));
    }

    #[test]
    fn test_use_toggles_at_doors_but_not_on_ladders() {
        let mut world = SimWorld::new();
        let mut host = SimHost::new();
        let mut bot = controller(&mut world, Team::Allies, 0.5);
        let handle = bot.handle();
        world.get_mut(handle).expect("bot").use_target = UseTarget::ClosedDoor;
        let first = bot.think(&world, &mut host);
        let second = bot.think(&world, &mut host);
        assert!(first.cmd.has(BUTTON_USE));
        assert!(!second.cmd.has(BUTTON_USE));

        world.with_client(handle, |c| c.on_ladder = true);
        bot.think(&world, &mut host);
        assert!(!bot.think(&world, &mut host).cmd.has(BUTTON_USE));
    }

    #[test]
    fn test_taunts_are_rate_limited() {
        let mut world = SimWorld::new();
        let mut host = SimHost::new();
        let tuning = BotTuning {
            behavior: crate::core::config::BehaviorTuning { taunt_chance: 1.0, ..Default::default() },
            ..BotTuning::default()
        };
        let handle = world.spawn_player(Team::Allies, Vec3::ZERO);
        let mut bot = BotController::new(
            handle,
            "Taunter",
            Skill::new(0.5),
            Arc::new(tuning),
            Box::new(SimMover::new()),
            Box::new(SimTurner::new()),
            StdRng::seed_from_u64(1),
        )
        .with_taunts(Arc::new(vec!["*51".to_string()]));

        bot.got_kill(1000, &mut host);
        bot.got_kill(5000, &mut host);
        bot.got_kill(9000, &mut host);
        assert_eq!(host.messages.len(), 2);
        assert_eq!(bot.next_taunt_at(), 17_000);
    }
}
