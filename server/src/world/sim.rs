// fps_bot_core/server/src/world/sim.rs
// In-memory host used by the demo binary and the test suites.

use super::{BotMover, BotTurner, CommandInfo, HostCommands, WorldQuery};
use crate::core::error::{BotError, BotResult};
use crate::core::types::*;
use std::collections::{HashMap, HashSet};
use tracing::trace;

pub const SIM_DEFAULT_VIEW_HEIGHT: f32 = 82.0;
pub const SIM_ARRIVAL_RADIUS: f32 = 32.0;

#[derive(Debug, Clone)]
pub struct SimEntity {
    pub view: EntityView,
    pub client: Option<ClientView>,
    pub weapon: Option<WeaponStats>,
    pub inventory: Vec<InventoryWeapon>,
    pub has_eyes: bool,
    pub use_target: UseTarget,
}

/// Slot table with generation counters, so stale handles resolve to nothing.
pub struct SimWorld {
    now: TimeMs,
    frame_time_ms: u64,
    pub team_play: bool,
    pub vision_distance: f32,
    pub far_plane_distance: f32,
    pub run_speed: f32,
    slots: Vec<Option<SimEntity>>,
    generations: Vec<u32>,
    blocked_sight: HashSet<(EntityHandle, EntityHandle)>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    pub fn new() -> Self {
        SimWorld {
            now: 0,
            frame_time_ms: crate::core::constants::TICK_DURATION_MS,
            team_play: true,
            vision_distance: 8192.0,
            far_plane_distance: 8192.0,
            run_speed: 287.0,
            slots: Vec::new(),
            generations: Vec::new(),
            blocked_sight: HashSet::new(),
        }
    }

    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }

    pub fn set_time(&mut self, now: TimeMs) {
        self.now = now;
    }

    pub fn set_frame_time(&mut self, ms: u64) {
        self.frame_time_ms = ms;
    }

    pub fn spawn(&mut self, kind: EntityKind, origin: Vec3) -> EntityHandle {
        let index = match self.slots.iter().position(Option::is_none) {
            Some(free) => free,
            None => {
                self.slots.push(None);
                self.generations.push(0);
                self.slots.len() - 1
            }
        };
        self.generations[index] += 1;
        let handle = EntityHandle::new(index as u32, self.generations[index]);
        let view = EntityView {
            handle,
            kind,
            origin,
            velocity: Vec3::ZERO,
            mins: Vec3::new(-15.0, -15.0, 0.0),
            maxs: Vec3::new(15.0, 15.0, 96.0),
            view_height: SIM_DEFAULT_VIEW_HEIGHT,
            hidden: false,
            no_target: false,
            dead: false,
            solid: true,
        };
        let client = match kind {
            EntityKind::Player { team } => Some(ClientView {
                name_index: index as u32,
                team,
                faction: 0,
                has_primary_choice: true,
                origin,
                forward: Vec3::new(1.0, 0.0, 0.0),
                right: Vec3::new(0.0, -1.0, 0.0),
                view_height: SIM_DEFAULT_VIEW_HEIGHT,
                ammo: 90,
                clip_ammo: 30,
                view_model_idle: true,
                ..ClientView::default()
            }),
            _ => None,
        };
        let weapon = client.as_ref().map(|_| automatic_rifle());
        self.slots[index] = Some(SimEntity {
            view,
            client,
            weapon,
            inventory: Vec::new(),
            has_eyes: true,
            use_target: UseTarget::Nothing,
        });
        trace!("sim: spawned {:?} as {}", kind, handle);
        handle
    }

    pub fn spawn_player(&mut self, team: Team, origin: Vec3) -> EntityHandle {
        self.spawn(EntityKind::Player { team }, origin)
    }

    pub fn spawn_npc(&mut self, faction: u8, origin: Vec3) -> EntityHandle {
        self.spawn(EntityKind::Npc { faction }, origin)
    }

    pub fn remove(&mut self, handle: EntityHandle) -> bool {
        if self.get(handle).is_none() {
            return false;
        }
        self.slots[handle.index as usize] = None;
        true
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&SimEntity> {
        let index = handle.index as usize;
        if self.generations.get(index) != Some(&handle.generation) {
            return None;
        }
        self.slots.get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut SimEntity> {
        let index = handle.index as usize;
        if self.generations.get(index) != Some(&handle.generation) {
            return None;
        }
        self.slots.get_mut(index)?.as_mut()
    }

    pub fn set_origin(&mut self, handle: EntityHandle, origin: Vec3) {
        if let Some(ent) = self.get_mut(handle) {
            ent.view.origin = origin;
        }
    }

    pub fn set_velocity(&mut self, handle: EntityHandle, velocity: Vec3) {
        if let Some(ent) = self.get_mut(handle) {
            ent.view.velocity = velocity;
        }
    }

    pub fn set_dead(&mut self, handle: EntityHandle, dead: bool) {
        if let Some(ent) = self.get_mut(handle) {
            ent.view.dead = dead;
            if let Some(client) = ent.client.as_mut() {
                client.dead = dead;
            }
        }
    }

    pub fn set_team(&mut self, handle: EntityHandle, team: Team) {
        if let Some(ent) = self.get_mut(handle) {
            if let EntityKind::Player { team: current } = &mut ent.view.kind {
                *current = team;
            }
            if let Some(client) = ent.client.as_mut() {
                client.team = team;
            }
        }
    }

    pub fn set_weapon(&mut self, handle: EntityHandle, weapon: Option<WeaponStats>) {
        if let Some(ent) = self.get_mut(handle) {
            ent.weapon = weapon;
        }
    }

    pub fn with_client(&mut self, handle: EntityHandle, f: impl FnOnce(&mut ClientView)) {
        if let Some(client) = self.get_mut(handle).and_then(|ent| ent.client.as_mut()) {
            f(client);
        }
    }

    pub fn set_sight_blocked(&mut self, viewer: EntityHandle, target: EntityHandle, blocked: bool) {
        if blocked {
            self.blocked_sight.insert((viewer, target));
        } else {
            self.blocked_sight.remove(&(viewer, target));
        }
    }

    /// Applies an intent to a player: turns it to the commanded yaw and moves
    /// it along its forward/right axes at run speed.
    pub fn integrate(&mut self, handle: EntityHandle, cmd: &IntentCommand, dt_secs: f32) {
        let run_speed = self.run_speed;
        let Some(ent) = self.get_mut(handle) else { return };
        if ent.view.dead {
            return;
        }
        let yaw = cmd.angles.y.to_radians();
        let forward = Vec3::new(yaw.cos(), yaw.sin(), 0.0);
        let right = Vec3::new(yaw.sin(), -yaw.cos(), 0.0);
        let speed = if cmd.has(BUTTON_RUN) { run_speed } else { run_speed * 0.5 };
        let fwd = cmd.forward_move as f32 / MOVE_AXIS_MAX as f32;
        let side = cmd.right_move as f32 / MOVE_AXIS_MAX as f32;
        let velocity = (forward * fwd + right * side) * speed;
        ent.view.velocity = velocity;
        ent.view.origin += velocity * dt_secs;
        if let Some(client) = ent.client.as_mut() {
            client.forward = forward;
            client.right = right;
        }
    }
}

impl WorldQuery for SimWorld {
    fn now(&self) -> TimeMs {
        self.now
    }

    fn frame_time_ms(&self) -> u64 {
        self.frame_time_ms
    }

    fn team_play(&self) -> bool {
        self.team_play
    }

    fn vision_distance(&self) -> f32 {
        self.vision_distance
    }

    fn far_plane_distance(&self) -> f32 {
        self.far_plane_distance
    }

    fn run_speed(&self) -> f32 {
        self.run_speed
    }

    fn entity(&self, handle: EntityHandle) -> Option<EntityView> {
        self.get(handle).map(|ent| ent.view)
    }

    fn sentients(&self) -> Vec<EntityHandle> {
        self.slots
            .iter()
            .flatten()
            .filter(|ent| ent.view.is_sentient())
            .map(|ent| ent.view.handle)
            .collect()
    }

    fn can_see(&self, viewer: EntityHandle, target: EntityHandle, fov_deg: f32, max_distance: f32) -> bool {
        let (Some(v), Some(t)) = (self.get(viewer), self.get(target)) else {
            return false;
        };
        if self.blocked_sight.contains(&(viewer, target)) {
            return false;
        }
        let delta = t.view.origin - v.view.origin;
        if delta.length_squared() > max_distance * max_distance {
            return false;
        }
        let forward = v.client.map(|c| c.forward).unwrap_or(Vec3::ZERO);
        if forward.is_zero() || delta.is_zero() {
            return true;
        }
        let cos_half_fov = (fov_deg * 0.5).to_radians().cos();
        forward.normalized().dot(delta.normalized()) >= cos_half_fov
    }

    fn client_state(&self, me: EntityHandle) -> Option<ClientView> {
        let ent = self.get(me)?;
        let mut client = ent.client?;
        client.origin = ent.view.origin;
        client.velocity = ent.view.velocity;
        client.view_height = ent.view.view_height;
        client.dead = ent.view.dead;
        Some(client)
    }

    fn active_weapon(&self, me: EntityHandle) -> Option<WeaponStats> {
        self.get(me)?.weapon
    }

    fn inventory(&self, me: EntityHandle) -> Vec<InventoryWeapon> {
        self.get(me).map(|ent| ent.inventory.clone()).unwrap_or_default()
    }

    fn eye_tag(&self, target: EntityHandle) -> Option<TagId> {
        self.get(target).filter(|ent| ent.has_eyes).map(|_| TagId(0))
    }

    fn tag_origin(&self, target: EntityHandle, _tag: TagId) -> Option<Vec3> {
        let ent = self.get(target)?;
        Some(ent.view.origin + Vec3::new(0.0, 0.0, ent.view.view_height))
    }

    fn use_target(&self, me: EntityHandle) -> UseTarget {
        self.get(me).map(|ent| ent.use_target).unwrap_or_default()
    }
}

pub fn automatic_rifle() -> WeaponStats {
    WeaponStats {
        id: WeaponId(1),
        fire_delay_secs: 0.1,
        primary_range: 4000.0,
        secondary_range: 64.0,
        spread: 0.3,
        semi_auto: false,
        secondary_melee: true,
        has_zoom: false,
        max_fire_movement: 1.0,
        max_fire_movement_mult: 1.0,
        has_ammo_in_clip: true,
        has_primary_ammo: true,
        needs_reload: false,
    }
}

pub fn semi_auto_rifle() -> WeaponStats {
    WeaponStats {
        id: WeaponId(2),
        fire_delay_secs: 0.4,
        primary_range: 8000.0,
        secondary_range: 0.0,
        spread: 0.1,
        semi_auto: true,
        secondary_melee: false,
        has_zoom: false,
        max_fire_movement: 1.0,
        max_fire_movement_mult: 1.0,
        has_ammo_in_clip: true,
        has_primary_ammo: true,
        needs_reload: false,
    }
}

/// Straight-line mover: walks directly at its goal.
#[derive(Debug, Default)]
pub struct SimMover {
    goal: Option<Vec3>,
    path_dir: Vec3,
    last_origin: Vec3,
    pursuing_attractive: bool,
    pub attractive_points: Vec<(i32, Vec3)>,
}

impl SimMover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn goal(&self) -> Option<Vec3> {
        self.goal
    }

    fn set_goal(&mut self, goal: Vec3) {
        if goal.distance_squared(self.last_origin) <= SIM_ARRIVAL_RADIUS * SIM_ARRIVAL_RADIUS {
            self.goal = None;
            return;
        }
        self.goal = Some(goal);
        self.path_dir = (goal - self.last_origin).normalized();
    }
}

impl BotMover for SimMover {
    fn move_to(&mut self, destination: Vec3) {
        self.pursuing_attractive = false;
        self.set_goal(destination);
    }

    fn avoid_path(&mut self, avoid: Vec3, radius: f32, preferred_dir: Vec3) {
        let mut away = (self.last_origin - avoid).normalized();
        if away.is_zero() {
            away = preferred_dir.normalized();
        }
        self.pursuing_attractive = false;
        self.set_goal(avoid + away * radius);
    }

    fn move_near(&mut self, destination: Vec3, radius: f32) {
        let toward = (self.last_origin - destination).normalized();
        self.pursuing_attractive = false;
        self.set_goal(destination + toward * radius);
    }

    fn move_to_best_attractive_point(&mut self, min_priority: i32) -> bool {
        let best = self
            .attractive_points
            .iter()
            .filter(|(priority, _)| *priority >= min_priority)
            .max_by_key(|(priority, _)| *priority)
            .map(|(_, point)| *point);
        match best {
            Some(point) => {
                if self.goal != Some(point) {
                    self.set_goal(point);
                }
                self.pursuing_attractive = self.goal.is_some();
                self.pursuing_attractive
            }
            None => false,
        }
    }

    fn is_moving(&self) -> bool {
        self.goal.is_some()
    }

    fn move_done(&self) -> bool {
        self.goal.is_none()
    }

    fn clear_move(&mut self) {
        self.goal = None;
        self.pursuing_attractive = false;
    }

    fn current_path_direction(&self) -> Vec3 {
        self.path_dir
    }

    fn move_think(&mut self, world: &dyn WorldQuery, me: EntityHandle, cmd: &mut IntentCommand, _skill: Skill) {
        let Some(client) = world.client_state(me) else { return };
        self.last_origin = client.origin;
        let Some(goal) = self.goal else { return };

        if goal.distance_squared(client.origin) <= SIM_ARRIVAL_RADIUS * SIM_ARRIVAL_RADIUS {
            if self.pursuing_attractive {
                self.attractive_points.retain(|(_, point)| *point != goal);
                self.pursuing_attractive = false;
            }
            self.goal = None;
            return;
        }

        // Strafing owns the lateral axis; the path only drives forward.
        self.path_dir = (goal - client.origin).normalized();
        let along = self.path_dir.dot(client.forward);
        cmd.set_forward_move((along * MOVE_AXIS_MAX as f32) as i32);
        if cmd.right_move == 0 {
            let side = self.path_dir.dot(client.right);
            cmd.set_right_move((side * MOVE_AXIS_MAX as f32) as i32);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TurnGoal {
    Point(Vec3),
    Angles(Vec3),
}

/// Snaps the view to its goal every tick.
#[derive(Debug)]
pub struct SimTurner {
    goal: TurnGoal,
    angles: Vec3,
    last_aim_point: Option<Vec3>,
}

impl Default for SimTurner {
    fn default() -> Self {
        SimTurner { goal: TurnGoal::Angles(Vec3::ZERO), angles: Vec3::ZERO, last_aim_point: None }
    }
}

impl SimTurner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent point passed to `aim_at`.
    pub fn last_aim_point(&self) -> Option<Vec3> {
        self.last_aim_point
    }
}

impl BotTurner for SimTurner {
    fn aim_at(&mut self, point: Vec3) {
        self.goal = TurnGoal::Point(point);
        self.last_aim_point = Some(point);
    }

    fn set_target_angles(&mut self, angles: Vec3) {
        self.goal = TurnGoal::Angles(angles);
    }

    fn target_angles(&self) -> Vec3 {
        self.angles
    }

    fn turn_think(
        &mut self,
        world: &dyn WorldQuery,
        me: EntityHandle,
        cmd: &mut IntentCommand,
        eyes: &mut EyeInfo,
        _skill: Skill,
    ) {
        let Some(client) = world.client_state(me) else { return };
        self.angles = match self.goal {
            TurnGoal::Point(point) => {
                let eye = client.origin + Vec3::new(0.0, 0.0, client.view_height);
                (point - eye).to_angles()
            }
            TurnGoal::Angles(angles) => angles,
        };
        cmd.angles = self.angles;
        eyes.angles = [self.angles.x, self.angles.y];
        eyes.offset = Vec3::new(0.0, 0.0, client.view_height);
    }
}

/// Records every side effect requested by the core.
#[derive(Debug)]
pub struct SimHost {
    pub commands: HashMap<String, CommandInfo>,
    pub failing_commands: HashSet<String>,
    pub thinks: Vec<(EntityHandle, IntentCommand, EyeInfo)>,
    pub console_log: Vec<(EntityHandle, String, Vec<String>)>,
    pub primary_requests: Vec<EntityHandle>,
    pub join_requests: Vec<(EntityHandle, f32)>,
    pub pending_joins: HashSet<EntityHandle>,
    pub weapon_uses: Vec<(EntityHandle, WeaponId)>,
    pub zoom_offs: Vec<EntityHandle>,
    pub messages: Vec<(EntityHandle, String)>,
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    pub fn new() -> Self {
        let mut commands = HashMap::new();
        for name in ["reload", "say", "kill", "join_team", "primarydmweapon"] {
            commands.insert(name.to_string(), CommandInfo { console: true });
        }
        for name in ["give", "noclip"] {
            commands.insert(name.to_string(), CommandInfo { console: false });
        }
        SimHost {
            commands,
            failing_commands: HashSet::new(),
            thinks: Vec::new(),
            console_log: Vec::new(),
            primary_requests: Vec::new(),
            join_requests: Vec::new(),
            pending_joins: HashSet::new(),
            weapon_uses: Vec::new(),
            zoom_offs: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn last_think(&self, me: EntityHandle) -> Option<&(EntityHandle, IntentCommand, EyeInfo)> {
        self.thinks.iter().rev().find(|(handle, _, _)| *handle == me)
    }

    pub fn console_commands_for(&self, me: EntityHandle) -> Vec<&str> {
        self.console_log
            .iter()
            .filter(|(handle, _, _)| *handle == me)
            .map(|(_, name, _)| name.as_str())
            .collect()
    }
}

impl HostCommands for SimHost {
    fn client_think(&mut self, me: EntityHandle, cmd: &IntentCommand, eyes: &EyeInfo) {
        self.thinks.push((me, *cmd, *eyes));
    }

    fn lookup_command(&self, name: &str) -> Option<CommandInfo> {
        self.commands.get(name).copied()
    }

    fn dispatch_console(&mut self, me: EntityHandle, name: &str, args: &[String]) -> BotResult<()> {
        if self.failing_commands.contains(name) {
            return Err(BotError::CommandFailed(format!("{} raised a script error", name)));
        }
        self.console_log.push((me, name.to_string(), args.to_vec()));
        Ok(())
    }

    fn request_primary_weapon(&mut self, me: EntityHandle) {
        self.primary_requests.push(me);
    }

    fn join_pending(&self, me: EntityHandle) -> bool {
        self.pending_joins.contains(&me)
    }

    fn auto_join_team(&mut self, me: EntityHandle, delay_secs: f32) {
        self.pending_joins.insert(me);
        self.join_requests.push((me, delay_secs));
    }

    fn use_weapon(&mut self, me: EntityHandle, weapon: WeaponId) {
        self.weapon_uses.push((me, weapon));
    }

    fn zoom_off(&mut self, me: EntityHandle) {
        self.zoom_offs.push(me);
    }

    fn send_message(&mut self, me: EntityHandle, text: &str) {
        self.messages.push((me, text.to_string()));
    }
}
