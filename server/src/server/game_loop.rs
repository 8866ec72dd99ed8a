// fps_bot_core/server/src/server/game_loop.rs
// Fixed-step host loop around the in-memory world, used by the bot_sim binary
// and the stress test.

use crate::concurrent::event_queue::BotEventSender;
use crate::core::config::BotManagerConfig;
use crate::core::constants::{TICK_DURATION, TICK_DURATION_MS};
use crate::core::error::BotResult;
use crate::core::types::*;
use crate::systems::ai::perception::{is_valid_enemy, AgentIdentity};
use crate::systems::bots::BotManager;
use crate::world::sim::{SimHost, SimMover, SimTurner, SimWorld};
use crate::world::WorldQuery;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::time::Instant;
use tokio::time::interval;
use tracing::{debug, info, warn};

const RESPAWN_DELAY_MS: u64 = 3000;
const ARENA_RADIUS: f32 = 1500.0;
const WEAPON_FIRE_RADIUS: f32 = 2048.0;
const MAX_HEALTH: i32 = 100;
const SHOT_DAMAGE: i32 = 20;
const HIT_CONE_DEG: f32 = 12.0;
const HIT_CHANCE: f64 = 0.35;
const LOG_EVERY_FRAMES: u64 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub shots: u64,
    pub kills: u64,
    pub respawns: u64,
}

pub struct SimulationLoop {
    pub world: SimWorld,
    pub host: SimHost,
    pub manager: BotManager,
    sender: BotEventSender,
    rng: StdRng,
    health: HashMap<EntityHandle, i32>,
    respawns: Vec<(EntityHandle, TimeMs)>,
    joins: Vec<(EntityHandle, TimeMs)>,
    next_team: Team,
    stats: LoopStats,
}

impl SimulationLoop {
    /// Builds an arena with `bots` unassigned players, each under bot control.
    pub fn new(config: BotManagerConfig, bots: usize) -> BotResult<Self> {
        let seed = config.rng_seed.unwrap_or(0x5eed);
        let mut manager = BotManager::new(config)?;
        let sender = manager.notifier();
        let mut world = SimWorld::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut health = HashMap::new();

        for _ in 0..bots {
            let origin = Self::spawn_point(&mut rng);
            let handle = world.spawn_player(Team::None, origin);
            health.insert(handle, MAX_HEALTH);
            manager.create_controller(handle, Box::new(SimMover::new()), Box::new(SimTurner::new()));
        }
        info!("Simulation arena ready with {} bots", bots);

        Ok(SimulationLoop {
            world,
            host: SimHost::new(),
            manager,
            sender,
            rng,
            health,
            respawns: Vec::new(),
            joins: Vec::new(),
            next_team: Team::Allies,
            stats: LoopStats::default(),
        })
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn notifier(&self) -> BotEventSender {
        self.sender.clone()
    }

    fn spawn_point(rng: &mut StdRng) -> Vec3 {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let radius = rng.gen_range(0.0..ARENA_RADIUS);
        Vec3::new(angle.cos() * radius, angle.sin() * radius, 0.0)
    }

    /// Advances the world by one tick and runs every controller once.
    pub fn step(&mut self) {
        self.world.advance(TICK_DURATION_MS);
        let now = self.world.now();

        self.apply_joins(now);
        self.apply_respawns(now);

        let before = self.host.thinks.len();
        self.manager.think_controllers(&self.world, &mut self.host);
        let thinks: Vec<_> = self.host.thinks.drain(before..).collect();
        self.host.thinks.clear();

        let dt_secs = TICK_DURATION_MS as f32 / 1000.0;
        for (handle, cmd, _eyes) in thinks {
            self.world.integrate(handle, &cmd, dt_secs);
            if cmd.has(BUTTON_ATTACK_PRIMARY) {
                self.fire_shot(handle, &cmd, now);
            }
        }

        self.stats.frames += 1;
        if self.stats.frames % LOG_EVERY_FRAMES == 0 {
            debug!(
                "Frame {}: {} shots, {} kills, {} respawns",
                self.stats.frames, self.stats.shots, self.stats.kills, self.stats.respawns
            );
        }
    }

    fn apply_joins(&mut self, now: TimeMs) {
        for (handle, delay_secs) in self.host.join_requests.drain(..) {
            self.joins.push((handle, now + (delay_secs * 1000.0) as u64));
        }
        let mut due = Vec::new();
        self.joins.retain(|&(handle, at)| {
            if now >= at {
                due.push(handle);
                false
            } else {
                true
            }
        });
        for handle in due {
            let team = self.next_team;
            self.next_team = if team == Team::Allies { Team::Axis } else { Team::Allies };
            self.world.set_team(handle, team);
            self.host.pending_joins.remove(&handle);
            self.sender.spawned(handle);
            debug!("{} joined {:?}", handle, team);
        }
    }

    fn apply_respawns(&mut self, now: TimeMs) {
        let mut due = Vec::new();
        self.respawns.retain(|&(handle, at)| {
            if now >= at {
                due.push(handle);
                false
            } else {
                true
            }
        });
        for handle in due {
            let origin = Self::spawn_point(&mut self.rng);
            self.world.set_dead(handle, false);
            self.world.set_origin(handle, origin);
            self.health.insert(handle, MAX_HEALTH);
            self.sender.spawned(handle);
            self.stats.respawns += 1;
        }
    }

    /// Hit-scan model: the closest valid enemy inside a narrow cone around
    /// the commanded view direction may be hit.
    fn fire_shot(&mut self, shooter: EntityHandle, cmd: &IntentCommand, now: TimeMs) {
        let Some(client) = self.world.client_state(shooter) else { return };
        if client.dead || !client.team.is_playing() {
            return;
        }
        self.stats.shots += 1;
        self.sender.broadcast(client.origin, EventKind::WeaponFire, shooter, WEAPON_FIRE_RADIUS);

        let me = AgentIdentity::from_client(shooter, &client);
        let pitch = cmd.angles.x.to_radians();
        let yaw = cmd.angles.y.to_radians();
        let aim = Vec3::new(pitch.cos() * yaw.cos(), pitch.cos() * yaw.sin(), -pitch.sin());
        let eye = client.origin + Vec3::new(0.0, 0.0, client.view_height);
        let cos_cone = (HIT_CONE_DEG * 0.5).to_radians().cos();

        let target = self
            .world
            .sentients()
            .into_iter()
            .filter_map(|handle| self.world.entity(handle))
            .filter(|view| is_valid_enemy(view, &me, self.world.team_play()))
            .filter(|view| {
                let center = view.origin + Vec3::new(0.0, 0.0, view.view_height * 0.6);
                (center - eye).normalized().dot(aim) >= cos_cone
            })
            .min_by(|a, b| {
                a.origin
                    .distance_squared(client.origin)
                    .total_cmp(&b.origin.distance_squared(client.origin))
            });

        let Some(target) = target else { return };
        if !self.rng.gen_bool(HIT_CHANCE) {
            return;
        }
        let health = self.health.entry(target.handle).or_insert(MAX_HEALTH);
        *health -= SHOT_DAMAGE;
        if *health <= 0 {
            self.world.set_dead(target.handle, true);
            self.sender.killed(target.handle, Some(shooter));
            self.sender.got_kill(shooter, target.handle);
            self.respawns.push((target.handle, now + RESPAWN_DELAY_MS));
            self.stats.kills += 1;
            debug!("{} killed {}", shooter, target.handle);
        }
    }

    /// Runs `frames` ticks paced at the server tick rate.
    pub async fn run(&mut self, frames: u64) -> LoopStats {
        let mut tick_timer = interval(TICK_DURATION);
        info!("Simulation loop started. Tick rate: {}ms", TICK_DURATION.as_millis());

        for _ in 0..frames {
            tick_timer.tick().await;
            let frame_start_time = Instant::now();
            self.step();
            let frame_time = frame_start_time.elapsed();
            if frame_time > TICK_DURATION {
                warn!("Frame {} took too long: {:?}", self.stats.frames, frame_time);
            }
        }
        info!(
            "Simulation finished after {} frames: {} shots, {} kills, {} respawns",
            self.stats.frames, self.stats.shots, self.stats.kills, self.stats.respawns
        );
        self.stats
    }
}
