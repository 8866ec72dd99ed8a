// fps_bot_core/server/tests/integration/common/mod.rs
// Shared arena harness for the integration suites. Not every suite uses
// every helper.
#![allow(dead_code)]

use fps_bot_core::core::config::BotManagerConfig;
use fps_bot_core::core::constants::TICK_DURATION_MS;
use fps_bot_core::core::types::{EntityHandle, Skill, Team, TimeMs, Vec3};
use fps_bot_core::systems::ai::controller::{BotController, TickOutput};
use fps_bot_core::systems::bots::BotManager;
use fps_bot_core::world::sim::{SimHost, SimMover, SimTurner, SimWorld};
use fps_bot_core::world::WorldQuery;
use tracing::info;

pub struct Arena {
    pub world: SimWorld,
    pub host: SimHost,
    pub manager: BotManager,
}

impl Arena {
    pub fn new(seed: u64) -> Self {
        Self::with_config(BotManagerConfig { rng_seed: Some(seed), ..BotManagerConfig::default() })
    }

    pub fn with_config(config: BotManagerConfig) -> Self {
        info!("[Test Setup] Creating arena with seed {:?}", config.rng_seed);
        let manager = BotManager::new(config).expect("valid bot config");
        Arena { world: SimWorld::new(), host: SimHost::new(), manager }
    }

    pub fn now(&self) -> TimeMs {
        self.world.now()
    }

    /// Spawns a player under bot control.
    pub fn add_bot(&mut self, team: Team, origin: Vec3, skill: f32) -> EntityHandle {
        let handle = self.world.spawn_player(team, origin);
        self.manager.create_controller_with_skill(
            handle,
            Skill::new(skill),
            Box::new(SimMover::new()),
            Box::new(SimTurner::new()),
        );
        handle
    }

    /// Spawns a player nobody controls; it stands where it is put.
    pub fn add_dummy(&mut self, team: Team, origin: Vec3) -> EntityHandle {
        self.world.spawn_player(team, origin)
    }

    pub fn bot(&self, handle: EntityHandle) -> &BotController {
        self.manager.find(handle).expect("controller exists")
    }

    /// Advances the clock one server tick, thinks every bot and applies
    /// their intents to the world.
    pub fn tick(&mut self) -> Vec<(EntityHandle, TickOutput)> {
        self.world.advance(TICK_DURATION_MS);
        let outputs = self.manager.think_controllers(&self.world, &mut self.host);
        let handles: Vec<EntityHandle> = self.manager.controllers().iter().map(|c| c.handle()).collect();
        let dt_secs = TICK_DURATION_MS as f32 / 1000.0;
        let paired: Vec<(EntityHandle, TickOutput)> = handles.into_iter().zip(outputs).collect();
        for (handle, output) in &paired {
            self.world.integrate(*handle, &output.cmd, dt_secs);
        }
        paired
    }

    /// Output of `handle` from a tick result.
    pub fn output_for(outputs: &[(EntityHandle, TickOutput)], handle: EntityHandle) -> TickOutput {
        outputs
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, output)| *output)
            .expect("bot produced an output")
    }

    /// Ticks until `done` holds or `max_ticks` elapse. Returns whether it held.
    pub fn run_until(&mut self, max_ticks: usize, mut done: impl FnMut(&Arena) -> bool) -> bool {
        for _ in 0..max_ticks {
            self.tick();
            if done(self) {
                return true;
            }
        }
        false
    }

    pub fn distance(&self, a: EntityHandle, b: EntityHandle) -> f32 {
        match (self.world.entity(a), self.world.entity(b)) {
            (Some(a), Some(b)) => a.origin.distance_squared(b.origin).sqrt(),
            _ => f32::INFINITY,
        }
    }
}
