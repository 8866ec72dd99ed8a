// fps_bot_core/server/src/systems/bots.rs
// Registry of bot controllers and the per-frame driver that feeds them
// notifications and ticks them.

use crate::concurrent::event_queue::{BotEventSender, BotNotification, PriorityEventQueue};
use crate::core::config::{BotManagerConfig, BotTuning};
use crate::core::error::BotResult;
use crate::core::types::{EntityHandle, NoticeEvent, Skill};
use crate::operational::monitoring::metrics::record_tick_duration;
use crate::systems::ai::controller::{BotController, TickOutput};
use crate::world::{BotMover, BotTurner, HostCommands, WorldQuery};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const BOT_NAMES: [&str; 20] = [
    "Bot_Alpha", "Bot_Bravo", "Bot_Charlie", "Bot_Delta", "Bot_Echo",
    "Bot_Foxtrot", "Bot_Golf", "Bot_Hotel", "Bot_India", "Bot_Juliet",
    "Bot_Kilo", "Bot_Lima", "Bot_Mike", "Bot_Nova", "Bot_Oscar",
    "Bot_Papa", "Bot_Quebec", "Bot_Romeo", "Bot_Sierra", "Bot_Tango",
];

// Upper bound on notifications applied per frame.
const MAX_NOTIFICATIONS_PER_FRAME: usize = 1024;

pub struct BotManager {
    controllers: Vec<BotController>,
    queue: Arc<PriorityEventQueue>,
    config: BotManagerConfig,
    tuning: Arc<BotTuning>,
    taunts: Arc<Vec<String>>,
    rng: StdRng,
    created: usize,
}

impl BotManager {
    pub fn new(config: BotManagerConfig) -> BotResult<Self> {
        config.validate()?;
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(BotManager {
            controllers: Vec::new(),
            queue: Arc::new(PriorityEventQueue::new()),
            tuning: Arc::new(config.tuning.clone()),
            taunts: Arc::new(config.taunts.clone()),
            config,
            rng,
            created: 0,
        })
    }

    pub fn config(&self) -> &BotManagerConfig {
        &self.config
    }

    /// Entry point for hosts and other threads to raise notifications.
    pub fn notifier(&self) -> BotEventSender {
        BotEventSender::new(Arc::clone(&self.queue))
    }

    /// Takes control of `handle` with a skill drawn from the configured range.
    pub fn create_controller(
        &mut self,
        handle: EntityHandle,
        mover: Box<dyn BotMover + Send>,
        turner: Box<dyn BotTurner + Send>,
    ) -> &mut BotController {
        let skill = if self.config.skill_min < self.config.skill_max {
            self.rng.gen_range(self.config.skill_min..self.config.skill_max)
        } else {
            self.config.skill_min
        };
        self.create_controller_with_skill(handle, Skill::new(skill), mover, turner)
    }

    pub fn create_controller_with_skill(
        &mut self,
        handle: EntityHandle,
        skill: Skill,
        mover: Box<dyn BotMover + Send>,
        turner: Box<dyn BotTurner + Send>,
    ) -> &mut BotController {
        self.remove_controller(handle);
        let name = BOT_NAMES[self.created % BOT_NAMES.len()];
        self.created += 1;
        let rng = StdRng::seed_from_u64(self.rng.gen());
        let controller = BotController::new(handle, name, skill, Arc::clone(&self.tuning), mover, turner, rng)
            .with_taunts(Arc::clone(&self.taunts))
            .with_manual_move(self.config.manual_move);
        info!("[Bot {} ({})]: Created with skill {:.2}.", name, handle, skill.value());
        self.controllers.push(controller);
        let last = self.controllers.len() - 1;
        &mut self.controllers[last]
    }

    pub fn remove_controller(&mut self, handle: EntityHandle) -> bool {
        let before = self.controllers.len();
        self.controllers.retain(|c| c.handle() != handle);
        before != self.controllers.len()
    }

    pub fn find(&self, handle: EntityHandle) -> Option<&BotController> {
        self.controllers.iter().find(|c| c.handle() == handle)
    }

    pub fn find_mut(&mut self, handle: EntityHandle) -> Option<&mut BotController> {
        self.controllers.iter_mut().find(|c| c.handle() == handle)
    }

    pub fn controllers(&self) -> &[BotController] {
        &self.controllers
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Applies queued notifications in priority order.
    pub fn dispatch_notifications(&mut self, world: &dyn WorldQuery, host: &mut dyn HostCommands) -> usize {
        let batch = self.queue.pop_batch(MAX_NOTIFICATIONS_PER_FRAME);
        let count = batch.len();
        let now = world.now();
        for notification in batch {
            match notification {
                BotNotification::Broadcast { position, kind, originator, radius } => {
                    let radius_squared = radius * radius;
                    for controller in self.controllers.iter_mut() {
                        let Some(me) = world.entity(controller.handle()) else { continue };
                        let event = NoticeEvent {
                            position,
                            kind,
                            originator,
                            distance_squared: me.origin.distance_squared(position),
                            radius_squared,
                        };
                        controller.notice_event(world, &event);
                    }
                }
                BotNotification::Notice { target, event } => {
                    if let Some(controller) = self.find_mut(target) {
                        controller.notice_event(world, &event);
                    }
                }
                BotNotification::Killed { victim, attacker } => {
                    if let Some(controller) = self.find_mut(victim) {
                        controller.killed(world, host, attacker);
                    }
                }
                BotNotification::GotKill { killer, victim } => {
                    if let Some(controller) = self.find_mut(killer) {
                        debug!("[Bot {} ({})]: Credited with killing {}.", controller.name(), killer, victim);
                        controller.got_kill(now, host);
                    }
                }
                BotNotification::Spawned { entity } => {
                    if let Some(controller) = self.find_mut(entity) {
                        controller.spawned(now);
                    }
                }
                BotNotification::StuffText { target, text } => {
                    if let Some(controller) = self.find_mut(target) {
                        controller.stuff_text(host, &text);
                    }
                }
            }
        }
        count
    }

    /// One frame: drain notifications, drop orphaned controllers, then tick
    /// every controller in creation order.
    pub fn think_controllers(&mut self, world: &dyn WorldQuery, host: &mut dyn HostCommands) -> Vec<TickOutput> {
        let start = Instant::now();
        self.dispatch_notifications(world, host);

        self.controllers.retain(|controller| {
            let alive = world.entity(controller.handle()).is_some();
            if !alive {
                warn!("[Bot {} ({})]: Controlled entity is gone, removing controller.", controller.name(), controller.handle());
            }
            alive
        });

        let outputs = self.controllers.iter_mut().map(|controller| controller.think(world, host)).collect();
        record_tick_duration(start.elapsed());
        outputs
    }
}
