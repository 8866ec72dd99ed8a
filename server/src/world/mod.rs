// fps_bot_core/server/src/world/mod.rs
//! Contracts between the bot decision core and the host game.
//!
//! The core never owns world entities. Everything it learns about the world
//! comes through [`WorldQuery`], every path-planning request goes through a
//! per-agent [`BotMover`], view control goes through a per-agent
//! [`BotTurner`], and everything the core asks the host to *do* goes through
//! [`HostCommands`].

pub mod sim;

use crate::core::error::BotResult;
use crate::core::types::{
    ClientView, EntityHandle, EntityView, EyeInfo, IntentCommand, InventoryWeapon, Skill, TagId, TimeMs,
    UseTarget, Vec3, WeaponId, WeaponStats,
};

/// Read-only view of the simulated world for the current frame.
pub trait WorldQuery {
    /// Current level time.
    fn now(&self) -> TimeMs;
    /// Length of one simulation frame.
    fn frame_time_ms(&self) -> u64;
    /// Whether teammates must be excluded from targeting.
    fn team_play(&self) -> bool;
    fn vision_distance(&self) -> f32;
    fn far_plane_distance(&self) -> f32;
    fn run_speed(&self) -> f32;

    /// Resolves a handle. Returns `None` when the slot is empty or has been
    /// reused by a newer entity.
    fn entity(&self, handle: EntityHandle) -> Option<EntityView>;
    /// Every sentient (players and NPCs) currently in the world.
    fn sentients(&self) -> Vec<EntityHandle>;
    /// Line-of-sight test limited by field of view (degrees) and distance.
    fn can_see(&self, viewer: EntityHandle, target: EntityHandle, fov_deg: f32, max_distance: f32) -> bool;

    fn client_state(&self, me: EntityHandle) -> Option<ClientView>;
    fn active_weapon(&self, me: EntityHandle) -> Option<WeaponStats>;
    fn inventory(&self, me: EntityHandle) -> Vec<InventoryWeapon>;

    /// Looks up the eye reference point of a target's model.
    fn eye_tag(&self, target: EntityHandle) -> Option<TagId>;
    fn tag_origin(&self, target: EntityHandle, tag: TagId) -> Option<Vec3>;

    /// What a short use trace in front of the agent hits.
    fn use_target(&self, me: EntityHandle) -> UseTarget;
}

/// Path planning and execution for one agent.
pub trait BotMover {
    fn move_to(&mut self, destination: Vec3);
    /// Moves away from `avoid` until at least `radius` away, biased toward `preferred_dir`.
    fn avoid_path(&mut self, avoid: Vec3, radius: f32, preferred_dir: Vec3);
    fn move_near(&mut self, destination: Vec3, radius: f32);
    /// Heads for the best attractive point of at least `min_priority`.
    /// Returns true when such a point is being pursued.
    fn move_to_best_attractive_point(&mut self, min_priority: i32) -> bool;
    fn is_moving(&self) -> bool;
    /// True when no requested move is still in progress.
    fn move_done(&self) -> bool;
    fn clear_move(&mut self);
    /// Normalized heading of the current path segment.
    fn current_path_direction(&self) -> Vec3;
    /// Writes the movement axes for this tick.
    fn move_think(&mut self, world: &dyn WorldQuery, me: EntityHandle, cmd: &mut IntentCommand, skill: Skill);
}

/// View control for one agent.
pub trait BotTurner {
    fn aim_at(&mut self, point: Vec3);
    fn set_target_angles(&mut self, angles: Vec3);
    fn target_angles(&self) -> Vec3;
    /// Writes view angles and eye info for this tick.
    fn turn_think(
        &mut self,
        world: &dyn WorldQuery,
        me: EntityHandle,
        cmd: &mut IntentCommand,
        eyes: &mut EyeInfo,
        skill: Skill,
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    /// Command may be issued from a client console.
    pub console: bool,
}

/// Side effects the core asks the host to perform.
pub trait HostCommands {
    /// Feeds one tick of input into the host's client-simulation step.
    fn client_think(&mut self, me: EntityHandle, cmd: &IntentCommand, eyes: &EyeInfo);

    fn lookup_command(&self, name: &str) -> Option<CommandInfo>;
    fn dispatch_console(&mut self, me: EntityHandle, name: &str, args: &[String]) -> BotResult<()>;

    /// Picks an automatic primary weapon for the next spawn.
    fn request_primary_weapon(&mut self, me: EntityHandle);
    fn join_pending(&self, me: EntityHandle) -> bool;
    fn auto_join_team(&mut self, me: EntityHandle, delay_secs: f32);
    fn use_weapon(&mut self, me: EntityHandle, weapon: WeaponId);
    fn zoom_off(&mut self, me: EntityHandle);
    /// Broadcasts a chat/voice message on behalf of the agent.
    fn send_message(&mut self, me: EntityHandle, text: &str);
}
