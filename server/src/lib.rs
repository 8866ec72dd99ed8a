// fps_bot_core/server/src/lib.rs
//! Decision core for server-side combat bots.
//!
//! Each controlled player gets a [`BotController`](systems::ai::controller::BotController)
//! that is ticked once per simulation frame by a
//! [`BotManager`](systems::bots::BotManager). The core talks to the host only
//! through the traits in [`world`].

pub mod core;
pub mod concurrent;
pub mod world;
pub mod systems;
pub mod operational;
pub mod server;

pub use crate::core::config::{BotManagerConfig, BotTuning};
pub use crate::core::error::{BotError, BotResult};
pub use crate::systems::ai::controller::{BotController, TickOutput, TickPhase};
pub use crate::systems::bots::BotManager;
