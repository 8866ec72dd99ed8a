// fps_bot_core/server/src/systems/mod.rs
pub mod ai;
pub mod bots;
