// fps_bot_core/server/src/core/mod.rs
pub mod config;
pub mod constants;
pub mod error;
pub mod types;
