// fps_bot_core/server/src/operational/mod.rs
pub mod monitoring;
