// fps_bot_core/server/src/concurrent/mod.rs
pub mod event_queue;
