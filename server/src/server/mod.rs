// fps_bot_core/server/src/server/mod.rs
pub mod game_loop;
