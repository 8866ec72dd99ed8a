// fps_bot_core/server/src/main.rs
use anyhow::Context;
use fps_bot_core::core::config::BotManagerConfig;
use fps_bot_core::operational::monitoring::metrics::{describe_bot_metrics, init_json_logging, init_logging};
use fps_bot_core::server::game_loop::SimulationLoop;
use tracing::{error, info};

const DEFAULT_BOTS: usize = 8;
const DEFAULT_FRAMES: u64 = 1200;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logging = if std::env::var_os("BOT_SIM_JSON_LOGS").is_some() { init_json_logging() } else { init_logging() };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {:?}", e);
        return Err(e);
    }
    describe_bot_metrics();

    // bot_sim [config.yaml] [bots] [frames]
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => BotManagerConfig::load(&path).with_context(|| format!("Failed to load bot config from {}", path))?,
        None => BotManagerConfig::default(),
    };
    let bots = match args.next() {
        Some(raw) => raw.parse::<usize>().with_context(|| format!("Invalid bot count {:?}", raw))?,
        None => DEFAULT_BOTS,
    };
    let frames = match args.next() {
        Some(raw) => raw.parse::<u64>().with_context(|| format!("Invalid frame count {:?}", raw))?,
        None => DEFAULT_FRAMES,
    };

    info!("bot_sim starting: {} bots, {} frames, skill {:.2}..{:.2}", bots, frames, config.skill_min, config.skill_max);

    let mut sim = match SimulationLoop::new(config, bots) {
        Ok(sim) => sim,
        Err(e) => {
            error!("Failed to build simulation: {}", e);
            return Err(e).context("Simulation setup failed");
        }
    };
    let stats = sim.run(frames).await;

    info!(
        "bot_sim done: {} frames, {} shots, {} kills, {} respawns",
        stats.frames, stats.shots, stats.kills, stats.respawns
    );
    Ok(())
}
