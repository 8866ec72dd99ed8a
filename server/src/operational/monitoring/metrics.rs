// fps_bot_core/server/src/operational/monitoring/metrics.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_histogram, histogram, Unit};
use std::time::Duration;

pub const BOT_STATE_TRANSITIONS_TOTAL: &str = "bot_state_transitions_total";
pub const BOT_ENGAGEMENTS_TOTAL: &str = "bot_engagements_total";
pub const BOT_ENEMY_LOST_TOTAL: &str = "bot_enemy_lost_total";
pub const BOT_SELF_HEAL_RESETS_TOTAL: &str = "bot_self_heal_resets_total";
pub const BOT_COMMANDS_DROPPED_TOTAL: &str = "bot_commands_dropped_total";
pub const BOT_TICK_DURATION_SECONDS: &str = "bot_tick_duration_seconds";

/// Registers descriptions with whatever recorder the host installed.
/// The library never installs an exporter itself.
pub fn describe_bot_metrics() {
    describe_counter!(BOT_STATE_TRANSITIONS_TOTAL, "Accepted behavior state transitions, labelled by target state");
    describe_counter!(BOT_ENGAGEMENTS_TOTAL, "Transitions into the attack state");
    describe_counter!(BOT_ENEMY_LOST_TOTAL, "Engagements that ended without a kill");
    describe_counter!(BOT_SELF_HEAL_RESETS_TOTAL, "Forced resets out of inconsistent or stuck states");
    describe_counter!(BOT_COMMANDS_DROPPED_TOTAL, "Console commands that were malformed, rejected or failed");
    describe_histogram!(BOT_TICK_DURATION_SECONDS, Unit::Seconds, "Time spent ticking every controller once");
}

pub fn record_tick_duration(duration: Duration) {
    histogram!(BOT_TICK_DURATION_SECONDS).record(duration.as_secs_f64());
}

// Logging setup
pub fn init_logging() -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "fps_bot_core=info,bot_sim=info".into()))
        .with(fmt::layer())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

/// JSON-formatted variant for log shippers.
pub fn init_json_logging() -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "fps_bot_core=info,bot_sim=info".into()))
        .with(fmt::layer().json())
        .try_init()
        .context("Failed to initialize JSON tracing subscriber")?;

    Ok(())
}
