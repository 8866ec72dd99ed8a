// fps_bot_core/server/tests/performance/bot_tick_stress.rs
use fps_bot_core::core::config::BotManagerConfig;
use fps_bot_core::server::game_loop::SimulationLoop;
use fps_bot_core::TickPhase;
use metrics::histogram;
use std::time::Instant;

fn setup_simulation(bots: usize, seed: u64) -> SimulationLoop {
    let config = BotManagerConfig { rng_seed: Some(seed), ..BotManagerConfig::default() };
    SimulationLoop::new(config, bots).expect("valid simulation config")
}

#[test]
fn stress_test_bot_ticks() {
    let mut sim = setup_simulation(64, 42);
    for _ in 0..1000 {
        let start = Instant::now();
        sim.step();
        histogram!("bot_tick_stress_step_ms").record(start.elapsed().as_secs_f64() * 1000.0);
    }

    let stats = sim.stats();
    assert_eq!(stats.frames, 1000);
    assert!(stats.shots > 0, "64 bots never fired in 50s of play");
    assert_eq!(sim.manager.len(), 64);
    assert!(sim.manager.controllers().iter().all(|c| c.state().is_some()));
}

#[test]
fn stress_test_lifecycle_churn() {
    let mut sim = setup_simulation(16, 7);
    let notifier = sim.notifier();
    let handles: Vec<_> = sim.manager.controllers().iter().map(|c| c.handle()).collect();

    for frame in 0..600u64 {
        // Hammer every bot with console text and spurious respawns.
        if frame % 10 == 0 {
            for handle in &handles {
                notifier.stuff_text(*handle, "say regroup");
                notifier.stuff_text(*handle, "not_a_command");
                notifier.spawned(*handle);
            }
        }
        sim.step();
    }

    assert_eq!(sim.stats().frames, 600);
    for handle in &handles {
        assert_eq!(sim.host.console_commands_for(*handle).len(), 60);
    }
}

#[tokio::test]
async fn stress_test_paced_loop_runs_to_completion() {
    let mut sim = setup_simulation(8, 3);
    let stats = sim.run(20).await;
    assert_eq!(stats.frames, 20);
    let outputs = sim.manager.think_controllers(&sim.world, &mut sim.host);
    assert!(outputs.iter().all(|output| output.phase != TickPhase::NoClient));
}
