use anyhow::{bail, Result};
use clap::Parser;
use log::{debug, error, info};

use drive_thru_sim::simulation::{ScriptedPlayer, SimConfig, SimWorld};

#[derive(Parser)]
#[command(name = "drive_thru_sim")]
#[command(about = "Headless drive-through order and queue simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "3000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum number of cars on the lane
    #[arg(long)]
    max_cars: Option<usize>,

    /// Smallest order size
    #[arg(long)]
    min_burgers: Option<u32>,

    /// Largest order size
    #[arg(long)]
    max_burgers: Option<u32>,

    /// Seconds a customer waits after the order is accepted
    #[arg(long)]
    patience: Option<f32>,

    /// Expire orders left behind by departed cars after this many seconds
    #[arg(long)]
    orphan_ttl: Option<f32>,

    /// Run without the scripted player (orders are never accepted)
    #[arg(long)]
    no_player: bool,

    /// Skip the periodic summaries and only log the final report
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn to_config(&self) -> SimConfig {
        let mut config = SimConfig::default();
        if let Some(max_cars) = self.max_cars {
            config.max_vehicles = max_cars;
        }
        if let Some(min) = self.min_burgers {
            config.min_burgers = min;
        }
        if let Some(max) = self.max_burgers {
            config.max_burgers = max;
        }
        if let Some(patience) = self.patience {
            config.patience_secs = patience;
        }
        config.orphan_ttl = self.orphan_ttl;
        config
    }
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,drive_thru_sim=info"),
    )
    .init();

    let cli = Cli::parse();
    if let Err(err) = run_headless(&cli) {
        error!("Simulation failed: {:#}", err);
        std::process::exit(1);
    }
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli) -> Result<()> {
    info!("Running drive-through simulation in headless mode...");
    info!("Ticks: {}, Delta: {}s", cli.ticks, cli.delta);

    if !cli.delta.is_finite() || cli.delta <= 0.0 {
        bail!("Tick delta must be a positive number of seconds, got {}", cli.delta);
    }

    let config = cli.to_config();
    let mut world = match cli.seed {
        Some(seed) => SimWorld::create_test_world_with_seed(config, seed)?,
        None => SimWorld::create_test_world(config)?,
    };
    let mut player = (!cli.no_player).then(ScriptedPlayer::default);

    // Calculate how many ticks equal 10 seconds of simulation time
    let ticks_per_report = ((10.0 / cli.delta).ceil() as u32).max(1);

    for tick in 1..=cli.ticks {
        world.tick(cli.delta);
        if let Some(player) = player.as_mut() {
            player.tick(cli.delta, &mut world)?;
        }

        for event in world.drain_order_events() {
            debug!("Order event: {:?}", event);
        }

        if !cli.quiet && tick % ticks_per_report == 0 {
            println!(
                "--- After tick {} ({:.1}s simulated time) ---",
                tick,
                tick as f32 * cli.delta
            );
            world.print_summary();
            world.draw_lane();
            println!();
        }
    }

    if !cli.quiet {
        println!("=== Final State ===");
        world.print_summary();
        world.draw_lane();
    }
    world.log_final_report();
    Ok(())
}
