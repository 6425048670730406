//! ColorSplash - interactive iris dashboard
//!
//! CLI commands:
//! - serve: Start HTTP server (dashboard page, update API, clock, health)
//! - species: List species in the dataset
//! - summary: Print the stats block for one species
//! - palettes: Show which palette a click count selects

mod chart;
mod clock;
mod config;
mod controller;
mod dashboard;
mod dataset;
mod layout;
mod logging;
mod palette;
mod server;
mod state;
mod stats;
mod svg;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::chart::title_case;
use crate::dashboard::{plot_view, ControlState, Dashboard};
use crate::dataset::Dataset;
use crate::palette::PaletteCycle;

#[derive(Parser)]
#[command(name = "colorsplash")]
#[command(about = "Interactive scatter dashboard over the iris dataset")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to dashboard.yaml config
    #[arg(short, long, default_value = "dashboard.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List species and row counts
    Species,

    /// Print min/max sepal length and mean sepal width for a species
    Summary {
        #[arg(short, long)]
        species: String,
    },

    /// Show the palette selected after a number of shuffle clicks
    Palettes {
        #[arg(long, default_value = "0")]
        clicks: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = config::Settings::load();

    logging::init_logging(&settings.log_dir)?;
    tracing::info!("ColorSplash starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let config = if cli.config.exists() {
        tracing::info!("Loading config from {:?}", cli.config);
        config::Config::load(&cli.config)?
    } else {
        tracing::warn!("Config file not found: {:?}, using defaults", cli.config);
        config::Config::default()
    };

    // A dataset that cannot be loaded is fatal
    let dataset = match &config.dataset {
        Some(path) => Dataset::load(path)?,
        None => Dataset::iris()?,
    };
    tracing::info!("Dataset loaded: {} records", dataset.len());

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(settings.port);
            let period = Duration::from_millis(config.tick_interval_ms);
            let dashboard = Dashboard::new(config, dataset)?;
            let state = state::AppState::new(dashboard, settings.web_dir);
            let ticker = clock::spawn_ticker(state.dashboard.clone(), state.clock_tx.clone(), period);
            let result = server::serve(state, port).await;
            ticker.abort();
            result?;
        }

        Commands::Species => {
            let counts = dataset.species_counts();
            println!("Species ({}):", counts.len());
            for (name, rows) in counts {
                println!("  - {} [{}] ({} rows)", title_case(&name), name, rows);
            }
        }

        Commands::Summary { species } => {
            let dashboard = Dashboard::new(config, dataset)?;
            let state = ControlState {
                species,
                ..dashboard.default_state()
            };
            let view = plot_view(dashboard.dataset(), dashboard.palettes(), &state);
            println!("{}", view.chart.title);
            if view.stats.summary.is_empty() {
                tracing::warn!("No rows for species '{}'", state.species);
            }
            println!("  {} points", view.chart.point_count());
            for line in &view.stats.lines {
                println!("  {} {}", line.label, line.value);
            }
        }

        Commands::Palettes { clicks } => {
            let dashboard = Dashboard::new(config, dataset)?;
            let palettes = dashboard.palettes().clone();
            let selected = PaletteCycle::at(palettes.clone(), clicks).index();
            let mut cycle = PaletteCycle::new(palettes);
            for i in 0..cycle.len() {
                let marker = if i == selected { "*" } else { " " };
                println!("{} {}", marker, cycle.current().colors().join(" "));
                cycle.advance();
            }
        }
    }

    Ok(())
}
