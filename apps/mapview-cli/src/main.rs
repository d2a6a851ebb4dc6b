use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use mapview_assets::DirectoryResolver;
use mapview_common::ViewerConfig;
use mapview_render::{DebugTextRenderer, LoadStage, MapViewer, Renderer, ViewerInputs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mapview-cli", about = "Headless map viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print the effective viewer config as YAML
    Config {
        /// YAML file to validate; defaults are printed without one
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Load a map headlessly and print the frame it would draw
    Inspect {
        #[command(flatten)]
        map: MapArgs,
        /// Ticks to run before giving up on pending assets
        #[arg(short, long, default_value = "600")]
        ticks: u64,
        /// List every model instance
        #[arg(long)]
        instances: bool,
    },
}

#[derive(Args)]
struct MapArgs {
    /// Map description (JSON)
    map: PathBuf,
    /// Tileset tables (JSON)
    #[arg(long)]
    tables: Option<PathBuf>,
    /// Object attribute table (JSON)
    #[arg(long)]
    attributes: Option<PathBuf>,
    /// Über-splat table (JSON)
    #[arg(long)]
    splats: Option<PathBuf>,
    /// Extracted game data; repeat for several roots. Defaults to the map's directory
    #[arg(long = "data-dir")]
    data_dirs: Vec<PathBuf>,
    /// Viewer config (YAML)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl MapArgs {
    fn open(&self) -> anyhow::Result<MapViewer> {
        let config = load_config(self.config.as_ref())?;
        let inputs = ViewerInputs::load(
            &self.map,
            self.tables.as_deref(),
            self.attributes.as_deref(),
            self.splats.as_deref(),
        )
        .with_context(|| format!("loading map {}", self.map.display()))?;

        let roots = if self.data_dirs.is_empty() {
            let parent = self.map.parent().map(PathBuf::from).unwrap_or_default();
            vec![parent]
        } else {
            self.data_dirs.clone()
        };
        Ok(MapViewer::new(
            config,
            inputs,
            Box::new(DirectoryResolver::new(roots)),
        ))
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ViewerConfig> {
    match path {
        Some(path) => {
            ViewerConfig::load(path).with_context(|| format!("reading config {}", path.display()))
        }
        None => Ok(ViewerConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("mapview-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", mapview_common::crate_info());
            println!("terrain: {}", mapview_terrain::crate_info());
            println!("assets: {}", mapview_assets::crate_info());
            println!("scene: {}", mapview_scene::crate_info());
            println!("input: {}", mapview_input::crate_info());
            println!("render: {}", mapview_render::crate_info());
        }
        Commands::Config { config } => {
            let config = load_config(config.as_ref())?;
            print!("{}", serde_yaml::to_string(&config)?);
        }
        Commands::Inspect {
            map,
            ticks,
            instances,
        } => {
            let mut viewer = map.open()?;
            let mut ran = 0;
            while ran < ticks {
                let report = viewer.tick();
                ran += 1;
                if report.stage == LoadStage::Ready && report.pending == 0 {
                    break;
                }
            }
            tracing::info!(ticks = ran, stage = ?viewer.stage(), "inspection finished");

            let renderer = if instances {
                DebugTextRenderer::verbose()
            } else {
                DebugTextRenderer::new()
            };
            let plan = viewer.frame_plan();
            print!("{}", renderer.render(&viewer, &plan));

            for warning in viewer.warnings() {
                println!("warning: {warning}");
            }
            for diagnostic in viewer.all_diagnostics() {
                let level = if diagnostic.critical { "error" } else { "note" };
                println!("{level}: {} ({})", diagnostic.path, diagnostic.reason);
            }
            viewer.shutdown();
        }
    }

    Ok(())
}
