use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tectoplanet::{PlanetSummary, SimulationRunner};
use tectonics::mesh::{load_template, template::save_template};
use tectonics::{Mesh, TectonicPlanet, TectonicsConfig, icosphere};

/// Plate tectonics simulation on a spherical mesh.
#[derive(Parser, Debug)]
#[command(name = "tectoplanet", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a planet, run tectonic steps and optionally save the result.
    Simulate {
        /// Binary mesh template for the data layer (an icosphere is used otherwise)
        #[arg(long, value_name = "FILE")]
        template: Option<PathBuf>,

        /// Icosphere subdivisions for the data layer when no template is given
        #[arg(long, default_value_t = 4)]
        subdivisions: u32,

        /// Icosphere subdivisions for an optional render layer
        #[arg(long)]
        render_subdivisions: Option<u32>,

        /// Random seed; 0 takes a seed from the clock
        #[arg(short, long, default_value_t = 42)]
        seed: u32,

        /// Number of tectonic steps to run
        #[arg(long, default_value_t = 100)]
        steps: u32,

        /// Resample the crust every N steps (0 never resamples)
        #[arg(long, default_value_t = 20)]
        resample_interval: u32,

        /// Add fractal detail after the plates are created
        #[arg(long)]
        fractal: bool,

        /// TOML configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Write the final planet to this file
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },
    /// Load a saved planet and print a summary.
    Inspect {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// TOML configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Write an icosphere as a binary mesh template.
    ExportTemplate {
        #[arg(long, default_value_t = 4)]
        subdivisions: u32,

        #[arg(value_name = "FILE")]
        output: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> tectonics::Result<TectonicsConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            TectonicsConfig::load_from_file(path)
        }
        None => Ok(TectonicsConfig::default()),
    }
}

fn main() -> tectonics::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Simulate {
            template,
            subdivisions,
            render_subdivisions,
            seed,
            steps,
            resample_interval,
            fractal,
            config,
            save,
        } => {
            let config = load_config(config.as_deref())?;
            let mesh: Mesh = match template {
                Some(path) => load_template(path)?.into_mesh(),
                None => icosphere(subdivisions),
            };

            let start = Instant::now();
            let mut planet = TectonicPlanet::new(mesh, config, seed)?;
            if let Some(level) = render_subdivisions {
                planet.set_render_mesh(icosphere(level));
            }
            let mut runner = SimulationRunner::new(planet, resample_interval);
            runner.initialize(fractal);
            println!("Planet ready in {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);

            let start = Instant::now();
            let summary = runner.run(steps)?;
            println!(
                "{} steps in {:.1}ms: {} contacts, {} resamples, {} rifts",
                summary.steps,
                start.elapsed().as_secs_f64() * 1000.0,
                summary.contacts,
                summary.resamples,
                summary.rifts
            );

            let planet = runner.into_planet();
            println!("{}", PlanetSummary::from_planet(&planet));
            if let Some(path) = save {
                planet.save_to_file(&path)?;
                println!("Saved to {}", path.display());
            }
        }
        Command::Inspect { path, config } => {
            let config = load_config(config.as_deref())?;
            let planet = TectonicPlanet::load_from_file(&path, config)?;
            println!("{}", PlanetSummary::from_planet(&planet));
        }
        Command::ExportTemplate { subdivisions, output } => {
            let mesh = icosphere(subdivisions);
            save_template(&mesh, &output)?;
            println!(
                "Wrote {} vertices, {} triangles to {}",
                mesh.vertex_count(),
                mesh.triangle_count(),
                output.display()
            );
        }
    }
    Ok(())
}
