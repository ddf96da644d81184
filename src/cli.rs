use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Preprocess per-catchment model output into routing forcing inputs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Run directory containing config/ and outputs/ngen/
    pub forcing_dir: PathBuf,

    /// Hydrofabric GeoPackage; defaults to the first .gpkg under
    /// <forcing_dir>/config
    #[arg(long)]
    pub gpkg: Option<PathBuf>,

    /// Simulation step count for the run window
    #[arg(long)]
    pub nts: Option<usize>,

    /// Forcing filename pattern, e.g. cat-*
    #[arg(long)]
    pub pattern: Option<String>,

    /// Optional TOML settings file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn get_args() -> Result<(Args, PathBuf, PathBuf)> {
    let args = Args::parse();

    let csv_dir = args.forcing_dir.join("outputs").join("ngen");
    let gpkg_path = match &args.gpkg {
        Some(path) => path.clone(),
        None => find_gpkg(&args.forcing_dir.join("config"))?,
    };

    Ok((args, csv_dir, gpkg_path))
}

// gpkg path is the first file with a .gpkg extension in the config dir
fn find_gpkg(config_dir: &Path) -> Result<PathBuf> {
    let entries = config_dir
        .read_dir()
        .with_context(|| format!("Failed to read config dir: {:?}", config_dir))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "gpkg") {
            return Ok(path);
        }
    }
    anyhow::bail!("No .gpkg file found in {:?}", config_dir)
}
