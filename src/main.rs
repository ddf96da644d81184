use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use forcing_rs::attributes::{self, FlowpathAttributeIndex};
use forcing_rs::cli::get_args;
use forcing_rs::config::{ColumnConfig, ForcingConfig};
use forcing_rs::diagnostics::Diagnostics;
use forcing_rs::{forcing, gage, ingest, io};

fn main() -> Result<()> {
    // Configuration
    let (args, csv_dir, gpkg_path) = get_args()?;
    let mut settings = match &args.config {
        Some(path) => ForcingConfig::load(path)
            .with_context(|| format!("Failed to load settings: {:?}", path))?,
        None => ForcingConfig::default(),
    };
    if let Some(nts) = args.nts {
        settings.nts = nts;
    }
    if let Some(pattern) = &args.pattern {
        settings.qlat_file_pattern_filter = pattern.clone();
    }

    // Initialize SQLite connection
    let conn = rusqlite::Connection::open(&gpkg_path)
        .with_context(|| format!("Failed to open database: {:?}", gpkg_path))?;
    let columns = ColumnConfig::new();

    // Build the unit-factor index
    println!("Loading flowpath attributes...");
    let flowpaths = attributes::load_flowpath_table(&conn, &columns)?;
    let index = FlowpathAttributeIndex::build(&flowpaths);
    println!("Indexed unit factors for {} flowpaths", index.len());

    // Discover the forcing file set
    let run_window = forcing::build_run_window(
        &csv_dir,
        &settings.qlat_file_pattern_filter,
        settings.nts,
    )?;

    println!("\nRun Window:");
    println!("  Files: {}", run_window.file_list.len());
    println!("  Steps: {}", run_window.step_count);
    println!("  Final timestamp: {}", run_window.final_timestamp);

    // Create progress bar
    let pb = ProgressBar::new(run_window.file_list.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")?
            .progress_chars("#>-"),
    );

    // Parse, merge and rescale the lateral flows
    let mut diagnostics = Diagnostics::new();
    let known_segments = index.known_segments();
    let merged = ingest::merge_catchment_files(
        &csv_dir,
        &run_window.file_list,
        &known_segments,
        settings.max_parse_threads,
        Some(&pb),
        &mut diagnostics,
    )?;
    pb.finish_and_clear();
    let scaled = ingest::scale_lateral_flows(&merged, &index, &mut diagnostics);

    // Derive the gage-to-segment mapping
    println!("Deriving gage assignments...");
    let waterbodies = attributes::load_waterbody_connections(&conn, &columns)?;
    let assignments = gage::map_gages(&flowpaths, &waterbodies, &mut diagnostics)?;

    // Hand off to the routing and DA consumers as CSV
    let qlat_file = format!(
        "lateral_flows_{}.csv",
        run_window.final_timestamp.format("%Y%m%d%H%M")
    );
    io::results::write_lateral_flows(Path::new(&qlat_file), &scaled)?;
    io::results::write_gage_assignments(Path::new("gage_assignments.csv"), &assignments)?;

    println!("\nPreprocessing complete:");
    println!(
        "  {} segments x {} timesteps -> {}",
        scaled.num_rows(),
        scaled.num_timestamps(),
        qlat_file
    );
    println!(
        "  {} gage assignments -> gage_assignments.csv",
        assignments.len()
    );

    if !diagnostics.is_empty() {
        println!("\n{} diagnostics:", diagnostics.len());
        for event in diagnostics.iter() {
            println!("  {}", event);
        }
    }

    Ok(())
}
