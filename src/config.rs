//! Command-line configuration.

use crate::types::{Appliance, RegionFilter};
use clap::Parser;
use std::path::PathBuf;

/// Household energy dashboard for a housing complex.
#[derive(Parser, Debug, Clone)]
#[command(name = "energy_dashboard", version, about)]
pub struct AppConfig {
    /// Household energy CSV to load.
    #[arg(long, default_value = "energy_data.csv", env = "ENERGY_DASHBOARD_DATA")]
    pub data: PathBuf,

    /// Region to show, or "All".
    #[arg(long, default_value = "All")]
    pub region: String,

    /// Appliance used for the consumption breakdown.
    #[arg(long, value_enum, default_value = "ac")]
    pub appliance: Appliance,

    /// Directory for exported reports.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Load, derive and export once without the interactive menu.
    #[arg(long)]
    pub batch: bool,

    /// Verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl AppConfig {
    pub fn region_filter(&self) -> RegionFilter {
        self.region.parse().unwrap_or_default()
    }
}
