//! Household energy dashboard.
//!
//! Loads a household consumption CSV, narrows it to one region and derives
//! aggregate metrics, z-score anomalies, an energy-saving score with
//! top/bottom rankings, and per-household recommendations.
//!
//! - `loader`: CSV ingestion and column contract
//! - `reports`: pure derivation functions
//! - `output`: file exports and markdown previews

pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use error::{DashboardError, Result};
pub use types::{Appliance, HouseholdRecord, RegionFilter};
