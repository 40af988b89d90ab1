use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// Columns the input CSV must carry, in the order the dataset ships them.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "Household_ID",
    "Region",
    "Monthly_Income_INR",
    "Monthly_Energy_Consumption_kWh",
    "Appliance_AC",
    "Appliance_Fan",
    "Appliance_Light",
    "Fridge",
    "Washing_Machine",
    "EV_Charging",
];

#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Household_ID")]
    pub household_id: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Monthly_Income_INR")]
    pub monthly_income_inr: f64,
    #[serde(rename = "Monthly_Energy_Consumption_kWh")]
    pub monthly_energy_kwh: f64,
    #[serde(rename = "Appliance_AC")]
    pub appliance_ac: u32,
    #[serde(rename = "Appliance_Fan")]
    pub appliance_fan: u32,
    #[serde(rename = "Appliance_Light")]
    pub appliance_light: u32,
    #[serde(rename = "Fridge")]
    pub fridge: u32,
    #[serde(rename = "Washing_Machine")]
    pub washing_machine: u32,
    #[serde(rename = "EV_Charging")]
    pub ev_charging: u8,
}

/// One validated household row.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdRecord {
    pub household_id: String,
    pub region: String,
    pub monthly_income_inr: f64,
    pub monthly_energy_kwh: f64,
    pub appliance_ac: u32,
    pub appliance_fan: u32,
    pub appliance_light: u32,
    pub fridge: u32,
    pub washing_machine: u32,
    pub ev_charging: u8,
}

impl HouseholdRecord {
    pub fn appliance(&self, appliance: Appliance) -> u32 {
        match appliance {
            Appliance::Ac => self.appliance_ac,
            Appliance::Fan => self.appliance_fan,
            Appliance::Light => self.appliance_light,
            Appliance::Fridge => self.fridge,
            Appliance::WashingMachine => self.washing_machine,
            Appliance::EvCharging => u32::from(self.ev_charging),
        }
    }

    /// Sum of all six appliance fields, EV charging included. Widened so
    /// that counts near `u32::MAX` cannot overflow.
    pub fn total_appliances(&self) -> u64 {
        Appliance::ALL
            .iter()
            .map(|a| u64::from(self.appliance(*a)))
            .sum()
    }

    pub fn charges_ev(&self) -> bool {
        self.ev_charging == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Appliance {
    Ac,
    Fan,
    Light,
    Fridge,
    WashingMachine,
    EvCharging,
}

impl Appliance {
    pub const ALL: [Appliance; 6] = [
        Appliance::Ac,
        Appliance::Fan,
        Appliance::Light,
        Appliance::Fridge,
        Appliance::WashingMachine,
        Appliance::EvCharging,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Appliance::Ac => "Appliance_AC",
            Appliance::Fan => "Appliance_Fan",
            Appliance::Light => "Appliance_Light",
            Appliance::Fridge => "Fridge",
            Appliance::WashingMachine => "Washing_Machine",
            Appliance::EvCharging => "EV_Charging",
        }
    }

    /// Human label, e.g. `Appliance AC` for `Appliance_AC`.
    pub fn label(self) -> String {
        self.column().replace('_', " ")
    }
}

/// Region selection. `"All"` keeps every household.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegionFilter {
    #[default]
    All,
    Only(String),
}

impl RegionFilter {
    pub const ALL_LABEL: &'static str = "All";
}

impl FromStr for RegionFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == Self::ALL_LABEL {
            Ok(RegionFilter::All)
        } else {
            Ok(RegionFilter::Only(s.to_string()))
        }
    }
}

impl fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionFilter::All => f.write_str(Self::ALL_LABEL),
            RegionFilter::Only(region) => f.write_str(region),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregates {
    pub households: usize,
    pub mean_kwh: f64,
    pub total_kwh: f64,
}

fn yes_no<S: Serializer>(flag: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(if *flag { "Yes" } else { "No" })
}

/// Header of the anomaly export, matching `AnomalyRow`'s serde names.
pub const ANOMALY_COLUMNS: [&str; 5] = [
    "Household_ID",
    "Monthly_Energy_Consumption_kWh",
    "Total_Appliances",
    "z_score_energy",
    "Anomaly",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRow {
    #[serde(rename = "Household_ID")]
    pub household_id: String,
    #[serde(rename = "Monthly_Energy_Consumption_kWh")]
    pub energy_kwh: f64,
    #[serde(rename = "Total_Appliances")]
    pub total_appliances: u64,
    #[serde(rename = "z_score_energy")]
    pub z_score: f64,
    #[serde(rename = "Anomaly", serialize_with = "yes_no")]
    pub anomaly: bool,
}

impl AnomalyRow {
    pub fn anomaly_label(&self) -> &'static str {
        if self.anomaly {
            "Yes"
        } else {
            "No"
        }
    }
}

/// Z-score classification of every household in the current set.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyReport {
    pub rows: Vec<AnomalyRow>,
}

impl AnomalyReport {
    pub fn anomalies(&self) -> Vec<AnomalyRow> {
        self.rows.iter().filter(|r| r.anomaly).cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.rows.iter().filter(|r| r.anomaly).count()
    }
}

pub const SCORE_COLUMNS: [&str; 5] = [
    "Household_ID",
    "Norm_Income",
    "Norm_Energy",
    "Norm_Appliances",
    "Energy_Saving_Score",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    #[serde(rename = "Household_ID")]
    pub household_id: String,
    #[serde(rename = "Norm_Income")]
    pub norm_income: f64,
    #[serde(rename = "Norm_Energy")]
    pub norm_energy: f64,
    #[serde(rename = "Norm_Appliances")]
    pub norm_appliances: f64,
    #[serde(rename = "Energy_Saving_Score")]
    pub score: f64,
}

/// Per-household scores plus the five most and least efficient households.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub rows: Vec<ScoreRow>,
    pub top: Vec<ScoreRow>,
    pub bottom: Vec<ScoreRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub count: u32,
    pub households: usize,
    pub mean_kwh: f64,
}

pub const INSIGHT_COLUMNS: [&str; 11] = [
    "Household_ID",
    "Region",
    "Monthly_Income_INR",
    "Monthly_Energy_Consumption_kWh",
    "Total_Appliances",
    "z_score_energy",
    "Anomaly",
    "Norm_Income",
    "Norm_Energy",
    "Norm_Appliances",
    "Energy_Saving_Score",
];

/// The augmented table: raw fields plus every derived column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseholdInsight {
    #[serde(rename = "Household_ID")]
    pub household_id: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Monthly_Income_INR")]
    pub monthly_income_inr: f64,
    #[serde(rename = "Monthly_Energy_Consumption_kWh")]
    pub monthly_energy_kwh: f64,
    #[serde(rename = "Total_Appliances")]
    pub total_appliances: u64,
    #[serde(rename = "z_score_energy")]
    pub z_score: f64,
    #[serde(rename = "Anomaly", serialize_with = "yes_no")]
    pub anomaly: bool,
    #[serde(rename = "Norm_Income")]
    pub norm_income: f64,
    #[serde(rename = "Norm_Energy")]
    pub norm_energy: f64,
    #[serde(rename = "Norm_Appliances")]
    pub norm_appliances: f64,
    #[serde(rename = "Energy_Saving_Score")]
    pub score: f64,
}

#[derive(Debug, Tabled, Clone)]
pub struct OverviewTableRow {
    #[tabled(rename = "Household_ID")]
    pub household_id: String,
    #[tabled(rename = "Region")]
    pub region: String,
    #[tabled(rename = "Income (INR)")]
    pub income: String,
    #[tabled(rename = "Energy (kWh)")]
    pub energy: String,
    #[tabled(rename = "Appliances")]
    pub appliances: u64,
    #[tabled(rename = "EV")]
    pub ev_charging: u8,
}

#[derive(Debug, Tabled, Clone)]
pub struct BreakdownTableRow {
    #[tabled(rename = "Count")]
    pub count: u32,
    #[tabled(rename = "Households")]
    pub households: usize,
    #[tabled(rename = "Avg Energy (kWh)")]
    pub mean_kwh: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct AnomalyTableRow {
    #[tabled(rename = "Household_ID")]
    pub household_id: String,
    #[tabled(rename = "Energy (kWh)")]
    pub energy: String,
    #[tabled(rename = "z_score_energy")]
    pub z_score: String,
    #[tabled(rename = "Anomaly")]
    pub anomaly: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct ScoreTableRow {
    #[tabled(rename = "Household_ID")]
    pub household_id: String,
    #[tabled(rename = "Energy_Saving_Score")]
    pub score: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub region: String,
    pub households: usize,
    pub avg_energy_kwh: f64,
    pub total_energy_kwh: f64,
    pub anomalies: usize,
    pub recommendations: usize,
    pub generated_at: DateTime<Utc>,
}
