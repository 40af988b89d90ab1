use crate::error::{DashboardError, Result};
use crate::types::{HouseholdRecord, RawRow, REQUIRED_COLUMNS};
use csv::{ReaderBuilder, Trim};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub regions: usize,
}

pub fn load_records(path: impl AsRef<Path>) -> Result<(Vec<HouseholdRecord>, LoadReport)> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "opening household dataset");
    let file = File::open(path)?;
    load_from_reader(file)
}

/// Read and validate every row. Any bad row aborts the load; nothing is
/// skipped, since the derived statistics depend on the full set.
pub fn load_from_reader<R: Read>(reader: R) -> Result<(Vec<HouseholdRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|col| !headers.iter().any(|h| h == **col))
    {
        return Err(DashboardError::MissingColumn((*missing).to_string()));
    }

    let mut records = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut regions: HashSet<String> = HashSet::new();

    for (idx, result) in rdr.deserialize::<RawRow>().enumerate() {
        // Header occupies line 1.
        let line = idx as u64 + 2;
        let row = result.map_err(|source| DashboardError::InvalidRow { line, source })?;
        let record = validate(row, line)?;
        if !seen.insert(record.household_id.clone()) {
            return Err(DashboardError::DuplicateHousehold(record.household_id));
        }
        regions.insert(record.region.clone());
        records.push(record);
    }

    let report = LoadReport {
        total_rows: records.len(),
        regions: regions.len(),
    };
    tracing::info!(
        rows = report.total_rows,
        regions = report.regions,
        "loaded household dataset"
    );
    Ok((records, report))
}

fn validate(row: RawRow, line: u64) -> Result<HouseholdRecord> {
    check_amount(row.monthly_income_inr, "Monthly_Income_INR", line)?;
    check_amount(row.monthly_energy_kwh, "Monthly_Energy_Consumption_kWh", line)?;
    if row.ev_charging > 1 {
        return Err(DashboardError::InvalidValue {
            line,
            column: "EV_Charging",
            value: row.ev_charging.to_string(),
        });
    }
    Ok(HouseholdRecord {
        household_id: row.household_id,
        region: row.region,
        monthly_income_inr: row.monthly_income_inr,
        monthly_energy_kwh: row.monthly_energy_kwh,
        appliance_ac: row.appliance_ac,
        appliance_fan: row.appliance_fan,
        appliance_light: row.appliance_light,
        fridge: row.fridge,
        washing_machine: row.washing_machine,
        ev_charging: row.ev_charging,
    })
}

fn check_amount(value: f64, column: &'static str, line: u64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DashboardError::InvalidValue {
            line,
            column,
            value: value.to_string(),
        })
    }
}
