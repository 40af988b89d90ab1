use crate::error::{DashboardError, Result};
use crate::types::{
    Aggregates, Appliance, AnomalyReport, AnomalyRow, BreakdownRow, HouseholdInsight,
    HouseholdRecord, RegionFilter, ScoreReport, ScoreRow,
};
use crate::util::{average, min_max_normalise, population_std_dev, round_to};
use std::collections::BTreeMap;
use std::fmt;

/// Households above this monthly consumption get the high-usage advice.
pub const HIGH_USAGE_KWH: f64 = 250.0;
/// |z| strictly above this marks a household as anomalous.
pub const ANOMALY_Z_THRESHOLD: f64 = 2.0;
/// Size of the most/least efficient rankings.
pub const RANKING_SIZE: usize = 5;

const WEIGHT_ENERGY: f64 = 0.5;
const WEIGHT_APPLIANCES: f64 = 0.3;
const WEIGHT_INCOME: f64 = 0.2;

pub fn filter_by_region(records: &[HouseholdRecord], region: &RegionFilter) -> Vec<HouseholdRecord> {
    match region {
        RegionFilter::All => records.to_vec(),
        RegionFilter::Only(name) => records
            .iter()
            .filter(|r| &r.region == name)
            .cloned()
            .collect(),
    }
}

/// Distinct regions in ascending order, as offered by the region selector.
pub fn available_regions(records: &[HouseholdRecord]) -> Vec<String> {
    let mut regions: Vec<String> = records.iter().map(|r| r.region.clone()).collect();
    regions.sort();
    regions.dedup();
    regions
}

pub fn compute_aggregates(records: &[HouseholdRecord]) -> Result<Aggregates> {
    if records.is_empty() {
        return Err(DashboardError::EmptyInput);
    }
    let total_kwh: f64 = records.iter().map(|r| r.monthly_energy_kwh).sum();
    Ok(Aggregates {
        households: records.len(),
        mean_kwh: total_kwh / records.len() as f64,
        total_kwh,
    })
}

/// Classify each household by the z-score of its energy use.
///
/// Uses the population standard deviation. When every household uses the
/// same amount, all z-scores are 0 and nothing is anomalous.
pub fn detect_anomalies(records: &[HouseholdRecord]) -> Result<AnomalyReport> {
    if records.len() < 2 {
        return Err(DashboardError::InsufficientData {
            required: 2,
            actual: records.len(),
        });
    }
    let energy: Vec<f64> = records.iter().map(|r| r.monthly_energy_kwh).collect();
    let mean = average(&energy);
    let std_dev = population_std_dev(&energy);
    // Compare values directly: a rounded mean can leave a tiny nonzero spread.
    let flat = std_dev == 0.0 || energy.iter().all(|e| *e == energy[0]);
    if flat {
        tracing::debug!(mean, "zero variance in energy use, no anomalies possible");
    }

    let rows: Vec<AnomalyRow> = records
        .iter()
        .map(|r| {
            let z_score = if flat {
                0.0
            } else {
                (r.monthly_energy_kwh - mean) / std_dev
            };
            AnomalyRow {
                household_id: r.household_id.clone(),
                energy_kwh: r.monthly_energy_kwh,
                total_appliances: r.total_appliances(),
                z_score,
                anomaly: z_score.abs() > ANOMALY_Z_THRESHOLD,
            }
        })
        .collect();

    let report = AnomalyReport { rows };
    tracing::debug!(
        households = records.len(),
        anomalies = report.count(),
        "anomaly detection complete"
    );
    Ok(report)
}

/// Weighted efficiency score on min-max normalised income, energy and
/// appliance count, scaled to 0..=100 and rounded to 2 places.
pub fn saving_score(norm_income: f64, norm_energy: f64, norm_appliances: f64) -> f64 {
    let raw = (1.0 - norm_energy) * WEIGHT_ENERGY
        + (1.0 - norm_appliances) * WEIGHT_APPLIANCES
        + norm_income * WEIGHT_INCOME;
    round_to(raw * 100.0, 2)
}

pub fn compute_saving_score(records: &[HouseholdRecord]) -> Result<ScoreReport> {
    if records.is_empty() {
        return Err(DashboardError::EmptyInput);
    }
    let income: Vec<f64> = records.iter().map(|r| r.monthly_income_inr).collect();
    let energy: Vec<f64> = records.iter().map(|r| r.monthly_energy_kwh).collect();
    let appliances: Vec<f64> = records
        .iter()
        .map(|r| r.total_appliances() as f64)
        .collect();

    let norm_income = min_max_normalise(&income);
    let norm_energy = min_max_normalise(&energy);
    let norm_appliances = min_max_normalise(&appliances);

    let rows: Vec<ScoreRow> = records
        .iter()
        .enumerate()
        .map(|(i, r)| ScoreRow {
            household_id: r.household_id.clone(),
            norm_income: norm_income[i],
            norm_energy: norm_energy[i],
            norm_appliances: norm_appliances[i],
            score: saving_score(norm_income[i], norm_energy[i], norm_appliances[i]),
        })
        .collect();

    // `sort_by` is stable, so ties keep record order.
    let mut ranked = rows.clone();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    let top: Vec<ScoreRow> = ranked.iter().take(RANKING_SIZE).cloned().collect();
    ranked = rows.clone();
    ranked.sort_by(|a, b| a.score.total_cmp(&b.score));
    let bottom: Vec<ScoreRow> = ranked.into_iter().take(RANKING_SIZE).collect();

    tracing::debug!(households = rows.len(), "saving scores computed");
    Ok(ScoreReport { rows, top, bottom })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    HighUsage { household_id: String },
    EvMeter { household_id: String },
}

impl Recommendation {
    pub fn for_record(record: &HouseholdRecord) -> Option<Self> {
        let household_id = record.household_id.clone();
        if record.monthly_energy_kwh > HIGH_USAGE_KWH {
            Some(Recommendation::HighUsage { household_id })
        } else if record.charges_ev() {
            Some(Recommendation::EvMeter { household_id })
        } else {
            None
        }
    }

    pub fn household_id(&self) -> &str {
        match self {
            Recommendation::HighUsage { household_id }
            | Recommendation::EvMeter { household_id } => household_id,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::HighUsage { household_id } => write!(
                f,
                "Household ID {household_id} - High usage! Recommend switching to solar and LED bulbs."
            ),
            Recommendation::EvMeter { household_id } => write!(
                f,
                "Household ID {household_id} - Consider installing a separate EV meter for optimal billing."
            ),
        }
    }
}

/// Lazy recommendation sequence over a record slice. Clone it to restart.
#[derive(Debug, Clone)]
pub struct Recommendations<'a> {
    records: std::slice::Iter<'a, HouseholdRecord>,
}

impl Recommendations<'_> {
    /// Newline-joined text, as exported to `recommendations.txt`.
    pub fn to_text(&self) -> String {
        self.clone()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Iterator for Recommendations<'_> {
    type Item = Recommendation;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.by_ref().find_map(Recommendation::for_record)
    }
}

pub fn build_recommendations(records: &[HouseholdRecord]) -> Recommendations<'_> {
    Recommendations {
        records: records.iter(),
    }
}

/// Mean energy use grouped by how many of `appliance` a household owns.
pub fn appliance_breakdown(records: &[HouseholdRecord], appliance: Appliance) -> Vec<BreakdownRow> {
    let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for r in records {
        groups
            .entry(r.appliance(appliance))
            .or_default()
            .push(r.monthly_energy_kwh);
    }
    groups
        .into_iter()
        .map(|(count, energy)| BreakdownRow {
            count,
            households: energy.len(),
            mean_kwh: average(&energy),
        })
        .collect()
}

/// Everything the presentation layer renders for one region selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub region: RegionFilter,
    pub records: Vec<HouseholdRecord>,
    pub aggregates: Aggregates,
    pub anomalies: AnomalyReport,
    pub scores: ScoreReport,
    pub insights: Vec<HouseholdInsight>,
    pub breakdown: Vec<BreakdownRow>,
    pub recommendations: Vec<String>,
}

/// Filter, then derive every view from scratch. The first failing step
/// aborts the whole build.
pub fn build_dashboard(
    all_records: &[HouseholdRecord],
    region: &RegionFilter,
    appliance: Appliance,
) -> Result<Dashboard> {
    let records = filter_by_region(all_records, region);
    tracing::debug!(%region, households = records.len(), "building dashboard");

    let aggregates = compute_aggregates(&records)?;
    let anomalies = detect_anomalies(&records)?;
    let scores = compute_saving_score(&records)?;
    let insights = records
        .iter()
        .zip(&anomalies.rows)
        .zip(&scores.rows)
        .map(|((r, a), s)| HouseholdInsight {
            household_id: r.household_id.clone(),
            region: r.region.clone(),
            monthly_income_inr: r.monthly_income_inr,
            monthly_energy_kwh: r.monthly_energy_kwh,
            total_appliances: a.total_appliances,
            z_score: a.z_score,
            anomaly: a.anomaly,
            norm_income: s.norm_income,
            norm_energy: s.norm_energy,
            norm_appliances: s.norm_appliances,
            score: s.score,
        })
        .collect();
    let breakdown = appliance_breakdown(&records, appliance);
    let recommendations = build_recommendations(&records)
        .map(|r| r.to_string())
        .collect();

    Ok(Dashboard {
        region: region.clone(),
        records,
        aggregates,
        anomalies,
        scores,
        insights,
        breakdown,
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn household(id: &str, region: &str, income: f64, energy: f64, appliances: u32, ev: u8) -> HouseholdRecord {
        HouseholdRecord {
            household_id: id.to_string(),
            region: region.to_string(),
            monthly_income_inr: income,
            monthly_energy_kwh: energy,
            appliance_ac: appliances,
            appliance_fan: 0,
            appliance_light: 0,
            fridge: 0,
            washing_machine: 0,
            ev_charging: ev,
        }
    }

    fn sample() -> Vec<HouseholdRecord> {
        vec![
            household("1", "North", 30_000.0, 300.0, 4, 0),
            household("2", "South", 60_000.0, 100.0, 2, 1),
            household("3", "North", 90_000.0, 100.0, 1, 0),
            household("4", "East", 45_000.0, 200.0, 3, 0),
        ]
    }

    #[test]
    fn filter_all_is_identity() {
        let data = sample();
        assert_eq!(filter_by_region(&data, &RegionFilter::All), data);
    }

    #[test]
    fn filter_keeps_order_of_matching_region() {
        let north = filter_by_region(&sample(), &RegionFilter::Only("North".into()));
        let ids: Vec<_> = north.iter().map(|r| r.household_id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[test]
    fn unknown_region_yields_empty_set() {
        assert!(filter_by_region(&sample(), &RegionFilter::Only("Mars".into())).is_empty());
    }

    #[test]
    fn regions_sorted_and_distinct() {
        assert_eq!(available_regions(&sample()), ["East", "North", "South"]);
    }

    #[test]
    fn aggregates_mean_and_sum() {
        let agg = compute_aggregates(&sample()).unwrap();
        assert_eq!(agg.total_kwh, 700.0);
        assert_eq!(agg.mean_kwh, 175.0);
        assert_eq!(agg.households, 4);
    }

    #[test]
    fn aggregates_reject_empty_input() {
        assert!(matches!(compute_aggregates(&[]), Err(DashboardError::EmptyInput)));
    }

    #[test]
    fn anomalies_need_two_records() {
        let one = vec![household("1", "N", 1.0, 1.0, 1, 0)];
        assert!(matches!(
            detect_anomalies(&one),
            Err(DashboardError::InsufficientData { required: 2, actual: 1 })
        ));
    }

    #[test]
    fn zero_variance_means_no_anomalies() {
        let flat: Vec<_> = (0..5)
            .map(|i| household(&i.to_string(), "N", 1.0, 120.0, 1, 0))
            .collect();
        let report = detect_anomalies(&flat).unwrap();
        assert_eq!(report.count(), 0);
        assert!(report.rows.iter().all(|r| r.z_score == 0.0));
    }

    #[test]
    fn outlier_is_flagged() {
        let mut data: Vec<_> = (0..10)
            .map(|i| household(&i.to_string(), "N", 1.0, 100.0, 1, 0))
            .collect();
        data.push(household("big", "N", 1.0, 1_000.0, 1, 0));
        let report = detect_anomalies(&data).unwrap();
        let flagged = report.anomalies();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].household_id, "big");
        assert_eq!(flagged[0].anomaly_label(), "Yes");
        assert!(flagged[0].z_score > 2.0);
    }

    #[test]
    fn z_of_exactly_two_is_not_anomalous() {
        // Four records at 0 and one at 5: mean 1, population std-dev 2,
        // so the high record sits at z = 2 exactly.
        let mut data: Vec<_> = (0..4)
            .map(|i| household(&i.to_string(), "N", 1.0, 0.0, 1, 0))
            .collect();
        data.push(household("edge", "N", 1.0, 5.0, 1, 0));
        let report = detect_anomalies(&data).unwrap();
        let edge = report.rows.last().unwrap();
        assert!((edge.z_score - 2.0).abs() < 1e-12);
        assert!(!edge.anomaly);
    }

    #[test]
    fn score_matches_weighted_formula() {
        let report = compute_saving_score(&sample()).unwrap();
        // Household 3: highest income, lowest energy, fewest appliances.
        assert_eq!(report.rows[2].score, 100.0);
        // Household 1: lowest income, highest energy, most appliances.
        assert_eq!(report.rows[0].score, 0.0);
        // Household 4: income 0.25, energy 0.5, appliances 2/3.
        let expected = round_to(((1.0 - 0.5) * 0.5 + (1.0 - 2.0 / 3.0) * 0.3 + 0.25 * 0.2) * 100.0, 2);
        assert_eq!(report.rows[3].score, expected);
        assert_eq!(report.rows[3].score, 40.0);
    }

    #[test]
    fn constant_fields_normalise_to_zero() {
        let data = vec![
            household("a", "N", 500.0, 100.0, 2, 0),
            household("b", "N", 500.0, 200.0, 2, 0),
        ];
        let report = compute_saving_score(&data).unwrap();
        for row in &report.rows {
            assert_eq!(row.norm_income, 0.0);
            assert_eq!(row.norm_appliances, 0.0);
        }
        assert_eq!(report.rows[0].score, 80.0);
        assert_eq!(report.rows[1].score, 30.0);
    }

    #[test]
    fn single_record_scores_fixed_value() {
        let report = compute_saving_score(&[household("solo", "N", 9.0, 9.0, 9, 1)]).unwrap();
        assert_eq!(report.rows[0].score, 80.0);
        assert_eq!(report.top.len(), 1);
        assert_eq!(report.bottom.len(), 1);
    }

    #[test]
    fn rankings_are_stable_on_ties() {
        let data = vec![
            household("a", "N", 500.0, 100.0, 2, 0),
            household("b", "N", 500.0, 100.0, 2, 0),
            household("c", "N", 500.0, 100.0, 2, 0),
        ];
        let report = compute_saving_score(&data).unwrap();
        let top: Vec<_> = report.top.iter().map(|r| r.household_id.as_str()).collect();
        let bottom: Vec<_> = report.bottom.iter().map(|r| r.household_id.as_str()).collect();
        assert_eq!(top, ["a", "b", "c"]);
        assert_eq!(bottom, ["a", "b", "c"]);
    }

    #[test]
    fn rankings_cap_at_five() {
        let data: Vec<_> = (0..12u32)
            .map(|i| household(&i.to_string(), "N", 1_000.0 * f64::from(i), 100.0 + f64::from(i), 1, 0))
            .collect();
        let report = compute_saving_score(&data).unwrap();
        assert_eq!(report.top.len(), 5);
        assert_eq!(report.bottom.len(), 5);
        assert!(report.top.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(report.bottom.windows(2).all(|w| w[0].score <= w[1].score));
    }

    #[test]
    fn recommendations_follow_priority() {
        let data = vec![
            household("1", "N", 1.0, 300.0, 1, 0),
            household("2", "N", 1.0, 100.0, 1, 1),
            household("3", "N", 1.0, 100.0, 1, 0),
        ];
        let lines: Vec<String> = build_recommendations(&data).map(|r| r.to_string()).collect();
        assert_eq!(
            lines,
            [
                "Household ID 1 - High usage! Recommend switching to solar and LED bulbs.",
                "Household ID 2 - Consider installing a separate EV meter for optimal billing.",
            ]
        );
    }

    #[test]
    fn high_usage_wins_over_ev() {
        let data = vec![household("9", "N", 1.0, 250.5, 1, 1)];
        let recs: Vec<_> = build_recommendations(&data).collect();
        assert_eq!(recs, [Recommendation::HighUsage { household_id: "9".into() }]);
    }

    #[test]
    fn exactly_threshold_is_not_high_usage() {
        let data = vec![household("7", "N", 1.0, 250.0, 1, 0)];
        assert_eq!(build_recommendations(&data).count(), 0);
    }

    #[test]
    fn recommendations_restart_when_cloned() {
        let data = sample();
        let recs = build_recommendations(&data);
        let first: Vec<_> = recs.clone().collect();
        let second: Vec<_> = recs.clone().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].household_id(), "2");
        assert_eq!(recs.to_text().lines().count(), 2);
        assert!(build_recommendations(&[]).next().is_none());
    }

    #[test]
    fn breakdown_groups_by_count() {
        let rows = appliance_breakdown(&sample(), Appliance::EvCharging);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].count, 0);
        assert_eq!(rows[0].households, 3);
        assert_eq!(rows[0].mean_kwh, 200.0);
        assert_eq!(rows[1].mean_kwh, 100.0);
        assert!(appliance_breakdown(&[], Appliance::Ac).is_empty());
    }

    #[test]
    fn dashboard_zips_derived_columns() {
        let dash = build_dashboard(&sample(), &RegionFilter::All, Appliance::Ac).unwrap();
        assert_eq!(dash.insights.len(), 4);
        assert_eq!(dash.insights[2].household_id, "3");
        assert_eq!(dash.insights[2].score, 100.0);
        assert_eq!(dash.recommendations.len(), 2);
        assert_eq!(dash.aggregates.total_kwh, 700.0);
    }

    #[test]
    fn dashboard_handles_huge_appliance_counts() {
        let mut big = household("A", "N", 100.0, 100.0, u32::MAX, 0);
        big.appliance_fan = 1;
        let data = vec![big, household("B", "N", 200.0, 150.0, 1, 0)];
        let dash = build_dashboard(&data, &RegionFilter::All, Appliance::Ac).unwrap();
        assert_eq!(dash.insights[0].total_appliances, u64::from(u32::MAX) + 1);
        assert_eq!(dash.insights[0].norm_appliances, 1.0);
        assert_eq!(dash.insights[1].norm_appliances, 0.0);
    }

    #[test]
    fn dashboard_propagates_insufficient_data() {
        let err = build_dashboard(&sample(), &RegionFilter::Only("East".into()), Appliance::Ac)
            .unwrap_err();
        assert!(matches!(err, DashboardError::InsufficientData { actual: 1, .. }));
        let err = build_dashboard(&sample(), &RegionFilter::Only("Mars".into()), Appliance::Ac)
            .unwrap_err();
        assert!(matches!(err, DashboardError::EmptyInput));
    }
}
