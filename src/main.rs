// Entry point and high-level CLI flow.
//
// - Option [1] loads and validates the household CSV.
// - Option [2] picks the region ("All" or one of the dataset's regions).
// - Option [3] derives every view for that region, prints previews and
//   exports the files; the user can then return to the menu or exit.
//
// `--batch` skips the menu and runs load, derive and export once.
use anyhow::{Context, Result};
use clap::Parser;
use energy_dashboard::config::AppConfig;
use energy_dashboard::reports::{self, Dashboard};
use energy_dashboard::util::{format_int, format_number};
use energy_dashboard::{loader, output, HouseholdRecord, RegionFilter};
use once_cell::sync::Lazy;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

// Records are loaded once and re-derived on every region change.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    data: Option<Vec<HouseholdRecord>>,
    region: RegionFilter,
}

fn state() -> std::sync::MutexGuard<'static, AppState> {
    // Recover the state if a previous holder panicked.
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read a single trimmed line after printing `prompt`.
///
/// Returns `None` once input is exhausted or unreadable.
fn read_line(input: &mut impl BufRead, prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask whether to go back to the dashboard menu after generating.
///
/// Returns `true` for `Y`, `false` for `N` or closed input.
fn prompt_back_to_menu(input: &mut impl BufRead) -> bool {
    loop {
        let Some(resp) = read_line(input, "Back to Dashboard Menu (Y/N): ") else {
            return false;
        };
        match resp.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Region to use after (re)loading `regions`. A previous selection survives
/// a reload while the new data still has it; otherwise the configured one
/// applies.
fn region_after_load(
    previous: Option<&RegionFilter>,
    configured: RegionFilter,
    regions: &[String],
) -> RegionFilter {
    match previous {
        Some(RegionFilter::All) => RegionFilter::All,
        Some(RegionFilter::Only(name)) if regions.contains(name) => {
            RegionFilter::Only(name.clone())
        }
        _ => configured,
    }
}

/// Handle option [1]: load the CSV and keep it in `APP_STATE`.
fn handle_load(cfg: &AppConfig) {
    match loader::load_records(&cfg.data) {
        Ok((data, report)) => {
            println!(
                "Processing dataset... ({} households loaded across {} regions)\n",
                format_int(report.total_rows),
                format_int(report.regions)
            );
            let regions = reports::available_regions(&data);
            let mut state = state();
            let previous = state.data.is_some().then(|| state.region.clone());
            state.region = region_after_load(previous.as_ref(), cfg.region_filter(), &regions);
            state.data = Some(data);
        }
        Err(e) => {
            tracing::error!(error = %e, path = %cfg.data.display(), "load failed");
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

/// Handle option [2]: choose "All" or one of the loaded regions.
fn handle_select_region(input: &mut impl BufRead) {
    let regions = {
        let state = state();
        match &state.data {
            Some(data) => reports::available_regions(data),
            None => {
                println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
                return;
            }
        }
    };

    println!("Select Region:");
    println!("[0] {}", RegionFilter::ALL_LABEL);
    for (i, region) in regions.iter().enumerate() {
        println!("[{}] {}", i + 1, region);
    }
    let Some(choice) = read_line(input, "Enter choice: ") else {
        return;
    };
    let selected = match choice.parse::<usize>() {
        Ok(0) => RegionFilter::All,
        Ok(n) if n <= regions.len() => RegionFilter::Only(regions[n - 1].clone()),
        _ => {
            println!("Invalid choice. Region unchanged.\n");
            return;
        }
    };
    println!("Region set to {}.\n", selected);
    state().region = selected;
}

fn print_dashboard(dashboard: &Dashboard) {
    let agg = &dashboard.aggregates;
    println!("Energy Dashboard for Housing Complex");
    println!("(Region: {})\n", dashboard.region);

    println!("Household Energy Consumption Overview\n");
    output::preview_table_rows(&output::overview_rows(&dashboard.records), 5);

    println!("Average Monthly Consumption (kWh): {}", format_number(agg.mean_kwh, 2));
    println!("Total Energy Consumption (kWh): {}\n", format_number(agg.total_kwh, 0));

    println!("Appliance-wise Count vs Energy Consumption\n");
    output::preview_table_rows(&output::breakdown_rows(&dashboard.breakdown), usize::MAX);

    println!("Smart Recommendations");
    for line in &dashboard.recommendations {
        println!("  {}", line);
    }
    println!();

    let anomalies = dashboard.anomalies.anomalies();
    println!("Anomaly Detection: Unusual Energy Usage");
    println!("Found {} anomalous households (|z| > 2)\n", anomalies.len());
    output::preview_table_rows(&output::anomaly_rows(&anomalies), usize::MAX);

    println!("Top Efficient Households\n");
    output::preview_table_rows(&output::score_rows(&dashboard.scores.top), usize::MAX);
    println!("Least Efficient Households\n");
    output::preview_table_rows(&output::score_rows(&dashboard.scores.bottom), usize::MAX);
}

/// Handle option [3]: derive, print and export the dashboard.
fn handle_generate(cfg: &AppConfig) {
    let (data, region) = {
        let state = state();
        (state.data.clone(), state.region.clone())
    };
    let Some(data) = data else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };

    let dashboard = match reports::build_dashboard(&data, &region, cfg.appliance) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(error = %e, %region, "cannot derive dashboard");
            println!("Cannot build dashboard for region {}: {}\n", region, e);
            return;
        }
    };
    print_dashboard(&dashboard);

    match output::export_dashboard(&dashboard, &cfg.out_dir) {
        Ok(report) => {
            println!("Outputs saved:");
            for path in &report.written {
                println!("  {}", path.display());
            }
            println!();
        }
        Err(e) => {
            tracing::error!(error = %e, "export failed");
            eprintln!("Write error: {}\n", e);
        }
    }
}

fn run_batch(cfg: &AppConfig) -> Result<()> {
    let (data, _) = loader::load_records(&cfg.data)
        .with_context(|| format!("loading {}", cfg.data.display()))?;
    let region = cfg.region_filter();
    let dashboard = reports::build_dashboard(&data, &region, cfg.appliance)
        .with_context(|| format!("deriving dashboard for region {region}"))?;
    print_dashboard(&dashboard);
    output::export_dashboard(&dashboard, &cfg.out_dir)
        .with_context(|| format!("exporting to {}", cfg.out_dir.display()))?;
    Ok(())
}

fn run_menu(cfg: &AppConfig, input: &mut impl BufRead) {
    loop {
        println!("Energy Dashboard:");
        println!("[1] Load the file");
        println!("[2] Select region");
        println!("[3] Generate dashboard\n");
        let Some(choice) = read_line(input, "Enter choice: ") else {
            println!("\nExiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(cfg),
            "2" => handle_select_region(input),
            "3" => {
                println!();
                handle_generate(cfg);
                if !prompt_back_to_menu(input) {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}

fn main() -> Result<()> {
    let cfg = AppConfig::parse();

    let level = if cfg.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(io::stderr)
        .init();

    if cfg.batch {
        run_batch(&cfg)
    } else {
        run_menu(&cfg, &mut io::stdin().lock());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_line_stops_at_end_of_input() {
        let mut input = "  3 \n".as_bytes();
        assert_eq!(read_line(&mut input, ""), Some("3".to_string()));
        assert_eq!(read_line(&mut input, ""), None);
    }

    #[test]
    fn back_prompt_exits_on_closed_input() {
        assert!(!prompt_back_to_menu(&mut "".as_bytes()));
        assert!(!prompt_back_to_menu(&mut "maybe\n".as_bytes()));
        assert!(prompt_back_to_menu(&mut "maybe\ny\n".as_bytes()));
    }

    #[test]
    fn menu_returns_when_input_closes() {
        let cfg = AppConfig::parse_from(["energy_dashboard"]);
        run_menu(&cfg, &mut "9\n".as_bytes());
    }

    #[test]
    fn reload_keeps_selected_region() {
        let regions = vec!["East".to_string(), "North".to_string()];
        let north = RegionFilter::Only("North".into());
        assert_eq!(
            region_after_load(Some(&north), RegionFilter::All, &regions),
            north
        );
        assert_eq!(
            region_after_load(Some(&RegionFilter::All), north.clone(), &regions),
            RegionFilter::All
        );
    }

    #[test]
    fn reload_falls_back_when_region_vanishes() {
        let regions = vec!["East".to_string()];
        let gone = RegionFilter::Only("North".into());
        assert_eq!(
            region_after_load(Some(&gone), RegionFilter::All, &regions),
            RegionFilter::All
        );
        let configured = RegionFilter::Only("East".into());
        assert_eq!(
            region_after_load(None, configured.clone(), &regions),
            configured
        );
    }
}
