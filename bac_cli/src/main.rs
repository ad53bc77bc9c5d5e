use bac_core::store::DRINK_LOG_FILE;
use bac_core::*;
use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bac")]
#[command(about = "Blood alcohol estimate from your logged drinks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a drink
    Add {
        /// Start from a preset (see `bac presets`)
        #[arg(long)]
        preset: Option<String>,

        /// Drink name
        #[arg(long)]
        name: Option<String>,

        /// Volume in millilitres
        #[arg(long)]
        volume_ml: Option<f64>,

        /// Alcohol by volume, percent
        #[arg(long)]
        abv: Option<f64>,

        /// When it was consumed (RFC 3339 or HH:MM today); defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// List logged drinks in time order
    List,

    /// Remove a drink by id or unique id prefix
    Remove {
        id: String,
    },

    /// Correct when a drink was consumed
    Retime {
        id: String,

        /// New time (RFC 3339 or HH:MM today)
        #[arg(long)]
        at: String,
    },

    /// Remove all drinks and start a new session
    Clear,

    /// Estimate BAC and time until under the legal threshold (default)
    Status {
        /// Evaluate at this time instead of now (RFC 3339 or HH:MM today)
        #[arg(long)]
        now: Option<String>,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the simulated BAC series as CSV (`-` for stdout)
    Export {
        path: PathBuf,
    },

    /// List drink presets
    Presets,

    /// Show the effective body and metabolism parameters
    Config,
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Initialize logging
    bac_core::logging::init_with_level(if cli.verbose { "debug" } else { "warn" });

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let log_path = data_dir.join(DRINK_LOG_FILE);
    tracing::debug!("Using drink log {:?}", log_path);

    match cli.command {
        Some(Commands::Add {
            preset,
            name,
            volume_ml,
            abv,
            at,
        }) => cmd_add(&log_path, preset, name, volume_ml, abv, at),
        Some(Commands::List) => cmd_list(&log_path),
        Some(Commands::Remove { id }) => cmd_remove(&log_path, &id),
        Some(Commands::Retime { id, at }) => cmd_retime(&log_path, &id, &at),
        Some(Commands::Clear) => cmd_clear(&log_path),
        Some(Commands::Status { now, json }) => cmd_status(&log_path, &config, now, json),
        Some(Commands::Export { path }) => cmd_export(&log_path, &config, &path),
        Some(Commands::Presets) => cmd_presets(),
        Some(Commands::Config) => cmd_config(&config),
        None => {
            // Default to "status" command
            cmd_status(&log_path, &config, None, false)
        }
    }
}

fn cmd_add(
    log_path: &Path,
    preset: Option<String>,
    name: Option<String>,
    volume_ml: Option<f64>,
    abv: Option<f64>,
    at: Option<String>,
) -> Result<()> {
    let preset = match preset {
        Some(id) => Some(
            get_default_catalog()
                .get(&id)
                .ok_or_else(|| Error::InvalidDrink(format!("Unknown preset: {}", id)))?,
        ),
        None => None,
    };

    let name = name
        .or_else(|| preset.map(|p| p.name.clone()))
        .ok_or_else(|| Error::InvalidDrink("--name is required without --preset".into()))?;
    let volume_ml = volume_ml
        .or_else(|| preset.map(|p| p.volume_ml))
        .ok_or_else(|| Error::InvalidDrink("--volume-ml is required without --preset".into()))?;
    let abv = abv
        .or_else(|| preset.map(|p| p.abv_percent))
        .ok_or_else(|| Error::InvalidDrink("--abv is required without --preset".into()))?;

    let timestamp_ms = match at {
        Some(s) => parse_time(&s)?,
        None => Utc::now().timestamp_millis(),
    };

    let drink = DrinkLog::update(log_path, |log| {
        log.add(name, volume_ml, abv, timestamp_ms).cloned()
    })?;

    println!(
        "✓ Logged {} ({:.2} standard drinks) at {}  [{}]",
        drink.name,
        drink.standard_drinks,
        format_consumed(&drink),
        short_id(&drink)
    );
    Ok(())
}

fn cmd_list(log_path: &Path) -> Result<()> {
    let log = DrinkLog::load(log_path)?;

    if log.is_empty() {
        println!("No drinks logged.");
        return Ok(());
    }

    println!(
        "{:<10} {:<17} {:>8} {:>6} {:>6}  {}",
        "ID", "TIME", "ML", "ABV%", "SD", "NAME"
    );
    for drink in log.sorted_by_time() {
        println!(
            "{:<10} {:<17} {:>8.0} {:>6.1} {:>6.2}  {}",
            short_id(drink),
            format_consumed(drink),
            drink.volume_ml,
            drink.abv_percent,
            drink.standard_drinks,
            drink.name
        );
    }
    println!();
    println!(
        "{} drinks, {:.2} standard drinks total",
        log.len(),
        log.total_standard_drinks()
    );
    Ok(())
}

fn cmd_remove(log_path: &Path, id: &str) -> Result<()> {
    let removed = DrinkLog::update(log_path, |log| {
        let target = log.find_by_prefix(id)?.id;
        log.remove(target)
    })?;

    println!("✓ Removed {} [{}]", removed.name, short_id(&removed));
    Ok(())
}

fn cmd_retime(log_path: &Path, id: &str, at: &str) -> Result<()> {
    let timestamp_ms = parse_time(at)?;
    let drink = DrinkLog::update(log_path, |log| {
        let target = log.find_by_prefix(id)?.id;
        log.update_timestamp(target, timestamp_ms).cloned()
    })?;

    println!(
        "✓ Moved {} [{}] to {}",
        drink.name,
        short_id(&drink),
        format_consumed(&drink)
    );
    Ok(())
}

fn cmd_clear(log_path: &Path) -> Result<()> {
    let count = DrinkLog::update(log_path, |log| Ok(log.clear()))?;
    println!("✓ Cleared {} drinks", count);
    Ok(())
}

fn cmd_status(log_path: &Path, config: &Config, now: Option<String>, json: bool) -> Result<()> {
    let log = DrinkLog::load(log_path)?;
    let now_ms = match now {
        Some(s) => parse_time(&s)?,
        None => Utc::now().timestamp_millis(),
    };

    let params = config.simulation_parameters();
    let points = simulate(log.events(), &params);
    let analytics = analyze(&points);
    let current = estimate_at(&points, now_ms);

    if json {
        let report = serde_json::json!({
            "drinks": log.len(),
            "standard_drinks": log.total_standard_drinks(),
            "current_bac_percent": current,
            "analytics": analytics,
            "samples": points.len(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let Some(analytics) = analytics else {
        println!("No drinks logged.");
        return Ok(());
    };

    println!(
        "Drinks:      {} ({:.2} standard drinks)",
        log.len(),
        log.total_standard_drinks()
    );
    match current {
        Some(bac) => println!("Current BAC: {:.3}%", bac),
        None => println!("Current BAC: -- (before first drink)"),
    }
    println!(
        "Peak BAC:    {:.3}% at {}",
        analytics.peak_bac_percent,
        format_time(analytics.peak_time_ms)
    );

    match analytics.status {
        ThresholdStatus::UnderThreshold => {
            println!(
                "Status:      under the {:.2}% threshold",
                LEGAL_THRESHOLD_BAC
            );
        }
        ThresholdStatus::OverThreshold {
            crossing_time_ms,
            is_projected: false,
            ..
        } => {
            println!(
                "Status:      over {:.2}% until {} ({})",
                LEGAL_THRESHOLD_BAC,
                format_time(crossing_time_ms),
                format_remaining(&analytics, now_ms)
            );
        }
        ThresholdStatus::OverThreshold {
            crossing_time_ms,
            crossing_bac_percent,
            is_projected: true,
        } => {
            println!(
                "Status:      still over {:.2}% at {} ({:.3}%), projection only",
                LEGAL_THRESHOLD_BAC,
                format_time(crossing_time_ms),
                crossing_bac_percent
            );
        }
    }

    println!();
    println!("Estimates only. Never use this to decide whether you can drive.");
    Ok(())
}

fn cmd_export(log_path: &Path, config: &Config, path: &Path) -> Result<()> {
    let log = DrinkLog::load(log_path)?;
    let points = simulate(log.events(), &config.simulation_parameters());

    if path == Path::new("-") {
        return write_series_csv(&points, std::io::stdout().lock());
    }

    let count = export_series_csv(&points, path)?;
    println!("✓ Exported {} samples to {}", count, path.display());
    Ok(())
}

fn cmd_presets() -> Result<()> {
    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Preset catalog errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Other("Invalid preset catalog".into()));
    }

    for preset in catalog.presets.values() {
        println!(
            "{:<12} {:<28} {:>5.2} SD",
            preset.id,
            preset.name,
            preset.standard_drinks()
        );
    }
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    let params = config.simulation_parameters();
    println!("Data dir:              {}", config.data.data_dir.display());
    println!("Body weight:           {:.1} kg", params.body_weight_kg);
    println!(
        "Sex:                   {:?} (r = {:.2})",
        params.sex,
        params.distribution_ratio()
    );
    println!(
        "First-hour burn:       {:.2} SD/h",
        params.first_hour_burn_rate
    );
    println!(
        "Subsequent burn:       {:.2} SD/h",
        params.subsequent_hour_burn_rate
    );
    println!(
        "Config file:           {}",
        Config::default_config_path().display()
    );
    Ok(())
}

/// Parse RFC 3339, or HH:MM meaning today in local time
fn parse_time(input: &str) -> Result<i64> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.timestamp_millis());
    }

    let time = NaiveTime::parse_from_str(input, "%H:%M")
        .map_err(|_| Error::InvalidTime(format!("expected RFC 3339 or HH:MM, got '{}'", input)))?;
    let local = Local::now()
        .date_naive()
        .and_time(time)
        .and_local_timezone(Local)
        .earliest()
        .ok_or_else(|| Error::InvalidTime(format!("{} does not exist today", input)))?;

    Ok(local.timestamp_millis())
}

fn format_time(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => timestamp_ms.to_string(),
    }
}

fn format_consumed(drink: &DrinkEvent) -> String {
    drink
        .consumed_at()
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn format_remaining(analytics: &SessionAnalytics, now_ms: i64) -> String {
    match analytics.remaining_until_threshold(now_ms) {
        Some(d) if d.num_minutes() > 0 => {
            format!("in {}h {:02}m", d.num_hours(), d.num_minutes() % 60)
        }
        Some(_) => "already passed".to_string(),
        None => "n/a".to_string(),
    }
}

fn short_id(drink: &DrinkEvent) -> String {
    drink.id.to_string()[..8].to_string()
}
