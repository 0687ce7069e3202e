mod cli;
mod config;
mod datasources;
mod db;
mod error;
mod logic;
mod models;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::Parser;
use cli::{Cli, Commands, IngestTarget};
use config::{Config, InputsConfig};
use datasources::csv_files;
use db::Database;
use logic::{IngestService, Pipeline, PipelineInputs, RunSummary};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let today = Local::now().date_naive();

    match cli.command {
        Commands::Init { force } => run_init(cli.config.as_ref(), force),
        Commands::Check => run_check(cli.config.as_ref(), cli.data_dir.as_ref()).await,
        Commands::Ingest { target, year } => {
            let (config, data_dir) = load(cli.config.as_ref(), cli.data_dir.as_ref())?;
            run_ingest(config, &data_dir, target, year, today).await
        }
        Commands::Run => {
            let (config, data_dir) = load(cli.config.as_ref(), cli.data_dir.as_ref())?;
            let summary = run_pipeline(&config, &data_dir, today)?;
            println!("{}", summary);
            Ok(())
        }
        Commands::Refresh => {
            let (config, data_dir) = load(cli.config.as_ref(), cli.data_dir.as_ref())?;
            run_ingest(config.clone(), &data_dir, IngestTarget::Recent, None, today).await?;
            let summary = run_pipeline(&config, &data_dir, today)?;
            println!("{}", summary);
            Ok(())
        }
        Commands::Report { city } => {
            let (config, data_dir) = load(cli.config.as_ref(), cli.data_dir.as_ref())?;
            run_report(&config, &data_dir, city.as_deref(), today)
        }
    }
}

fn load(config_path: Option<&PathBuf>, data_dir: Option<&PathBuf>) -> Result<(Config, PathBuf)> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let data_dir = Config::data_dir(data_dir).context("Failed to prepare data directory")?;
    Ok((config, data_dir))
}

fn run_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(p) => p.clone(),
        None => Config::default_config_path()?,
    };

    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {}. Pass --force to overwrite.",
            path.display()
        );
    }

    Config::default()
        .write_to(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

async fn run_check(config_path: Option<&PathBuf>, data_dir: Option<&PathBuf>) -> Result<()> {
    let (config, data_dir) = load(config_path, data_dir)?;
    println!("Config OK: {} cities, timezone {}", config.cities.len(), config.timezone);
    println!("Data directory: {}", data_dir.display());

    let service = IngestService::new(config, &data_dir)?;
    let mut problems = 0;
    for (label, result) in check_inputs(service.inputs()) {
        match result {
            Ok(rows) => println!("  {:<20} OK ({} rows)", label, rows),
            Err(e) => {
                problems += 1;
                println!("  {:<20} {}", label, e);
            }
        }
    }

    if service.check_connection().await {
        println!("  {:<20} OK", "Open-Meteo");
    } else {
        problems += 1;
        println!("  {:<20} OFFLINE", "Open-Meteo");
    }

    if problems > 0 {
        anyhow::bail!("{} check(s) failed", problems);
    }
    Ok(())
}

fn check_inputs(inputs: &InputsConfig) -> Vec<(&'static str, error::Result<usize>)> {
    vec![
        (
            "historical weather",
            csv_files::read_observations(&inputs.historical).map(|r| r.len()),
        ),
        (
            "forecast",
            csv_files::read_observations(&inputs.forecast).map(|r| r.len()),
        ),
        (
            "sun times",
            csv_files::read_sun_times(&inputs.sun_times).map(|r| r.len()),
        ),
        ("plants", csv_files::read_plants(&inputs.plants).map(|r| r.len())),
    ]
}

async fn run_ingest(
    config: Config,
    data_dir: &Path,
    target: IngestTarget,
    year: Option<i32>,
    today: NaiveDate,
) -> Result<()> {
    let service = IngestService::new(config, data_dir)?;
    let report = match target {
        IngestTarget::Recent => service.ingest_recent().await,
        IngestTarget::Historical => service.ingest_historical(today).await,
        IngestTarget::Sun => service.ingest_sun_times(year.unwrap_or_else(|| today.year())).await,
    }
    .with_context(|| format!("Failed to ingest {:?}", target))?;

    println!(
        "Wrote {} rows of {} to {}",
        report.rows,
        report.kind,
        report.path.display()
    );
    if report.is_partial() {
        println!("Skipped cities: {}", report.failed.join(", "));
    }
    Ok(())
}

fn run_pipeline(config: &Config, data_dir: &Path, today: NaiveDate) -> Result<RunSummary> {
    let inputs = config.inputs.resolve(data_dir);
    let pipeline_inputs = PipelineInputs {
        historical: csv_files::read_observations(&inputs.historical)
            .context("Reading historical weather (try `gardencal ingest historical`)")?,
        forecast: csv_files::read_observations(&inputs.forecast)
            .context("Reading forecast (try `gardencal ingest recent`)")?,
        sun_times: csv_files::read_sun_times(&inputs.sun_times)
            .context("Reading sun times (try `gardencal ingest sun`)")?,
        plants: csv_files::read_plants(&inputs.plants).context("Reading plants")?,
    };

    let pipeline = Pipeline::new(config.reference_year(today), today)?;
    let output = pipeline.run(&pipeline_inputs).context("Pipeline run failed")?;

    let db_path = Config::db_file(data_dir);
    let mut db = Database::open(&db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    let run_id = db.publish(&output).context("Failed to publish derived tables")?;
    tracing::info!(run_id, path = %db.path().display(), "Published run");

    Ok(output.summary)
}

fn run_report(config: &Config, data_dir: &Path, city: Option<&str>, today: NaiveDate) -> Result<()> {
    let db_path = Config::db_file(data_dir);
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;

    let run = db
        .latest_run()?
        .context("Nothing published yet. Run `gardencal run` first.")?;
    println!(
        "Run #{} on {} (reference year {}, completed {})",
        run.id, run.run_date, run.reference_year, run.completed_at
    );

    let cities = match city {
        Some(name) => {
            let name = config.city(name).map(|c| c.name.as_str()).unwrap_or(name);
            let found = db
                .cities()?
                .into_iter()
                .find(|c| c.eq_ignore_ascii_case(name.trim()))
                .with_context(|| format!("No published data for city '{}'", name))?;
            vec![found]
        }
        None => db.cities()?,
    };

    for city in &cities {
        print_city(&db, city, today)?;
    }
    Ok(())
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%b %d").to_string())
        .unwrap_or_else(|| "-".into())
}

fn print_city(db: &Database, city: &str, today: NaiveDate) -> Result<()> {
    println!();
    println!("== {} ==", city);

    if let Some(stats) = db.freeze_stats_for_city(city)? {
        println!("Freeze dates       last      first");
        println!(
            "  all years        {:<9} {}",
            fmt_date(stats.avg_last_freeze_all_time),
            fmt_date(stats.avg_first_freeze_all_time)
        );
        println!(
            "  last 10 years    {:<9} {}",
            fmt_date(stats.avg_last_freeze_10y),
            fmt_date(stats.avg_first_freeze_10y)
        );
        println!(
            "  last 5 years     {:<9} {}",
            fmt_date(stats.avg_last_freeze_5y),
            fmt_date(stats.avg_first_freeze_5y)
        );
        if let Some(days) = stats.growing_season_days() {
            println!("  growing season   {} days", days);
        }
    }

    let windows = db.planting_windows_for_city(city)?;
    if !windows.is_empty() {
        println!("Planting calendar");
        for w in &windows {
            println!(
                "  {:<26} start {}  outdoor {}  end {}  ({} days, {} outdoors){}",
                format!("{}/{}", w.growing_season, w.harvest_type),
                fmt_date(Some(w.planting_start)),
                fmt_date(Some(w.outdoor_start)),
                fmt_date(Some(w.planting_end)),
                w.planting_range_days,
                w.outdoor_days(),
                if w.contains(today) { "  open now" } else { "" }
            );
        }
    }

    let weeks = db.irrigation_weeks_for_city(city)?;
    if !weeks.is_empty() {
        println!("Irrigation");
        for week in &weeks {
            println!(
                "  week of {}  {:>5.2} in  {:+.2}  {}",
                week.week_start, week.total_rainfall, week.surplus_deficit, week.status
            );
        }
    }

    let days = db.daily_temperatures_for_city(city, today)?;
    if !days.is_empty() {
        println!("Daily temperatures");
        for day in &days {
            println!(
                "  {}  avg {:>5.1}  ({:.0}/{:.0})  {}",
                fmt_date(Some(day.date)),
                day.temp_avg,
                day.temp_min,
                day.temp_max,
                day.status
            );
        }
    }

    let ranking = db.viability_for_city(city)?;
    if !ranking.is_empty() {
        println!("Best plants this week");
        for row in &ranking {
            println!(
                "  {:<24} {}/{} days{}",
                row.common_name,
                row.viable_days,
                row.days_scored,
                if row.good_week { "  good week" } else { "" }
            );
        }
    }

    Ok(())
}
