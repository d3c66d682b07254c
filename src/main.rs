use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use attendance_analytics::cache::RecordCache;
use attendance_analytics::config::AppConfig;
use attendance_analytics::models::{AttendanceRecord, FilterOptions};
use attendance_analytics::{aggregate, filter, growth, live, report, retention, source};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "attendance-analytics")]
#[command(about = "Attendance, retention and growth analytics for orientation scans", long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to $ATTENDANCE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Attendance JSON file, overrides the configured path
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// Include records that were never reported upstream
    #[arg(long, global = true)]
    include_unreported: bool,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    #[arg(long)]
    branch: Option<String>,
    #[arg(long)]
    session: Option<String>,
    #[arg(long)]
    day: Option<u32>,
    /// Only keep records with at least one scanned session
    #[arg(long, conflicts_with = "include_unscanned")]
    scanned_only: bool,
    /// Keep records without scans even if the config says otherwise
    #[arg(long)]
    include_unscanned: bool,
}

impl FilterArgs {
    fn to_options(&self, config: &AppConfig) -> FilterOptions {
        let show_scanned_only = if self.scanned_only {
            true
        } else if self.include_unscanned {
            false
        } else {
            config.filters.show_scanned_only
        };

        FilterOptions {
            branch: self.branch.clone(),
            session: self.session.clone(),
            day: self.day,
            show_scanned_only: Some(show_scanned_only),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Grouped counts by branch, session and day
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Attendance and retention rates
    Retention {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// New attendees per day and per-session peaks
    Growth {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "attendance-report.md")]
        out: PathBuf,
    },
    /// Export statistics and filtered records as JSON
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        /// Defaults to attendance-report-<date>.json
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write the per-day retention and growth table as CSV
    Csv {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "attendance-days.csv")]
        out: PathBuf,
    },
    /// Follow the data file and print a summary on every change
    Watch {
        #[command(flatten)]
        filters: FilterArgs,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn prepare(records: &[AttendanceRecord], reported_only: bool) -> Vec<AttendanceRecord> {
    if reported_only {
        filter::reported_only(records)
    } else {
        records.to_vec()
    }
}

fn print_summary(records: &[AttendanceRecord]) {
    let stats = aggregate::aggregate(records);
    let scanned = aggregate::scanned_counts(records);

    println!("Total records: {}", stats.total);
    println!(
        "Scanned: {} ({} unscanned)",
        scanned.scanned, scanned.unscanned
    );
    if let Some((session, count)) = aggregate::most_active_session(&stats) {
        println!(
            "Most active period: {} ({} scans)",
            aggregate::session_label(session),
            count
        );
    }

    println!("By branch:");
    for (branch, count) in &stats.by_branch {
        println!("- {branch}: {count}");
    }
    println!("By session:");
    for (session, count) in &stats.by_session {
        println!("- {}: {}", aggregate::session_label(session), count);
    }
    println!("By day:");
    for (day, count) in &stats.by_day {
        println!("- day {day}: {count}");
    }
}

fn print_retention(records: &[AttendanceRecord]) {
    let analytics = retention::calculate_retention(records);

    println!(
        "Attendance rate: {:.1}% ({} of {} registered)",
        analytics.attendance_rate, analytics.total_attended, analytics.total_registered
    );
    println!(
        "Absentee rate: {:.1}% ({} absent)",
        analytics.absentee_rate, analytics.total_absent
    );
    for (session, entry) in &analytics.retention_by_session {
        println!(
            "- {}: {} attended ({:.1}%)",
            aggregate::session_label(session),
            entry.attended,
            entry.retention_rate
        );
    }
    for point in &analytics.progressive_retention {
        println!(
            "- through day {}: {} cumulative ({:.1}%)",
            point.day, point.cumulative_attended, point.cumulative_retention
        );
    }
}

fn print_growth(records: &[AttendanceRecord]) {
    let metrics = growth::calculate_growth(records);

    println!(
        "Average daily growth: {:.1} new attendees/day",
        metrics.average_daily_growth()
    );
    for day in &metrics.daily_growth {
        println!(
            "- day {}: {} new, {} cumulative, growth {:.1}%",
            day.day, day.new_attendees, day.cumulative_attendees, day.growth_rate
        );
    }
    for (session, summary) in &metrics.session_growth {
        println!(
            "- {}: {} scans, {:.1}/day, peak day {} ({})",
            aggregate::session_label(session),
            summary.total_attendees,
            summary.average_per_day,
            summary.peak_day,
            summary.peak_attendance
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.data_path = data;
    }
    let reported_only = config.reported_only && !cli.include_unreported;

    let mut cache = RecordCache::new(config.cache_ttl());
    let data_path = config.data_path.clone();
    let loaded_mtime = live::modified_at(&data_path);
    let snapshot = cache
        .get_or_load(|| source::load_records(&data_path))
        .context("failed to load attendance data")?;
    let records = prepare(&snapshot, reported_only);
    tracing::info!(
        total = snapshot.len(),
        analysed = records.len(),
        "attendance data ready"
    );

    match cli.command {
        Commands::Summary { filters, json } => {
            let filtered = filter::filter(&records, &filters.to_options(&config));
            if json {
                let stats = aggregate::aggregate(&filtered);
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_summary(&filtered);
            }
        }
        Commands::Retention { filters, json } => {
            let filtered = filter::filter(&records, &filters.to_options(&config));
            if json {
                let analytics = retention::calculate_retention(&filtered);
                println!("{}", serde_json::to_string_pretty(&analytics)?);
            } else {
                print_retention(&filtered);
            }
        }
        Commands::Growth { filters, json } => {
            let filtered = filter::filter(&records, &filters.to_options(&config));
            if json {
                let metrics = growth::calculate_growth(&filtered);
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                print_growth(&filtered);
            }
        }
        Commands::Report { filters, out } => {
            let options = filters.to_options(&config);
            let filtered = filter::filter(&records, &options);
            let output = report::build_report(
                options.branch.as_deref(),
                chrono::Utc::now(),
                &options,
                &filtered,
            );
            std::fs::write(&out, output)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { filters, out } => {
            let options = filters.to_options(&config);
            let filtered = filter::filter(&records, &options);
            let now = chrono::Utc::now();
            let out = out.unwrap_or_else(|| PathBuf::from(report::export_file_name(now)));
            let export = report::build_export(now, &options, &filtered);
            std::fs::write(&out, serde_json::to_string_pretty(&export)?)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "Exported {} records to {}.",
                filtered.len(),
                out.display()
            );
        }
        Commands::Csv { filters, out } => {
            let filtered = filter::filter(&records, &filters.to_options(&config));
            let analytics = retention::calculate_retention(&filtered);
            let metrics = growth::calculate_growth(&filtered);
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let rows = report::write_day_table_csv(file, &analytics, &metrics)?;
            println!("Wrote {rows} days to {}.", out.display());
        }
        Commands::Watch { filters } => {
            let options = filters.to_options(&config);
            let (publisher, mut receiver) = live::snapshot_channel(snapshot.to_vec());
            let watcher = tokio::spawn(live::watch_file(
                data_path.clone(),
                loaded_mtime,
                config.watch_interval(),
                publisher,
            ));

            println!("Watching {} (Ctrl-C to stop).", data_path.display());
            print_summary(&filter::filter(&records, &options));

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    update = receiver.changed() => {
                        let Some(update) = update else { break };
                        let update = cache.store(Arc::unwrap_or_clone(update));
                        let records = prepare(&update, reported_only);
                        println!();
                        print_summary(&filter::filter(&records, &options));
                    }
                }
            }

            drop(receiver);
            watcher.abort();
        }
    }

    Ok(())
}
