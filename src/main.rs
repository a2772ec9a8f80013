use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod calendar;
mod db;
mod models;
mod push;
mod route;
mod stats;
mod timeclock;

use push::{PushBehavior, PushClient};

#[derive(Parser)]
#[command(name = "campo-dispatch")]
#[command(about = "Field-service scheduling: routes, calendars, statistics and push dispatch", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum NotifyKind {
    New,
    Updated,
    Cancelled,
    Reminder,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import customers from a CSV file (name, address, city, phone, email, equipment, last service)
    ImportCustomers {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Export customers to a CSV file with the same column contract
    ExportCustomers {
        #[arg(long, default_value = "customers.csv")]
        out: PathBuf,
    },
    /// Print a technician's route for one day
    Route {
        #[arg(long)]
        technician: String,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Print the 35-day month grid
    Calendar {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        /// Restrict to these technician emails (repeatable)
        #[arg(long = "technician")]
        technicians: Vec<String>,
    },
    /// Monthly statistics rollup with previous-month delta
    Stats {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
    /// Render a technician's daily attendance report to HTML
    Timesheet {
        #[arg(long)]
        technician: String,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, default_value = "timesheet.html")]
        out: PathBuf,
    },
    /// Send a push notification for an appointment to its technician
    Notify {
        #[arg(long)]
        appointment: Uuid,
        #[arg(long, value_enum)]
        kind: NotifyKind,
        #[arg(long)]
        no_alert: bool,
        #[arg(long)]
        no_sound: bool,
        #[arg(long)]
        no_badge: bool,
    },
}

fn month_range(year: i32, month: u32) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1).context("invalid year/month")?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .context("invalid year/month")?;
    Ok((
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(NaiveTime::MIN).and_utc(),
    ))
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

fn day_range(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportCustomers { csv } => {
            let imported = db::import_customers_csv(&pool, &csv).await?;
            println!("Imported {imported} customers from {}.", csv.display());
        }
        Commands::ExportCustomers { out } => {
            let exported = db::export_customers_csv(&pool, &out).await?;
            println!("Exported {exported} customers to {}.", out.display());
        }
        Commands::Route { technician, date } => {
            let (start, end) = day_range(date);
            let appointments =
                db::fetch_appointments(&pool, start, end, Some(technician.as_str())).await?;
            let day_route = route::build_day_route(&appointments);

            if day_route.stops.is_empty() {
                println!("No appointments for {technician} on {date}.");
                return Ok(());
            }

            println!("Route for {technician} on {date}:");
            for stop in &day_route.stops {
                let signed = if stop.signed { " [firmato]" } else { "" };
                println!(
                    "- {} {} ({}, {}){signed}",
                    stop.scheduled_at.format("%H:%M"),
                    stop.customer_name,
                    stop.address,
                    stop.city
                );
            }
            println!(
                "Estimated {} km, {} min on the road.",
                day_route.total_distance_km, day_route.total_time_min
            );
            if let Some(url) = route::maps_directions_url(&day_route) {
                println!("Directions: {url}");
            }
        }
        Commands::Calendar {
            year,
            month,
            technicians,
        } => {
            let mut technician_ids = Vec::new();
            for email in &technicians {
                technician_ids.push(db::fetch_technician_by_email(&pool, email).await?.id);
            }

            let (start, end) = month_range(year, month)?;
            let appointments = db::fetch_appointments(&pool, start, end, None).await?;
            let cells = calendar::month_grid(year, month, &appointments, &technician_ids)
                .context("invalid year/month")?;

            for cell in &cells {
                if cell.appointments.is_empty() {
                    continue;
                }
                let marker = if cell.in_month { "" } else { " (adjacent)" };
                println!("{}{marker}:", cell.date);
                for apt in &cell.appointments {
                    println!(
                        "  {} {} — {} [{}]",
                        apt.scheduled_at.format("%H:%M"),
                        apt.customer_name,
                        apt.technician_name,
                        apt.status.as_str()
                    );
                }
            }
            let total: usize = cells.iter().map(|cell| cell.appointments.len()).sum();
            println!("{total} appointments across {} days.", cells.len());
        }
        Commands::Stats { year, month } => {
            let (start, end) = month_range(year, month)?;
            let current = db::fetch_appointments(&pool, start, end, None).await?;

            let (prev_year, prev_month) = previous_month(year, month);
            let (prev_start, prev_end) = month_range(prev_year, prev_month)?;
            let previous = db::fetch_appointments(&pool, prev_start, prev_end, None).await?;

            let rollup = stats::monthly_rollup(&current, &previous);
            println!("Statistics for {year}-{month:02}:");
            println!("- Appointments: {}", rollup.total_appointments);
            println!(
                "- Completed: {} ({}%)",
                rollup.completed_appointments, rollup.completion_rate
            );
            println!("- Cancelled: {}", rollup.cancelled_appointments);
            println!("- Distinct customers: {}", rollup.distinct_customers);
            println!(
                "- Average duration: {} min",
                rollup.average_duration_minutes
            );
            for tech in &rollup.by_technician {
                println!(
                    "  - {}: {} appointments, {} completed",
                    tech.technician_name, tech.count, tech.completed
                );
            }
            println!(
                "- vs previous month: {:+} appointments, {:+}% completion",
                rollup.previous_month.appointments_diff,
                rollup.previous_month.completion_rate_diff
            );
        }
        Commands::Timesheet {
            technician,
            date,
            out,
        } => {
            let record = db::fetch_technician_by_email(&pool, &technician).await?;
            let entries = db::fetch_time_entries(&pool, record.id, date).await?;

            for entry in &entries {
                tracing::debug!(
                    entry_id = %entry.id,
                    kind = timeclock::entry_label(&entry.kind),
                    at = %entry.recorded_at,
                    "time entry"
                );
            }
            for anomaly in timeclock::validate_sequence(&entries) {
                tracing::warn!(
                    technician = %record.email,
                    %date,
                    anomaly = %anomaly,
                    "irregular time-clock sequence"
                );
            }

            let summary = timeclock::summarize_entries(&entries);
            let html = timeclock::render_timesheet_html(&record, date, &entries, &summary);
            std::fs::write(&out, html)?;
            println!(
                "Timesheet for {} on {date} written to {} ({} worked).",
                record.full_name,
                out.display(),
                summary.total_hours
            );
        }
        Commands::Notify {
            appointment,
            kind,
            no_alert,
            no_sound,
            no_badge,
        } => {
            let record = db::fetch_appointment(&pool, appointment).await?;
            let technician = db::fetch_technician(&pool, record.technician_id).await?;
            let token = technician
                .push_token
                .as_deref()
                .with_context(|| format!("technician {} has no push token", technician.email))?;

            let behavior = PushBehavior {
                show_alert: !no_alert,
                play_sound: !no_sound,
                set_badge: !no_badge,
            };
            let client = PushClient::http(behavior)?;

            let result = match kind {
                NotifyKind::New => {
                    client
                        .notify_new_appointment(
                            token,
                            record.id,
                            &record.customer_name,
                            record.scheduled_at,
                        )
                        .await
                }
                NotifyKind::Updated => {
                    client
                        .notify_appointment_updated(
                            token,
                            record.id,
                            &record.customer_name,
                            record.scheduled_at,
                        )
                        .await
                }
                NotifyKind::Cancelled => {
                    client
                        .notify_appointment_cancelled(token, record.id, &record.customer_name)
                        .await
                }
                NotifyKind::Reminder => {
                    let address =
                        format!("{}, {}", record.customer_address, record.customer_city);
                    client
                        .notify_appointment_reminder(
                            token,
                            record.id,
                            &record.customer_name,
                            &address,
                        )
                        .await
                }
            };

            result?;
            println!("Notification delivered to {}.", technician.full_name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn month_range_is_half_open() {
        let (start, end) = month_range(2026, 3).unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
    }

    #[test]
    fn month_range_rolls_over_december() {
        let (_, end) = month_range(2026, 12).unwrap();
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
    }

    #[test]
    fn previous_month_wraps_to_last_year() {
        assert_eq!(previous_month(2026, 1), (2025, 12));
        assert_eq!(previous_month(2026, 7), (2026, 6));
    }

    #[test]
    fn day_range_spans_one_day() {
        let (start, end) = day_range(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
        assert_eq!((end - start).num_days(), 1);
        assert_eq!(start.day(), 9);
    }
}
