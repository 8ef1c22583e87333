use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;

mod config;
mod consolidate;
mod dates;
mod db;
mod export;
mod extract;
mod grades;
mod grid;
mod layout;
mod matching;
mod models;
mod report;
mod stats;

use export::{CsvDirSink, ReportSink};

#[derive(Parser)]
#[command(name = "grade-consolidator")]
#[command(about = "Reconciles course registrations against transcript grades", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Import a transcript or course-registration export
    #[command(group(
        ArgGroup::new("source")
            .args(["transcript", "registration"])
            .required(true)
            .multiple(false)
    ))]
    Import {
        #[arg(long)]
        transcript: Option<PathBuf>,
        #[arg(long)]
        registration: Option<PathBuf>,
    },
    /// Delete every imported student and registration
    Clear,
    /// Print the per-registration subject status summary
    Consolidate {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export report sheets as CSV files
    Export {
        #[arg(long, value_enum, default_value_t = ExportKind::All)]
        kind: ExportKind,
        #[arg(long, default_value = "exports")]
        out_dir: PathBuf,
    },
    /// Search imported records by name, ID, email or class
    Search {
        #[arg(long)]
        query: String,
        /// Search registrations instead of transcript rows
        #[arg(long)]
        registrations: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportKind {
    RetakeStudents,
    AllStudents,
    ConsolidatedRetake,
    ConsolidatedAll,
    ConsolidatedDetailed,
    All,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_tracing()?;
    let cli = Cli::parse();
    let settings = config::AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Import {
            transcript,
            registration,
        } => {
            let imported_at = Utc::now();
            if let Some(path) = transcript {
                let students = extract::load_transcript(&path, imported_at)
                    .with_context(|| format!("failed to import {}", path.display()))?;
                let inserted = db::insert_students(&pool, &students).await?;
                println!("Imported {inserted} students from {}.", path.display());
            } else if let Some(path) = registration {
                let registrations = extract::load_registrations(&path, imported_at)
                    .with_context(|| format!("failed to import {}", path.display()))?;
                let inserted = db::insert_registrations(&pool, &registrations).await?;
                println!("Imported {inserted} registrations from {}.", path.display());
            }
        }
        Commands::Clear => {
            db::clear_all(&pool).await?;
            println!("All imported data removed.");
        }
        Commands::Consolidate { limit } => {
            let students = db::fetch_students(&pool).await?;
            let registrations = db::fetch_registrations(&pool).await?;
            let records = consolidate::consolidate(&students, &registrations);

            if records.is_empty() {
                println!("No registrations imported yet.");
                return Ok(());
            }

            let summary = stats::consolidated_stats(&records);
            println!(
                "{} registrations ({} matched): {} graded, {} awaiting grades, {} retakes.",
                summary.registrations,
                summary.matched,
                summary.registered_with_grade,
                summary.registered_no_grade,
                summary.registered_retakes
            );
            for record in records.iter().take(limit) {
                println!(
                    "- {} ({}, {}) {} registered, {} graded, {} awaiting, {} retakes",
                    record.full_name,
                    record.student_id,
                    record.troy_id.as_deref().unwrap_or("unmatched"),
                    record.registered_subjects.len(),
                    record.count_status(models::SubjectStatus::RegisteredWithGrade),
                    record.count_status(models::SubjectStatus::RegisteredNoGrade),
                    record.registered_retakes().count()
                );
            }
        }
        Commands::Report { out } => {
            let students = db::fetch_students(&pool).await?;
            let registrations = db::fetch_registrations(&pool).await?;
            let records = consolidate::consolidate(&students, &registrations);
            let report = report::build_report(Utc::now().date_naive(), &students, &records);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { kind, out_dir } => {
            let students = db::fetch_students(&pool).await?;
            let registrations = db::fetch_registrations(&pool).await?;
            let records = consolidate::consolidate(&students, &registrations);

            let mut sink = CsvDirSink::new(out_dir, Utc::now().date_naive());
            for sheet in sheets_for(kind, &students, &records) {
                sink.write_sheet(&sheet)?;
            }
            for path in sink.written() {
                println!("Wrote {}.", path.display());
            }
        }
        Commands::Search {
            query,
            registrations,
        } => {
            if registrations {
                let found = db::search_registrations(&pool, &query).await?;
                println!("{} registrations match {query:?}:", found.len());
                for reg in found {
                    println!(
                        "- {} ({}, partner {}) {}: {} subjects, {} credits",
                        reg.full_name(),
                        reg.student_id,
                        reg.partner_id,
                        reg.class_name,
                        reg.registered_subjects.len(),
                        reg.registered_credits
                    );
                }
            } else {
                let found = db::search_students(&pool, &query).await?;
                println!("{} students match {query:?}:", found.len());
                for student in found {
                    println!(
                        "- {} (Troy {}, VNU {}) {}: {} graded, {} retakes",
                        student.full_name(),
                        student.troy_id,
                        student.vnu_id,
                        student.class_name,
                        student.grades.len(),
                        student.retake_subjects().count()
                    );
                }
            }
        }
    }

    Ok(())
}

fn sheets_for(
    kind: ExportKind,
    students: &[models::StudentRecord],
    records: &[models::ConsolidatedRecord],
) -> Vec<report::ReportSheet> {
    match kind {
        ExportKind::RetakeStudents => vec![report::retake_students_sheet(students)],
        ExportKind::AllStudents => vec![report::all_students_sheet(students)],
        ExportKind::ConsolidatedRetake => vec![report::consolidated_retake_sheet(records)],
        ExportKind::ConsolidatedAll => vec![report::consolidated_all_sheet(records)],
        ExportKind::ConsolidatedDetailed => vec![report::consolidated_detailed_sheet(records)],
        ExportKind::All => vec![
            report::retake_students_sheet(students),
            report::all_students_sheet(students),
            report::consolidated_retake_sheet(records),
            report::consolidated_all_sheet(records),
            report::consolidated_detailed_sheet(records),
        ],
    }
}
