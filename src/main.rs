use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;

mod admission;
mod catalog;
mod classify;
mod db;
mod error;
mod grades;
mod models;
mod report;

use grades::LetterGradeTable;
use models::{WeightConfig, WeightPreset};

#[derive(Parser)]
#[command(name = "admission-planner")]
#[command(about = "Admission average and university matching planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a realistic sample catalog and student profile
    Seed,
    /// Import the program catalog from a flat CSV export
    ImportCatalog {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import manually entered grades for an existing student
    ImportGrades {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        email: String,
    },
    /// Import an extracted grade profile (JSON from the extraction service)
    ImportProfile {
        #[arg(long)]
        json: PathBuf,
    },
    /// Compute and store a student's admission average
    #[command(group(
        ArgGroup::new("weighting")
            .args(["preset", "secondary_weight"])
            .multiple(false)
    ))]
    Score {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "standard")]
        preset: String,
        #[arg(long, requires = "exam_weight")]
        secondary_weight: Option<f64>,
        #[arg(long, requires = "secondary_weight")]
        exam_weight: Option<f64>,
    },
    /// Search the catalog for programs and their entry thresholds
    Find {
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown admission-planning report
    Report {
        #[arg(long)]
        email: String,
        #[arg(long)]
        query: String,
        #[arg(long, default_value = "standard")]
        preset: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn resolve_weights(
    preset: &str,
    secondary_weight: Option<f64>,
    exam_weight: Option<f64>,
) -> anyhow::Result<WeightConfig> {
    if let (Some(secondary), Some(exam)) = (secondary_weight, exam_weight) {
        return Ok(WeightConfig::new(secondary, exam)?);
    }
    let preset = WeightPreset::parse(preset).with_context(|| {
        format!("unknown preset '{preset}' (expected standard, equal-weight or secondary-only)")
    })?;
    Ok(preset.config())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://admission-planner.db?mode=rwc".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to open the planner database")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportCatalog { csv } => {
            let imported = db::import_catalog_csv(&pool, &csv).await?;
            println!("Imported {imported} catalog offerings from {}.", csv.display());
        }
        Commands::ImportGrades { csv, email } => {
            let inserted = db::import_grades_csv(&pool, &csv, &email).await?;
            println!("Inserted {inserted} grades for {email} from {}.", csv.display());
        }
        Commands::ImportProfile { json } => {
            let (email, inserted) = db::import_profile_json(&pool, &json).await?;
            println!("Profile for {email} imported with {inserted} grade records.");
        }
        Commands::Score {
            email,
            preset,
            secondary_weight,
            exam_weight,
        } => {
            let weights = resolve_weights(&preset, secondary_weight, exam_weight)?;
            let (student, profile) = db::fetch_profile(&pool, &email).await?;
            let letters = LetterGradeTable::standard();
            let score =
                admission::calculate_admission_average(&profile, &weights, Some(&letters))?;

            let today = Utc::now().date_naive();
            db::save_score(&pool, student.id, score.on_two_hundred(), &weights, today).await?;

            println!(
                "Admission average for {}: {:.2}/200 ({:.2}/20)",
                student.full_name,
                score.on_two_hundred(),
                score.on_twenty()
            );
            println!(
                "Weights: secondary {:.0}%, exams {:.0}%",
                weights.secondary_weight * 100.0,
                weights.exam_weight * 100.0
            );

            let history = db::fetch_recent_scores(&pool, student.id, 5).await?;
            if history.len() > 1 {
                println!("Recent computations:");
                for (computed_at, score_200) in history {
                    println!("- {computed_at}: {score_200:.2}/200");
                }
            }
        }
        Commands::Find { query, limit } => {
            let catalog = db::fetch_catalog(&pool).await?;
            let result = catalog::find_programs(&catalog, &query);

            if result.is_empty() {
                println!("No programs found for '{query}'.");
                return Ok(());
            }

            println!("Programs matching '{query}':");
            for entry in report::ranked_entries(&result).iter().take(limit) {
                if entry.required_grade > 0.0 {
                    println!(
                        "- {} at {} ({}, {}): last admitted {:.1}/200, {} vacancies",
                        entry.program_name,
                        entry.institution_name,
                        entry.region,
                        entry.cycle_year,
                        entry.required_grade,
                        entry.vacancies
                    );
                } else {
                    println!(
                        "- {} at {} ({}, {}): no recorded threshold, {} vacancies",
                        entry.program_name,
                        entry.institution_name,
                        entry.region,
                        entry.cycle_year,
                        entry.vacancies
                    );
                }
            }

            match result.stats {
                Some(stats) => println!(
                    "Thresholds over {} offering(s): min {:.1}, max {:.1}, avg {:.1}",
                    stats.sample_size, stats.min_required, stats.max_required, stats.avg_required
                ),
                None => println!("No recorded thresholds among the matched programs."),
            }
        }
        Commands::Report {
            email,
            query,
            preset,
            out,
        } => {
            let weights = resolve_weights(&preset, None, None)?;
            let (student, profile) = db::fetch_profile(&pool, &email).await?;
            let letters = LetterGradeTable::standard();
            let score =
                admission::calculate_admission_average(&profile, &weights, Some(&letters))?;

            let catalog = db::fetch_catalog(&pool).await?;
            let result = catalog::find_programs(&catalog, &query);

            let today = Utc::now().date_naive();
            db::save_score(&pool, student.id, score.on_two_hundred(), &weights, today).await?;

            let report =
                report::build_report(&student, &query, score, &weights, &result, today);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
