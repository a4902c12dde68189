use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use wellness_early_warning::config::AppConfig;
use wellness_early_warning::models::{
    Dimension, SurveyKind, SurveyRecord, SurveyResponses, UserProfile,
};
use wellness_early_warning::{db, export, population, report, risk};

#[derive(Parser)]
#[command(name = "wellness-early-warning")]
#[command(about = "Wellness survey scoring and risk tracking for at-risk youth", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Answers {
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    mood: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    anxiety: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    sleep: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    social: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    energy: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    stress: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    hopeful: Option<u8>,
}

impl From<Answers> for SurveyResponses {
    fn from(answers: Answers) -> Self {
        SurveyResponses {
            mood: answers.mood,
            anxiety: answers.anxiety,
            sleep: answers.sleep,
            social: answers.social,
            energy: answers.energy,
            stress: answers.stress,
            hopeful: answers.hopeful,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the survey questions
    Questions,
    /// Create or upgrade the database schema
    InitDb,
    /// Register a user
    AddUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: i32,
        #[arg(long)]
        context: String,
        #[arg(long)]
        gender: Option<String>,
    },
    /// Submit a scored survey for a user
    Submit {
        #[arg(long)]
        user_id: Uuid,
        #[arg(long, default_value = "daily")]
        kind: SurveyKind,
        #[command(flatten)]
        answers: Answers,
    },
    /// Replace a survey's answers and rescore it
    EditSurvey {
        #[arg(long)]
        survey_id: Uuid,
        #[command(flatten)]
        answers: Answers,
    },
    /// Import users from a CSV file
    ImportUsers {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import surveys from a CSV file
    ImportSurveys {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show one user's risk summary and per-question trends
    Profile {
        #[arg(long)]
        user_id: Uuid,
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=risk::MAX_WINDOW_DAYS))]
        since_days: Option<i64>,
    },
    /// List surveys that raised a crisis alert, newest first
    Crisis {
        #[arg(long)]
        user_id: Option<Uuid>,
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=risk::MAX_WINDOW_DAYS))]
        since_days: Option<i64>,
    },
    /// List high-risk users
    HighRisk {
        #[arg(long)]
        context: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a population report
    Report {
        #[arg(long, value_enum, default_value = "markdown")]
        format: ReportFormat,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Export per-user risk summaries to CSV
    Export {
        #[arg(long, default_value = "user_risk.csv")]
        out: PathBuf,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("WELLNESS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Questions) {
        for dimension in Dimension::ALL {
            println!("{}: {}", dimension, dimension.question());
        }
        return Ok(());
    }

    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate()?;
    let settings = config.settings();
    for warning in settings.thresholds.warnings() {
        warn!("{warning}");
    }

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::Questions => {}
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::AddUser {
            name,
            age,
            context,
            gender,
        } => {
            let user = UserProfile::new(
                Uuid::new_v4(),
                &name,
                age,
                &context,
                gender.as_deref(),
                Utc::now(),
            )?;
            db::insert_user(&pool, &user).await?;
            println!("Registered {} ({}).", user.name, user.id);
        }
        Commands::Submit {
            user_id,
            kind,
            answers,
        } => {
            db::fetch_user(&pool, user_id)
                .await?
                .with_context(|| format!("user {user_id} not found"))?;
            let survey = SurveyRecord::submit(user_id, kind, answers.into());
            db::insert_survey(&pool, &survey).await?;
            info!(survey_id = %survey.id(), "survey stored");
            println!(
                "Survey {} scored {:.2}{}",
                survey.id(),
                survey.wellness_score(),
                if survey.crisis_alert() {
                    " (CRISIS ALERT)"
                } else {
                    ""
                }
            );
        }
        Commands::EditSurvey { survey_id, answers } => {
            let survey = db::update_survey_responses(&pool, survey_id, answers.into()).await?;
            println!(
                "Survey {} rescored {:.2}, crisis alert: {}",
                survey.id(),
                survey.wellness_score(),
                survey.crisis_alert()
            );
        }
        Commands::ImportUsers { csv } => {
            let imported = db::import_users_csv(&pool, &csv).await?;
            println!("Imported {imported} users from {}.", csv.display());
        }
        Commands::ImportSurveys { csv } => {
            let inserted = db::import_surveys_csv(&pool, &csv).await?;
            println!("Inserted {inserted} surveys from {}.", csv.display());
        }
        Commands::Profile {
            user_id,
            since_days,
        } => {
            let now = Utc::now();
            let user = db::fetch_user(&pool, user_id)
                .await?
                .with_context(|| format!("user {user_id} not found"))?;
            let since = since_days.map(|days| risk::cutoff(now, days));
            let surveys = db::fetch_surveys(&pool, Some(user_id), since).await?;
            let summary = risk::profile_user(&user, &surveys, &settings.trend, now);

            println!("{} ({}, {}, {})", summary.name, summary.age, summary.context, summary.gender);
            println!(
                "- {} surveys, mean wellness {:.2}, mean mood {:.2}",
                summary.total_surveys, summary.avg_wellness, summary.avg_mood
            );
            println!(
                "- {} crisis alerts ({:.1}%), mood {}, wellness {}",
                summary.crisis_count,
                summary.crisis_rate,
                summary.mood_trend,
                summary.wellness_trend
            );
            match summary.days_since_last {
                Some(days) => println!("- last survey {days} days ago"),
                None => println!("- no surveys yet"),
            }
            println!(
                "- high risk: {}",
                risk::is_high_risk(&summary, &settings.thresholds)
            );
            let averages: Vec<String> = Dimension::ALL
                .iter()
                .map(|d| format!("{d} {:.2}", summary.average(*d)))
                .collect();
            println!("- averages: {}", averages.join(", "));
            for trend in risk::dimension_trends(&user, &surveys, &settings.trend) {
                if trend.answered == 0 {
                    continue;
                }
                println!(
                    "  {}: avg {:.2}, {}, latest {}",
                    trend.dimension,
                    trend.average,
                    trend.trend,
                    trend
                        .latest
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "n/a".to_string())
                );
            }
        }
        Commands::Crisis {
            user_id,
            since_days,
        } => {
            let since = since_days.map(|days| risk::cutoff(Utc::now(), days));
            let surveys = db::fetch_crisis_surveys(&pool, user_id, since).await?;
            let alerts = risk::crisis_alerts(&surveys);
            if alerts.is_empty() {
                println!("No crisis alerts found.");
                return Ok(());
            }

            println!("Crisis alerts:");
            for alert in alerts {
                let triggers: Vec<&str> = alert.triggers.iter().map(|t| t.as_str()).collect();
                println!(
                    "- {} user {} survey {} wellness {:.2} ({})",
                    alert.taken_at.format("%Y-%m-%d %H:%M"),
                    alert.user_id,
                    alert.survey_id,
                    alert.wellness_score,
                    triggers.join(", ")
                );
            }
        }
        Commands::HighRisk { context, limit } => {
            let users = db::fetch_users(&pool).await?;
            let surveys = db::fetch_surveys(&pool, None, None).await?;
            let summaries =
                population::summarize_users(&users, &surveys, &settings.trend, Utc::now());

            let flagged: Vec<_> = summaries
                .iter()
                .filter(|s| s.total_surveys > 0)
                .filter(|s| {
                    context
                        .as_deref()
                        .map_or(true, |c| risk::context_matches(&s.context, c))
                })
                .filter(|s| risk::is_high_risk(s, &settings.thresholds))
                .collect();

            if flagged.is_empty() {
                println!("No high-risk users found.");
                return Ok(());
            }

            println!("High-risk users:");
            for summary in flagged.iter().take(limit) {
                println!(
                    "- {} ({}, {}) wellness {:.2}, crisis rate {:.1}% across {} surveys",
                    summary.name,
                    summary.age,
                    summary.context,
                    summary.avg_wellness,
                    summary.crisis_rate,
                    summary.total_surveys
                );
            }
        }
        Commands::Report { format, out, limit } => {
            let users = db::fetch_users(&pool).await?;
            let surveys = db::fetch_surveys(&pool, None, None).await?;
            let analysis = population::analyze(&users, &surveys, &settings, Utc::now());
            let body = match format {
                ReportFormat::Markdown => report::build_report(&analysis, limit),
                ReportFormat::Json => serde_json::to_string_pretty(&analysis)?,
            };
            std::fs::write(&out, body)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { out } => {
            let users = db::fetch_users(&pool).await?;
            let surveys = db::fetch_surveys(&pool, None, None).await?;
            let summaries =
                population::summarize_users(&users, &surveys, &settings.trend, Utc::now());
            export::write_summaries_csv(&out, &summaries, &settings.thresholds)?;
            println!("Exported {} user summaries to {}.", summaries.len(), out.display());
        }
    }

    Ok(())
}
