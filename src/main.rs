//! Eguru CLI - inspect and maintain the offline learning store

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use eguru::config::{self, EguruConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "eguru")]
#[command(version)]
#[command(about = "Offline store for the Eguru learning client - lessons, progress, users and quizzes")]
#[command(long_about = r#"
Eguru keeps lessons, learner progress, user profiles and quizzes in a local
SQLite database so the learning client works fully offline.

Example usage:
  eguru init
  eguru seed
  eguru lessons --subject Mathematics
  eguru quiz --lesson 4 --user u1 --answers 2,1,0
  eguru report --user u1
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and bring its schema up to date
    Init {
        /// Also write an eguru.toml pointing at the database
        #[arg(long)]
        write_config: bool,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Seed lessons from the catalog
    Seed {
        /// JSON catalog file (defaults to the built-in sample catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Insert every missing lesson and quiz, even if lessons already exist
        #[arg(long)]
        all: bool,
    },

    /// List lessons, optionally filtered by one index
    Lessons {
        #[arg(short, long, conflicts_with_all = ["kind", "level"])]
        subject: Option<String>,

        /// Lesson type: video, audio, text, quiz
        #[arg(short = 't', long = "type", conflicts_with = "level")]
        kind: Option<String>,

        /// Level: beginner, intermediate, advanced
        #[arg(short, long)]
        level: Option<String>,
    },

    /// Record progress of a user on a lesson
    Record {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        lesson: String,

        /// Completion percentage (0-100)
        #[arg(short, long, default_value = "0")]
        progress: u8,

        /// Total seconds spent on the lesson
        #[arg(short, long, default_value = "0")]
        seconds: u64,

        /// Mark the lesson completed
        #[arg(long)]
        completed: bool,
    },

    /// Show a user's progress
    Progress {
        #[arg(short, long)]
        user: String,

        /// Only this lesson
        #[arg(short, long)]
        lesson: Option<String>,
    },

    /// Show a lesson's quiz, or submit answers for scoring
    Quiz {
        #[arg(short, long)]
        lesson: String,

        #[arg(short, long)]
        user: Option<String>,

        /// Comma-separated option indexes, empty for unanswered (e.g. "2,1,0")
        #[arg(short, long)]
        answers: Option<String>,

        /// Seconds spent on this attempt, added to earlier time on the lesson
        #[arg(short, long, default_value = "0")]
        seconds: u64,

        /// JSON catalog file for the fallback quiz
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Dashboard summary for one student
    Report {
        #[arg(short, long)]
        user: String,
    },

    /// Teacher view over every cached student profile
    ClassReport,

    /// How all learners did on one lesson
    LessonReport {
        #[arg(short, long)]
        lesson: String,
    },

    /// Manage cached user profiles
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Show record counts and schema version
    Stats,
}

#[derive(Subcommand)]
enum UserAction {
    /// Save (overwrite) a user profile
    Save {
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: String,

        /// student or teacher
        #[arg(long, default_value = "student")]
        role: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        grade: Option<String>,
    },

    /// Show a cached user profile
    Show {
        #[arg(long)]
        id: String,
    },
}

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

/// Print a JSON envelope for a successful command
pub fn emit_success(output_mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if output_mode.is_human() {
        return Ok(());
    }
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let cfg: EguruConfig = config::load_config(Some(&config_path))?.unwrap_or_default();
    let database = cfg.database_path(cli.database.as_deref());

    let ctx = commands::Context::new(output_mode, cfg, database);

    let result = match cli.command {
        Commands::Init { write_config, force } => {
            commands::run_init(&ctx, write_config.then_some(config_path.as_path()), force).await
        }
        Commands::Seed { catalog, all } => commands::run_seed(&ctx, catalog.as_deref(), all).await,
        Commands::Lessons { subject, kind, level } => {
            commands::run_lessons(&ctx, subject.as_deref(), kind.as_deref(), level.as_deref()).await
        }
        Commands::Record { user, lesson, progress, seconds, completed } => {
            commands::run_record(&ctx, &user, &lesson, progress, seconds, completed).await
        }
        Commands::Progress { user, lesson } => commands::run_progress(&ctx, &user, lesson.as_deref()).await,
        Commands::Quiz { lesson, user, answers, seconds, catalog } => {
            commands::run_quiz(&ctx, &lesson, user.as_deref(), answers.as_deref(), seconds, catalog.as_deref()).await
        }
        Commands::Report { user } => commands::run_report(&ctx, &user).await,
        Commands::ClassReport => commands::run_class_report(&ctx).await,
        Commands::LessonReport { lesson } => commands::run_lesson_report(&ctx, &lesson).await,
        Commands::User { action } => match action {
            UserAction::Save { id, name, role, email, language, grade } => {
                let profile = commands::UserProfile { id, name, role, email, language, grade };
                commands::run_user_save(&ctx, profile).await
            }
            UserAction::Show { id } => commands::run_user_show(&ctx, &id).await,
        },
        Commands::Stats => commands::run_stats(&ctx).await,
    };

    ctx.close().await;
    result
}
