use crate::{OutputMode, emit_success};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use eguru::activity::{self, LessonSession};
use eguru::config::{self, EguruConfig};
use eguru::report::{self, StudentRow};
use eguru::seed::{self, Catalog};
use eguru::ui::{Icons, header, info, lesson_icon, muted, render, section, stats_table, success, summary_row, theme, warn};
use eguru::{Lesson, LessonType, Level, LocalStore, Quiz, Role, ScoreBand, StoreLocation, User, UserProgress};
use owo_colors::OwoColorize;
use tabled::Tabled;

pub struct Context {
    pub output_mode: OutputMode,
    pub config: EguruConfig,
    pub database: PathBuf,
    store: LocalStore,
}

impl Context {
    pub fn new(output_mode: OutputMode, config: EguruConfig, database: PathBuf) -> Self {
        let mut store = LocalStore::new(StoreLocation::file(&database));
        if let Some(timeout) = config.busy_timeout() {
            store = store.with_busy_timeout(timeout);
        }
        Self { output_mode, config, database, store }
    }

    /// The store, opened on first use
    async fn store(&self) -> anyhow::Result<&LocalStore> {
        self.store.init().await?;
        Ok(&self.store)
    }

    pub async fn close(&self) {
        self.store.close().await;
    }

    fn catalog(&self, flag: Option<&Path>) -> anyhow::Result<Catalog> {
        match self.config.catalog_path(flag) {
            Some(path) => {
                tracing::debug!("Loading catalog from {}", path.display());
                Ok(Catalog::from_json_file(&path)?)
            }
            None => Ok(Catalog::sample()),
        }
    }

    fn human(&self) -> bool {
        self.output_mode.is_human()
    }
}

#[derive(Tabled)]
struct LessonLine {
    #[tabled(rename = "")]
    icon: &'static str,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Level")]
    level: Level,
    #[tabled(rename = "Minutes")]
    duration: u32,
}

impl From<&Lesson> for LessonLine {
    fn from(l: &Lesson) -> Self {
        Self {
            icon: lesson_icon(l.kind),
            id: l.id.clone(),
            title: l.title.clone(),
            subject: l.subject.clone(),
            level: l.level,
            duration: l.duration,
        }
    }
}

#[derive(Tabled)]
struct ProgressLine {
    #[tabled(rename = "Lesson")]
    lesson: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Minutes")]
    time_spent: u32,
    #[tabled(rename = "Quiz")]
    quiz_score: String,
    #[tabled(rename = "Last accessed")]
    last_accessed: String,
}

impl From<&UserProgress> for ProgressLine {
    fn from(p: &UserProgress) -> Self {
        Self {
            lesson: p.lesson_id.clone(),
            progress: if p.completed {
                format!("{} 100%", Icons::CHECK)
            } else {
                format!("{}%", p.progress)
            },
            time_spent: p.time_spent,
            quiz_score: p.quiz_score.map(|s| format!("{}%", s)).unwrap_or_else(|| "-".into()),
            last_accessed: p.last_accessed.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Tabled)]
struct StudentLine {
    #[tabled(rename = "Student")]
    name: String,
    #[tabled(rename = "Grade")]
    grade: String,
    #[tabled(rename = "Completed")]
    completed: String,
    #[tabled(rename = "Minutes")]
    time_spent: u64,
    #[tabled(rename = "Avg score")]
    average_score: String,
}

impl From<&StudentRow> for StudentLine {
    fn from(s: &StudentRow) -> Self {
        Self {
            name: s.name.clone(),
            grade: s.grade.clone().unwrap_or_else(|| "-".into()),
            completed: format!(
                "{}/{} ({:.0}%)",
                s.completed_lessons,
                s.total_lessons,
                s.completion_percent()
            ),
            time_spent: s.time_spent,
            average_score: format_score(s.average_score),
        }
    }
}

fn format_score(score: Option<f64>) -> String {
    score.map(|s| format!("{:.0}%", s)).unwrap_or_else(|| "-".into())
}

/// Parse "2,1,0" into answers; empty entries are unanswered
fn parse_answers(raw: &str) -> anyhow::Result<Vec<Option<usize>>> {
    raw.split(',')
        .map(str::trim)
        .map(|part| {
            if part.is_empty() {
                Ok(None)
            } else {
                part.parse::<usize>()
                    .map(Some)
                    .map_err(|_| anyhow::anyhow!("invalid answer '{}': expected an option index", part))
            }
        })
        .collect()
}

pub async fn run_init(ctx: &Context, config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let store = ctx.store().await?;
    let stats = store.stats().await?;

    if let Some(path) = config_path {
        let cfg = EguruConfig {
            database: Some(ctx.database.display().to_string()),
            ..ctx.config.clone()
        };
        config::write_config(path, &cfg, force)?;
        if ctx.human() {
            info("Config", &path.display().to_string());
        }
    }

    if ctx.human() {
        header("Eguru store ready");
        info("Database", &stats.location);
        info("Schema version", &stats.schema_version.to_string());
    } else {
        emit_success(ctx.output_mode, "init", serde_json::to_value(&stats)?)?;
    }
    Ok(())
}

pub async fn run_seed(ctx: &Context, catalog: Option<&Path>, all: bool) -> anyhow::Result<()> {
    let catalog = ctx.catalog(catalog)?;
    let store = ctx.store().await?;

    let report = if all {
        seed::seed_catalog(store, &catalog).await?
    } else {
        seed::seed_catalog_if_empty(store, &catalog).await?
    };

    if ctx.human() {
        if report.lessons_added == 0 && report.quizzes_added == 0 {
            println!("{} Nothing to seed: {}", Icons::SEED, report);
        } else {
            success(&format!("{} Seeded {}", Icons::SEED, report));
        }
    } else {
        emit_success(ctx.output_mode, "seed", serde_json::to_value(report)?)?;
    }
    Ok(())
}

pub async fn run_lessons(
    ctx: &Context,
    subject: Option<&str>,
    kind: Option<&str>,
    level: Option<&str>,
) -> anyhow::Result<()> {
    let store = ctx.store().await?;

    let lessons = if let Some(subject) = subject {
        store.get_lessons_by_subject(subject).await?
    } else if let Some(kind) = kind {
        store.get_lessons_by_type(LessonType::from_str(kind)?).await?
    } else if let Some(level) = level {
        store.get_lessons_by_level(Level::from_str(level)?).await?
    } else {
        store.get_all_lessons().await?
    };

    if !ctx.human() {
        return emit_success(ctx.output_mode, "lessons", serde_json::to_value(&lessons)?);
    }

    if lessons.is_empty() {
        println!("{} No lessons found. Run `eguru seed` to load the catalog.", Icons::EMPTY);
    } else {
        let rows: Vec<LessonLine> = lessons.iter().map(LessonLine::from).collect();
        println!("{}", render(&rows));
    }
    Ok(())
}

pub async fn run_record(
    ctx: &Context,
    user: &str,
    lesson: &str,
    progress: u8,
    seconds: u64,
    completed: bool,
) -> anyhow::Result<()> {
    if progress > 100 {
        anyhow::bail!("progress must be between 0 and 100, got {}", progress);
    }
    let store = ctx.store().await?;
    if store.get_lesson(lesson).await?.is_none() {
        warn(&format!("Lesson {} is not in the catalog", lesson));
    }

    let session = LessonSession { progress, seconds_spent: seconds, completed };
    let saved = activity::record_session(store, user, lesson, session).await?;

    if ctx.human() {
        success(&format!("Recorded {} on lesson {} ({}%)", user, lesson, saved.progress));
    } else {
        emit_success(ctx.output_mode, "record", serde_json::to_value(&saved)?)?;
    }
    Ok(())
}

pub async fn run_progress(ctx: &Context, user: &str, lesson: Option<&str>) -> anyhow::Result<()> {
    let store = ctx.store().await?;

    let records = match lesson {
        Some(lesson) => store.get_progress_by_lesson(lesson, user).await?.into_iter().collect(),
        None => store.get_progress_by_user(user).await?,
    };

    if !ctx.human() {
        return emit_success(ctx.output_mode, "progress", serde_json::to_value(&records)?);
    }

    if records.is_empty() {
        println!("{} No progress recorded for {}", Icons::EMPTY, user);
    } else {
        println!("{} Progress for {}", Icons::PERSON, user.bold());
        let rows: Vec<ProgressLine> = records.iter().map(ProgressLine::from).collect();
        println!("{}", render(&rows));
    }
    Ok(())
}

fn print_quiz(quiz: &Quiz) {
    header(&format!("Quiz {} ({} questions)", quiz.id, quiz.questions.len()));
    for (n, q) in quiz.questions.iter().enumerate() {
        println!();
        println!("{}. {}", n + 1, q.question.bold());
        for (i, option) in q.options.iter().enumerate() {
            println!("   [{}] {}", i, option);
        }
    }
}

pub async fn run_quiz(
    ctx: &Context,
    lesson: &str,
    user: Option<&str>,
    answers: Option<&str>,
    seconds: u64,
    catalog: Option<&Path>,
) -> anyhow::Result<()> {
    let catalog = ctx.catalog(catalog)?;
    let store = ctx.store().await?;

    let Some(quiz) = seed::load_quiz(store, &catalog, lesson).await? else {
        anyhow::bail!("no quiz available for lesson {}", lesson);
    };

    let Some(raw) = answers else {
        if ctx.human() {
            print_quiz(&quiz);
        } else {
            emit_success(ctx.output_mode, "quiz", serde_json::to_value(&quiz)?)?;
        }
        return Ok(());
    };

    let Some(user) = user else {
        anyhow::bail!("--user is required when submitting answers");
    };
    let answers = parse_answers(raw)?;
    let outcome = activity::record_quiz_attempt(store, user, &quiz, &answers, seconds).await?;

    if !ctx.human() {
        return emit_success(ctx.output_mode, "quiz", serde_json::to_value(&outcome)?);
    }

    for (n, q) in quiz.questions.iter().enumerate() {
        let given = answers.get(n).copied().flatten();
        let mark = if given.is_some_and(|a| q.is_correct(a)) { Icons::CHECK } else { Icons::CROSS };
        println!("{} {}", mark, q.question);
        if let Some(explanation) = &q.explanation {
            println!("   {}", muted(explanation));
        }
    }
    println!();
    let style = theme().score(outcome.band);
    println!(
        "{} Your score: {} ({}/{} correct)",
        Icons::STAR,
        format!("{}%", outcome.score).style(style),
        outcome.correct,
        outcome.total
    );
    let message = match outcome.band {
        ScoreBand::Excellent => "Excellent work!",
        ScoreBand::Good => "Good job!",
        ScoreBand::NeedsPractice => "Keep practicing!",
    };
    println!("  {}", message);
    Ok(())
}

pub async fn run_report(ctx: &Context, user: &str) -> anyhow::Result<()> {
    let store = ctx.store().await?;
    let summary = report::student_summary(store, user).await?;

    if !ctx.human() {
        return emit_success(ctx.output_mode, "report", serde_json::to_value(&summary)?);
    }

    header(&format!("Dashboard for {}", user));
    let completed = format!("{}/{}", summary.completed_lessons, summary.total_lessons);
    let minutes = summary.total_time_spent.to_string();
    let score = format_score(summary.average_score);
    println!(
        "{}",
        stats_table(&[
            ("Lessons completed", &completed),
            ("Minutes spent", &minutes),
            ("Average quiz score", &score),
        ])
    );

    if !summary.in_progress.is_empty() {
        section("Continue learning");
        for l in &summary.in_progress {
            summary_row(&l.id, &l.title);
        }
    }
    if !summary.recommended.is_empty() {
        section("Recommended");
        for l in &summary.recommended {
            summary_row(&l.id, &l.title);
        }
    }
    Ok(())
}

pub async fn run_class_report(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.store().await?;
    let class = report::class_report(store).await?;

    if !ctx.human() {
        return emit_success(ctx.output_mode, "class-report", serde_json::to_value(&class)?);
    }

    header(&format!("{} Class report", Icons::TEACHER));
    if class.students.is_empty() {
        println!("{} No student profiles cached on this device.", Icons::EMPTY);
        return Ok(());
    }

    let rows: Vec<StudentLine> = class.students.iter().map(StudentLine::from).collect();
    println!("{}", render(&rows));
    summary_row("Average completion", &format!("{:.0}%", class.average_completion));
    summary_row("Total minutes", &class.total_time_spent.to_string());
    summary_row("Average score", &format_score(class.average_score));
    Ok(())
}

pub async fn run_lesson_report(ctx: &Context, lesson: &str) -> anyhow::Result<()> {
    let store = ctx.store().await?;
    let report = report::lesson_report(store, lesson).await?;

    if !ctx.human() {
        return emit_success(ctx.output_mode, "lesson-report", serde_json::to_value(&report)?);
    }

    let title = report.lesson.as_ref().map(|l| l.title.as_str()).unwrap_or("(unknown lesson)");
    header(&format!("{} - {}", report.lesson_id, title));
    let learners = report.learners.to_string();
    let completions = report.completions.to_string();
    let minutes = report.total_time_spent.to_string();
    let score = format_score(report.average_score);
    println!(
        "{}",
        stats_table(&[
            ("Learners", &learners),
            ("Completions", &completions),
            ("Minutes spent", &minutes),
            ("Average quiz score", &score),
        ])
    );
    Ok(())
}

/// Profile fields collected from the command line
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub role: String,
    pub email: Option<String>,
    pub language: Option<String>,
    pub grade: Option<String>,
}

pub async fn run_user_save(ctx: &Context, profile: UserProfile) -> anyhow::Result<()> {
    let role = Role::from_str(&profile.role)?;
    let user = User {
        email: profile.email,
        language: profile.language,
        grade: profile.grade,
        ..User::new(profile.id, profile.name, role)
    };

    let store = ctx.store().await?;
    store.save_user(&user).await?;

    if ctx.human() {
        success(&format!("Saved {} {} ({})", Icons::PERSON, user.display_name(), role));
    } else {
        emit_success(ctx.output_mode, "user", serde_json::to_value(&user)?)?;
    }
    Ok(())
}

pub async fn run_user_show(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let store = ctx.store().await?;
    let user = store.get_user(id).await?;

    if !ctx.human() {
        return emit_success(ctx.output_mode, "user", serde_json::to_value(&user)?);
    }

    match user {
        Some(user) => {
            println!("{} {}", Icons::PERSON, user.display_name().bold());
            summary_row("ID", &user.id);
            if let Some(role) = user.role {
                summary_row("Role", role.as_str());
            }
            for (label, value) in [("Email", &user.email), ("Language", &user.language), ("Grade", &user.grade)] {
                if let Some(value) = value {
                    summary_row(label, value);
                }
            }
        }
        None => println!("{} No cached profile for {}", Icons::EMPTY, id),
    }
    Ok(())
}

pub async fn run_stats(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.store().await?;
    let stats = store.stats().await?;

    if ctx.human() {
        println!("{} Eguru Statistics ({})", Icons::STATS, stats.location);
        println!("------------------------------------");
        println!("{}", stats);
    } else {
        emit_success(ctx.output_mode, "stats", serde_json::to_value(&stats)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answers() {
        assert_eq!(parse_answers("2,1,0").unwrap(), vec![Some(2), Some(1), Some(0)]);
        assert_eq!(parse_answers("2, ,0").unwrap(), vec![Some(2), None, Some(0)]);
        assert!(parse_answers("2,x").is_err());
    }
}
