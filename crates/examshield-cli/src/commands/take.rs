//! The `examshield take` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use examshield_core::integrity::IntegrityWarning;
use examshield_core::model::Difficulty;
use examshield_core::parser;
use examshield_core::results::{AttemptResult, SubmitReason};
use examshield_core::scorer::Scorer;
use examshield_core::timer::{format_clock, TimeBand};
use examshield_core::traits::{DiscardSink, QuestionSource, SessionObserver};
use examshield_core::{Session, SessionDeps, SessionRunner};
use examshield_graders::config::{create_grader, load_config_from};

use crate::OutputFormat;

pub struct TakeArgs {
    pub bank: PathBuf,
    pub answers: PathBuf,
    pub subject: Option<String>,
    pub difficulty: Option<String>,
    pub minutes: Option<u32>,
    pub tick_ms: Option<u64>,
    pub format: OutputFormat,
    pub config: Option<PathBuf>,
}

/// Prints session events to stderr.
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_tick(&self, remaining_secs: u32) {
        // Whole minutes and band boundaries only.
        if remaining_secs % 60 == 0 || matches!(remaining_secs, 299 | 599) {
            let band = match TimeBand::for_remaining(remaining_secs) {
                TimeBand::Normal => "",
                TimeBand::Warning => " (hurry up)",
                TimeBand::Danger => " (almost out of time)",
            };
            tracing::debug!("{} left{band}", format_clock(remaining_secs));
        }
    }

    fn on_warning(&self, warning: &IntegrityWarning) {
        eprintln!("  WARNING: {}", warning.message());
    }

    fn on_rejected(&self, operation: &str, error: &str) {
        eprintln!("  Rejected {operation}: {error}");
    }

    fn on_submitted(&self, result: &AttemptResult, reason: SubmitReason) {
        eprintln!(
            "  Session {reason}: {}/{} after {} min",
            result.score, result.total_marks, result.time_taken_minutes
        );
    }
}

pub async fn execute(args: TakeArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;
    let bank = parser::parse_bank(&args.bank)?;
    let script = parser::parse_script(&args.answers)?;

    let mut session_config = bank.session_config();
    if let Some(subject) = &args.subject {
        session_config.subject = subject.clone();
    }
    if let Some(d) = &args.difficulty {
        let difficulty: Difficulty = d.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        session_config.difficulty = difficulty;
        session_config.total_time_minutes = difficulty.default_minutes();
    }
    if let Some(minutes) = args.minutes {
        anyhow::ensure!(minutes >= 1, "--minutes must be at least 1");
        session_config.total_time_minutes = minutes;
    }

    let questions = bank
        .questions(&session_config)
        .await
        .with_context(|| format!("cannot build a paper from {}", args.bank.display()))?;

    let grader = create_grader(&config)?;
    let scorer = Scorer::new(grader).with_weak_topic_threshold(config.weak_topic_threshold);
    let deps = SessionDeps::with_configured_scorer(scorer, Arc::new(DiscardSink))
        .with_observer(Arc::new(ConsoleObserver))
        .with_warning_ceiling(config.warning_ceiling);

    let session = Session::start(session_config, questions, deps)?;
    let tick_period = args
        .tick_ms
        .map(|ms| Duration::from_millis(ms.max(1)))
        .unwrap_or_else(|| config.tick_period());

    eprintln!(
        "examshield v{} - {} {} ({}), {} to go",
        env!("CARGO_PKG_VERSION"),
        session.config().subject,
        session.config().difficulty,
        session.config().counts,
        format_clock(session.remaining_secs())
    );

    let (tx, handle) = SessionRunner::new(session)
        .with_tick_period(tick_period)
        .spawn(script.len().max(1));

    for command in script {
        // The runner stops receiving once the session is submitted.
        if tx.send(command).await.is_err() {
            break;
        }
    }
    drop(tx);

    let result = handle.await.context("session task failed")??;

    match args.format {
        OutputFormat::Text => print_result(&result),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result).context("failed to serialize result")?;
            println!("{json}");
        }
    }

    Ok(())
}

fn print_result(result: &AttemptResult) {
    println!(
        "\n{} {} - {} ({})",
        result.subject,
        result.difficulty,
        result.grade(),
        result.grade().label()
    );
    println!(
        "Score: {}/{}  Accuracy: {}%  Time: {} min  Answered: {}/{}",
        result.score,
        result.total_marks,
        result.accuracy,
        result.time_taken_minutes,
        result.answered(),
        result.questions.len()
    );
    println!(
        "Tab switches: {}  Fail probability: {}%",
        result.integrity_warnings,
        result.fail_probability()
    );

    let mut table = Table::new();
    table.set_header(vec!["Topic", "Correct", "Total", "Accuracy"]);
    for (topic, score) in &result.topic_breakdown {
        table.add_row(vec![
            Cell::new(topic),
            Cell::new(score.correct),
            Cell::new(score.total),
            Cell::new(format!("{:.0}%", score.accuracy())),
        ]);
    }
    println!("\n{table}");

    if result.weak_topics.is_empty() {
        println!("No weak topics.");
    } else {
        println!("Weak topics: {}", result.weak_topics.join(", "));
    }
}
