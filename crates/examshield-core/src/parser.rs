//! TOML question banks and answer scripts.
//!
//! A bank is a static question supply for one subject. An answer script is a
//! recorded list of [`SessionCommand`]s replayed against a live session.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::model::{
    Difficulty, Question, QuestionCounts, QuestionType, SessionConfig, NOMINAL_LONG_MARKS,
    NOMINAL_MCQ_MARKS, NOMINAL_SHORT_MARKS,
};
use crate::runner::SessionCommand;
use crate::traits::QuestionSource;

#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    subject: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    total_time_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(rename = "type")]
    question_type: String,
    prompt: String,
    topic: String,
    #[serde(default)]
    marks: Option<u32>,
    #[serde(default = "default_time_limit")]
    time_limit_secs: u32,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_option: Option<usize>,
    #[serde(default)]
    reference_answer: Option<String>,
}

fn default_time_limit() -> u32 {
    120
}

#[derive(Debug, Deserialize)]
struct TomlScript {
    #[serde(default)]
    events: Vec<SessionCommand>,
}

/// Questions for one subject, loaded from a TOML file.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    pub id: String,
    pub subject: String,
    pub difficulty: Difficulty,
    /// Overrides the difficulty's default time budget when set.
    pub total_time_minutes: Option<u32>,
    pub questions: Vec<Question>,
    pub source: PathBuf,
}

impl QuestionBank {
    /// Question counts available in the bank.
    pub fn counts(&self) -> QuestionCounts {
        QuestionCounts::of(&self.questions)
    }

    /// A config that uses every question in the bank.
    pub fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::new(&self.subject, self.difficulty, self.counts());
        match self.total_time_minutes {
            Some(minutes) => config.with_total_time(minutes),
            None => config,
        }
    }

    /// Select the first `counts` questions of each type, keeping bank order.
    pub fn select(&self, counts: QuestionCounts) -> Result<Vec<Question>> {
        let available = self.counts();
        for ty in [
            QuestionType::Mcq,
            QuestionType::ShortAnswer,
            QuestionType::LongAnswer,
        ] {
            if counts.get(ty) > available.get(ty) {
                anyhow::bail!(
                    "bank '{}' has {} {ty} questions, {} requested",
                    self.id,
                    available.get(ty),
                    counts.get(ty)
                );
            }
        }

        let mut taken = QuestionCounts::default();
        let selected = self
            .questions
            .iter()
            .filter(|q| {
                let slot = match q.question_type() {
                    QuestionType::Mcq => &mut taken.mcq,
                    QuestionType::ShortAnswer => &mut taken.short,
                    QuestionType::LongAnswer => &mut taken.long,
                };
                if *slot < counts.get(q.question_type()) {
                    *slot += 1;
                    true
                } else {
                    false
                }
            })
            .cloned()
            .collect();
        Ok(selected)
    }
}

#[async_trait]
impl QuestionSource for QuestionBank {
    fn name(&self) -> &str {
        &self.id
    }

    async fn questions(&self, config: &SessionConfig) -> Result<Vec<Question>> {
        if !config.subject.eq_ignore_ascii_case(&self.subject) {
            anyhow::bail!(
                "bank '{}' covers {}, not {}",
                self.id,
                self.subject,
                config.subject
            );
        }
        self.select(config.counts)
    }
}

/// Parse a single bank file.
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse bank TOML from a string.
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let difficulty = parsed
        .bank
        .difficulty
        .as_deref()
        .map(str::parse::<Difficulty>)
        .transpose()
        .map_err(|e| anyhow::anyhow!("{e}"))?
        .unwrap_or_default();

    let questions = parsed
        .questions
        .into_iter()
        .map(convert_question)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid question in {}", source_path.display()))?;

    Ok(QuestionBank {
        id: parsed.bank.id,
        subject: parsed.bank.subject,
        difficulty,
        total_time_minutes: parsed.bank.total_time_minutes,
        questions,
        source: source_path.to_path_buf(),
    })
}

fn convert_question(q: TomlQuestion) -> Result<Question> {
    let question_type: QuestionType = q.question_type.parse().map_err(|e: String| {
        anyhow::anyhow!("question {}: {e}", q.id)
    })?;
    let marks = q.marks.unwrap_or(match question_type {
        QuestionType::Mcq => NOMINAL_MCQ_MARKS,
        QuestionType::ShortAnswer => NOMINAL_SHORT_MARKS,
        QuestionType::LongAnswer => NOMINAL_LONG_MARKS,
    });

    let question = match question_type {
        QuestionType::Mcq => {
            let correct = q
                .correct_option
                .with_context(|| format!("question {}: MCQ without correct_option", q.id))?;
            Question::mcq(
                q.id,
                q.prompt,
                q.topic,
                marks,
                q.time_limit_secs,
                q.options,
                correct,
            )?
        }
        QuestionType::ShortAnswer => Question::short_answer(
            q.id,
            q.prompt,
            q.topic,
            marks,
            q.time_limit_secs,
            q.reference_answer,
        )?,
        QuestionType::LongAnswer => Question::long_answer(
            q.id,
            q.prompt,
            q.topic,
            marks,
            q.time_limit_secs,
            q.reference_answer,
        )?,
    };
    Ok(question)
}

/// Recursively load every `.toml` bank under a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
            }
        }
    }

    banks.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(banks)
}

/// Parse an answer script file.
pub fn parse_script(path: &Path) -> Result<Vec<SessionCommand>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answer script: {}", path.display()))?;
    parse_script_str(&content, path)
}

/// Parse answer script TOML (`[[events]]` tables) from a string.
pub fn parse_script_str(content: &str, source_path: &Path) -> Result<Vec<SessionCommand>> {
    let parsed: TomlScript = toml::from_str(content)
        .with_context(|| format!("failed to parse answer script: {}", source_path.display()))?;
    Ok(parsed.events)
}

/// A non-fatal problem found in a bank.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub question_id: Option<String>,
    pub message: String,
}

/// Check a parsed bank for problems that would break a session.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "bank has no questions".into(),
        });
    }

    let mut seen = HashSet::new();
    for q in &bank.questions {
        if !seen.insert(q.id()) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id().to_string()),
                message: format!("duplicate question ID: {}", q.id()),
            });
        }
    }

    for q in &bank.questions {
        if q.topic().trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id().to_string()),
                message: "topic is empty".into(),
            });
        }
        if q.is_descriptive() && q.reference_answer().is_none() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id().to_string()),
                message: "descriptive question has no reference_answer".into(),
            });
        }
    }

    if bank.total_time_minutes == Some(0) {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "total_time_minutes is zero".into(),
        });
    }

    warnings
}
