//! Core data model types for examshield.
//!
//! Questions, session configuration, and answer payloads. Questions are
//! validated when they are built and never change afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SessionError;

/// Marks shown in the setup wizard for each question type.
pub const NOMINAL_MCQ_MARKS: u32 = 2;
pub const NOMINAL_SHORT_MARKS: u32 = 5;
pub const NOMINAL_LONG_MARKS: u32 = 10;

/// A single exam question.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: String,
    prompt: String,
    topic: String,
    marks: u32,
    time_limit_secs: u32,
    kind: QuestionKind,
}

/// The answer shape of a question, with only the fields that kind needs.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    Mcq {
        options: Vec<String>,
        correct_option: usize,
    },
    ShortAnswer {
        reference_answer: Option<String>,
    },
    LongAnswer {
        reference_answer: Option<String>,
    },
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Mcq { .. } => QuestionType::Mcq,
            QuestionKind::ShortAnswer { .. } => QuestionType::ShortAnswer,
            QuestionKind::LongAnswer { .. } => QuestionType::LongAnswer,
        }
    }
}

impl Question {
    /// Build a multiple-choice question.
    pub fn mcq(
        id: impl Into<String>,
        prompt: impl Into<String>,
        topic: impl Into<String>,
        marks: u32,
        time_limit_secs: u32,
        options: Vec<String>,
        correct_option: usize,
    ) -> Result<Self, SessionError> {
        let id = id.into();
        if options.len() < 2 {
            return Err(SessionError::validation(format!(
                "question {id}: an MCQ needs at least 2 options, got {}",
                options.len()
            )));
        }
        if correct_option >= options.len() {
            return Err(SessionError::validation(format!(
                "question {id}: correct option {correct_option} is out of bounds for {} options",
                options.len()
            )));
        }
        Self::build(
            id,
            prompt.into(),
            topic.into(),
            marks,
            time_limit_secs,
            QuestionKind::Mcq {
                options,
                correct_option,
            },
        )
    }

    /// Build a short-answer question.
    pub fn short_answer(
        id: impl Into<String>,
        prompt: impl Into<String>,
        topic: impl Into<String>,
        marks: u32,
        time_limit_secs: u32,
        reference_answer: Option<String>,
    ) -> Result<Self, SessionError> {
        Self::build(
            id.into(),
            prompt.into(),
            topic.into(),
            marks,
            time_limit_secs,
            QuestionKind::ShortAnswer { reference_answer },
        )
    }

    /// Build a long-answer question.
    pub fn long_answer(
        id: impl Into<String>,
        prompt: impl Into<String>,
        topic: impl Into<String>,
        marks: u32,
        time_limit_secs: u32,
        reference_answer: Option<String>,
    ) -> Result<Self, SessionError> {
        Self::build(
            id.into(),
            prompt.into(),
            topic.into(),
            marks,
            time_limit_secs,
            QuestionKind::LongAnswer { reference_answer },
        )
    }

    fn build(
        id: String,
        prompt: String,
        topic: String,
        marks: u32,
        time_limit_secs: u32,
        kind: QuestionKind,
    ) -> Result<Self, SessionError> {
        if id.trim().is_empty() {
            return Err(SessionError::validation("question id is empty"));
        }
        if prompt.trim().is_empty() {
            return Err(SessionError::validation(format!(
                "question {id}: prompt is empty"
            )));
        }
        if marks == 0 {
            return Err(SessionError::validation(format!(
                "question {id}: marks must be positive"
            )));
        }
        if time_limit_secs == 0 {
            return Err(SessionError::validation(format!(
                "question {id}: time allotment must be positive"
            )));
        }
        Ok(Self {
            id,
            prompt,
            topic,
            marks,
            time_limit_secs,
            kind,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn marks(&self) -> u32 {
        self.marks
    }

    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    /// Whether this question takes a text or image answer.
    pub fn is_descriptive(&self) -> bool {
        !matches!(self.kind, QuestionKind::Mcq { .. })
    }

    /// Reference answer for descriptive questions, if the source supplied one.
    pub fn reference_answer(&self) -> Option<&str> {
        match &self.kind {
            QuestionKind::Mcq { .. } => None,
            QuestionKind::ShortAnswer { reference_answer }
            | QuestionKind::LongAnswer { reference_answer } => reference_answer.as_deref(),
        }
    }
}

/// Question type tag, used for counts and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    #[serde(rename = "short")]
    ShortAnswer,
    #[serde(rename = "long")]
    LongAnswer,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Mcq => write!(f, "MCQ"),
            QuestionType::ShortAnswer => write!(f, "Short Answer"),
            QuestionType::LongAnswer => write!(f, "Long Answer"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mcq" => Ok(QuestionType::Mcq),
            "short" | "short_answer" | "shortanswer" => Ok(QuestionType::ShortAnswer),
            "long" | "long_answer" | "longanswer" => Ok(QuestionType::LongAnswer),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// Paper difficulty.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Time budget the setup wizard offers for this difficulty, in minutes.
    pub fn default_minutes(self) -> u32 {
        match self {
            Difficulty::Easy => 30,
            Difficulty::Medium => 45,
            Difficulty::Hard => 60,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Number of questions of each type in a paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuestionCounts {
    #[serde(default)]
    pub mcq: usize,
    #[serde(default)]
    pub short: usize,
    #[serde(default)]
    pub long: usize,
}

impl QuestionCounts {
    pub fn new(mcq: usize, short: usize, long: usize) -> Self {
        Self { mcq, short, long }
    }

    /// Tally the questions of a paper by type.
    pub fn of(questions: &[Question]) -> Self {
        let mut counts = Self::default();
        for q in questions {
            match q.question_type() {
                QuestionType::Mcq => counts.mcq += 1,
                QuestionType::ShortAnswer => counts.short += 1,
                QuestionType::LongAnswer => counts.long += 1,
            }
        }
        counts
    }

    pub fn get(&self, question_type: QuestionType) -> usize {
        match question_type {
            QuestionType::Mcq => self.mcq,
            QuestionType::ShortAnswer => self.short,
            QuestionType::LongAnswer => self.long,
        }
    }

    pub fn total(&self) -> usize {
        self.mcq + self.short + self.long
    }
}

impl fmt::Display for QuestionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} MCQ, {} short, {} long",
            self.mcq, self.short, self.long
        )
    }
}

/// Paper configuration chosen before a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Subject name (e.g. "Physics").
    pub subject: String,
    /// Paper difficulty.
    pub difficulty: Difficulty,
    /// Questions per type.
    pub counts: QuestionCounts,
    /// Total time budget in minutes.
    pub total_time_minutes: u32,
}

impl SessionConfig {
    /// Config with the difficulty's default time budget.
    pub fn new(subject: impl Into<String>, difficulty: Difficulty, counts: QuestionCounts) -> Self {
        Self {
            subject: subject.into(),
            difficulty,
            counts,
            total_time_minutes: difficulty.default_minutes(),
        }
    }

    pub fn with_total_time(mut self, minutes: u32) -> Self {
        self.total_time_minutes = minutes;
        self
    }

    pub fn total_time_secs(&self) -> u32 {
        self.total_time_minutes.saturating_mul(60)
    }

    /// Marks the wizard advertises for these counts.
    pub fn nominal_marks(&self) -> u32 {
        self.counts.mcq as u32 * NOMINAL_MCQ_MARKS
            + self.counts.short as u32 * NOMINAL_SHORT_MARKS
            + self.counts.long as u32 * NOMINAL_LONG_MARKS
    }
}

/// Opaque reference to an uploaded answer image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The single answer payload held for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// Index into an MCQ's options.
    SelectedOption(usize),
    /// Typed answer to a descriptive question.
    Text(String),
    /// Photo of a handwritten answer to a descriptive question.
    Image(ImageRef),
}

impl Answer {
    /// Blank text and blank image references do not count as answers.
    pub fn is_empty(&self) -> bool {
        match self {
            Answer::SelectedOption(_) => false,
            Answer::Text(text) => text.trim().is_empty(),
            Answer::Image(image) => image.as_str().trim().is_empty(),
        }
    }
}
