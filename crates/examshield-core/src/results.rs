//! Attempt result types.
//!
//! An [`AttemptResult`] is the frozen outcome of one submitted session. It has
//! no reference back to the session and is never recomputed.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Difficulty, QuestionType};

/// What caused the session to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    /// The candidate submitted.
    Manual,
    /// The timer reached zero.
    TimeExpired,
}

impl fmt::Display for SubmitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitReason::Manual => write!(f, "submitted"),
            SubmitReason::TimeExpired => write!(f, "time expired"),
        }
    }
}

/// Correct/total tally for one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicScore {
    pub correct: u32,
    pub total: u32,
}

impl TopicScore {
    /// Percentage of correct questions, 0.0 when the topic has none.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }
}

/// How a single question was graded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: String,
    pub question_type: QuestionType,
    pub topic: String,
    pub marks: u32,
    pub awarded_marks: u32,
    pub correct: bool,
    pub answered: bool,
    /// Grader feedback for descriptive answers.
    #[serde(default)]
    pub feedback: Option<String>,
}

/// The scored outcome of one submitted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    /// Unique attempt identifier.
    pub id: Uuid,
    /// Session this attempt was scored from.
    pub session_id: Uuid,
    pub subject: String,
    pub difficulty: Difficulty,
    /// When the session was submitted.
    pub submitted_at: DateTime<Utc>,
    pub submit_reason: SubmitReason,
    /// Marks awarded across all questions.
    pub score: u32,
    /// Sum of every question's marks.
    pub total_marks: u32,
    /// `round(score / total_marks * 100)`, clamped to 0..=100.
    pub accuracy: u32,
    /// Whole minutes used, rounded.
    pub time_taken_minutes: u32,
    /// Per-topic correct/total.
    pub topic_breakdown: BTreeMap<String, TopicScore>,
    /// Topics below the weak-topic threshold, sorted by name.
    pub weak_topics: Vec<String>,
    /// Focus-loss warnings raised during the session.
    pub integrity_warnings: u32,
    pub questions: Vec<QuestionOutcome>,
}

impl AttemptResult {
    /// Letter grade for the attempt's accuracy.
    pub fn grade(&self) -> LetterGrade {
        LetterGrade::from_accuracy(self.accuracy)
    }

    /// Rough chance of failing the real exam at this accuracy.
    pub fn fail_probability(&self) -> u32 {
        100u32.saturating_sub(self.accuracy).saturating_sub(10)
    }

    /// Number of questions that received a non-empty answer.
    pub fn answered(&self) -> usize {
        self.questions.iter().filter(|q| q.answered).count()
    }
}

/// Letter grade bands shown on the results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterGrade {
    APlus,
    A,
    BPlus,
    B,
    C,
    D,
}

impl LetterGrade {
    pub fn from_accuracy(accuracy: u32) -> Self {
        match accuracy {
            90.. => LetterGrade::APlus,
            80..=89 => LetterGrade::A,
            70..=79 => LetterGrade::BPlus,
            60..=69 => LetterGrade::B,
            50..=59 => LetterGrade::C,
            _ => LetterGrade::D,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LetterGrade::APlus => "Outstanding!",
            LetterGrade::A => "Excellent!",
            LetterGrade::BPlus => "Good Job!",
            LetterGrade::B => "Above Average",
            LetterGrade::C => "Needs Work",
            LetterGrade::D => "Revise Required",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
        };
        f.write_str(s)
    }
}
