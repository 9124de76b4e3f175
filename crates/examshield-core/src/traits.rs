//! Capability traits the session engine is wired with.
//!
//! The engine never knows which implementation sits behind these: tests use
//! in-process fakes, production can grade over the network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::integrity::IntegrityWarning;
use crate::model::{Answer, Question, QuestionType, SessionConfig};
use crate::results::{AttemptResult, SubmitReason};

// ---------------------------------------------------------------------------
// Descriptive answer grading
// ---------------------------------------------------------------------------

/// Grades short and long answers. MCQs never reach a grader.
#[async_trait]
pub trait DescriptiveGrader: Send + Sync {
    /// Human-readable grader name (e.g. "placeholder").
    fn name(&self) -> &str;

    /// Grade one non-empty descriptive answer.
    async fn grade(&self, request: &GradeRequest) -> anyhow::Result<DescriptiveGrade>;
}

/// A descriptive answer sent for grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRequest {
    pub question_id: String,
    pub question_type: QuestionType,
    pub prompt: String,
    pub topic: String,
    /// Maximum marks the answer can earn.
    pub marks: u32,
    #[serde(default)]
    pub reference_answer: Option<String>,
    pub answer: Answer,
}

impl GradeRequest {
    pub fn new(question: &Question, answer: &Answer) -> Self {
        Self {
            question_id: question.id().to_string(),
            question_type: question.question_type(),
            prompt: question.prompt().to_string(),
            topic: question.topic().to_string(),
            marks: question.marks(),
            reference_answer: question.reference_answer().map(str::to_string),
            answer: answer.clone(),
        }
    }
}

/// A grader's verdict on one descriptive answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptiveGrade {
    /// Marks awarded; the scorer caps this at the question's marks.
    pub awarded_marks: u32,
    /// Whether the answer counts as correct in the topic breakdown.
    pub correct: bool,
    #[serde(default)]
    pub feedback: Option<String>,
}

// ---------------------------------------------------------------------------
// Question supply
// ---------------------------------------------------------------------------

/// Supplies the ordered questions for a configured paper.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    fn name(&self) -> &str;

    /// Produce questions matching `config.counts` exactly.
    async fn questions(&self, config: &SessionConfig) -> anyhow::Result<Vec<Question>>;
}

// ---------------------------------------------------------------------------
// Result sink and session observer
// ---------------------------------------------------------------------------

/// Receives each attempt result once, at submission.
pub trait ResultSink: Send + Sync {
    fn record(&self, result: &AttemptResult);
}

/// Sink that drops results.
pub struct DiscardSink;

impl ResultSink for DiscardSink {
    fn record(&self, _: &AttemptResult) {}
}

/// Session event reporting trait.
pub trait SessionObserver: Send + Sync {
    fn on_tick(&self, remaining_secs: u32);
    fn on_warning(&self, warning: &IntegrityWarning);
    fn on_rejected(&self, operation: &str, error: &str);
    fn on_submitted(&self, result: &AttemptResult, reason: SubmitReason);
}

/// No-op session observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_tick(&self, _: u32) {}
    fn on_warning(&self, _: &IntegrityWarning) {}
    fn on_rejected(&self, _: &str, _: &str) {}
    fn on_submitted(&self, _: &AttemptResult, _: SubmitReason) {}
}
