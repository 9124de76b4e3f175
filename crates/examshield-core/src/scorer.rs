//! Attempt scoring.
//!
//! MCQs are marked here directly. Descriptive answers go through the
//! [`DescriptiveGrader`] capability, so swapping the grader never touches the
//! MCQ logic or the session.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use uuid::Uuid;

use crate::error::SessionError;
use crate::model::{Answer, Question, QuestionKind};
use crate::results::{AttemptResult, QuestionOutcome, SubmitReason, TopicScore};
use crate::session::{Session, SessionState};
use crate::traits::{DescriptiveGrader, GradeRequest};

/// Topics scoring below this percentage are reported as weak.
pub const DEFAULT_WEAK_TOPIC_THRESHOLD: f64 = 70.0;

/// Computes an [`AttemptResult`] from a submitted session.
#[derive(Clone)]
pub struct Scorer {
    grader: Arc<dyn DescriptiveGrader>,
    weak_topic_threshold: f64,
}

impl fmt::Debug for Scorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scorer")
            .field("grader", &self.grader.name())
            .field("weak_topic_threshold", &self.weak_topic_threshold)
            .finish()
    }
}

impl Scorer {
    pub fn new(grader: Arc<dyn DescriptiveGrader>) -> Self {
        Self {
            grader,
            weak_topic_threshold: DEFAULT_WEAK_TOPIC_THRESHOLD,
        }
    }

    pub fn with_weak_topic_threshold(mut self, threshold: f64) -> Self {
        self.weak_topic_threshold = threshold.clamp(0.0, 100.0);
        self
    }

    pub fn weak_topic_threshold(&self) -> f64 {
        self.weak_topic_threshold
    }

    pub fn grader_name(&self) -> &str {
        self.grader.name()
    }

    /// Score a freshly submitted session. Only [`Session::submit`] calls this.
    ///
    /// Fails with [`SessionError::InvalidState`] if the session is still
    /// active or already holds its result.
    pub(crate) async fn score(&self, session: &Session) -> Result<AttemptResult, SessionError> {
        if session.state() != SessionState::Submitted || session.result().is_some() {
            return Err(SessionError::InvalidState {
                operation: "score",
                state: session.state(),
            });
        }

        let mut outcomes = Vec::with_capacity(session.questions().len());
        let mut pending = Vec::new();

        for question in session.questions() {
            let answer = session.answer(question.id()).filter(|a| !a.is_empty());
            match (question.kind(), answer) {
                (_, None) => outcomes.push(unanswered(question)),
                (QuestionKind::Mcq { correct_option, .. }, Some(answer)) => {
                    outcomes.push(grade_mcq(question, *correct_option, answer));
                }
                (_, Some(answer)) => {
                    pending.push((outcomes.len(), GradeRequest::new(question, answer)));
                    let mut outcome = unanswered(question);
                    outcome.answered = true;
                    outcomes.push(outcome);
                }
            }
        }

        let grades = join_all(pending.iter().map(|(_, req)| self.grader.grade(req))).await;
        for ((idx, req), grade) in pending.iter().zip(grades) {
            let outcome = &mut outcomes[*idx];
            match grade {
                Ok(grade) => {
                    outcome.awarded_marks = grade.awarded_marks.min(outcome.marks);
                    outcome.correct = grade.correct;
                    outcome.feedback = grade.feedback;
                }
                Err(e) => {
                    tracing::warn!(
                        "grader '{}' failed on {}, awarding zero: {e:#}",
                        self.grader.name(),
                        req.question_id
                    );
                }
            }
        }

        let summary = summarize(&outcomes, self.weak_topic_threshold);
        let config = session.config();

        Ok(AttemptResult {
            id: Uuid::new_v4(),
            session_id: session.id(),
            subject: config.subject.clone(),
            difficulty: config.difficulty,
            submitted_at: chrono::Utc::now(),
            submit_reason: session.submit_reason().unwrap_or(SubmitReason::Manual),
            score: summary.score,
            total_marks: summary.total_marks,
            accuracy: summary.accuracy,
            time_taken_minutes: minutes_taken(config.total_time_secs(), session.remaining_secs()),
            topic_breakdown: summary.topic_breakdown,
            weak_topics: summary.weak_topics,
            integrity_warnings: session.integrity_warnings(),
            questions: outcomes,
        })
    }
}

fn unanswered(question: &Question) -> QuestionOutcome {
    QuestionOutcome {
        question_id: question.id().to_string(),
        question_type: question.question_type(),
        topic: question.topic().to_string(),
        marks: question.marks(),
        awarded_marks: 0,
        correct: false,
        answered: false,
        feedback: None,
    }
}

fn grade_mcq(question: &Question, correct_option: usize, answer: &Answer) -> QuestionOutcome {
    let correct = matches!(answer, Answer::SelectedOption(selected) if *selected == correct_option);
    QuestionOutcome {
        awarded_marks: if correct { question.marks() } else { 0 },
        correct,
        answered: true,
        ..unanswered(question)
    }
}

/// Totals derived from graded questions.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSummary {
    pub score: u32,
    pub total_marks: u32,
    pub accuracy: u32,
    pub topic_breakdown: BTreeMap<String, TopicScore>,
    pub weak_topics: Vec<String>,
}

/// Aggregate graded questions into score, accuracy, and topic breakdown.
pub fn summarize(outcomes: &[QuestionOutcome], weak_topic_threshold: f64) -> ScoreSummary {
    let score = outcomes.iter().map(|o| o.awarded_marks).sum();
    let total_marks = outcomes.iter().map(|o| o.marks).sum();

    let mut topic_breakdown: BTreeMap<String, TopicScore> = BTreeMap::new();
    for outcome in outcomes {
        let entry = topic_breakdown.entry(outcome.topic.clone()).or_default();
        entry.total += 1;
        if outcome.correct {
            entry.correct += 1;
        }
    }

    // BTreeMap iteration keeps this sorted by topic name.
    let weak_topics = topic_breakdown
        .iter()
        .filter(|(_, t)| t.accuracy() < weak_topic_threshold)
        .map(|(name, _)| name.clone())
        .collect();

    ScoreSummary {
        score,
        total_marks,
        accuracy: accuracy_percent(score, total_marks),
        topic_breakdown,
        weak_topics,
    }
}

/// `round(score / total * 100)` clamped to 0..=100; zero when `total` is zero.
pub fn accuracy_percent(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let pct = (score as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u32
}

/// Whole minutes between the configured budget and the time left, rounded.
pub fn minutes_taken(configured_secs: u32, remaining_secs: u32) -> u32 {
    let elapsed = configured_secs.saturating_sub(remaining_secs);
    (elapsed as f64 / 60.0).round() as u32
}
