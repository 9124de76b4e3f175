//! The test-taking session state machine.
//!
//! A [`Session`] is `Active` from [`Session::start`] until it is submitted,
//! either manually or by the timer reaching zero. `Submitted` is terminal:
//! answers, position, and time are frozen and the result is computed once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::integrity::{IntegrityMonitor, IntegrityWarning, DEFAULT_WARNING_CEILING};
use crate::model::{
    Answer, ImageRef, Question, QuestionCounts, QuestionKind, QuestionType, SessionConfig,
};
use crate::results::{AttemptResult, SubmitReason};
use crate::scorer::Scorer;
use crate::traits::{DescriptiveGrader, NoopObserver, ResultSink, SessionObserver};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Submitted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active => write!(f, "active"),
            SessionState::Submitted => write!(f, "submitted"),
        }
    }
}

/// Navigator status of one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Current,
    Answered,
    Unanswered,
}

/// Outcome of advancing the clock.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Running { remaining_secs: u32 },
    Expired(AttemptResult),
}

/// Capabilities a session is wired with.
#[derive(Clone)]
pub struct SessionDeps {
    scorer: Scorer,
    sink: Arc<dyn ResultSink>,
    observer: Arc<dyn SessionObserver>,
    warning_ceiling: u32,
}

impl SessionDeps {
    pub fn new(grader: Arc<dyn DescriptiveGrader>, sink: Arc<dyn ResultSink>) -> Self {
        Self::with_configured_scorer(Scorer::new(grader), sink)
    }

    /// Wire a scorer that already carries its own settings.
    pub fn with_configured_scorer(scorer: Scorer, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            scorer,
            sink,
            observer: Arc::new(NoopObserver),
            warning_ceiling: DEFAULT_WARNING_CEILING,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_warning_ceiling(mut self, ceiling: u32) -> Self {
        self.warning_ceiling = ceiling;
        self
    }
}

/// One test attempt and everything captured during it.
pub struct Session {
    id: Uuid,
    config: SessionConfig,
    questions: Vec<Question>,
    positions: HashMap<String, usize>,
    answers: HashMap<String, Answer>,
    current_index: usize,
    remaining_secs: u32,
    integrity: IntegrityMonitor,
    state: SessionState,
    submit_reason: Option<SubmitReason>,
    result: Option<AttemptResult>,
    deps: SessionDeps,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("subject", &self.config.subject)
            .field("questions", &self.questions.len())
            .field("answered", &self.answered_count())
            .field("current_index", &self.current_index)
            .field("remaining_secs", &self.remaining_secs)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start an active session at question 0 with the full time budget.
    pub fn start(
        config: SessionConfig,
        questions: Vec<Question>,
        deps: SessionDeps,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::validation("a session needs at least one question"));
        }
        if config.total_time_minutes == 0 {
            return Err(SessionError::validation("total time must be positive"));
        }
        let supplied = QuestionCounts::of(&questions);
        if supplied != config.counts {
            return Err(SessionError::validation(format!(
                "questions ({supplied}) do not match the configured counts ({})",
                config.counts
            )));
        }

        let mut positions = HashMap::with_capacity(questions.len());
        for (i, q) in questions.iter().enumerate() {
            if positions.insert(q.id().to_string(), i).is_some() {
                return Err(SessionError::validation(format!(
                    "duplicate question id: {}",
                    q.id()
                )));
            }
        }

        let id = Uuid::new_v4();
        tracing::info!(
            "session {id} started: {} {} ({}), {} min",
            config.subject,
            config.difficulty,
            config.counts,
            config.total_time_minutes
        );

        Ok(Self {
            id,
            remaining_secs: config.total_time_secs(),
            integrity: IntegrityMonitor::new(deps.warning_ceiling),
            config,
            questions,
            positions,
            answers: HashMap::new(),
            current_index: 0,
            state: SessionState::Active,
            submit_reason: None,
            result: None,
            deps,
        })
    }

    // --- Accessors --------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_submitted(&self) -> bool {
        self.state == SessionState::Submitted
    }

    pub fn submit_reason(&self) -> Option<SubmitReason> {
        self.submit_reason
    }

    pub fn integrity_warnings(&self) -> u32 {
        self.integrity.warnings()
    }

    pub fn answer(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    /// The frozen result, once submitted.
    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }

    /// Questions holding a non-empty answer.
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| !a.is_empty()).count()
    }

    pub fn question_status(&self, index: usize) -> Option<QuestionStatus> {
        let question = self.questions.get(index)?;
        let status = if index == self.current_index {
            QuestionStatus::Current
        } else if self.answer(question.id()).is_some_and(|a| !a.is_empty()) {
            QuestionStatus::Answered
        } else {
            QuestionStatus::Unanswered
        };
        Some(status)
    }

    // --- Answer capture ---------------------------------------------------

    /// Select an option of an MCQ, replacing any earlier selection.
    pub fn select_option(&mut self, question_id: &str, option: usize) -> Result<(), SessionError> {
        self.ensure_active("select an option")?;
        let question = self.lookup(question_id)?;
        let option_count = match question.kind() {
            QuestionKind::Mcq { options, .. } => options.len(),
            _ => {
                return Err(SessionError::input(format!(
                    "question {question_id} is a {} question, not an MCQ",
                    question.question_type()
                )))
            }
        };
        if option >= option_count {
            return Err(SessionError::input(format!(
                "option {option} is out of bounds for question {question_id} ({option_count} options)"
            )));
        }
        tracing::debug!("{question_id}: selected option {option}");
        self.answers
            .insert(question_id.to_string(), Answer::SelectedOption(option));
        Ok(())
    }

    /// Type an answer to a descriptive question, replacing any text or image.
    pub fn set_text(
        &mut self,
        question_id: &str,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.set_descriptive("set answer text", question_id, Answer::Text(text.into()))
    }

    /// Attach an uploaded image to a descriptive question, replacing any text.
    pub fn set_image_ref(
        &mut self,
        question_id: &str,
        image: ImageRef,
    ) -> Result<(), SessionError> {
        self.set_descriptive("attach an image", question_id, Answer::Image(image))
    }

    fn set_descriptive(
        &mut self,
        operation: &'static str,
        question_id: &str,
        answer: Answer,
    ) -> Result<(), SessionError> {
        self.ensure_active(operation)?;
        let question = self.lookup(question_id)?;
        if question.question_type() == QuestionType::Mcq {
            return Err(SessionError::input(format!(
                "question {question_id} is an MCQ and takes an option, not text or an image"
            )));
        }
        tracing::debug!("{question_id}: {operation}");
        self.answers.insert(question_id.to_string(), answer);
        Ok(())
    }

    // --- Navigation -------------------------------------------------------

    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_active("navigate")?;
        if index >= self.questions.len() {
            return Err(SessionError::input(format!(
                "question index {index} is out of bounds for {} questions",
                self.questions.len()
            )));
        }
        self.current_index = index;
        Ok(())
    }

    /// Move to the next question, staying on the last one.
    pub fn next_question(&mut self) -> Result<usize, SessionError> {
        self.ensure_active("navigate")?;
        self.current_index = (self.current_index + 1).min(self.questions.len() - 1);
        Ok(self.current_index)
    }

    /// Move to the previous question, staying on the first one.
    pub fn previous_question(&mut self) -> Result<usize, SessionError> {
        self.ensure_active("navigate")?;
        self.current_index = self.current_index.saturating_sub(1);
        Ok(self.current_index)
    }

    // --- Clock, integrity, submission ---------------------------------------

    /// Advance the clock. Reaching zero submits before this returns.
    pub async fn tick(&mut self, elapsed_secs: u32) -> Result<TickOutcome, SessionError> {
        self.ensure_active("tick")?;
        self.remaining_secs = self.remaining_secs.saturating_sub(elapsed_secs);
        self.deps.observer.on_tick(self.remaining_secs);
        if self.remaining_secs == 0 {
            tracing::info!("session {} ran out of time", self.id);
            let result = self.submit_with(SubmitReason::TimeExpired).await?;
            return Ok(TickOutcome::Expired(result));
        }
        Ok(TickOutcome::Running {
            remaining_secs: self.remaining_secs,
        })
    }

    /// Report a visibility change. Only losses while active raise a warning.
    pub fn visibility_changed(&mut self, hidden: bool) -> Option<IntegrityWarning> {
        if !hidden || self.is_submitted() {
            return None;
        }
        let warning = self.integrity.record_focus_loss();
        tracing::warn!(
            "session {}: tab switch {}/{}",
            self.id,
            warning.count,
            warning.ceiling
        );
        self.deps.observer.on_warning(&warning);
        Some(warning)
    }

    /// Submit the session.
    ///
    /// The first call freezes the session, scores it, and hands the result to
    /// the sink. Later calls return that same result.
    pub async fn submit(&mut self) -> Result<AttemptResult, SessionError> {
        self.submit_with(SubmitReason::Manual).await
    }

    async fn submit_with(&mut self, reason: SubmitReason) -> Result<AttemptResult, SessionError> {
        if let Some(result) = &self.result {
            return Ok(result.clone());
        }
        if self.state == SessionState::Active {
            self.state = SessionState::Submitted;
            self.submit_reason = Some(reason);
        }

        let result = self.deps.scorer.score(self).await?;
        tracing::info!(
            "session {} {}: {}/{} ({}%)",
            self.id,
            result.submit_reason,
            result.score,
            result.total_marks,
            result.accuracy
        );
        self.deps.sink.record(&result);
        self.deps
            .observer
            .on_submitted(&result, result.submit_reason);
        self.result = Some(result.clone());
        Ok(result)
    }

    /// Report a rejected operation to the observer.
    pub(crate) fn notify_rejected(&self, operation: &str, error: &SessionError) {
        self.deps.observer.on_rejected(operation, &error.to_string());
    }

    fn ensure_active(&self, operation: &'static str) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active => Ok(()),
            state => Err(SessionError::InvalidState { operation, state }),
        }
    }

    fn lookup(&self, question_id: &str) -> Result<&Question, SessionError> {
        self.positions
            .get(question_id)
            .map(|&i| &self.questions[i])
            .ok_or_else(|| SessionError::input(format!("unknown question id: {question_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::model::{Difficulty, QuestionCounts};
    use crate::results::TopicScore;
    use crate::traits::{DescriptiveGrade, GradeRequest};

    /// Awards 3 for text and 5 for images, correct only at full marks.
    struct FixedGrader {
        calls: AtomicU32,
    }

    impl FixedGrader {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl DescriptiveGrader for FixedGrader {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn grade(&self, request: &GradeRequest) -> anyhow::Result<DescriptiveGrade> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let awarded = match request.answer {
                Answer::Image(_) => 5,
                _ => 3,
            }
            .min(request.marks);
            Ok(DescriptiveGrade {
                awarded_marks: awarded,
                correct: awarded == request.marks,
                feedback: None,
            })
        }
    }

    struct FailingGrader;

    #[async_trait]
    impl DescriptiveGrader for FailingGrader {
        fn name(&self) -> &str {
            "failing"
        }

        async fn grade(&self, _: &GradeRequest) -> anyhow::Result<DescriptiveGrade> {
            anyhow::bail!("grader offline")
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        results: Mutex<Vec<AttemptResult>>,
    }

    impl ResultSink for RecordingSink {
        fn record(&self, result: &AttemptResult) {
            self.results.lock().unwrap().push(result.clone());
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        warnings: Mutex<Vec<IntegrityWarning>>,
        submissions: AtomicU32,
    }

    impl SessionObserver for RecordingObserver {
        fn on_tick(&self, _: u32) {}
        fn on_warning(&self, warning: &IntegrityWarning) {
            self.warnings.lock().unwrap().push(*warning);
        }
        fn on_rejected(&self, _: &str, _: &str) {}
        fn on_submitted(&self, _: &AttemptResult, _: SubmitReason) {
            self.submissions.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn mcq(id: &str, topic: &str, correct: usize) -> Question {
        Question::mcq(
            id,
            format!("Question {id}"),
            topic,
            2,
            90,
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct,
        )
        .unwrap()
    }

    fn config(counts: QuestionCounts, minutes: u32) -> SessionConfig {
        SessionConfig::new("Physics", Difficulty::Medium, counts).with_total_time(minutes)
    }

    fn two_mcq_session(sink: Arc<RecordingSink>) -> Session {
        Session::start(
            config(QuestionCounts::new(2, 0, 0), 45),
            vec![mcq("q1", "Mechanics", 0), mcq("q2", "Mechanics", 1)],
            SessionDeps::new(FixedGrader::new(), sink),
        )
        .unwrap()
    }

    fn mixed_session(grader: Arc<dyn DescriptiveGrader>) -> Session {
        let questions = vec![
            mcq("q1", "Mechanics", 0),
            Question::short_answer("q6", "Explain superposition", "Waves", 5, 300, None).unwrap(),
            Question::long_answer("q7", "Derive the pendulum period", "Mechanics", 10, 600, None)
                .unwrap(),
        ];
        Session::start(
            config(QuestionCounts::new(1, 1, 1), 45),
            questions,
            SessionDeps::new(grader, Arc::new(RecordingSink::default())),
        )
        .unwrap()
    }

    #[test]
    fn start_initialises_active_session() {
        let session = two_mcq_session(Arc::new(RecordingSink::default()));
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.remaining_secs(), 45 * 60);
        assert_eq!(session.integrity_warnings(), 0);
        assert_eq!(session.answered_count(), 0);
        assert!(session.result().is_none());
    }

    #[test]
    fn start_rejects_mismatched_counts_and_duplicates() {
        let sink: Arc<RecordingSink> = Arc::new(RecordingSink::default());
        let deps = SessionDeps::new(FixedGrader::new(), sink);

        let err = Session::start(
            config(QuestionCounts::new(3, 0, 0), 45),
            vec![mcq("q1", "Mechanics", 0)],
            deps.clone(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));

        let err = Session::start(
            config(QuestionCounts::new(2, 0, 0), 45),
            vec![mcq("q1", "Mechanics", 0), mcq("q1", "Optics", 1)],
            deps.clone(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate question id"));

        assert!(Session::start(
            config(QuestionCounts::new(0, 0, 0), 45),
            vec![],
            deps.clone()
        )
        .is_err());

        assert!(Session::start(
            config(QuestionCounts::new(1, 0, 0), 0),
            vec![mcq("q1", "Mechanics", 0)],
            deps
        )
        .is_err());
    }

    #[test]
    fn go_to_out_of_bounds_keeps_position() {
        let mut session = two_mcq_session(Arc::new(RecordingSink::default()));
        session.go_to(1).unwrap();
        let err = session.go_to(2).unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(_)));
        assert_eq!(session.current_index(), 1);
        assert!(session.go_to(usize::MAX).is_err());
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn next_and_previous_clamp_at_the_ends() {
        let mut session = two_mcq_session(Arc::new(RecordingSink::default()));
        assert_eq!(session.previous_question().unwrap(), 0);
        assert_eq!(session.next_question().unwrap(), 1);
        assert_eq!(session.next_question().unwrap(), 1);
    }

    #[test]
    fn select_option_validates_bounds_and_kind() {
        let mut session = mixed_session(FixedGrader::new());
        assert!(matches!(
            session.select_option("q1", 4),
            Err(SessionError::InvalidInput(_))
        ));
        assert!(session.answer("q1").is_none());
        assert!(matches!(
            session.select_option("q6", 0),
            Err(SessionError::InvalidInput(_))
        ));
        assert!(matches!(
            session.select_option("nope", 0),
            Err(SessionError::InvalidInput(_))
        ));

        session.select_option("q1", 2).unwrap();
        session.select_option("q1", 3).unwrap();
        assert_eq!(session.answer("q1"), Some(&Answer::SelectedOption(3)));
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn text_and_image_replace_each_other() {
        let mut session = mixed_session(FixedGrader::new());
        session.set_text("q6", "waves add up").unwrap();
        session.set_image_ref("q6", ImageRef::new("blob:q6")).unwrap();
        assert_eq!(
            session.answer("q6"),
            Some(&Answer::Image(ImageRef::new("blob:q6")))
        );
        session.set_text("q6", "typed again").unwrap();
        assert_eq!(session.answer("q6"), Some(&Answer::Text("typed again".into())));
        assert_eq!(session.answered_count(), 1);

        assert!(matches!(
            session.set_text("q1", "not allowed"),
            Err(SessionError::InvalidInput(_))
        ));
    }

    #[test]
    fn blank_text_is_not_counted_as_answered() {
        let mut session = mixed_session(FixedGrader::new());
        session.set_text("q6", "   ").unwrap();
        assert_eq!(session.answered_count(), 0);
        assert_eq!(session.question_status(1), Some(QuestionStatus::Unanswered));
        session.set_text("q6", "something").unwrap();
        assert_eq!(session.question_status(0), Some(QuestionStatus::Current));
        assert_eq!(session.question_status(1), Some(QuestionStatus::Answered));
        assert_eq!(session.question_status(3), None);
    }

    #[tokio::test]
    async fn two_mcq_scenario_scores_half() {
        let sink = Arc::new(RecordingSink::default());
        let mut session = two_mcq_session(Arc::clone(&sink));
        session.select_option("q1", 0).unwrap();
        session.select_option("q2", 0).unwrap();

        let result = session.submit().await.unwrap();
        assert_eq!(result.score, 2);
        assert_eq!(result.total_marks, 4);
        assert_eq!(result.accuracy, 50);
        assert_eq!(result.submit_reason, SubmitReason::Manual);
        assert_eq!(
            result.topic_breakdown["Mechanics"],
            TopicScore {
                correct: 1,
                total: 2
            }
        );
        assert_eq!(result.weak_topics, vec!["Mechanics".to_string()]);
        assert_eq!(sink.results.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submit_is_idempotent() {
        let sink = Arc::new(RecordingSink::default());
        let mut session = two_mcq_session(Arc::clone(&sink));
        session.select_option("q1", 0).unwrap();

        let first = session.submit().await.unwrap();
        let second = session.submit().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(session.result(), Some(&first));
        assert_eq!(sink.results.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mutations_after_submit_are_rejected() {
        let mut session = mixed_session(FixedGrader::new());
        session.select_option("q1", 0).unwrap();
        let result = session.submit().await.unwrap();

        assert!(session.select_option("q1", 1).unwrap_err().is_state_error());
        assert!(session.set_text("q6", "late").unwrap_err().is_state_error());
        assert!(session
            .set_image_ref("q7", ImageRef::new("late.jpg"))
            .unwrap_err()
            .is_state_error());
        assert!(session.tick(1).await.unwrap_err().is_state_error());
        assert!(session.go_to(1).unwrap_err().is_state_error());

        assert_eq!(session.answer("q1"), Some(&Answer::SelectedOption(0)));
        assert!(session.answer("q6").is_none());
        assert_eq!(session.result(), Some(&result));
        assert_eq!(session.remaining_secs(), 45 * 60);
    }

    #[tokio::test]
    async fn expiry_submits_exactly_once() {
        let sink = Arc::new(RecordingSink::default());
        let observer = Arc::new(RecordingObserver::default());
        let mut session = Session::start(
            config(QuestionCounts::new(2, 0, 0), 1),
            vec![mcq("q1", "Mechanics", 0), mcq("q2", "Optics", 1)],
            SessionDeps::new(FixedGrader::new(), sink.clone()).with_observer(observer.clone()),
        )
        .unwrap();

        let mut expired = 0;
        for _ in 0..100 {
            match session.tick(1).await {
                Ok(TickOutcome::Running { .. }) => {}
                Ok(TickOutcome::Expired(_)) => expired += 1,
                Err(e) => assert!(e.is_state_error()),
            }
        }
        assert_eq!(expired, 1);
        assert_eq!(observer.submissions.load(Ordering::SeqCst), 1);
        assert_eq!(sink.results.lock().unwrap().len(), 1);
        assert_eq!(session.remaining_secs(), 0);
    }

    #[tokio::test]
    async fn unanswered_expiry_scores_zero_with_full_time() {
        let mut session = Session::start(
            config(QuestionCounts::new(2, 0, 0), 30),
            vec![mcq("q1", "Mechanics", 0), mcq("q2", "Optics", 1)],
            SessionDeps::new(FixedGrader::new(), Arc::new(RecordingSink::default())),
        )
        .unwrap();

        let outcome = session.tick(30 * 60 + 5).await.unwrap();
        let TickOutcome::Expired(result) = outcome else {
            panic!("expected the tick to expire the session");
        };
        assert_eq!(result.score, 0);
        assert_eq!(result.accuracy, 0);
        assert_eq!(result.time_taken_minutes, 30);
        assert_eq!(result.submit_reason, SubmitReason::TimeExpired);
        assert_eq!(result.weak_topics, vec!["Mechanics", "Optics"]);
    }

    #[tokio::test]
    async fn visibility_warnings_stop_after_submit() {
        let observer = Arc::new(RecordingObserver::default());
        let mut session = Session::start(
            config(QuestionCounts::new(2, 0, 0), 45),
            vec![mcq("q1", "Mechanics", 0), mcq("q2", "Optics", 1)],
            SessionDeps::new(FixedGrader::new(), Arc::new(RecordingSink::default()))
                .with_observer(observer.clone()),
        )
        .unwrap();

        for _ in 0..3 {
            assert!(session.visibility_changed(true).is_some());
        }
        assert!(session.visibility_changed(false).is_none());
        assert_eq!(session.integrity_warnings(), 3);

        let result = session.submit().await.unwrap();
        assert_eq!(result.integrity_warnings, 3);

        assert!(session.visibility_changed(true).is_none());
        assert_eq!(session.integrity_warnings(), 3);

        let warnings = observer.warnings.lock().unwrap();
        assert_eq!(
            warnings.iter().map(|w| (w.count, w.ceiling)).collect::<Vec<_>>(),
            vec![(1, 3), (2, 3), (3, 3)]
        );
    }

    #[tokio::test]
    async fn descriptive_answers_go_through_grader() {
        let grader = FixedGrader::new();
        let mut session = mixed_session(grader.clone());
        session.select_option("q1", 0).unwrap();
        session.set_image_ref("q6", ImageRef::new("blob:q6")).unwrap();
        session.set_text("q7", "T = 2π√(L/g)").unwrap();

        let result = session.submit().await.unwrap();
        assert_eq!(grader.calls.load(Ordering::SeqCst), 2);
        // 2 (MCQ) + 5 (image, full marks) + 3 (text on a 10-mark question)
        assert_eq!(result.score, 10);
        assert_eq!(result.total_marks, 17);
        assert_eq!(result.accuracy, 59);
        assert_eq!(
            result.topic_breakdown["Mechanics"],
            TopicScore {
                correct: 1,
                total: 2
            }
        );
        assert_eq!(
            result.topic_breakdown["Waves"],
            TopicScore {
                correct: 1,
                total: 1
            }
        );
    }

    #[tokio::test]
    async fn blank_descriptive_answers_skip_the_grader() {
        let grader = FixedGrader::new();
        let mut session = mixed_session(grader.clone());
        session.set_text("q6", "  ").unwrap();
        let result = session.submit().await.unwrap();
        assert_eq!(grader.calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.answered(), 0);
    }

    #[tokio::test]
    async fn grader_failure_awards_zero_but_still_submits() {
        let mut session = mixed_session(Arc::new(FailingGrader));
        session.select_option("q1", 0).unwrap();
        session.set_text("q6", "an answer").unwrap();
        let result = session.submit().await.unwrap();
        assert_eq!(result.score, 2);
        assert!(session.is_submitted());
    }

    #[tokio::test]
    async fn scorer_rejects_active_session() {
        let session = two_mcq_session(Arc::new(RecordingSink::default()));
        let scorer = Scorer::new(FixedGrader::new());
        let err = scorer.score(&session).await.unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidState {
                operation: "score",
                state: SessionState::Active
            }
        );
    }

    #[tokio::test]
    async fn scorer_refuses_to_rescore_submitted_session() {
        let sink = Arc::new(RecordingSink::default());
        let mut session = two_mcq_session(sink.clone());
        session.select_option("q1", 0).unwrap();
        let first = session.submit().await.unwrap();

        let scorer = Scorer::new(FixedGrader::new());
        let err = scorer.score(&session).await.unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidState {
                operation: "score",
                state: SessionState::Submitted
            }
        );
        assert_eq!(session.submit().await.unwrap().id, first.id);
        assert_eq!(sink.results.lock().unwrap().len(), 1);
    }
}
