//! Mock grader for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use examshield_core::traits::{DescriptiveGrade, DescriptiveGrader, GradeRequest};

/// Grades from a table keyed by question id, recording every request.
///
/// Questions missing from the table get `default_marks`. Ids listed with
/// [`MockGrader::failing_on`] return an error instead.
pub struct MockGrader {
    marks: HashMap<String, u32>,
    default_marks: u32,
    failing: Vec<String>,
    call_count: AtomicU32,
    requests: Mutex<Vec<GradeRequest>>,
}

impl MockGrader {
    pub fn new(marks: HashMap<String, u32>) -> Self {
        Self {
            marks,
            default_marks: 0,
            failing: Vec::new(),
            call_count: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A mock that awards the same marks to every answer.
    pub fn with_fixed_marks(marks: u32) -> Self {
        Self {
            default_marks: marks,
            ..Self::new(HashMap::new())
        }
    }

    pub fn failing_on(mut self, question_id: impl Into<String>) -> Self {
        self.failing.push(question_id.into());
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<GradeRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DescriptiveGrader for MockGrader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn grade(&self, request: &GradeRequest) -> anyhow::Result<DescriptiveGrade> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if self.failing.contains(&request.question_id) {
            anyhow::bail!("mock failure for {}", request.question_id);
        }

        let awarded_marks = self
            .marks
            .get(&request.question_id)
            .copied()
            .unwrap_or(self.default_marks)
            .min(request.marks);
        Ok(DescriptiveGrade {
            awarded_marks,
            correct: awarded_marks == request.marks,
            feedback: Some(format!("mock: {awarded_marks}/{}", request.marks)),
        })
    }
}
