//! Fixed-credit grader used when no grading service is configured.

use async_trait::async_trait;

use examshield_core::model::Answer;
use examshield_core::traits::{DescriptiveGrade, DescriptiveGrader, GradeRequest};

/// Marks awarded to any non-empty typed answer.
pub const TEXT_CREDIT: u32 = 3;
/// Marks awarded to any uploaded image.
pub const IMAGE_CREDIT: u32 = 5;

/// Awards flat partial credit without reading the answer.
///
/// Credit is capped at the question's marks. An answer only counts as
/// correct when the credit reaches full marks.
#[derive(Debug, Clone)]
pub struct PlaceholderGrader {
    text_credit: u32,
    image_credit: u32,
}

impl Default for PlaceholderGrader {
    fn default() -> Self {
        Self::new(TEXT_CREDIT, IMAGE_CREDIT)
    }
}

impl PlaceholderGrader {
    pub fn new(text_credit: u32, image_credit: u32) -> Self {
        Self {
            text_credit,
            image_credit,
        }
    }
}

#[async_trait]
impl DescriptiveGrader for PlaceholderGrader {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn grade(&self, request: &GradeRequest) -> anyhow::Result<DescriptiveGrade> {
        let credit = match &request.answer {
            Answer::Text(_) => self.text_credit,
            Answer::Image(_) => self.image_credit,
            Answer::SelectedOption(_) => {
                anyhow::bail!("question {} is not descriptive", request.question_id)
            }
        };
        let awarded_marks = credit.min(request.marks);
        Ok(DescriptiveGrade {
            awarded_marks,
            correct: awarded_marks == request.marks,
            feedback: None,
        })
    }
}
