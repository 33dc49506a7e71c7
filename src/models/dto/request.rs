use std::borrow::Cow;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::{Question, TestDefinition};

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_min_questions"))]
pub struct CreateTestRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,

    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: u32,

    pub min_questions: Option<u32>,

    #[validate(length(min = 1, message = "A test needs at least one question"))]
    #[validate(nested)]
    pub questions: Vec<QuestionInput>,
}

pub type UpdateTestRequest = CreateTestRequest;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_correct_index"))]
pub struct QuestionInput {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,

    #[validate(custom(function = "validate_options"))]
    pub options: Vec<String>,

    pub correct_index: usize,
}

impl From<QuestionInput> for Question {
    fn from(input: QuestionInput) -> Self {
        Question {
            text: input.text,
            options: input.options,
            correct_index: input.correct_index,
        }
    }
}

impl CreateTestRequest {
    pub fn into_definition(self, id: &str, created_by: &str) -> TestDefinition {
        TestDefinition {
            id: id.to_string(),
            title: self.title,
            description: self.description,
            duration_minutes: Some(self.duration_minutes),
            min_questions: self.min_questions,
            questions: self.questions.into_iter().map(Question::from).collect(),
            created_by: created_by.to_string(),
            created_at: Some(Utc::now()),
        }
    }
}

fn validate_min_questions(request: &CreateTestRequest) -> Result<(), ValidationError> {
    match request.min_questions {
        Some(n) if n as usize > request.questions.len() => Err(ValidationError::new(
            "min_questions_exceeds_total",
        )
        .with_message(Cow::Borrowed(
            "Minimum questions cannot be more than total questions",
        ))),
        _ => Ok(()),
    }
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() < 2 {
        return Err(ValidationError::new("too_few_options")
            .with_message(Cow::Borrowed("A question needs at least two options")));
    }
    if options.iter().any(|o| o.trim().is_empty()) {
        return Err(ValidationError::new("empty_option")
            .with_message(Cow::Borrowed("Options must not be blank")));
    }
    Ok(())
}

fn validate_correct_index(input: &QuestionInput) -> Result<(), ValidationError> {
    if input.correct_index >= input.options.len() {
        return Err(ValidationError::new("correct_index_out_of_range")
            .with_message(Cow::Borrowed("The correct answer must be one of the options")));
    }
    Ok(())
}
