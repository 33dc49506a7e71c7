use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Identity, Survey, SurveyQuestion, SurveyQuestionKind, SurveyResponse},
        dto::response::{round_one_decimal, OptionTally, QuestionStats},
    },
    repositories::{SurveyRepository, SurveyResponseRepository},
};

/// A survey as produced by the text generator, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSurvey {
    pub title: String,
    pub questions: Vec<SurveyQuestion>,
}

#[derive(Deserialize)]
struct GeneratedEnvelope {
    survey: RawSurvey,
}

#[derive(Deserialize)]
struct RawSurvey {
    #[serde(default)]
    title: String,
    questions: Vec<RawQuestion>,
}

/// Unlike a stored `SurveyQuestion`, generator output must spell out `options`.
#[derive(Deserialize)]
struct RawQuestion {
    question: String,
    #[serde(rename = "type")]
    kind: SurveyQuestionKind,
    options: Vec<String>,
}

/// Pulls the survey JSON out of free-form generator output.
///
/// The generator tends to wrap its JSON in prose or code fences, so only the
/// span from the first `{` to the last `}` is parsed. Every question needs an
/// `options` array with at least one entry; short-answer questions are not
/// accepted from the generator.
pub fn parse_generated_survey(raw_text: &str) -> AppResult<GeneratedSurvey> {
    let (Some(start), Some(end)) = (raw_text.find('{'), raw_text.rfind('}')) else {
        return Err(AppError::ValidationError(
            "generator output contains no JSON object".to_string(),
        ));
    };
    if end < start {
        return Err(AppError::ValidationError(
            "generator output contains no JSON object".to_string(),
        ));
    }

    let envelope: GeneratedEnvelope = serde_json::from_str(&raw_text[start..=end])?;
    let raw = envelope.survey;

    let mut questions = Vec::with_capacity(raw.questions.len());
    for (position, q) in raw.questions.into_iter().enumerate() {
        if q.kind == SurveyQuestionKind::ShortAnswer {
            return Err(AppError::ValidationError(format!(
                "question {} is short_answer, which generated surveys may not use",
                position + 1
            )));
        }
        if q.options.is_empty() {
            return Err(AppError::ValidationError(format!(
                "question {} has no options",
                position + 1
            )));
        }
        questions.push(SurveyQuestion {
            question: q.question,
            kind: q.kind,
            options: q.options,
        });
    }

    Ok(GeneratedSurvey {
        title: raw.title,
        questions,
    })
}

pub struct SurveyService {
    surveys: Arc<dyn SurveyRepository>,
    responses: Arc<dyn SurveyResponseRepository>,
}

impl SurveyService {
    pub fn new(
        surveys: Arc<dyn SurveyRepository>,
        responses: Arc<dyn SurveyResponseRepository>,
    ) -> Self {
        Self { surveys, responses }
    }

    pub async fn create_survey(
        &self,
        owner: &Identity,
        generated: GeneratedSurvey,
    ) -> AppResult<Survey> {
        if generated.title.trim().is_empty() {
            return Err(AppError::ValidationError(
                "survey title must not be empty".to_string(),
            ));
        }
        if generated.questions.is_empty() {
            return Err(AppError::ValidationError(
                "a survey needs at least one question".to_string(),
            ));
        }

        let survey = Survey {
            id: Uuid::new_v4().to_string(),
            title: generated.title,
            created_by: owner.key.clone(),
            questions: generated.questions,
            created_at: Some(Utc::now()),
        };

        let created = self.surveys.create(survey).await?;
        log::info!("'{}' created survey '{}'", owner.key, created.id);
        Ok(created)
    }

    pub async fn get_survey(&self, id: &str) -> AppResult<Survey> {
        self.surveys
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Survey with id '{}' not found", id)))
    }

    pub async fn submit_response(
        &self,
        survey_id: &str,
        answers: BTreeMap<usize, String>,
    ) -> AppResult<SurveyResponse> {
        let survey = self.get_survey(survey_id).await?;

        if let Some(position) = answers.keys().find(|p| **p >= survey.questions.len()) {
            return Err(AppError::ValidationError(format!(
                "survey has no question {}",
                position + 1
            )));
        }

        let response = SurveyResponse {
            id: Uuid::new_v4().to_string(),
            survey_id: survey.id,
            answers,
            submitted_at: Utc::now(),
        };

        self.responses.append(response).await
    }

    /// Per-option counts for every question answered by picking an option.
    /// Answers that match none of the listed options are not counted.
    pub async fn option_stats(&self, survey_id: &str) -> AppResult<Vec<QuestionStats>> {
        let survey = self.get_survey(survey_id).await?;
        let responses = self.responses.list_by_survey(survey_id).await?;
        let denominator = responses.len().max(1) as f64;

        let stats = survey
            .questions
            .iter()
            .enumerate()
            .filter(|(_, q)| q.kind.has_options())
            .map(|(position, question)| {
                let tallies = question
                    .options
                    .iter()
                    .map(|option| {
                        let count = responses
                            .iter()
                            .filter(|r| r.answers.get(&position) == Some(option))
                            .count();
                        OptionTally {
                            option: option.clone(),
                            count,
                            percentage: round_one_decimal(count as f64 / denominator * 100.0),
                        }
                    })
                    .collect();

                QuestionStats {
                    position,
                    question: question.question.clone(),
                    responses: responses.len(),
                    tallies,
                }
            })
            .collect();

        Ok(stats)
    }
}
