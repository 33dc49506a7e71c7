use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::position_keys;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyQuestionKind {
    MultipleChoice,
    RatingScale,
    ShortAnswer,
}

impl SurveyQuestionKind {
    /// Whether answers are picked from `options` and can be tallied.
    pub fn has_options(&self) -> bool {
        !matches!(self, SurveyQuestionKind::ShortAnswer)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SurveyQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: SurveyQuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Survey {
    pub id: String,
    pub title: String,
    pub created_by: String,
    pub questions: Vec<SurveyQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One participant's answers, keyed by question position.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SurveyResponse {
    pub id: String,
    pub survey_id: String,
    #[serde(with = "position_keys")]
    pub answers: BTreeMap<usize, String>,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_kind_uses_snake_case_names() {
        let q: SurveyQuestion = serde_json::from_str(
            r#"{"question": "How was it?", "type": "rating_scale", "options": ["1", "2", "3"]}"#,
        )
        .expect("question should deserialize");

        assert_eq!(q.kind, SurveyQuestionKind::RatingScale);
        assert!(q.kind.has_options());
    }

    #[test]
    fn short_answer_has_no_options() {
        let q: SurveyQuestion =
            serde_json::from_str(r#"{"question": "Anything else?", "type": "short_answer"}"#)
                .expect("question should deserialize");

        assert!(q.options.is_empty());
        assert!(!q.kind.has_options());
    }

    #[test]
    fn unknown_question_kind_is_rejected() {
        let parsed = serde_json::from_str::<SurveyQuestion>(
            r#"{"question": "Essay", "type": "essay", "options": []}"#,
        );
        assert!(parsed.is_err());
    }
}
