use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A multiple-choice question as authored.
///
/// `correct_index` is not checked against `options` here; a question whose
/// index points past its options simply never awards credit.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Question {
    #[serde(alias = "question")]
    pub text: String,
    pub options: Vec<String>,
    #[serde(alias = "correct")]
    pub correct_index: usize,
}

impl Question {
    pub fn new(text: &str, options: &[&str], correct_index: usize) -> Self {
        Question {
            text: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_index,
        }
    }

    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_index && option_index < self.options.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TestDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(
        default,
        alias = "duration",
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_minutes: Option<u32>,
    #[serde(
        default,
        alias = "minQuestions",
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_questions: Option<u32>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(alias = "createdBy")]
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TestDefinition {
    /// Number of questions each participant is shown, clamped to what was authored.
    pub fn questions_per_attempt(&self) -> usize {
        let authored = self.questions.len();
        match self.min_questions {
            Some(n) => (n as usize).min(authored),
            None => authored,
        }
    }

    pub fn time_budget_seconds(&self, default_minutes: u32) -> u32 {
        self.duration_minutes
            .unwrap_or(default_minutes)
            .saturating_mul(60)
    }
}

/// Accepts a count stored either as a number or as a numeric string.
/// Anything else (negative, fractional, free text, null) reads as absent.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(min_questions: Option<u32>, authored: usize) -> TestDefinition {
        TestDefinition {
            id: "t1".to_string(),
            title: "Rust basics".to_string(),
            description: String::new(),
            duration_minutes: Some(5),
            min_questions,
            questions: (0..authored)
                .map(|i| Question::new(&format!("Q{}", i + 1), &["a", "b"], 0))
                .collect(),
            created_by: "owner-1".to_string(),
            created_at: None,
        }
    }

    #[test]
    fn questions_per_attempt_clamps_to_authored_count() {
        assert_eq!(definition(Some(2), 3).questions_per_attempt(), 2);
        assert_eq!(definition(Some(7), 3).questions_per_attempt(), 3);
        assert_eq!(definition(Some(0), 3).questions_per_attempt(), 0);
        assert_eq!(definition(None, 4).questions_per_attempt(), 4);
    }

    #[test]
    fn time_budget_falls_back_to_default_minutes() {
        let mut def = definition(None, 1);
        assert_eq!(def.time_budget_seconds(10), 300);

        def.duration_minutes = None;
        assert_eq!(def.time_budget_seconds(10), 600);
    }

    #[test]
    fn deserializes_counts_stored_as_strings() {
        let def: TestDefinition = serde_json::from_value(json!({
            "id": "t1",
            "title": "Stored by the web form",
            "description": "",
            "duration": "15",
            "minQuestions": 2,
            "questions": [
                { "question": "2 + 2?", "options": ["3", "4"], "correct": 1 }
            ],
            "createdBy": "uid-9"
        }))
        .expect("legacy shape should deserialize");

        assert_eq!(def.duration_minutes, Some(15));
        assert_eq!(def.min_questions, Some(2));
        assert_eq!(def.questions[0].text, "2 + 2?");
        assert_eq!(def.questions[0].correct_index, 1);
        assert_eq!(def.created_by, "uid-9");
    }

    #[test]
    fn non_numeric_duration_reads_as_absent() {
        let def: TestDefinition = serde_json::from_value(json!({
            "id": "t1",
            "title": "t",
            "duration_minutes": "soon",
            "min_questions": -3,
            "created_by": "o"
        }))
        .expect("definition should deserialize");

        assert_eq!(def.duration_minutes, None);
        assert_eq!(def.min_questions, None);
        assert!(def.questions.is_empty());
    }

    #[test]
    fn out_of_range_correct_index_never_matches() {
        let q = Question::new("Pick", &["a", "b"], 5);
        assert!(!q.is_correct(5));
        assert!(!q.is_correct(0));
    }
}
