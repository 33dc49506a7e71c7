use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{position_keys, Question};

/// Participant key recorded when no identity provider supplied one.
pub const ANONYMOUS_PARTICIPANT: &str = "anonymous";

fn anonymous() -> String {
    ANONYMOUS_PARTICIPANT.to_string()
}

/// The scored outcome of one attempt. Written once, never updated.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResultRecord {
    pub id: String,
    #[serde(default = "anonymous")]
    pub participant_key: String,
    #[serde(default = "anonymous")]
    pub participant_label: String,
    pub test_id: String,
    pub score: u32,
    pub total: u32,
    #[serde(with = "position_keys")]
    pub answers: BTreeMap<usize, usize>,
    #[serde(default)]
    pub questions: Vec<Question>,
    pub submitted_at_epoch_millis: i64,
}

impl ResultRecord {
    /// Identified participants get one stable id per test so the store's unique
    /// index turns a second submission into a duplicate-key rejection.
    /// Anonymous submissions are never deduplicated.
    pub fn record_id_for(test_id: &str, participant_key: &str) -> String {
        if participant_key == ANONYMOUS_PARTICIPANT {
            Uuid::new_v4().to_string()
        } else {
            format!(
                "{}:{}",
                escape_id_part(test_id),
                escape_id_part(participant_key)
            )
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.participant_key == ANONYMOUS_PARTICIPANT
    }
}

/// Percent-escapes `%` and `:` so the joined id splits back unambiguously.
fn escape_id_part(part: &str) -> String {
    part.replace('%', "%25").replace(':', "%3A")
}

/// Counts positions whose recorded option is the question's correct one.
/// Unanswered positions never count.
pub fn score_answers(questions: &[Question], answers: &BTreeMap<usize, usize>) -> u32 {
    questions
        .iter()
        .enumerate()
        .filter(|(position, question)| {
            answers
                .get(position)
                .is_some_and(|option| question.is_correct(*option))
        })
        .count() as u32
}
