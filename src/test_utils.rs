#[cfg(test)]
pub mod fixtures {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use crate::models::domain::{Identity, Question, ResultRecord, TestDefinition};

    pub const OWNER_KEY: &str = "owner-1";

    /// One minute, two of three questions shown; question N has correct option N-1.
    pub fn three_question_test() -> TestDefinition {
        TestDefinition {
            id: "t1".to_string(),
            title: "Rust basics".to_string(),
            description: "Ownership and borrowing".to_string(),
            duration_minutes: Some(1),
            min_questions: Some(2),
            questions: vec![
                Question::new("Q1", &["a", "b", "c"], 0),
                Question::new("Q2", &["a", "b", "c"], 1),
                Question::new("Q3", &["a", "b", "c"], 2),
            ],
            created_by: OWNER_KEY.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single(),
        }
    }

    pub fn owner_identity() -> Identity {
        Identity::new(OWNER_KEY, "Test Owner")
    }

    pub fn stored_result(test_id: &str, participant_key: &str, score: u32) -> ResultRecord {
        ResultRecord {
            id: ResultRecord::record_id_for(test_id, participant_key),
            participant_key: participant_key.to_string(),
            participant_label: participant_key.to_string(),
            test_id: test_id.to_string(),
            score,
            total: 2,
            answers: BTreeMap::from([(0, 0), (1, 1)]),
            questions: vec![],
            submitted_at_epoch_millis: 1_700_000_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_fixture_test_definition() {
        let test = three_question_test();
        assert_eq!(test.questions.len(), 3);
        assert_eq!(test.questions_per_attempt(), 2);
        assert_eq!(test.created_by, OWNER_KEY);
    }

    #[test]
    fn test_fixture_stored_result() {
        let result = stored_result("t1", "u1", 2);
        assert_eq!(result.id, "t1:u1");
        assert_eq!(result.answers.len(), 2);
    }
}
