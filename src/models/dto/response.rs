use serde::Serialize;

use crate::models::domain::ResultRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub attempts: usize,
    pub average_score: f64,
    pub best_score: u32,
}

impl ResultSummary {
    pub fn from_records(records: &[ResultRecord]) -> Self {
        if records.is_empty() {
            return ResultSummary {
                attempts: 0,
                average_score: 0.0,
                best_score: 0,
            };
        }

        let total: u64 = records.iter().map(|r| r.score as u64).sum();
        ResultSummary {
            attempts: records.len(),
            average_score: round_one_decimal(total as f64 / records.len() as f64),
            best_score: records.iter().map(|r| r.score).max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResultsResponse {
    pub test_id: String,
    pub title: String,
    pub summary: ResultSummary,
    pub results: Vec<ResultRecord>,
}

/// One line of a participant's attempt history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendedTest {
    pub test_id: String,
    pub title: String,
    pub score: u32,
    pub total: u32,
    pub submitted_at_epoch_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionTally {
    pub option: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionStats {
    pub position: usize,
    pub question: String,
    pub responses: usize,
    pub tallies: Vec<OptionTally>,
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
