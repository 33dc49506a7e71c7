use std::collections::BTreeMap;

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        result_record::{score_answers, ANONYMOUS_PARTICIPANT},
        Identity, Question, ResultRecord, TestDefinition,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Phase {
    NotStarted,
    InProgress,
    Submitted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is not running; nothing changed.
    Idle,
    Running { remaining_seconds: u32 },
    /// The countdown hit zero on this tick and the session must be submitted.
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteStatus {
    Pending,
    Persisted,
    /// The store already held a result for this participant and test.
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub record: ResultRecord,
    pub status: WriteStatus,
}

/// One participant's pass through a test, held in memory until its result is written.
#[derive(Clone, Debug)]
pub struct AttemptSession {
    definition: TestDefinition,
    participant_key: String,
    participant_label: String,
    selected_questions: Vec<Question>,
    remaining_seconds: u32,
    answers: BTreeMap<usize, usize>,
    phase: Phase,
    submission: Option<Submission>,
    default_duration_minutes: u32,
}

impl AttemptSession {
    pub fn new(
        definition: TestDefinition,
        identity: Option<&Identity>,
        default_duration_minutes: u32,
    ) -> Self {
        let (participant_key, participant_label) = match identity {
            Some(identity) => (identity.key.clone(), identity.display_label.clone()),
            None => (
                ANONYMOUS_PARTICIPANT.to_string(),
                ANONYMOUS_PARTICIPANT.to_string(),
            ),
        };

        AttemptSession {
            definition,
            participant_key,
            participant_label,
            selected_questions: Vec::new(),
            remaining_seconds: 0,
            answers: BTreeMap::new(),
            phase: Phase::NotStarted,
            submission: None,
            default_duration_minutes,
        }
    }

    pub fn definition(&self) -> &TestDefinition {
        &self.definition
    }

    pub fn test_id(&self) -> &str {
        &self.definition.id
    }

    pub fn participant_key(&self) -> &str {
        &self.participant_key
    }

    pub fn participant_label(&self) -> &str {
        &self.participant_label
    }

    pub fn selected_questions(&self) -> &[Question] {
        &self.selected_questions
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    /// True once the result has been written or definitively refused by the store.
    pub fn is_settled(&self) -> bool {
        matches!(
            self.submission.as_ref().map(|s| s.status),
            Some(WriteStatus::Persisted) | Some(WriteStatus::Rejected)
        )
    }

    /// Countdown as `m:ss`.
    pub fn remaining_display(&self) -> String {
        format!(
            "{}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }

    pub fn start<R>(&mut self, participant_label: &str, rng: &mut R) -> AppResult<()>
    where
        R: Rng + ?Sized,
    {
        if self.phase != Phase::NotStarted {
            return Err(AppError::InvalidState(format!(
                "attempt is already {:?}",
                self.phase
            )));
        }

        let label = participant_label.trim();
        if label.is_empty() {
            return Err(AppError::ValidationError(
                "Please enter your name before starting".to_string(),
            ));
        }

        // Partial Fisher-Yates: the first `n` slots are a uniform random ordered sample.
        let take = self.definition.questions_per_attempt();
        let mut pool = self.definition.questions.clone();
        let (picked, _) = pool.partial_shuffle(rng, take);

        self.selected_questions = picked.to_vec();
        self.participant_label = label.to_string();
        self.remaining_seconds = self
            .definition
            .time_budget_seconds(self.default_duration_minutes);
        self.phase = Phase::InProgress;
        Ok(())
    }

    pub fn answer(&mut self, position: usize, option: usize) -> AppResult<()> {
        if self.phase != Phase::InProgress {
            return Err(AppError::InvalidState(
                "answers are only accepted while the attempt is running".to_string(),
            ));
        }

        let question = self.selected_questions.get(position).ok_or_else(|| {
            AppError::ValidationError(format!("there is no question {}", position + 1))
        })?;

        if option >= question.options.len() {
            return Err(AppError::ValidationError(format!(
                "question {} has no option {}",
                position + 1,
                option + 1
            )));
        }

        self.answers.insert(position, option);
        Ok(())
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::InProgress {
            return TickOutcome::Idle;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            TickOutcome::Expired
        } else {
            TickOutcome::Running {
                remaining_seconds: self.remaining_seconds,
            }
        }
    }

    pub fn score(&self) -> u32 {
        score_answers(&self.selected_questions, &self.answers)
    }

    /// Moves `InProgress` to `Submitted` and returns the record to write.
    ///
    /// Only the first call while running yields a record; every later call,
    /// and any call before start, returns `None`.
    pub fn seal(&mut self, submitted_at_epoch_millis: i64) -> Option<ResultRecord> {
        if self.phase != Phase::InProgress {
            return None;
        }
        self.phase = Phase::Submitted;

        let record = ResultRecord {
            id: ResultRecord::record_id_for(&self.definition.id, &self.participant_key),
            participant_key: self.participant_key.clone(),
            participant_label: self.participant_label.clone(),
            test_id: self.definition.id.clone(),
            score: self.score(),
            total: self.selected_questions.len() as u32,
            answers: self.answers.clone(),
            questions: self.selected_questions.clone(),
            submitted_at_epoch_millis,
        };

        self.submission = Some(Submission {
            record: record.clone(),
            status: WriteStatus::Pending,
        });
        Some(record)
    }

    pub(crate) fn set_write_status(&mut self, status: WriteStatus) {
        if let Some(submission) = self.submission.as_mut() {
            submission.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn started(definition: TestDefinition) -> AttemptSession {
        let mut session = AttemptSession::new(definition, None, 10);
        session
            .start("Alice", &mut StdRng::seed_from_u64(7))
            .expect("start should succeed");
        session
    }

    #[test]
    fn start_rejects_blank_names_without_changing_phase() {
        let mut session = AttemptSession::new(three_question_test(), None, 10);
        let result = session.start("   ", &mut StdRng::seed_from_u64(1));

        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert_eq!(session.phase(), Phase::NotStarted);
        assert!(session.selected_questions().is_empty());
    }

    #[test]
    fn start_trims_label_and_sets_budget() {
        let mut session = AttemptSession::new(three_question_test(), None, 10);
        session
            .start("  Alice  ", &mut StdRng::seed_from_u64(1))
            .unwrap();

        assert_eq!(session.participant_label(), "Alice");
        assert_eq!(session.participant_key(), ANONYMOUS_PARTICIPANT);
        assert_eq!(session.remaining_seconds(), 60);
        assert_eq!(session.selected_questions().len(), 2);
        assert_eq!(session.phase(), Phase::InProgress);
    }

    #[test]
    fn start_twice_is_an_invalid_state() {
        let mut session = started(three_question_test());
        let again = session.start("Bob", &mut StdRng::seed_from_u64(2));

        assert!(matches!(again, Err(AppError::InvalidState(_))));
        assert_eq!(session.participant_label(), "Alice");
    }

    #[test]
    fn missing_duration_uses_default() {
        let mut definition = three_question_test();
        definition.duration_minutes = None;
        let session = started(definition);

        assert_eq!(session.remaining_seconds(), 600);
    }

    #[test]
    fn selection_is_clamped_and_drawn_from_authored_questions() {
        let mut definition = three_question_test();
        definition.min_questions = Some(10);
        let session = started(definition.clone());

        assert_eq!(session.selected_questions().len(), 3);
        for question in session.selected_questions() {
            assert!(definition.questions.contains(question));
        }
    }

    #[test]
    fn answer_validates_bounds_and_overwrites() {
        let mut session = started(three_question_test());

        assert!(matches!(
            session.answer(2, 0),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            session.answer(0, 3),
            Err(AppError::ValidationError(_))
        ));

        session.answer(0, 1).unwrap();
        session.answer(0, 2).unwrap();
        assert_eq!(session.answers().get(&0), Some(&2));
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn answer_before_start_is_rejected() {
        let mut session = AttemptSession::new(three_question_test(), None, 10);
        assert!(matches!(
            session.answer(0, 0),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn tick_counts_down_to_expiry() {
        let mut session = started(three_question_test());

        for expected in (1..60).rev() {
            assert_eq!(
                session.tick(),
                TickOutcome::Running {
                    remaining_seconds: expected
                }
            );
        }
        assert_eq!(session.tick(), TickOutcome::Expired);
        assert_eq!(session.remaining_seconds(), 0);
    }

    #[test]
    fn tick_after_submission_changes_nothing() {
        let mut session = started(three_question_test());
        session.tick();
        session.seal(1_700_000_000_000).unwrap();

        let before = session.remaining_seconds();
        assert_eq!(session.tick(), TickOutcome::Idle);
        assert_eq!(session.remaining_seconds(), before);
    }

    #[test]
    fn tick_before_start_is_idle() {
        let mut session = AttemptSession::new(three_question_test(), None, 10);
        assert_eq!(session.tick(), TickOutcome::Idle);
    }

    #[test]
    fn seal_yields_record_exactly_once() {
        let mut session = started(three_question_test());
        let correct = session.selected_questions()[0].correct_index;
        session.answer(0, correct).unwrap();

        let record = session.seal(42).expect("first seal yields a record");
        assert_eq!(record.score, 1);
        assert_eq!(record.total, 2);
        assert_eq!(record.submitted_at_epoch_millis, 42);
        assert_eq!(record.questions, session.selected_questions().to_vec());
        assert_eq!(session.phase(), Phase::Submitted);

        assert!(session.seal(43).is_none());
        assert_eq!(
            session.submission().map(|s| s.status),
            Some(WriteStatus::Pending)
        );
    }

    #[test]
    fn seal_before_start_is_a_no_op() {
        let mut session = AttemptSession::new(three_question_test(), None, 10);
        assert!(session.seal(1).is_none());
        assert_eq!(session.phase(), Phase::NotStarted);
    }

    #[test]
    fn identified_session_carries_identity_into_record() {
        let identity = Identity::new("u1", "Alice A.");
        let mut session = AttemptSession::new(three_question_test(), Some(&identity), 10);
        session
            .start(&identity.display_label, &mut StdRng::seed_from_u64(3))
            .unwrap();

        let record = session.seal(1).unwrap();
        assert_eq!(record.participant_key, "u1");
        assert_eq!(record.participant_label, "Alice A.");
        assert_eq!(record.id, "t1:u1");
    }

    #[test]
    fn remaining_display_pads_seconds() {
        let mut session = started(three_question_test());
        assert_eq!(session.remaining_display(), "1:00");
        session.tick();
        assert_eq!(session.remaining_display(), "0:59");
    }
}
