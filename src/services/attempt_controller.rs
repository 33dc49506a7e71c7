use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use crate::{
    auth::IdentityProvider,
    config::DEFAULT_DURATION_MINUTES,
    errors::{AppError, AppResult},
    models::domain::{
        AttemptSession, Identity, ResultRecord, TestDefinition, TickOutcome, WriteStatus,
    },
    repositories::{ResultRepository, TestRepository},
};

/// Drives attempts against the definition and result stores.
///
/// The controller holds no per-attempt state; every operation takes the
/// `AttemptSession` it acts on.
pub struct AttemptController {
    tests: Arc<dyn TestRepository>,
    results: Arc<dyn ResultRepository>,
    identity: Option<Arc<dyn IdentityProvider>>,
    default_duration_minutes: u32,
}

impl AttemptController {
    pub fn new(tests: Arc<dyn TestRepository>, results: Arc<dyn ResultRepository>) -> Self {
        Self {
            tests,
            results,
            identity: None,
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
        }
    }

    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(provider);
        self
    }

    pub fn with_default_duration(mut self, minutes: u32) -> Self {
        self.default_duration_minutes = minutes;
        self
    }

    pub async fn load(&self, test_id: &str) -> AppResult<TestDefinition> {
        let definition = self
            .tests
            .find_by_id(test_id)
            .await
            .map_err(|e| {
                log::error!("Could not load test '{}': {}", test_id, e);
                AppError::DefinitionNotFound(format!("cannot load test '{}'", test_id))
            })?
            .ok_or_else(|| AppError::DefinitionNotFound(test_id.to_string()))?;

        Ok(definition)
    }

    /// Refuses entry when the store already holds a result from this participant.
    ///
    /// This is read-then-act and can be raced by two sessions opened together;
    /// the unique record id makes the later write fail in that case.
    pub async fn gate_entry(&self, test_id: &str, identity: &Identity) -> AppResult<()> {
        let existing = self.results.list_by_test(test_id).await?;

        if existing.iter().any(|r| r.participant_key == identity.key) {
            log::info!(
                "Participant '{}' already attempted test '{}'",
                identity.key,
                test_id
            );
            return Err(AppError::AlreadyAttempted(format!(
                "you have already taken test '{}'",
                test_id
            )));
        }
        Ok(())
    }

    /// Loads the test, applies the entry gate when an identity is available,
    /// and returns a session ready to start.
    pub async fn open(&self, test_id: &str) -> AppResult<AttemptSession> {
        let definition = self.load(test_id).await?;

        let identity = self
            .identity
            .as_ref()
            .and_then(|provider| provider.current_identity());

        if let Some(identity) = identity.as_ref() {
            self.gate_entry(test_id, identity).await?;
        }

        Ok(AttemptSession::new(
            definition,
            identity.as_ref(),
            self.default_duration_minutes,
        ))
    }

    pub fn start(&self, session: &mut AttemptSession, participant_label: &str) -> AppResult<()> {
        self.start_with_rng(session, participant_label, &mut rand::thread_rng())
    }

    pub fn start_with_rng<R>(
        &self,
        session: &mut AttemptSession,
        participant_label: &str,
        rng: &mut R,
    ) -> AppResult<()>
    where
        R: Rng + ?Sized,
    {
        session.start(participant_label, rng)?;
        log::info!(
            "'{}' started test '{}' with {} questions and {}s on the clock",
            session.participant_label(),
            session.test_id(),
            session.selected_questions().len(),
            session.remaining_seconds()
        );
        Ok(())
    }

    pub fn answer(
        &self,
        session: &mut AttemptSession,
        position: usize,
        option: usize,
    ) -> AppResult<()> {
        session.answer(position, option)
    }

    /// Advances the countdown by one second. On expiry the attempt is
    /// submitted and the written record returned.
    pub async fn tick(&self, session: &mut AttemptSession) -> AppResult<Option<ResultRecord>> {
        match session.tick() {
            TickOutcome::Expired => {
                log::info!("Time is up on test '{}', submitting", session.test_id());
                self.submit(session).await
            }
            TickOutcome::Idle | TickOutcome::Running { .. } => Ok(None),
        }
    }

    /// Scores and writes the attempt. Returns `None` when the session was not
    /// running, which makes repeated triggers harmless.
    pub async fn submit(&self, session: &mut AttemptSession) -> AppResult<Option<ResultRecord>> {
        let Some(record) = session.seal(Utc::now().timestamp_millis()) else {
            log::debug!("Ignoring submit for test '{}': not running", session.test_id());
            return Ok(None);
        };

        match self.results.append(record.clone()).await {
            Ok(id) => {
                session.set_write_status(WriteStatus::Persisted);
                log::info!(
                    "Stored result '{}' for test '{}': {}/{}",
                    id,
                    record.test_id,
                    record.score,
                    record.total
                );
                Ok(Some(record))
            }
            Err(AppError::AlreadyExists(_)) => {
                session.set_write_status(WriteStatus::Rejected);
                log::warn!(
                    "Participant '{}' already has a result for test '{}'",
                    record.participant_key,
                    record.test_id
                );
                Err(AppError::AlreadyAttempted(format!(
                    "a result for test '{}' was already submitted",
                    record.test_id
                )))
            }
            Err(e) => {
                log::error!("Failed to store result for test '{}': {}", record.test_id, e);
                Err(AppError::StoreWriteFailure(e.to_string()))
            }
        }
    }

    /// Writes the already-scored record again after a failed submission.
    pub async fn retry_submit(&self, session: &mut AttemptSession) -> AppResult<ResultRecord> {
        let submission = session.submission().cloned().ok_or_else(|| {
            AppError::InvalidState("nothing has been submitted yet".to_string())
        })?;

        match submission.status {
            WriteStatus::Persisted => return Ok(submission.record),
            WriteStatus::Rejected => {
                return Err(AppError::AlreadyAttempted(format!(
                    "a result for test '{}' was already submitted",
                    submission.record.test_id
                )))
            }
            WriteStatus::Pending => {}
        }

        match self.results.append(submission.record.clone()).await {
            Ok(_) => {
                session.set_write_status(WriteStatus::Persisted);
                log::info!("Stored result for test '{}' on retry", submission.record.test_id);
                Ok(submission.record)
            }
            Err(AppError::AlreadyExists(_)) => {
                if self.landed_earlier(&submission.record).await? {
                    session.set_write_status(WriteStatus::Persisted);
                    log::info!(
                        "Earlier write for test '{}' had landed",
                        submission.record.test_id
                    );
                    Ok(submission.record)
                } else {
                    session.set_write_status(WriteStatus::Rejected);
                    log::warn!(
                        "Participant '{}' already has another result for test '{}'",
                        submission.record.participant_key,
                        submission.record.test_id
                    );
                    Err(AppError::AlreadyAttempted(format!(
                        "a result for test '{}' was already submitted",
                        submission.record.test_id
                    )))
                }
            }
            Err(e) => {
                log::error!(
                    "Retry failed for test '{}': {}",
                    submission.record.test_id,
                    e
                );
                Err(AppError::StoreWriteFailure(e.to_string()))
            }
        }
    }

    /// Whether the record stored under `pending.id` is the one this session wrote.
    async fn landed_earlier(&self, pending: &ResultRecord) -> AppResult<bool> {
        // Anonymous ids are minted per submission, so a duplicate can only be ours.
        if pending.is_anonymous() {
            return Ok(true);
        }

        let stored = self
            .results
            .list_by_test(&pending.test_id)
            .await
            .map_err(|e| AppError::StoreWriteFailure(e.to_string()))?;

        Ok(stored.iter().any(|r| {
            r.id == pending.id
                && r.submitted_at_epoch_millis == pending.submitted_at_epoch_millis
                && r.answers == pending.answers
        }))
    }
}
