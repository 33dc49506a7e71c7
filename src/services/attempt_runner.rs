use std::{sync::Arc, time::Duration};

use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{AttemptSession, Phase, Question, ResultRecord, WriteStatus},
    services::attempt_controller::AttemptController,
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Input to a running attempt. Participant actions and timer ticks share one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptEvent {
    Start { participant_label: String },
    Answer { position: usize, option: usize },
    Submit,
    Tick,
    RetrySubmit,
    Abandon,
}

/// What the host should show after an event was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptUpdate {
    Started {
        questions: Vec<Question>,
        remaining_seconds: u32,
    },
    Remaining {
        remaining_seconds: u32,
        display: String,
    },
    Answered {
        position: usize,
        option: usize,
    },
    Submitted(ResultRecord),
    SubmitFailed(String),
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Submitted(ResultRecord),
    /// Scored, but the store never accepted the write.
    Unsaved { record: ResultRecord, error: String },
    /// The store refused the write because this participant already has a result.
    AlreadyAttempted(ResultRecord),
    Abandoned,
}

/// Host-side sender for one attempt.
#[derive(Clone)]
pub struct AttemptHandle {
    events: UnboundedSender<AttemptEvent>,
}

impl AttemptHandle {
    pub fn send(&self, event: AttemptEvent) -> AppResult<()> {
        self.events
            .send(event)
            .map_err(|_| AppError::InvalidState("the attempt has already ended".to_string()))
    }

    pub fn start(&self, participant_label: &str) -> AppResult<()> {
        self.send(AttemptEvent::Start {
            participant_label: participant_label.to_string(),
        })
    }

    pub fn answer(&self, position: usize, option: usize) -> AppResult<()> {
        self.send(AttemptEvent::Answer { position, option })
    }

    pub fn submit(&self) -> AppResult<()> {
        self.send(AttemptEvent::Submit)
    }

    pub fn retry(&self) -> AppResult<()> {
        self.send(AttemptEvent::RetrySubmit)
    }

    pub fn abandon(&self) -> AppResult<()> {
        self.send(AttemptEvent::Abandon)
    }
}

/// Event loop for a single attempt session.
///
/// Events and countdown ticks are handled one at a time on this task, so a
/// countdown expiry and a manual submit can never both reach the store.
/// Events already queued when the host drops its handle are still handled.
pub struct AttemptRunner {
    controller: Arc<AttemptController>,
    session: AttemptSession,
    events: UnboundedReceiver<AttemptEvent>,
    updates: UnboundedSender<AttemptUpdate>,
    countdown: Option<Interval>,
    last_error: Option<String>,
}

impl AttemptRunner {
    pub fn new(
        controller: Arc<AttemptController>,
        session: AttemptSession,
    ) -> (Self, AttemptHandle, UnboundedReceiver<AttemptUpdate>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let runner = Self {
            controller,
            session,
            events: events_rx,
            updates: updates_tx,
            countdown: None,
            last_error: None,
        };

        (runner, AttemptHandle { events: events_tx }, updates_rx)
    }

    /// Runs until the result is settled or the attempt is abandoned.
    ///
    /// Once every handle is gone the queue is drained; a running countdown
    /// keeps going and submits on expiry, anything else ends the loop.
    pub async fn run(mut self) -> AttemptOutcome {
        let mut host_gone = false;

        loop {
            let received = tokio::select! {
                received = self.events.recv(), if !host_gone => received,
                _ = next_tick(&mut self.countdown) => Some(AttemptEvent::Tick),
            };
            let Some(event) = received else {
                host_gone = true;
                if self.countdown.is_none() {
                    break;
                }
                continue;
            };

            if !self.handle(event).await {
                break;
            }

            if self.session.phase() == Phase::Submitted {
                self.countdown = None;
                if self.session.is_settled() {
                    break;
                }
            }
            if host_gone && self.countdown.is_none() {
                break;
            }
        }

        self.outcome()
    }

    /// Returns `false` when the loop should stop.
    async fn handle(&mut self, event: AttemptEvent) -> bool {
        match event {
            AttemptEvent::Start { participant_label } => {
                match self.controller.start(&mut self.session, &participant_label) {
                    Ok(()) => {
                        self.countdown = Some(new_countdown());
                        self.notify(AttemptUpdate::Started {
                            questions: self.session.selected_questions().to_vec(),
                            remaining_seconds: self.session.remaining_seconds(),
                        });
                    }
                    Err(e) => self.notify(AttemptUpdate::Rejected(e.to_string())),
                }
            }
            AttemptEvent::Answer { position, option } => {
                match self.controller.answer(&mut self.session, position, option) {
                    Ok(()) => self.notify(AttemptUpdate::Answered { position, option }),
                    Err(e) => self.notify(AttemptUpdate::Rejected(e.to_string())),
                }
            }
            AttemptEvent::Tick => {
                let result = self.controller.tick(&mut self.session).await;
                if self.session.phase() == Phase::InProgress {
                    self.notify(AttemptUpdate::Remaining {
                        remaining_seconds: self.session.remaining_seconds(),
                        display: self.session.remaining_display(),
                    });
                }
                self.report_submission(result);
            }
            AttemptEvent::Submit => {
                let result = self.controller.submit(&mut self.session).await;
                self.report_submission(result);
            }
            AttemptEvent::RetrySubmit => {
                let result = self
                    .controller
                    .retry_submit(&mut self.session)
                    .await
                    .map(Some);
                self.report_submission(result);
            }
            AttemptEvent::Abandon => {
                log::info!("Attempt on test '{}' abandoned", self.session.test_id());
                return false;
            }
        }
        true
    }

    fn report_submission(&mut self, result: AppResult<Option<ResultRecord>>) {
        match result {
            Ok(Some(record)) => {
                self.last_error = None;
                self.notify(AttemptUpdate::Submitted(record));
            }
            Ok(None) => {}
            Err(e) => {
                self.last_error = Some(e.to_string());
                self.notify(AttemptUpdate::SubmitFailed(e.to_string()));
            }
        }
    }

    fn notify(&self, update: AttemptUpdate) {
        // The host may have stopped listening; the attempt carries on regardless.
        let _ = self.updates.send(update);
    }

    fn outcome(&self) -> AttemptOutcome {
        let Some(submission) = self.session.submission() else {
            return AttemptOutcome::Abandoned;
        };

        match submission.status {
            WriteStatus::Persisted => AttemptOutcome::Submitted(submission.record.clone()),
            WriteStatus::Rejected => AttemptOutcome::AlreadyAttempted(submission.record.clone()),
            WriteStatus::Pending => AttemptOutcome::Unsaved {
                record: submission.record.clone(),
                error: self
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "result was not stored".to_string()),
            },
        }
    }
}

fn new_countdown() -> Interval {
    let mut countdown = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    countdown.set_missed_tick_behavior(MissedTickBehavior::Delay);
    countdown
}

/// Resolves on the next countdown tick; never resolves while no countdown runs.
async fn next_tick(countdown: &mut Option<Interval>) {
    match countdown {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
