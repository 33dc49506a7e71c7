pub mod attempt_controller;
pub mod attempt_runner;
pub mod survey_service;
pub mod test_service;

pub use attempt_controller::AttemptController;
pub use attempt_runner::{AttemptEvent, AttemptHandle, AttemptOutcome, AttemptRunner, AttemptUpdate};
pub use survey_service::{parse_generated_survey, GeneratedSurvey, SurveyService};
pub use test_service::TestService;
