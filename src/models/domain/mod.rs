pub mod attempt_session;
pub mod identity;
pub mod position_keys;
pub mod result_record;
pub mod survey;
pub mod test_definition;
pub use attempt_session::{AttemptSession, Phase, TickOutcome, WriteStatus};
pub use identity::Identity;
pub use result_record::{ResultRecord, ANONYMOUS_PARTICIPANT};
pub use survey::{Survey, SurveyQuestion, SurveyQuestionKind, SurveyResponse};
pub use test_definition::{Question, TestDefinition};
