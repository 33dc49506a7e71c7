pub mod result_repository;
pub mod survey_repository;
pub mod survey_response_repository;
pub mod test_repository;

pub use result_repository::{MongoResultRepository, ResultRepository};
pub use survey_repository::{MongoSurveyRepository, SurveyRepository};
pub use survey_response_repository::{MongoSurveyResponseRepository, SurveyResponseRepository};
pub use test_repository::{MongoTestRepository, TestRepository};

#[cfg(test)]
pub use result_repository::MockResultRepository;
#[cfg(test)]
pub use survey_repository::MockSurveyRepository;
#[cfg(test)]
pub use survey_response_repository::MockSurveyResponseRepository;
#[cfg(test)]
pub use test_repository::MockTestRepository;
