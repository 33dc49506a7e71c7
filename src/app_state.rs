use std::sync::Arc;

use crate::{
    auth::{IdentityProvider, JwtService},
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoResultRepository, MongoSurveyRepository, MongoSurveyResponseRepository,
        MongoTestRepository, ResultRepository, TestRepository,
    },
    services::{AttemptController, SurveyService, TestService},
};

/// Hours a locally issued identity token stays valid.
const TOKEN_EXPIRATION_HOURS: i64 = 24;

#[derive(Clone)]
pub struct AppState {
    pub test_service: Arc<TestService>,
    pub survey_service: Arc<SurveyService>,
    pub jwt_service: Arc<JwtService>,
    pub config: Arc<Config>,
    tests: Arc<dyn TestRepository>,
    results: Arc<dyn ResultRepository>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let test_repository = Arc::new(MongoTestRepository::new(&db, &config.tests_collection));
        test_repository.ensure_indexes().await?;

        let result_repository =
            Arc::new(MongoResultRepository::new(&db, &config.results_collection));
        result_repository.ensure_indexes().await?;

        let survey_repository =
            Arc::new(MongoSurveyRepository::new(&db, &config.surveys_collection));
        survey_repository.ensure_indexes().await?;

        let response_repository = Arc::new(MongoSurveyResponseRepository::new(
            &db,
            &config.responses_collection,
        ));
        response_repository.ensure_indexes().await?;

        log::info!("Repositories ready on database '{}'", db.db_name());

        let test_service = Arc::new(TestService::new(
            test_repository.clone(),
            result_repository.clone(),
        ));
        let survey_service = Arc::new(SurveyService::new(survey_repository, response_repository));
        let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, TOKEN_EXPIRATION_HOURS));

        Ok(Self {
            test_service,
            survey_service,
            jwt_service,
            config: Arc::new(config),
            tests: test_repository,
            results: result_repository,
        })
    }

    /// A controller for one participant; `identity` enables the one-attempt gate.
    pub fn attempt_controller(
        &self,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> AttemptController {
        let controller = AttemptController::new(self.tests.clone(), self.results.clone())
            .with_default_duration(self.config.default_duration_minutes);

        match identity {
            Some(provider) => controller.with_identity_provider(provider),
            None => controller,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
