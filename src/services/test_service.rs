use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::require_owner,
    errors::{AppError, AppResult},
    models::{
        domain::{Identity, TestDefinition},
        dto::{
            request::{CreateTestRequest, UpdateTestRequest},
            response::{AttendedTest, ResultSummary, TestResultsResponse},
        },
    },
    repositories::{ResultRepository, TestRepository},
};

/// Authoring side: owners create and maintain tests and read their results.
pub struct TestService {
    tests: Arc<dyn TestRepository>,
    results: Arc<dyn ResultRepository>,
}

impl TestService {
    pub fn new(tests: Arc<dyn TestRepository>, results: Arc<dyn ResultRepository>) -> Self {
        Self { tests, results }
    }

    pub async fn get_test(&self, id: &str) -> AppResult<TestDefinition> {
        self.tests
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::DefinitionNotFound(id.to_string()))
    }

    pub async fn create_test(
        &self,
        owner: &Identity,
        request: CreateTestRequest,
    ) -> AppResult<TestDefinition> {
        request.validate()?;

        let definition = request.into_definition(&Uuid::new_v4().to_string(), &owner.key);
        let created = self.tests.create(definition).await?;

        log::info!("'{}' created test '{}'", owner.key, created.id);
        Ok(created)
    }

    pub async fn update_test(
        &self,
        requester: &Identity,
        id: &str,
        request: UpdateTestRequest,
    ) -> AppResult<TestDefinition> {
        request.validate()?;

        let existing = self.get_test(id).await?;
        require_owner(requester, &existing.created_by)?;

        let mut updated = request.into_definition(&existing.id, &existing.created_by);
        updated.created_at = existing.created_at;

        self.tests.update(updated).await
    }

    pub async fn delete_test(&self, requester: &Identity, id: &str) -> AppResult<()> {
        let existing = self.get_test(id).await?;
        require_owner(requester, &existing.created_by)?;

        self.tests.delete(id).await?;
        log::info!("'{}' deleted test '{}'", requester.key, id);
        Ok(())
    }

    pub async fn list_tests_by_owner(&self, owner: &Identity) -> AppResult<Vec<TestDefinition>> {
        self.tests.list_by_owner(&owner.key).await
    }

    /// Results for a test, newest first, visible to its owner only.
    pub async fn list_results(
        &self,
        requester: &Identity,
        test_id: &str,
    ) -> AppResult<TestResultsResponse> {
        let test = self.get_test(test_id).await?;
        require_owner(requester, &test.created_by)?;

        let mut results = self.results.list_by_test(test_id).await?;
        results.sort_by(|a, b| b.submitted_at_epoch_millis.cmp(&a.submitted_at_epoch_millis));

        Ok(TestResultsResponse {
            test_id: test.id,
            title: test.title,
            summary: ResultSummary::from_records(&results),
            results,
        })
    }

    /// Tests the participant has taken, newest first. A test deleted since is
    /// listed under its id.
    pub async fn list_attempts_by_participant(
        &self,
        participant: &Identity,
    ) -> AppResult<Vec<AttendedTest>> {
        let mut records = self.results.list_by_participant(&participant.key).await?;
        records.sort_by(|a, b| b.submitted_at_epoch_millis.cmp(&a.submitted_at_epoch_millis));

        let mut attended = Vec::with_capacity(records.len());
        for record in records {
            let title = match self.tests.find_by_id(&record.test_id).await? {
                Some(test) => test.title,
                None => record.test_id.clone(),
            };
            attended.push(AttendedTest {
                test_id: record.test_id,
                title,
                score: record.score,
                total: record.total,
                submitted_at_epoch_millis: record.submitted_at_epoch_millis,
            });
        }
        Ok(attended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::dto::request::QuestionInput,
        repositories::{MockResultRepository, MockTestRepository},
        test_utils::fixtures::*,
    };

    fn request(min_questions: Option<u32>) -> CreateTestRequest {
        CreateTestRequest {
            title: "Geography".to_string(),
            description: "Capitals".to_string(),
            duration_minutes: 10,
            min_questions,
            questions: vec![QuestionInput {
                text: "Capital of France?".to_string(),
                options: vec!["Paris".to_string(), "Lyon".to_string()],
                correct_index: 0,
            }],
        }
    }

    fn owned_test() -> MockTestRepository {
        let mut tests = MockTestRepository::new();
        tests
            .expect_find_by_id()
            .returning(|_| Ok(Some(three_question_test())));
        tests
    }

    #[tokio::test]
    async fn create_test_assigns_owner_and_id() {
        let mut tests = MockTestRepository::new();
        tests.expect_create().times(1).returning(Ok);
        let service = TestService::new(Arc::new(tests), Arc::new(MockResultRepository::new()));

        let created = service
            .create_test(&owner_identity(), request(Some(1)))
            .await
            .unwrap();

        assert_eq!(created.created_by, OWNER_KEY);
        assert!(Uuid::parse_str(&created.id).is_ok());
    }

    #[tokio::test]
    async fn create_test_rejects_min_questions_above_total() {
        let mut tests = MockTestRepository::new();
        tests.expect_create().never();
        let service = TestService::new(Arc::new(tests), Arc::new(MockResultRepository::new()));

        let result = service.create_test(&owner_identity(), request(Some(5))).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn update_by_non_owner_is_unauthorized() {
        let mut tests = owned_test();
        tests.expect_update().never();
        let service = TestService::new(Arc::new(tests), Arc::new(MockResultRepository::new()));

        let stranger = Identity::new("stranger", "Mallory");
        let result = service.update_test(&stranger, "t1", request(None)).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn update_keeps_id_owner_and_creation_time() {
        let mut tests = owned_test();
        tests.expect_update().times(1).returning(Ok);
        let service = TestService::new(Arc::new(tests), Arc::new(MockResultRepository::new()));

        let updated = service
            .update_test(&owner_identity(), "t1", request(None))
            .await
            .unwrap();

        let original = three_question_test();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_by, original.created_by);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.title, "Geography");
    }

    #[tokio::test]
    async fn delete_by_owner_removes_test() {
        let mut tests = owned_test();
        tests
            .expect_delete()
            .withf(|id| id == "t1")
            .times(1)
            .returning(|_| Ok(()));
        let service = TestService::new(Arc::new(tests), Arc::new(MockResultRepository::new()));

        assert!(service.delete_test(&owner_identity(), "t1").await.is_ok());
    }

    #[tokio::test]
    async fn delete_of_missing_test_is_not_found() {
        let mut tests = MockTestRepository::new();
        tests.expect_find_by_id().returning(|_| Ok(None));
        let service = TestService::new(Arc::new(tests), Arc::new(MockResultRepository::new()));

        assert!(matches!(
            service.delete_test(&owner_identity(), "gone").await,
            Err(AppError::DefinitionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_results_sorts_newest_first_with_summary() {
        let mut results = MockResultRepository::new();
        results.expect_list_by_test().returning(|_| {
            let mut older = stored_result("t1", "u1", 1);
            older.submitted_at_epoch_millis = 1_000;
            let mut newer = stored_result("t1", "u2", 2);
            newer.submitted_at_epoch_millis = 2_000;
            Ok(vec![older, newer])
        });
        let service = TestService::new(Arc::new(owned_test()), Arc::new(results));

        let response = service.list_results(&owner_identity(), "t1").await.unwrap();
        assert_eq!(response.results[0].participant_key, "u2");
        assert_eq!(response.summary.attempts, 2);
        assert_eq!(response.summary.best_score, 2);
        assert_eq!(response.summary.average_score, 1.5);
    }

    #[tokio::test]
    async fn list_results_for_non_owner_is_unauthorized() {
        let mut results = MockResultRepository::new();
        results.expect_list_by_test().never();
        let service = TestService::new(Arc::new(owned_test()), Arc::new(results));

        let stranger = Identity::new("stranger", "Mallory");
        assert!(matches!(
            service.list_results(&stranger, "t1").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn list_attempts_by_participant_names_tests_newest_first() {
        let mut tests = MockTestRepository::new();
        tests
            .expect_find_by_id()
            .returning(|id| Ok((id == "t1").then(three_question_test)));
        let mut results = MockResultRepository::new();
        results
            .expect_list_by_participant()
            .withf(|key| key == "u1")
            .returning(|_| {
                let older = stored_result("t1", "u1", 2);
                let mut newer = stored_result("gone", "u1", 1);
                newer.submitted_at_epoch_millis += 1_000;
                Ok(vec![older, newer])
            });
        let service = TestService::new(Arc::new(tests), Arc::new(results));

        let attended = service
            .list_attempts_by_participant(&Identity::new("u1", "Una"))
            .await
            .unwrap();

        assert_eq!(attended.len(), 2);
        assert_eq!(attended[0].title, "gone");
        assert_eq!(attended[1].title, "Rust basics");
        assert_eq!(attended[1].score, 2);
    }
}
