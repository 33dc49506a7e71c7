use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::SurveyResponse};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SurveyResponseRepository: Send + Sync {
    async fn append(&self, response: SurveyResponse) -> AppResult<SurveyResponse>;
    async fn list_by_survey(&self, survey_id: &str) -> AppResult<Vec<SurveyResponse>>;
}

pub struct MongoSurveyResponseRepository {
    collection: Collection<SurveyResponse>,
}

impl MongoSurveyResponseRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        let model = IndexModel::builder()
            .keys(doc! { "survey_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("survey_id".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(model).await?;
        log::info!("Created index on responses.survey_id");
        Ok(())
    }
}

#[async_trait]
impl SurveyResponseRepository for MongoSurveyResponseRepository {
    async fn append(&self, response: SurveyResponse) -> AppResult<SurveyResponse> {
        self.collection.insert_one(&response).await?;
        Ok(response)
    }

    async fn list_by_survey(&self, survey_id: &str) -> AppResult<Vec<SurveyResponse>> {
        let responses = self
            .collection
            .find(doc! { "survey_id": survey_id })
            .await?
            .try_collect()
            .await?;
        Ok(responses)
    }
}
