use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::Survey};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SurveyRepository: Send + Sync {
    async fn create(&self, survey: Survey) -> AppResult<Survey>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Survey>>;
}

pub struct MongoSurveyRepository {
    collection: Collection<Survey>,
}

impl MongoSurveyRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        let model = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(model).await?;
        log::info!("Created unique index on surveys.id");
        Ok(())
    }
}

#[async_trait]
impl SurveyRepository for MongoSurveyRepository {
    async fn create(&self, survey: Survey) -> AppResult<Survey> {
        self.collection.insert_one(&survey).await?;
        Ok(survey)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Survey>> {
        let survey = self.collection.find_one(doc! { "id": id }).await?;
        Ok(survey)
    }
}
