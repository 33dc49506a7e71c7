use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::ResultRecord};

/// Append-only sink for scored attempts, scoped by test id.
///
/// `append` must fail with `AppError::AlreadyExists` when a record with the
/// same id is already stored; identified participants rely on this for
/// one-result-per-test.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultRepository: Send + Sync {
    async fn append(&self, record: ResultRecord) -> AppResult<String>;
    async fn list_by_test(&self, test_id: &str) -> AppResult<Vec<ResultRecord>>;
    async fn list_by_participant(&self, participant_key: &str) -> AppResult<Vec<ResultRecord>>;
}

pub struct MongoResultRepository {
    collection: Collection<ResultRecord>,
}

impl MongoResultRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for results collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let test_index = IndexModel::builder()
            .keys(doc! { "test_id": 1, "submitted_at_epoch_millis": -1 })
            .options(
                IndexOptions::builder()
                    .name("test_submitted".to_string())
                    .build(),
            )
            .build();

        let participant_index = IndexModel::builder()
            .keys(doc! { "participant_key": 1, "submitted_at_epoch_millis": -1 })
            .options(
                IndexOptions::builder()
                    .name("participant_submitted".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(test_index).await?;
        self.collection.create_index(participant_index).await?;

        log::info!("Successfully created indexes for results collection");
        Ok(())
    }
}

#[async_trait]
impl ResultRepository for MongoResultRepository {
    async fn append(&self, record: ResultRecord) -> AppResult<String> {
        self.collection.insert_one(&record).await?;
        Ok(record.id)
    }

    async fn list_by_test(&self, test_id: &str) -> AppResult<Vec<ResultRecord>> {
        let records = self
            .collection
            .find(doc! { "test_id": test_id })
            .sort(doc! { "submitted_at_epoch_millis": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(records)
    }

    async fn list_by_participant(&self, participant_key: &str) -> AppResult<Vec<ResultRecord>> {
        let records = self
            .collection
            .find(doc! { "participant_key": participant_key })
            .sort(doc! { "submitted_at_epoch_millis": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(records)
    }
}
