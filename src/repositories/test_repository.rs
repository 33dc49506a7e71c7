use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::TestDefinition,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestDefinition>>;
    async fn list_by_owner(&self, owner: &str) -> AppResult<Vec<TestDefinition>>;
    async fn create(&self, test: TestDefinition) -> AppResult<TestDefinition>;
    async fn update(&self, test: TestDefinition) -> AppResult<TestDefinition>;
    async fn delete(&self, id: &str) -> AppResult<()>;
}

pub struct MongoTestRepository {
    collection: Collection<TestDefinition>,
}

impl MongoTestRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for tests collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let owner_index = IndexModel::builder()
            .keys(doc! { "created_by": 1 })
            .options(
                IndexOptions::builder()
                    .name("created_by".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(owner_index).await?;

        log::info!("Successfully created indexes for tests collection");
        Ok(())
    }
}

#[async_trait]
impl TestRepository for MongoTestRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestDefinition>> {
        let test = self.collection.find_one(doc! { "id": id }).await?;
        Ok(test)
    }

    async fn list_by_owner(&self, owner: &str) -> AppResult<Vec<TestDefinition>> {
        let tests = self
            .collection
            .find(doc! { "created_by": owner })
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(tests)
    }

    async fn create(&self, test: TestDefinition) -> AppResult<TestDefinition> {
        self.collection.insert_one(&test).await?;
        Ok(test)
    }

    async fn update(&self, test: TestDefinition) -> AppResult<TestDefinition> {
        let result = self
            .collection
            .replace_one(doc! { "id": &test.id }, &test)
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::DefinitionNotFound(test.id));
        }
        Ok(test)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let result = self.collection.delete_one(doc! { "id": id }).await?;

        if result.deleted_count == 0 {
            return Err(AppError::DefinitionNotFound(id.to_string()));
        }
        Ok(())
    }
}
