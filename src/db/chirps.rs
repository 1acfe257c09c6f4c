use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId};
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use super::{ChirpRepository, StoreError, from_bson_datetime, to_bson_datetime};
use crate::config::Constants;
use crate::structure::chirps::{Chirp, SortOrder};

#[derive(Debug, Serialize, Deserialize)]
struct ChirpDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
    body: String,
    user_id: ObjectId,
}

impl From<ChirpDocument> for Chirp {
    fn from(doc: ChirpDocument) -> Self {
        Chirp {
            id: doc.id,
            created_at: from_bson_datetime(doc.created_at),
            updated_at: from_bson_datetime(doc.updated_at),
            body: doc.body,
            user_id: doc.user_id,
        }
    }
}

pub struct MongoChirpRepository {
    chirps: Collection<ChirpDocument>,
}

impl MongoChirpRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            chirps: db.collection(Constants::CHIRPS_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": 1 })
            .build();
        self.chirps.create_index(index).await?;
        Ok(())
    }
}

#[async_trait]
impl ChirpRepository for MongoChirpRepository {
    async fn create(&self, chirp: Chirp) -> Result<Chirp, StoreError> {
        let chirp_doc = ChirpDocument {
            id: chirp.id,
            created_at: to_bson_datetime(chirp.created_at),
            updated_at: to_bson_datetime(chirp.updated_at),
            body: chirp.body.clone(),
            user_id: chirp.user_id,
        };
        self.chirps.insert_one(chirp_doc).await?;
        Ok(chirp)
    }

    async fn list(
        &self,
        author: Option<&ObjectId>,
        order: SortOrder,
    ) -> Result<Vec<Chirp>, StoreError> {
        let mut filter = doc! {};
        if let Some(author) = author {
            filter.insert("user_id", *author);
        }
        let direction = match order {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        };

        let cursor = self
            .chirps
            .find(filter)
            .sort(doc! { "created_at": direction, "_id": direction })
            .await?;
        let docs: Vec<ChirpDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(Chirp::from).collect())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Chirp>, StoreError> {
        let found = self.chirps.find_one(doc! { "_id": *id }).await?;
        Ok(found.map(Chirp::from))
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let result = self.chirps.delete_one(doc! { "_id": *id }).await?;
        Ok(result.deleted_count == 1)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = self.chirps.delete_many(doc! {}).await?;
        Ok(result.deleted_count)
    }
}
