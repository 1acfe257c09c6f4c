use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, Bson, doc, oid::ObjectId};
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use super::{
    RefreshTokenRepository, StoreError, from_bson_datetime, is_duplicate_key, to_bson_datetime,
};
use crate::config::Constants;
use crate::structure::refresh_tokens::RefreshTokenRecord;

/// The raw token value is the primary key.
#[derive(Debug, Serialize, Deserialize)]
struct RefreshTokenDocument {
    #[serde(rename = "_id")]
    token: String,
    user_id: ObjectId,
    created_at: bson::DateTime,
    expires_at: bson::DateTime,
    revoked_at: Option<bson::DateTime>,
}

impl From<RefreshTokenDocument> for RefreshTokenRecord {
    fn from(doc: RefreshTokenDocument) -> Self {
        RefreshTokenRecord {
            token: doc.token,
            user_id: doc.user_id,
            created_at: from_bson_datetime(doc.created_at),
            expires_at: from_bson_datetime(doc.expires_at),
            revoked_at: doc.revoked_at.map(from_bson_datetime),
        }
    }
}

pub struct MongoRefreshTokenRepository {
    tokens: Collection<RefreshTokenDocument>,
}

impl MongoRefreshTokenRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            tokens: db.collection(Constants::REFRESH_TOKENS_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let index = IndexModel::builder().keys(doc! { "user_id": 1 }).build();
        self.tokens.create_index(index).await?;
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepository for MongoRefreshTokenRepository {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        let token_doc = RefreshTokenDocument {
            token: record.token,
            user_id: record.user_id,
            created_at: to_bson_datetime(record.created_at),
            expires_at: to_bson_datetime(record.expires_at),
            revoked_at: record.revoked_at.map(to_bson_datetime),
        };

        match self.tokens.insert_one(token_doc).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate("refresh token")),
            Err(e) => Err(e.into()),
        }
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let found = self.tokens.find_one(doc! { "_id": token }).await?;
        Ok(found.map(RefreshTokenRecord::from))
    }

    async fn revoke(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        // `revoked_at: null` keeps the first revocation timestamp.
        let filter = doc! { "_id": token, "revoked_at": Bson::Null };
        let update = doc! { "$set": { "revoked_at": to_bson_datetime(now) } };

        let result = self.tokens.update_one(filter, update).await?;
        Ok(result.modified_count == 1)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let filter = doc! { "user_id": *user_id, "revoked_at": Bson::Null };
        let update = doc! { "$set": { "revoked_at": to_bson_datetime(now) } };

        let result = self.tokens.update_many(filter, update).await?;
        Ok(result.modified_count)
    }
}
