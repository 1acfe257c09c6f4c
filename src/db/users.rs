use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc, oid::ObjectId};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use super::{StoreError, UserRepository, from_bson_datetime, is_duplicate_key, to_bson_datetime};
use crate::config::Constants;
use crate::structure::users::User;

#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
    email: String,
    hashed_password: String,
    #[serde(default)]
    is_chirpy_red: bool,
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        User {
            id: doc.id,
            created_at: from_bson_datetime(doc.created_at),
            updated_at: from_bson_datetime(doc.updated_at),
            email: doc.email,
            hashed_password: doc.hashed_password,
            is_chirpy_red: doc.is_chirpy_red,
        }
    }
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        UserDocument {
            id: user.id,
            created_at: to_bson_datetime(user.created_at),
            updated_at: to_bson_datetime(user.updated_at),
            email: user.email.clone(),
            hashed_password: user.hashed_password.clone(),
            is_chirpy_red: user.is_chirpy_red,
        }
    }
}

pub struct MongoUserRepository {
    users: Collection<UserDocument>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection(Constants::USERS_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users.create_index(index).await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn create(&self, user: User) -> Result<User, StoreError> {
        match self.users.insert_one(UserDocument::from(&user)).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate("email")),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let found = self.users.find_one(doc! { "email": email }).await?;
        Ok(found.map(User::from))
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        let found = self.users.find_one(doc! { "_id": *id }).await?;
        Ok(found.map(User::from))
    }

    async fn update_credentials(
        &self,
        id: &ObjectId,
        email: &str,
        hashed_password: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let update = doc! {
            "$set": {
                "email": email,
                "hashed_password": hashed_password,
                "updated_at": to_bson_datetime(now),
            }
        };
        let result = self
            .users
            .find_one_and_update(doc! { "_id": *id }, update)
            .return_document(ReturnDocument::After)
            .await;

        match result {
            Ok(found) => Ok(found.map(User::from)),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate("email")),
            Err(e) => Err(e.into()),
        }
    }

    async fn upgrade_to_chirpy_red(
        &self,
        id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let update = doc! {
            "$set": {
                "is_chirpy_red": true,
                "updated_at": to_bson_datetime(now),
            }
        };
        let result = self.users.update_one(doc! { "_id": *id }, update).await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = self.users.delete_many(doc! {}).await?;
        Ok(result.deleted_count)
    }
}
