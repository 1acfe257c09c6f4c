use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use mongodb::{Client, Database};

use crate::config::Constants;
use crate::structure::chirps::{Chirp, SortOrder};
use crate::structure::refresh_tokens::RefreshTokenRecord;
use crate::structure::users::User;

pub mod chirps;
pub mod memory;
pub mod refresh_tokens;
pub mod users;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("duplicate {0}")]
    Duplicate(&'static str),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError>;

    /// Replace email and password hash. `None` when the user does not exist.
    async fn update_credentials(
        &self,
        id: &ObjectId,
        email: &str,
        hashed_password: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    /// Returns false when no such user exists.
    async fn upgrade_to_chirpy_red(
        &self,
        id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn delete_all(&self) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), StoreError>;

    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Set `revoked_at` if the token exists and is not revoked yet, as one
    /// atomic conditional update. Returns whether a record changed.
    async fn revoke(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn revoke_all_for_user(
        &self,
        user_id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ChirpRepository: Send + Sync {
    async fn create(&self, chirp: Chirp) -> Result<Chirp, StoreError>;

    async fn list(
        &self,
        author: Option<&ObjectId>,
        order: SortOrder,
    ) -> Result<Vec<Chirp>, StoreError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Chirp>, StoreError>;

    /// Returns false when nothing was deleted.
    async fn delete(&self, id: &ObjectId) -> Result<bool, StoreError>;

    async fn delete_all(&self) -> Result<u64, StoreError>;
}

/// The store handles shared by the session layer and the handlers.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub chirps: Arc<dyn ChirpRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
}

impl Repositories {
    pub async fn mongo(db: &Database) -> Result<Self, StoreError> {
        let users = users::MongoUserRepository::new(db);
        users.ensure_indexes().await?;
        let chirps = chirps::MongoChirpRepository::new(db);
        chirps.ensure_indexes().await?;
        let refresh_tokens = refresh_tokens::MongoRefreshTokenRepository::new(db);
        refresh_tokens.ensure_indexes().await?;

        Ok(Self {
            users: Arc::new(users),
            chirps: Arc::new(chirps),
            refresh_tokens: Arc::new(refresh_tokens),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUserRepository::default()),
            chirps: Arc::new(memory::MemoryChirpRepository::default()),
            refresh_tokens: Arc::new(memory::MemoryRefreshTokenRepository::default()),
        }
    }
}

/// Get MongoDB database connection
pub async fn get_database(db_url: &str) -> Result<Database, StoreError> {
    let client = Client::with_uri_str(db_url).await?;
    Ok(client.database(Constants::DB_NAME))
}

pub(crate) fn to_bson_datetime(value: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(value.timestamp_millis())
}

pub(crate) fn from_bson_datetime(value: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value.timestamp_millis()).unwrap_or_default()
}

pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    const DUPLICATE_KEY: i32 = 11000;

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}
