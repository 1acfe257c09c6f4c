//! In-process stores for the dev platform and for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mongodb::bson::oid::ObjectId;

use super::{ChirpRepository, RefreshTokenRepository, StoreError, UserRepository};
use crate::structure::chirps::{Chirp, SortOrder};
use crate::structure::refresh_tokens::RefreshTokenRecord;
use crate::structure::users::User;

#[derive(Default)]
pub struct MemoryUserRepository {
    users: DashMap<ObjectId, User>,
    // email -> id; claiming an entry here is what makes emails unique
    emails: DashMap<String, ObjectId>,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, StoreError> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => return Err(StoreError::Duplicate("email")),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = self.emails.get(email).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|user| user.value().clone()))
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).map(|user| user.value().clone()))
    }

    async fn update_credentials(
        &self,
        id: &ObjectId,
        email: &str,
        hashed_password: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        // Lock order is users then emails; nothing takes them the other way round.
        let Some(mut user) = self.users.get_mut(id) else {
            return Ok(None);
        };

        if user.email != email {
            match self.emails.entry(email.to_string()) {
                Entry::Occupied(_) => return Err(StoreError::Duplicate("email")),
                Entry::Vacant(slot) => {
                    slot.insert(*id);
                }
            }
            self.emails.remove(&user.email);
        }

        user.email = email.to_string();
        user.hashed_password = hashed_password.to_string();
        user.updated_at = now;

        Ok(Some(user.value().clone()))
    }

    async fn upgrade_to_chirpy_red(
        &self,
        id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self.users.get_mut(id) {
            Some(mut user) => {
                user.is_chirpy_red = true;
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let count = self.users.len() as u64;
        self.users.clear();
        self.emails.clear();
        Ok(count)
    }
}

#[derive(Default)]
pub struct MemoryRefreshTokenRepository {
    tokens: DashMap<String, RefreshTokenRecord>,
}

#[async_trait]
impl RefreshTokenRepository for MemoryRefreshTokenRepository {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        match self.tokens.entry(record.token.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate("refresh token")),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.tokens.get(token).map(|record| record.value().clone()))
    }

    async fn revoke(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        // get_mut holds the shard lock across the check and the write
        match self.tokens.get_mut(token) {
            Some(mut record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(
        &self,
        user_id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut revoked = 0;
        for mut record in self.tokens.iter_mut() {
            if record.user_id == *user_id && record.revoked_at.is_none() {
                record.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[derive(Default)]
pub struct MemoryChirpRepository {
    chirps: DashMap<ObjectId, Chirp>,
}

#[async_trait]
impl ChirpRepository for MemoryChirpRepository {
    async fn create(&self, chirp: Chirp) -> Result<Chirp, StoreError> {
        self.chirps.insert(chirp.id, chirp.clone());
        Ok(chirp)
    }

    async fn list(
        &self,
        author: Option<&ObjectId>,
        order: SortOrder,
    ) -> Result<Vec<Chirp>, StoreError> {
        let mut chirps: Vec<Chirp> = self
            .chirps
            .iter()
            .filter(|chirp| author.is_none_or(|author| chirp.user_id == *author))
            .map(|chirp| chirp.value().clone())
            .collect();

        chirps.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        if order == SortOrder::Desc {
            chirps.reverse();
        }
        Ok(chirps)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Chirp>, StoreError> {
        Ok(self.chirps.get(id).map(|chirp| chirp.value().clone()))
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool, StoreError> {
        Ok(self.chirps.remove(id).is_some())
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let count = self.chirps.len() as u64;
        self.chirps.clear();
        Ok(count)
    }
}
