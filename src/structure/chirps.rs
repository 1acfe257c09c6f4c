use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct Chirp {
    pub id: ObjectId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub user_id: ObjectId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Deserialize)]
pub struct NewChirpRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ChirpListQuery {
    pub author_id: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Debug, Serialize)]
pub struct ChirpResponse {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub user_id: String,
}

impl From<Chirp> for ChirpResponse {
    fn from(chirp: Chirp) -> Self {
        ChirpResponse {
            id: chirp.id.to_hex(),
            created_at: chirp.created_at,
            updated_at: chirp.updated_at,
            body: chirp.body,
            user_id: chirp.user_id.to_hex(),
        }
    }
}
