use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::config::Constants;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JwtError {
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Sign an access token for `user_id`, valid from `now` for `ttl`.
pub fn make_jwt(
    user_id: &ObjectId,
    secret: &[u8],
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<String, JwtError> {
    let claims = Claims {
        iss: Constants::TOKEN_ISSUER.to_string(),
        sub: user_id.to_hex(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| JwtError::Signing(e.to_string()))
}

/// Check signature and expiry of an access token and return its subject.
///
/// Expiry is judged against `now`, not the wall clock. A token whose issuer
/// is not ours is reported the same way as a bad signature.
pub fn validate_jwt(token: &str, secret: &[u8], now: DateTime<Utc>) -> Result<ObjectId, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_issuer(&[Constants::TOKEN_ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation).map_err(
        |e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidIssuer => JwtError::InvalidSignature,
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Malformed,
        },
    )?;

    if now.timestamp() >= data.claims.exp {
        return Err(JwtError::Expired);
    }

    ObjectId::parse_str(&data.claims.sub).map_err(|_| JwtError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-signing-secret";

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn round_trips_subject() {
        let user_id = ObjectId::new();
        let token = make_jwt(&user_id, SECRET, start(), Duration::hours(1)).unwrap();
        let subject = validate_jwt(&token, SECRET, start() + Duration::minutes(59)).unwrap();
        assert_eq!(subject, user_id);
    }

    #[test]
    fn expires_at_ttl_boundary() {
        let user_id = ObjectId::new();
        let token = make_jwt(&user_id, SECRET, start(), Duration::hours(1)).unwrap();
        assert_eq!(
            validate_jwt(&token, SECRET, start() + Duration::hours(1)),
            Err(JwtError::Expired)
        );
        assert_eq!(
            validate_jwt(&token, SECRET, start() + Duration::days(2)),
            Err(JwtError::Expired)
        );
    }

    #[test]
    fn rejects_other_secret() {
        let token = make_jwt(&ObjectId::new(), SECRET, start(), Duration::hours(1)).unwrap();
        assert_eq!(
            validate_jwt(&token, b"another-secret", start()),
            Err(JwtError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_tampered_payload() {
        let token = make_jwt(&ObjectId::new(), SECRET, start(), Duration::hours(1)).unwrap();
        let other = make_jwt(&ObjectId::new(), SECRET, start(), Duration::hours(1)).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        assert_eq!(
            validate_jwt(&forged, SECRET, start()),
            Err(JwtError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            validate_jwt("not.a.jwt", SECRET, start()),
            Err(JwtError::Malformed)
        );
        assert_eq!(validate_jwt("", SECRET, start()), Err(JwtError::Malformed));
    }

    #[test]
    fn signing_is_deterministic() {
        let user_id = ObjectId::new();
        let first = make_jwt(&user_id, SECRET, start(), Duration::hours(1)).unwrap();
        let second = make_jwt(&user_id, SECRET, start(), Duration::hours(1)).unwrap();
        assert_eq!(first, second);
        assert!(!first.contains("test-signing-secret"));
    }
}
