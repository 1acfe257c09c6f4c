//! `Authorization` header parsing.
//!
//! The accepted grammar is `scheme SP credential`. Only the first space
//! separates the two parts; the credential is handed back exactly as sent.

use axum::http::{HeaderMap, header::AUTHORIZATION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    ApiKey,
}

impl AuthScheme {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "Bearer" => Some(AuthScheme::Bearer),
            "ApiKey" => Some(AuthScheme::ApiKey),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub scheme: AuthScheme,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("no authorization header included in request")]
    Missing,

    #[error("malformed authorization header")]
    Malformed,
}

pub fn parse_authorization(raw: &str) -> Result<Credential, HeaderError> {
    let (word, value) = raw.split_once(' ').ok_or(HeaderError::Malformed)?;
    let scheme = AuthScheme::from_word(word).ok_or(HeaderError::Malformed)?;
    if value.is_empty() {
        return Err(HeaderError::Malformed);
    }

    Ok(Credential {
        scheme,
        value: value.to_string(),
    })
}

fn extract(headers: &HeaderMap, expected: AuthScheme) -> Result<String, HeaderError> {
    let raw = headers.get(AUTHORIZATION).ok_or(HeaderError::Missing)?;
    let raw = raw.to_str().map_err(|_| HeaderError::Malformed)?;
    if raw.is_empty() {
        return Err(HeaderError::Missing);
    }

    let credential = parse_authorization(raw)?;
    if credential.scheme != expected {
        return Err(HeaderError::Malformed);
    }
    Ok(credential.value)
}

/// Token presented as `Authorization: Bearer <token>`.
pub fn get_bearer_token(headers: &HeaderMap) -> Result<String, HeaderError> {
    extract(headers, AuthScheme::Bearer)
}

/// Key presented as `Authorization: ApiKey <key>` by machine callers.
pub fn get_api_key(headers: &HeaderMap) -> Result<String, HeaderError> {
    extract(headers, AuthScheme::ApiKey)
}
