use rand::TryRngCore;
use rand::rngs::OsRng;

pub const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
#[error("secure random source unavailable: {0}")]
pub struct EntropyError(String);

/// Generate a random 256-bit refresh token, hex encoded.
pub fn generate_refresh_token() -> Result<String, EntropyError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| EntropyError(e.to_string()))?;
    Ok(hex::encode(bytes))
}
