use std::env;
use std::fmt;

use chrono::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("MONGO_DB_URL must be set outside the dev platform")]
    MissingDatabase,
}

#[derive(Clone)]
pub struct Config {
    pub platform: String,
    pub port: u16,
    pub filepath_root: String,
    pub mongo_db_url: Option<String>,
    pub jwt_secret: String,
    pub polka_key: String,
    pub bcrypt_cost: u32,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl Config {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let platform = required("PLATFORM")?;
        let jwt_secret = required("JWT_SECRET")?;
        let polka_key = required("POLKA_KEY")?;

        let mongo_db_url = lookup("MONGO_DB_URL").filter(|url| !url.is_empty());
        if mongo_db_url.is_none() && platform != "dev" {
            return Err(ConfigError::MissingDatabase);
        }

        let port = parse_or(&lookup, "PORT", 8080)?;
        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }
        let access_token_ttl = ttl_or(
            &lookup,
            "ACCESS_TOKEN_TTL_SECS",
            60 * 60,
            Duration::try_seconds,
        )?;
        let refresh_token_ttl =
            ttl_or(&lookup, "REFRESH_TOKEN_TTL_DAYS", 60, Duration::try_days)?;

        Ok(Self {
            platform,
            port,
            filepath_root: lookup("FILEPATH_ROOT").unwrap_or_else(|| ".".to_string()),
            mongo_db_url,
            jwt_secret,
            polka_key,
            bcrypt_cost,
            access_token_ttl,
            refresh_token_ttl,
        })
    }

    pub fn is_dev(&self) -> bool {
        self.platform == "dev"
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}

/// A token lifetime must be positive and no longer than
/// [`Constants::MAX_TOKEN_TTL_DAYS`], so `now + ttl` always stays in range.
fn ttl_or<F>(
    lookup: &F,
    name: &'static str,
    default: i64,
    to_duration: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let amount: i64 = parse_or(lookup, name, default)?;
    let max = Duration::days(Constants::MAX_TOKEN_TTL_DAYS);
    to_duration(amount)
        .filter(|ttl| *ttl > Duration::zero() && *ttl <= max)
        .ok_or_else(|| ConfigError::Invalid {
            name,
            value: amount.to_string(),
        })
}

// Secrets stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("platform", &self.platform)
            .field("port", &self.port)
            .field("filepath_root", &self.filepath_root)
            .field("mongo_db_url", &self.mongo_db_url.as_ref().map(|_| "<redacted>"))
            .field("jwt_secret", &"<redacted>")
            .field("polka_key", &"<redacted>")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

pub struct Constants;

impl Constants {
    pub const DB_NAME: &'static str = "chirpy";

    pub const USERS_COLLECTION: &'static str = "Users";

    pub const CHIRPS_COLLECTION: &'static str = "Chirps";

    pub const REFRESH_TOKENS_COLLECTION: &'static str = "RefreshTokens";

    pub const TOKEN_ISSUER: &'static str = "chirpy";

    pub const MAX_CHIRP_LENGTH: usize = 140;

    /// bcrypt reads 72 bytes of input and the terminating NUL counts
    /// towards them.
    pub const MAX_PASSWORD_BYTES: usize = 71;

    pub const MAX_TOKEN_TTL_DAYS: i64 = 100 * 365;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn loads_defaults_for_dev_platform() {
        let config = Config::from_lookup(lookup_from(&[
            ("PLATFORM", "dev"),
            ("JWT_SECRET", "s3cret"),
            ("POLKA_KEY", "f271c81ff7084ee5b99a5091b42d486e"),
        ]))
        .unwrap();

        assert!(config.is_dev());
        assert_eq!(config.port, 8080);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.access_token_ttl, Duration::hours(1));
        assert_eq!(config.refresh_token_ttl, Duration::days(60));
        assert!(config.mongo_db_url.is_none());
    }

    #[test]
    fn rejects_missing_secret() {
        let err = Config::from_lookup(lookup_from(&[("PLATFORM", "dev"), ("POLKA_KEY", "k")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn requires_database_outside_dev() {
        let err = Config::from_lookup(lookup_from(&[
            ("PLATFORM", "prod"),
            ("JWT_SECRET", "s"),
            ("POLKA_KEY", "k"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabase));
    }

    #[test]
    fn rejects_unparsable_port() {
        let err = Config::from_lookup(lookup_from(&[
            ("PLATFORM", "dev"),
            ("JWT_SECRET", "s"),
            ("POLKA_KEY", "k"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    fn with_ttl(name: &str, value: &str) -> Result<Config, ConfigError> {
        Config::from_lookup(lookup_from(&[
            ("PLATFORM", "dev"),
            ("JWT_SECRET", "s"),
            ("POLKA_KEY", "k"),
            (name, value),
        ]))
    }

    #[test]
    fn rejects_non_positive_ttls() {
        for value in ["0", "-5"] {
            assert!(matches!(
                with_ttl("ACCESS_TOKEN_TTL_SECS", value),
                Err(ConfigError::Invalid { name: "ACCESS_TOKEN_TTL_SECS", .. })
            ));
            assert!(matches!(
                with_ttl("REFRESH_TOKEN_TTL_DAYS", value),
                Err(ConfigError::Invalid { name: "REFRESH_TOKEN_TTL_DAYS", .. })
            ));
        }
    }

    #[test]
    fn rejects_ttls_out_of_range() {
        assert!(matches!(
            with_ttl("REFRESH_TOKEN_TTL_DAYS", &i64::MAX.to_string()),
            Err(ConfigError::Invalid { name: "REFRESH_TOKEN_TTL_DAYS", .. })
        ));
        assert!(matches!(
            with_ttl("ACCESS_TOKEN_TTL_SECS", &i64::MAX.to_string()),
            Err(ConfigError::Invalid { name: "ACCESS_TOKEN_TTL_SECS", .. })
        ));
        // representable as a Duration but far past the calendar
        assert!(matches!(
            with_ttl("REFRESH_TOKEN_TTL_DAYS", "100000000"),
            Err(ConfigError::Invalid { name: "REFRESH_TOKEN_TTL_DAYS", .. })
        ));
        assert_eq!(
            with_ttl("REFRESH_TOKEN_TTL_DAYS", "30").unwrap().refresh_token_ttl,
            Duration::days(30)
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = Config::from_lookup(lookup_from(&[
            ("PLATFORM", "dev"),
            ("JWT_SECRET", "very-secret-value"),
            ("POLKA_KEY", "polka-key-value"),
        ]))
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("very-secret-value"));
        assert!(!rendered.contains("polka-key-value"));
    }
}
