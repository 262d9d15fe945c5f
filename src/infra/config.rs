//! Centralized configuration (environment variables + defaults).
//!
//! Everything the process needs at startup is resolved once into a [`Config`]
//! value and handed to constructors. Nothing here is read lazily from the
//! environment later on.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_GAME_TRAFFIC_FREQUENCY_SECS: u64 = 60;
pub const DEFAULT_GAME_TRAFFIC_LIMIT_PLAY_TIME_PER_FREQ: u32 = 30;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be a valid {expected} (got {value:?})")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("GAME_TRAFFIC_LIMIT_PLAY_TIME_PER_FREQ must not be negative (got {0})")]
    NegativePlayTimeCap(i64),
    #[error("GAME_TRAFFIC_FREQUENCY must be greater than zero")]
    ZeroTrafficPeriod,
}

/// Settings for the background traffic simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficConfig {
    pub period: Duration,
    /// Upper bound (inclusive) of the play time added to a row per tick, in minutes.
    pub play_time_cap: u32,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub store_timeout: Duration,
    pub request_timeout: Duration,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub traffic: TrafficConfig,
}

impl Config {
    /// Reads the process environment (after loading `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL")
            .or_else(|| get("POSTGRESQL_URL"))
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let port = parse_or(get("PORT"), "PORT", "port number", DEFAULT_PORT)?;
        let database_max_connections = parse_or(
            get("DATABASE_MAX_CONNECTIONS"),
            "DATABASE_MAX_CONNECTIONS",
            "u32",
            DEFAULT_MAX_CONNECTIONS,
        )?
        .max(1);
        let store_timeout = parse_or(
            get("STORE_TIMEOUT_SECS"),
            "STORE_TIMEOUT_SECS",
            "number of seconds",
            DEFAULT_STORE_TIMEOUT_SECS,
        )?;
        let request_timeout = parse_or(
            get("REQUEST_TIMEOUT_SECS"),
            "REQUEST_TIMEOUT_SECS",
            "number of seconds",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let token_ttl = parse_or(
            get("TOKEN_TTL_SECS"),
            "TOKEN_TTL_SECS",
            "number of seconds",
            DEFAULT_TOKEN_TTL_SECS,
        )?;

        let period = parse_or(
            get("GAME_TRAFFIC_FREQUENCY"),
            "GAME_TRAFFIC_FREQUENCY",
            "number of seconds",
            DEFAULT_GAME_TRAFFIC_FREQUENCY_SECS,
        )?;
        if period == 0 {
            return Err(ConfigError::ZeroTrafficPeriod);
        }

        // Parsed signed so a negative cap is reported as such rather than as garbage.
        let cap: i64 = parse_or(
            get("GAME_TRAFFIC_LIMIT_PLAY_TIME_PER_FREQ"),
            "GAME_TRAFFIC_LIMIT_PLAY_TIME_PER_FREQ",
            "integer",
            i64::from(DEFAULT_GAME_TRAFFIC_LIMIT_PLAY_TIME_PER_FREQ),
        )?;
        if cap < 0 {
            return Err(ConfigError::NegativePlayTimeCap(cap));
        }
        let play_time_cap = u32::try_from(cap).map_err(|_| ConfigError::Invalid {
            name: "GAME_TRAFFIC_LIMIT_PLAY_TIME_PER_FREQ",
            expected: "u32",
            value: cap.to_string(),
        })?;

        let seed = match get("GAME_TRAFFIC_SEED") {
            Some(raw) => Some(parse(&raw, "GAME_TRAFFIC_SEED", "u64")?),
            None => None,
        };

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            store_timeout: Duration::from_secs(store_timeout),
            request_timeout: Duration::from_secs(request_timeout),
            jwt_secret,
            token_ttl: Duration::from_secs(token_ttl),
            traffic: TrafficConfig {
                period: Duration::from_secs(period),
                play_time_cap,
                seed,
            },
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse<T: std::str::FromStr>(
    raw: &str,
    name: &'static str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value: raw.to_string(),
    })
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => parse(&raw, name, expected),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/games"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let cfg = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.traffic.period, Duration::from_secs(60));
        assert_eq!(cfg.traffic.play_time_cap, 30);
        assert_eq!(cfg.traffic.seed, None);
        assert_eq!(cfg.store_timeout, Duration::from_secs(5));
    }

    #[test]
    fn postgresql_url_is_accepted_as_fallback() {
        let cfg = Config::from_lookup(lookup(&[
            ("POSTGRESQL_URL", "postgres://db/x"),
            ("JWT_SECRET", "s"),
        ]))
        .unwrap();
        assert_eq!(cfg.database_url, "postgres://db/x");
    }

    #[test]
    fn negative_play_time_cap_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("GAME_TRAFFIC_LIMIT_PLAY_TIME_PER_FREQ", "-1"));
        assert_eq!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::NegativePlayTimeCap(-1))
        );
    }

    #[test]
    fn zero_cap_is_allowed_but_zero_period_is_not() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("GAME_TRAFFIC_LIMIT_PLAY_TIME_PER_FREQ", "0"));
        assert_eq!(Config::from_lookup(lookup(&pairs)).unwrap().traffic.play_time_cap, 0);

        pairs.push(("GAME_TRAFFIC_FREQUENCY", "0"));
        assert_eq!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::ZeroTrafficPeriod)
        );
    }

    #[test]
    fn missing_secret_and_garbage_values_are_reported() {
        assert_eq!(
            Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])),
            Err(ConfigError::Missing("JWT_SECRET"))
        );

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
    }
}
