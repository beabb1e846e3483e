/// 환경 변수 기반 설정
// region:    --- Imports
use crate::bidding::rules::BidPolicy;
use std::collections::HashMap;
use thiserror::Error;

// endregion: --- Imports

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub kafka_brokers: Option<String>,
    pub sweep_interval_secs: u64,
    pub bid_policy: BidPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: None,
            kafka_brokers: None,
            sweep_interval_secs: 30,
            bid_policy: BidPolicy::AtLeastIncrement,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("3000")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_url = env_map
            .get("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .cloned();

        let kafka_brokers = env_map
            .get("KAFKA_BROKERS")
            .filter(|s| !s.trim().is_empty())
            .cloned();

        let sweep_interval_secs = env_map
            .get("SWEEP_INTERVAL_SECS")
            .map(|s| s.as_str())
            .unwrap_or("30")
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "SWEEP_INTERVAL_SECS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let bid_policy = match env_map
            .get("BID_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("at_least")
        {
            "at_least" => BidPolicy::AtLeastIncrement,
            "exact" => BidPolicy::ExactIncrement,
            other => {
                return Err(ConfigError::InvalidValue(
                    "BID_POLICY".to_string(),
                    format!("must be at_least or exact, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            database_url,
            kafka_brokers,
            sweep_interval_secs,
            bid_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(HashMap::new()).unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.sweep_interval_secs, 30);
        assert_eq!(config.bid_policy, BidPolicy::AtLeastIncrement);
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = HashMap::new();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_sweep_interval() {
        let mut env_map = HashMap::new();
        env_map.insert("SWEEP_INTERVAL_SECS".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SWEEP_INTERVAL_SECS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_bid_policy() {
        let mut env_map = HashMap::new();
        env_map.insert("BID_POLICY".to_string(), "exact".to_string());
        env_map.insert("DATABASE_URL".to_string(), "  ".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.bid_policy, BidPolicy::ExactIncrement);
        assert!(config.database_url.is_none());

        let mut env_map = HashMap::new();
        env_map.insert("BID_POLICY".to_string(), "dutch".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "BID_POLICY"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
