use crate::engine::FeeBasis;
use crate::marketplace::TrendyolConfig;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub trendyol_seller_id: u64,
    pub trendyol_api_key: String,
    pub trendyol_api_secret: String,
    pub trendyol_api_token: Option<String>,
    pub trendyol_base_url: String,
    pub trendyol_user_agent: Option<String>,
    pub trendyol_storefront_code: String,
    pub trendyol_timeout_seconds: u64,
    pub trendyol_min_request_gap_ms: u64,
    pub fee_basis: FeeBasis,
    pub job_lock_ttl_seconds: i64,
    pub autopilot_interval_secs: u64,
    pub poll_interval_secs: u64,
    pub batch_concurrency: usize,
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 8080u16, "must be a valid u16")?;

        let database_path = required(&env_map, "DATABASE_PATH")?;

        let trendyol_seller_id = required(&env_map, "TRENDYOL_SELLER_ID")?
            .trim()
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "TRENDYOL_SELLER_ID".to_string(),
                    "must be a numeric seller id".to_string(),
                )
            })?;
        let trendyol_api_key = required(&env_map, "TRENDYOL_API_KEY")?;
        let trendyol_api_secret = required(&env_map, "TRENDYOL_API_SECRET")?;
        let trendyol_api_token = optional(&env_map, "TRENDYOL_API_TOKEN");
        let trendyol_base_url = optional(&env_map, "TRENDYOL_BASE_URL")
            .unwrap_or_else(|| "https://apigw.trendyol.com".to_string());
        let trendyol_user_agent = optional(&env_map, "TRENDYOL_USER_AGENT");
        let trendyol_storefront_code =
            optional(&env_map, "TRENDYOL_STOREFRONT_CODE").unwrap_or_else(|| "SA".to_string());
        let trendyol_timeout_seconds = parse_or(
            &env_map,
            "TRENDYOL_TIMEOUT_SECONDS",
            30u64,
            "must be a whole number of seconds",
        )?;
        if trendyol_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "TRENDYOL_TIMEOUT_SECONDS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let trendyol_min_request_gap_ms = parse_or(
            &env_map,
            "TRENDYOL_MIN_REQUEST_GAP_MS",
            250u64,
            "must be a whole number of milliseconds",
        )?;

        let fee_basis = FeeBasis::from_str(
            env_map
                .get("FEE_BASIS")
                .map(|s| s.trim())
                .unwrap_or("cost"),
        )
        .map_err(|msg| ConfigError::InvalidValue("FEE_BASIS".to_string(), msg))?;

        let job_lock_ttl_seconds = parse_or(
            &env_map,
            "JOB_LOCK_TTL_SECONDS",
            900i64,
            "must be a valid i64",
        )?;
        if job_lock_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "JOB_LOCK_TTL_SECONDS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let autopilot_interval_secs = parse_or(
            &env_map,
            "AUTOPILOT_INTERVAL_SECS",
            0u64,
            "must be a whole number of seconds (0 disables)",
        )?;
        let poll_interval_secs = parse_or(
            &env_map,
            "POLL_INTERVAL_SECS",
            0u64,
            "must be a whole number of seconds (0 disables)",
        )?;

        let batch_concurrency = parse_or(
            &env_map,
            "BATCH_CONCURRENCY",
            4usize,
            "must be a positive integer",
        )?;
        if batch_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "BATCH_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let telegram = match (
            optional(&env_map, "TELEGRAM_BOT_TOKEN"),
            optional(&env_map, "TELEGRAM_CHAT_ID"),
        ) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingEnv("TELEGRAM_CHAT_ID".to_string())),
            (None, Some(_)) => {
                return Err(ConfigError::MissingEnv("TELEGRAM_BOT_TOKEN".to_string()))
            }
        };

        Ok(Config {
            port,
            database_path,
            trendyol_seller_id,
            trendyol_api_key,
            trendyol_api_secret,
            trendyol_api_token,
            trendyol_base_url,
            trendyol_user_agent,
            trendyol_storefront_code,
            trendyol_timeout_seconds,
            trendyol_min_request_gap_ms,
            fee_basis,
            job_lock_ttl_seconds,
            autopilot_interval_secs,
            poll_interval_secs,
            batch_concurrency,
            telegram,
        })
    }

    pub fn trendyol_config(&self) -> TrendyolConfig {
        let mut config = TrendyolConfig::new(
            self.trendyol_seller_id,
            self.trendyol_api_key.clone(),
            self.trendyol_api_secret.clone(),
        );
        config.base_url = self.trendyol_base_url.clone();
        config.api_token = self.trendyol_api_token.clone();
        config.user_agent = self.trendyol_user_agent.clone();
        config.storefront_code = self.trendyol_storefront_code.clone();
        config.timeout = Duration::from_secs(self.trendyol_timeout_seconds);
        config.min_request_gap = Duration::from_millis(self.trendyol_min_request_gap_ms);
        config
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    optional(env_map, key).ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

/// Blank values count as unset.
fn optional(env_map: &HashMap<String, String>, key: &str) -> Option<String> {
    env_map
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    hint: &str,
) -> Result<T, ConfigError> {
    match optional(env_map, key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), hint.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map.insert("TRENDYOL_SELLER_ID".to_string(), "123456".to_string());
        map.insert("TRENDYOL_API_KEY".to_string(), "key".to_string());
        map.insert("TRENDYOL_API_SECRET".to_string(), "secret".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.trendyol_seller_id, 123456);
        assert_eq!(config.trendyol_base_url, "https://apigw.trendyol.com");
        assert_eq!(config.trendyol_storefront_code, "SA");
        assert_eq!(config.fee_basis, FeeBasis::CostAnchored);
        assert_eq!(config.job_lock_ttl_seconds, 900);
        assert_eq!(config.autopilot_interval_secs, 0);
        assert_eq!(config.poll_interval_secs, 0);
        assert_eq!(config.batch_concurrency, 4);
        assert!(config.telegram.is_none());
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_trendyol_credentials() {
        for key in ["TRENDYOL_SELLER_ID", "TRENDYOL_API_KEY", "TRENDYOL_API_SECRET"] {
            let mut env_map = setup_required_env();
            env_map.remove(key);
            match Config::from_env_map(env_map) {
                Err(ConfigError::MissingEnv(s)) => assert_eq!(s, key),
                _ => panic!("Expected MissingEnv error for {}", key),
            }
        }
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let mut env_map = setup_required_env();
        env_map.insert("TRENDYOL_API_SECRET".to_string(), "   ".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "TRENDYOL_API_SECRET"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_seller_id() {
        let mut env_map = setup_required_env();
        env_map.insert("TRENDYOL_SELLER_ID".to_string(), "abc".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "TRENDYOL_SELLER_ID"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_fee_basis() {
        let mut env_map = setup_required_env();
        env_map.insert("FEE_BASIS".to_string(), "gross".to_string());
        let config = Config::from_env_map(env_map.clone()).unwrap();
        assert_eq!(config.fee_basis, FeeBasis::GrossRevenue);

        env_map.insert("FEE_BASIS".to_string(), "net".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "FEE_BASIS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_batch_concurrency_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("BATCH_CONCURRENCY".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "BATCH_CONCURRENCY"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_non_positive_lock_ttl_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("JOB_LOCK_TTL_SECONDS".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "JOB_LOCK_TTL_SECONDS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_telegram_requires_both_values() {
        let mut env_map = setup_required_env();
        env_map.insert("TELEGRAM_BOT_TOKEN".to_string(), "bot".to_string());
        match Config::from_env_map(env_map.clone()) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "TELEGRAM_CHAT_ID"),
            _ => panic!("Expected MissingEnv error"),
        }

        env_map.insert("TELEGRAM_CHAT_ID".to_string(), "-100".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(
            config.telegram,
            Some(TelegramConfig {
                bot_token: "bot".to_string(),
                chat_id: "-100".to_string(),
            })
        );
    }

    #[test]
    fn test_trendyol_config_carries_overrides() {
        let mut env_map = setup_required_env();
        env_map.insert("TRENDYOL_BASE_URL".to_string(), "http://localhost:9".to_string());
        env_map.insert("TRENDYOL_STOREFRONT_CODE".to_string(), "AE".to_string());
        env_map.insert("TRENDYOL_TIMEOUT_SECONDS".to_string(), "5".to_string());
        env_map.insert("TRENDYOL_MIN_REQUEST_GAP_MS".to_string(), "0".to_string());
        let trendyol = Config::from_env_map(env_map).unwrap().trendyol_config();
        assert_eq!(trendyol.seller_id, 123456);
        assert_eq!(trendyol.base_url, "http://localhost:9");
        assert_eq!(trendyol.storefront_code, "AE");
        assert_eq!(trendyol.timeout, Duration::from_secs(5));
        assert_eq!(trendyol.min_request_gap, Duration::ZERO);
        assert_eq!(trendyol.user_agent(), "123456 - SelfIntegration");
    }
}
