use crate::domain::{resolve_network, Decimal, NetworkKey};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Network assumed for events that carry no recognizable label.
    pub default_network: NetworkKey,
    /// Maximum relative amount difference for a match, e.g. 0.25 for 25%.
    pub amount_tolerance: Decimal,
    pub price_api_url: String,
    pub price_refresh_secs: u64,
    pub price_timeout_ms: u64,
    /// Static price overrides, e.g. `avalanche=25,polygon=0.5`.
    pub static_native_prices: HashMap<NetworkKey, Decimal>,
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
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let default_network = match env_map.get("DEFAULT_NETWORK") {
            None => NetworkKey::Avalanche,
            Some(label) => {
                let resolved = resolve_network(Some(label), NetworkKey::Avalanche).key;
                // resolve_network falls back silently; reject labels that
                // only "resolved" because of the fallback.
                if resolved == NetworkKey::Avalanche
                    && resolve_network(Some(label), NetworkKey::Ethereum).key
                        == NetworkKey::Ethereum
                {
                    return Err(ConfigError::InvalidValue(
                        "DEFAULT_NETWORK".to_string(),
                        format!("unrecognized network label {:?}", label),
                    ));
                }
                resolved
            }
        };

        let amount_tolerance = parse_decimal(&env_map, "AMOUNT_TOLERANCE", "0.25")?;
        if !amount_tolerance.is_positive() {
            return Err(ConfigError::InvalidValue(
                "AMOUNT_TOLERANCE".to_string(),
                "must be positive".to_string(),
            ));
        }

        let price_api_url = env_map
            .get("PRICE_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.coingecko.com/api/v3".to_string());

        let price_refresh_secs = parse_u64(&env_map, "PRICE_REFRESH_SECS", "60")?;
        let price_timeout_ms = parse_u64(&env_map, "PRICE_TIMEOUT_MS", "3000")?;

        let static_native_prices = parse_static_prices(&env_map)?;

        Ok(Config {
            port,
            database_path,
            default_network,
            amount_tolerance,
            price_api_url,
            price_refresh_secs,
            price_timeout_ms,
            static_native_prices,
        })
    }
}

fn parse_u64(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<u64, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<u64>()
        .map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a valid u64".to_string())
        })
}

fn parse_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    let raw = env_map.get(key).map(|s| s.as_str()).unwrap_or(default);
    Decimal::from_str_canonical(raw)
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

/// Parse `STATIC_NATIVE_PRICES` of the form `network=price,network=price`.
fn parse_static_prices(
    env_map: &HashMap<String, String>,
) -> Result<HashMap<NetworkKey, Decimal>, ConfigError> {
    let Some(raw) = env_map.get("STATIC_NATIVE_PRICES") else {
        return Ok(HashMap::new());
    };

    let mut prices = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((network_raw, price_raw)) = pair.split_once('=') else {
            return Err(ConfigError::InvalidValue(
                "STATIC_NATIVE_PRICES".to_string(),
                format!("expected network=price, got {:?}", pair),
            ));
        };
        let network = NetworkKey::from_canonical(network_raw.trim()).ok_or_else(|| {
            ConfigError::InvalidValue(
                "STATIC_NATIVE_PRICES".to_string(),
                format!("unknown network {:?}", network_raw.trim()),
            )
        })?;
        let price = Decimal::from_str_canonical(price_raw.trim()).map_err(|e| {
            ConfigError::InvalidValue("STATIC_NATIVE_PRICES".to_string(), e.to_string())
        })?;
        if !price.is_positive() {
            return Err(ConfigError::InvalidValue(
                "STATIC_NATIVE_PRICES".to_string(),
                format!("price for {} must be positive", network),
            ));
        }
        prices.insert(network, price);
    }
    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_network, NetworkKey::Avalanche);
        assert_eq!(config.amount_tolerance.to_canonical_string(), "0.25");
        assert_eq!(config.price_refresh_secs, 60);
        assert!(config.static_native_prices.is_empty());
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_default_network_aliases() {
        let mut env_map = setup_required_env();
        env_map.insert("DEFAULT_NETWORK".to_string(), "arb".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.default_network, NetworkKey::Arbitrum);
    }

    #[test]
    fn test_unknown_default_network_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("DEFAULT_NETWORK".to_string(), "dogechain".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DEFAULT_NETWORK"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("AMOUNT_TOLERANCE".to_string(), "-0.1".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "AMOUNT_TOLERANCE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_static_prices_parsed() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "STATIC_NATIVE_PRICES".to_string(),
            "avalanche=30, polygon=0.4".to_string(),
        );
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(
            config.static_native_prices[&NetworkKey::Avalanche].to_canonical_string(),
            "30"
        );
        assert_eq!(
            config.static_native_prices[&NetworkKey::Polygon].to_canonical_string(),
            "0.4"
        );
    }

    #[test]
    fn test_static_prices_malformed_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("STATIC_NATIVE_PRICES".to_string(), "avalanche:30".to_string());
        assert!(matches!(
            Config::from_env_map(env_map),
            Err(ConfigError::InvalidValue(_, _))
        ));

        let mut env_map = setup_required_env();
        env_map.insert("STATIC_NATIVE_PRICES".to_string(), "mars=30".to_string());
        assert!(matches!(
            Config::from_env_map(env_map),
            Err(ConfigError::InvalidValue(_, _))
        ));
    }
}
