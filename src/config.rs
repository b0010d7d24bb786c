use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_TABLE: &str = "Meta Eleição";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Remote {
        base_url: String,
        table: String,
        api_key: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub source: DataSource,
    pub cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let cache_ttl = lookup("APP_CACHE_TTL_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);

        let source = match lookup("APP_DATA_URL").filter(|url| !url.trim().is_empty()) {
            Some(base_url) => DataSource::Remote {
                base_url,
                table: lookup("APP_DATA_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
                api_key: lookup("APP_DATA_KEY"),
            },
            None => DataSource::File(
                lookup("APP_DATA_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("data/cities.json")),
            ),
        };

        Self {
            port,
            source,
            cache_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_local_file() {
        let config = config_from(&[]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.cache_ttl, DEFAULT_CACHE_TTL);
        assert_eq!(config.source, DataSource::File(PathBuf::from("data/cities.json")));
    }

    #[test]
    fn remote_url_wins_over_path() {
        let config = config_from(&[
            ("APP_DATA_URL", "https://example.supabase.co"),
            ("APP_DATA_PATH", "ignored.json"),
            ("APP_DATA_KEY", "anon"),
            ("APP_CACHE_TTL_SECS", "30"),
            ("PORT", "not-a-port"),
        ]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(
            config.source,
            DataSource::Remote {
                base_url: "https://example.supabase.co".to_string(),
                table: DEFAULT_TABLE.to_string(),
                api_key: Some("anon".to_string()),
            }
        );
    }
}
