use std::{env, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};

use crate::{
    room::{IdleBasis, RegistryConfig},
    search::youtube::DEFAULT_API_BASE,
};

/// Process configuration, read from the environment (`.env` honoured).
#[derive(Debug, Clone)]
pub struct Config {
    pub address:         String,
    pub request_timeout: Duration,
    pub youtube:         YoutubeConfig,
    pub registry:        RegistryConfig,
}

#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    pub token:    String,
    pub limit:    u32,
    pub api_base: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let registry = RegistryConfig::default()
            .subscriber_buffer(parse(&get, "SUBSCRIBER_BUFFER", 10)?)
            .cleanup_interval(Duration::from_secs(parse(&get, "CLEANUP_INTERVAL", 60)?))
            .idle_ttl(Duration::from_secs(parse(&get, "EMPTY_ROOM_TTL", 300)?))
            .idle_basis(
                var("ROOM_IDLE_BASIS", "created")
                    .parse::<IdleBasis>()
                    .map_err(|e| anyhow!("ROOM_IDLE_BASIS: {e}"))?,
            );

        Ok(Self {
            address: var("ADDRESS", "0.0.0.0:8080"),
            request_timeout: Duration::from_secs(parse(&get, "REQUEST_TIMEOUT", 30)?),
            youtube: YoutubeConfig {
                token: var("TOKEN", ""),
                limit: parse(&get, "LIMIT", 10)?,
                api_base: var("YOUTUBE_API_BASE", DEFAULT_API_BASE),
            },
            registry,
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value `{raw}` for {key}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.address, "0.0.0.0:8080");
        assert_eq!(cfg.youtube.limit, 10);
        assert!(cfg.youtube.token.is_empty());
        assert_eq!(cfg.registry.subscriber_buffer, 10);
        assert_eq!(cfg.registry.cleanup_interval, Duration::from_secs(60));
        assert_eq!(cfg.registry.idle_ttl, Duration::from_secs(300));
        assert_eq!(cfg.registry.idle_basis, IdleBasis::SinceCreation);
    }

    #[test]
    fn overrides() {
        let cfg = load(&[
            ("ADDRESS", "127.0.0.1:9000"),
            ("TOKEN", "k"),
            ("LIMIT", "25"),
            ("EMPTY_ROOM_TTL", "30"),
            ("ROOM_IDLE_BASIS", "activity"),
        ])
        .unwrap();
        assert_eq!(cfg.address, "127.0.0.1:9000");
        assert_eq!(cfg.youtube.token, "k");
        assert_eq!(cfg.youtube.limit, 25);
        assert_eq!(cfg.registry.idle_ttl, Duration::from_secs(30));
        assert_eq!(cfg.registry.idle_basis, IdleBasis::SinceLastActivity);
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        let err = load(&[("LIMIT", "many")]).unwrap_err();
        assert!(format!("{err:#}").contains("LIMIT"));
        assert!(load(&[("ROOM_IDLE_BASIS", "never")]).is_err());
    }
}
