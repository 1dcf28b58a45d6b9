use config::{Config, ConfigError, Environment, File};
use interestlens_core::scoring::ScoringWeights;
use interestlens_core::{CacheConfig, CacheTtls, ScoringConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub collaborators: CollaboratorConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheSettings {
    pub item_ttl_seconds: u64,
    pub article_ttl_seconds: u64,
    pub authenticity_ttl_seconds: u64,
    pub preview_ttl_seconds: u64,
    #[serde(default)]
    pub coalesce_misses: bool,
    pub cleanup_interval_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            item_ttl_seconds: 3600,
            article_ttl_seconds: 3600,
            authenticity_ttl_seconds: 3600,
            preview_ttl_seconds: 900,
            coalesce_misses: false,
            cleanup_interval_seconds: 60,
        }
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttls: CacheTtls {
                item: Duration::from_secs(self.item_ttl_seconds),
                article: Duration::from_secs(self.article_ttl_seconds),
                authenticity: Duration::from_secs(self.authenticity_ttl_seconds),
                preview: Duration::from_secs(self.preview_ttl_seconds),
            },
            coalesce_misses: self.coalesce_misses,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScoringSettings {
    pub voice_complete: ScoringWeights,
    pub voice_incomplete: ScoringWeights,
    pub result_limit: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            voice_complete: ScoringWeights::VOICE_COMPLETE,
            voice_incomplete: ScoringWeights::VOICE_INCOMPLETE,
            result_limit: 10,
        }
    }
}

impl ScoringSettings {
    pub fn to_scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            voice_complete: self.voice_complete,
            voice_incomplete: self.voice_incomplete,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CollaboratorConfig {
    /// OpenAI-compatible embeddings endpoint; embeddings are skipped when unset
    pub embedding_endpoint: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub timeout_seconds: u64,
    pub max_concurrent: usize,
    pub user_agent: String,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            embedding_endpoint: None,
            embedding_api_key: None,
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_seconds: 10,
            max_concurrent: 5,
            user_agent: "Mozilla/5.0 (compatible; InterestLens/0.1)".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    pub ttl_seconds: u64,
    pub max_active: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 1800,
            max_active: 100,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ActivityConfig {
    pub ttl_seconds: u64,
    pub max_records: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 60 * 60 * 24 * 30,
            max_records: 10_000,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            cache: CacheSettings::default(),
            scoring: ScoringSettings::default(),
            collaborators: CollaboratorConfig::default(),
            sessions: SessionConfig::default(),
            activity: ActivityConfig::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let builder = Self::defaults()?
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false));

        Self::finish(builder)
    }

    /// Loads settings from an explicit file instead of the `config/` directory
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let builder = Self::defaults()?.add_source(File::with_name(path).required(true));
        Self::finish(builder)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = Settings::default();
        let complete = defaults.scoring.voice_complete;
        let incomplete = defaults.scoring.voice_incomplete;

        Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", u64::from(defaults.server.port))?
            .set_default("cache.item_ttl_seconds", defaults.cache.item_ttl_seconds)?
            .set_default("cache.article_ttl_seconds", defaults.cache.article_ttl_seconds)?
            .set_default(
                "cache.authenticity_ttl_seconds",
                defaults.cache.authenticity_ttl_seconds,
            )?
            .set_default("cache.preview_ttl_seconds", defaults.cache.preview_ttl_seconds)?
            .set_default("cache.coalesce_misses", defaults.cache.coalesce_misses)?
            .set_default(
                "cache.cleanup_interval_seconds",
                defaults.cache.cleanup_interval_seconds,
            )?
            .set_default("scoring.voice_complete.text", complete.text)?
            .set_default("scoring.voice_complete.topic", complete.topic)?
            .set_default("scoring.voice_complete.voice", complete.voice)?
            .set_default("scoring.voice_complete.prominence", complete.prominence)?
            .set_default("scoring.voice_incomplete.text", incomplete.text)?
            .set_default("scoring.voice_incomplete.topic", incomplete.topic)?
            .set_default("scoring.voice_incomplete.voice", incomplete.voice)?
            .set_default("scoring.voice_incomplete.prominence", incomplete.prominence)?
            .set_default("scoring.result_limit", defaults.scoring.result_limit as u64)?
            .set_default(
                "collaborators.embedding_model",
                defaults.collaborators.embedding_model,
            )?
            .set_default(
                "collaborators.timeout_seconds",
                defaults.collaborators.timeout_seconds,
            )?
            .set_default(
                "collaborators.max_concurrent",
                defaults.collaborators.max_concurrent as u64,
            )?
            .set_default("collaborators.user_agent", defaults.collaborators.user_agent)?
            .set_default("sessions.ttl_seconds", defaults.sessions.ttl_seconds)?
            .set_default("sessions.max_active", defaults.sessions.max_active as u64)?
            .set_default("activity.ttl_seconds", defaults.activity.ttl_seconds)?
            .set_default("activity.max_records", defaults.activity.max_records as u64)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let settings: Settings = builder
            .add_source(Environment::with_prefix("INTERESTLENS").separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, weights) in [
            ("voice_complete", &self.scoring.voice_complete),
            ("voice_incomplete", &self.scoring.voice_incomplete),
        ] {
            if !weights.is_normalized() {
                return Err(ConfigError::Message(format!(
                    "scoring.{name} weights must sum to 1.0, got {}",
                    weights.total()
                )));
            }
        }

        if self.scoring.result_limit == 0 {
            return Err(ConfigError::Message(
                "scoring.result_limit must be at least 1".into(),
            ));
        }

        if !(1..=10).contains(&self.collaborators.max_concurrent) {
            return Err(ConfigError::Message(
                "collaborators.max_concurrent must be between 1 and 10".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.cache.preview_ttl_seconds, 900);
        assert_eq!(settings.sessions.ttl_seconds, 1800);
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[scoring]
result_limit = 5

[scoring.voice_incomplete]
text = 0.25
topic = 0.50
voice = 0.10
prominence = 0.15
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.scoring.result_limit, 5);
        assert_eq!(settings.scoring.voice_incomplete.topic, 0.50);
        assert_eq!(settings.scoring.voice_complete, ScoringWeights::VOICE_COMPLETE);
    }

    #[test]
    fn test_unnormalized_weights_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[scoring.voice_complete]\ntext = 0.9\ntopic = 0.9\nvoice = 0.1\nprominence = 0.1"
        )
        .unwrap();

        let err = Settings::from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("must sum to 1.0"));
    }
}
