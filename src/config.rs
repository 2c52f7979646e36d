use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "virtual-cluster.toml";

/// Main configuration structure for the virtual cluster provider
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Region the control plane lives in
    pub region: String,
    /// Control plane endpoint override
    pub endpoint: Option<String>,
    /// Bearer token sent with every request (optional)
    pub token: Option<String>,
    /// Lifecycle wait settings
    pub timeouts: TimeoutsConfig,
    /// Client-side request rate limiting
    pub rate_limit: RateLimitConfig,
    /// Log level
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeoutsConfig {
    /// Maximum time to wait for a virtual cluster to become RUNNING
    pub create_minutes: u64,
    /// Maximum time to wait for a virtual cluster to become TERMINATED
    pub delete_minutes: u64,
    /// Delay between two status probes
    pub poll_delay_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,
    /// Burst capacity
    pub burst: u32,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            create_minutes: 90,
            delete_minutes: 90,
            poll_delay_seconds: 60,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
            burst: 10,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None, // Derived from the region
            token: None,
            timeouts: TimeoutsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl TimeoutsConfig {
    pub fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_minutes.saturating_mul(60))
    }

    pub fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_minutes.saturating_mul(60))
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_secs(self.poll_delay_seconds)
    }
}

impl ProviderConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values (region seeded from AWS_REGION)
    /// 2. Configuration file (virtual-cluster.toml, or the given path)
    /// 3. Environment variables (prefixed with VCLUSTER__)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // The standard region variable seeds the defaults
        let mut defaults = ProviderConfig::default();
        if let Ok(region) = std::env::var("AWS_REGION") {
            defaults.region = region;
        }

        let mut builder = Config::builder().add_source(Config::try_from(&defaults)?);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("VCLUSTER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let provider_config: ProviderConfig = builder.build()?.try_deserialize()?;
        Ok(provider_config)
    }

    /// Control plane endpoint, derived from the region unless overridden
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://emr-containers.{}.amazonaws.com", self.region))
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
