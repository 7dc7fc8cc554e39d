//! Node configuration.
//!
//! Layered with `figment`, lowest to highest priority:
//! 1. Built-in defaults
//! 2. `diyguide.toml` in the working directory (optional)
//! 3. Environment variables prefixed with `DIYGUIDE_`

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use diyguide_pipeline::{ApiKey, Credentials, PipelineConfig};
use diyguide_providers::{ProviderConfig, OPENAI_BASE_URL, SERPAPI_BASE_URL};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default config file name.
pub const CONFIG_FILE: &str = "diyguide.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,

    pub openai_base_url: String,
    pub serpapi_base_url: String,

    pub research_model: String,
    pub synthesis_model: String,

    /// Organic results requested per search.
    pub search_result_count: usize,

    /// Timeout for each provider call.
    pub http_timeout_secs: u64,

    /// Reject guides that break the section layout.
    pub strict_structure: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            log_filter: "info".to_string(),
            openai_base_url: OPENAI_BASE_URL.to_string(),
            serpapi_base_url: SERPAPI_BASE_URL.to_string(),
            research_model: pipeline.research_model,
            synthesis_model: pipeline.synthesis_model,
            search_result_count: 10,
            http_timeout_secs: 120,
            strict_structure: pipeline.strict_structure,
        }
    }
}

impl NodeConfig {
    /// Layered sources, before extraction.
    pub fn figment(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(NodeConfig::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("DIYGUIDE_"))
    }

    pub fn load(config_file: &Path) -> Result<NodeConfig, Box<figment::Error>> {
        Self::figment(config_file).extract().map_err(Box::new)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid bind_addr \"{}\": {}", self.bind_addr, e))
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            research_model: self.research_model.clone(),
            synthesis_model: self.synthesis_model.clone(),
            strict_structure: self.strict_structure,
            ..PipelineConfig::default()
        }
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            openai_base_url: self.openai_base_url.clone(),
            serpapi_base_url: self.serpapi_base_url.clone(),
            search_result_count: self.search_result_count,
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }
}

/// Credentials from `OPENAI_API_KEY` and `SERPAPI_API_KEY`, when set.
pub fn credentials_from_env() -> Credentials {
    let read = |name: &str| std::env::var(name).ok().and_then(ApiKey::new);
    Credentials::new(read("OPENAI_API_KEY"), read("SERPAPI_API_KEY"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 3000);
        assert_eq!(config.research_model, "gpt-4o");
        assert_eq!(config.synthesis_model, "o3-mini");
        assert!(config.strict_structure);

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.max_research_items, 10);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config: NodeConfig = Figment::from(Serialized::defaults(NodeConfig::default()))
            .merge(Toml::file("does-not-exist.toml"))
            .extract()
            .unwrap();
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.http_timeout_secs, 120);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config: NodeConfig = Figment::from(Serialized::defaults(NodeConfig::default()))
            .merge(Toml::string(
                "bind_addr = \"127.0.0.1:8080\"\nsynthesis_model = \"gpt-4o-mini\"\nstrict_structure = false\nhttp_timeout_secs = 30",
            ))
            .extract()
            .unwrap();

        assert_eq!(config.socket_addr().unwrap().port(), 8080);
        assert_eq!(config.pipeline_config().synthesis_model, "gpt-4o-mini");
        assert!(!config.pipeline_config().strict_structure);
        assert_eq!(config.provider_config().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_bad_bind_addr() {
        let config = NodeConfig {
            bind_addr: "not an address".into(),
            ..NodeConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
