use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::cache::CacheSupport;

pub const ENV_PREFIX: &str = "CANVAS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// The environment variable that sets a settings key, e.g. `model_id` -> `CANVAS_MODEL_ID`
pub fn to_env_var(field: &str) -> String {
    format!("{}_{}", ENV_PREFIX, field.replace('.', "__").to_uppercase())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// What a model can accept
pub struct ModelCapabilities {
    #[serde(default)]
    pub cache_support: CacheSupport,
    #[serde(default)]
    pub image_support: bool,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub model_id: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_enable_prompt_cache")]
    pub enable_prompt_cache: bool,
    #[serde(default)]
    pub models: HashMap<String, ModelCapabilities>,
}

impl Settings {
    /// Load defaults, an optional `canvas.toml`/`canvas.json` in the working
    /// directory, then `CANVAS_*` environment variables
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(File::with_name("canvas").required(false))
    }

    /// Like [`Settings::new`] but with an explicit, required settings file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load(File::from(path.as_ref()).required(true))
    }

    fn load(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("region", default_region())?
            .set_default("enable_prompt_cache", default_enable_prompt_cache())?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // "missing field `model_id`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }

    /// Capabilities of the configured model; cache support is empty when prompt
    /// caching is switched off
    pub fn capabilities(&self) -> Result<ModelCapabilities, ConfigError> {
        self.capabilities_for(&self.model_id)
    }

    pub fn capabilities_for(&self, model_id: &str) -> Result<ModelCapabilities, ConfigError> {
        let mut capabilities = self
            .models
            .get(model_id)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownModel(model_id.to_string()))?;
        if !self.enable_prompt_cache {
            capabilities.cache_support.clear();
        }
        Ok(capabilities)
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_enable_prompt_cache() -> bool {
    true
}
