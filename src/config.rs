//! Layered service configuration.
//!
//! Precedence, lowest first: built-in defaults, an optional config file
//! (explicit path or `BANKMARK_CONFIG_FILE`), then `BANKMARK__*` environment
//! variables. Command-line flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PIPELINE_PATH: &str = "models/bank_marketing_pipeline.json";
pub const CONFIG_FILE_ENV: &str = "BANKMARK_CONFIG_FILE";
pub const ENV_PREFIX: &str = "BANKMARK";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Pipeline artifact to load at startup.
    pub pipeline_path: PathBuf,
    /// JSON schema file; the built-in bank marketing schema when absent.
    #[serde(default)]
    pub schema_path: Option<PathBuf>,
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            pipeline_path: PathBuf::from(DEFAULT_PIPELINE_PATH),
            schema_path: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl ServeConfig {
    /// Load configuration from defaults, file and process environment.
    ///
    /// An explicit `file` must exist; a file named by `BANKMARK_CONFIG_FILE`
    /// is optional.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        match file {
            Some(path) => Self::build(Some((path, true)), None),
            None => {
                let from_env = std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from);
                Self::build(from_env.as_deref().map(|p| (p, false)), None)
            }
        }
    }

    fn build(
        file: Option<(&Path, bool)>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("pipeline_path", DEFAULT_PIPELINE_PATH)?
            .set_default("log_level", "info")?
            .set_default("log_format", "text")?;

        if let Some((path, required)) = file {
            builder = builder.add_source(config::File::from(path).required(required));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .source(env),
        );

        builder.build()?.try_deserialize()
    }
}
