// Configuration module

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod options;
mod registry;

pub use options::{
    deep_merge, BoxError, DeclaredPipeline, DeclaredStep, Options, PreProcessHook,
};
pub use registry::{default_commands, default_steps, Registry, StepSpec};

/// Errors raised while loading or merging router configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable '{0}' is referenced but not set")]
    MissingEnvVar(String),

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to materialize merged options: {0}")]
    Merge(#[from] serde_json::Error),

    #[error("unknown step '{0}' in declared step set")]
    UnknownDeclaredStep(String),

    #[error("unknown parameter '{param}' for declared step '{step}'")]
    UnknownDeclaredParameter { step: String, param: String },

    #[error("invalid substitution pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Top-level router configuration file.
///
/// `router` holds instance-wide overrides applied to every request;
/// `apps` holds per-application overrides keyed by application name.
/// Both are raw JSON trees so the three-layer deep merge can stay
/// schema-agnostic until the final deserialize into [`Options`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<Value>,
    #[serde(default)]
    pub apps: HashMap<String, AppConfig>,
}

/// Per-application configuration block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<Value>,
}

impl RouterConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration with `${VAR_NAME}` environment substitution.
    ///
    /// All referenced variables are checked before any substitution happens
    /// so a half-substituted config is never parsed.
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, ConfigError> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")?;

        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            if std::env::var(var_name).is_err() {
                return Err(ConfigError::MissingEnvVar(var_name.to_string()));
            }
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        Self::from_yaml(&substituted)
    }
}

/// Application configuration store.
///
/// Accepts an application name and returns its router overrides, or `None`
/// for unknown applications (which simply contribute no overrides).
pub trait AppStore: Send + Sync {
    fn router_overrides(&self, app: &str) -> Option<Value>;
}

/// In-memory application store backed by the configuration file.
#[derive(Debug, Clone, Default)]
pub struct StaticAppStore {
    apps: HashMap<String, Value>,
}

impl StaticAppStore {
    pub fn new(apps: HashMap<String, Value>) -> Self {
        StaticAppStore { apps }
    }

    pub fn from_config(config: &RouterConfig) -> Self {
        let apps = config
            .apps
            .iter()
            .filter_map(|(name, app)| app.router.clone().map(|router| (name.clone(), router)))
            .collect();
        StaticAppStore { apps }
    }
}

impl AppStore for StaticAppStore {
    fn router_overrides(&self, app: &str) -> Option<Value> {
        self.apps.get(app).cloned()
    }
}
