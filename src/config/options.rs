//! Effective per-request router options.
//!
//! An [`Options`] record is produced for every request by deep-merging, in
//! increasing precedence: built-in defaults, the application's stored
//! router overrides, and the instance-wide overrides passed at resolver
//! construction. Object-valued keys (including the registries) merge
//! recursively; scalars and arrays are replaced wholesale by the
//! higher-precedence layer.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::registry::{self, Registry};
use super::ConfigError;
use crate::constants::{
    DEFAULT_PARAM_DELIMITER, DEFAULT_PARAM_VALUE_DELIMITER, DEFAULT_PATH_DELIMITER,
    DEFAULT_SIGNATURE_DELIMITER, DEFAULT_STEP_DELIMITER, DEFAULT_STEP_VALUE_DELIMITER,
};
use crate::hash::StepHasher;
use crate::route::RouteInfo;
use crate::steps::{ParamValue, Step};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Pre-processing hook invoked with the in-progress route descriptor right
/// after URL decomposition, before step-segment splitting. May rewrite the
/// descriptor in place; an error aborts resolution for the request.
#[derive(Clone)]
pub struct PreProcessHook(
    Arc<dyn Fn(&mut RouteInfo, &Options) -> Result<(), BoxError> + Send + Sync>,
);

impl PreProcessHook {
    pub fn new(
        hook: impl Fn(&mut RouteInfo, &Options) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Self {
        PreProcessHook(Arc::new(hook))
    }

    pub fn call(&self, route: &mut RouteInfo, options: &Options) -> Result<(), BoxError> {
        (self.0)(route, options)
    }
}

impl fmt::Debug for PreProcessHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PreProcessHook(..)")
    }
}

/// A step declared directly in configuration (structured form, not the URL
/// grammar). Short or canonical names are accepted; both go through the
/// registries at merge time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredStep {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

/// A declared step set canonicalized and pre-hashed at configuration-merge
/// time, for use as a precomputed cache identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredPipeline {
    pub steps: Vec<Step>,
    pub hash: String,
}

/// Effective configuration for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Separates the asset path from the step segment.
    pub path_delimiter: String,
    /// Separates steps inside the step segment.
    pub step_delimiter: String,
    /// Separates a step's short name from its parameter blob.
    pub step_value_delimiter: String,
    /// Separates parameters inside a blob.
    pub param_delimiter: String,
    /// Separates a parameter's short name from its value.
    pub param_value_delimiter: String,
    /// Separates the signed payload from the trailing signature.
    pub signature_delimiter: String,

    /// Command registry, checked before the step registry.
    pub commands: Registry,
    /// Transformation step registry.
    pub steps: Registry,

    pub support_webp: bool,
    pub support_avif: bool,

    /// Serve the stored asset verbatim when a request carries no steps.
    pub use_original: bool,
    /// Declared step set describing the stored "original" rendition.
    pub original_steps: Option<Vec<DeclaredStep>>,
    /// Declared step set describing the high-quality original rendition.
    pub hq_original_steps: Option<Vec<DeclaredStep>>,

    /// Whether `?cache=false` is honored. `None` falls back to the
    /// resolver's runtime mode (allowed outside production).
    pub can_disable_cache: Option<bool>,

    #[serde(skip)]
    pub pre_process: Option<PreProcessHook>,
    #[serde(skip)]
    pub original_pipeline: Option<DeclaredPipeline>,
    #[serde(skip)]
    pub hq_original_pipeline: Option<DeclaredPipeline>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            path_delimiter: DEFAULT_PATH_DELIMITER.to_string(),
            step_delimiter: DEFAULT_STEP_DELIMITER.to_string(),
            step_value_delimiter: DEFAULT_STEP_VALUE_DELIMITER.to_string(),
            param_delimiter: DEFAULT_PARAM_DELIMITER.to_string(),
            param_value_delimiter: DEFAULT_PARAM_VALUE_DELIMITER.to_string(),
            signature_delimiter: DEFAULT_SIGNATURE_DELIMITER.to_string(),
            commands: registry::default_commands(),
            steps: registry::default_steps(),
            support_webp: true,
            support_avif: false,
            use_original: false,
            original_steps: None,
            hq_original_steps: None,
            can_disable_cache: None,
            pre_process: None,
            original_pipeline: None,
            hq_original_pipeline: None,
        }
    }
}

impl Options {
    /// Merge the three configuration layers into an effective record.
    ///
    /// Precedence, lowest first: built-in defaults, application overrides,
    /// instance overrides. Non-serializable fields (hook, pre-hashed
    /// pipelines) are attached afterwards by the resolver.
    pub fn resolve(
        app_overrides: Option<&Value>,
        instance_overrides: Option<&Value>,
    ) -> Result<Options, ConfigError> {
        let mut tree = serde_json::to_value(Options::default())?;
        if let Some(overrides) = app_overrides {
            deep_merge(&mut tree, overrides);
        }
        if let Some(overrides) = instance_overrides {
            deep_merge(&mut tree, overrides);
        }
        let options: Options = serde_json::from_value(tree)?;
        Ok(options)
    }

    /// Effective cachability policy once the resolver has filled the
    /// runtime-mode default in.
    pub fn cache_can_be_disabled(&self) -> bool {
        self.can_disable_cache.unwrap_or(false)
    }

    /// Canonicalize and pre-hash the declared step sets.
    pub fn bind_declared_pipelines(
        &mut self,
        hasher: &dyn StepHasher,
    ) -> Result<(), ConfigError> {
        if let Some(declared) = &self.original_steps {
            let steps = self.resolve_declared(declared)?;
            let hash = hasher.digest(&steps);
            self.original_pipeline = Some(DeclaredPipeline { steps, hash });
        }
        if let Some(declared) = &self.hq_original_steps {
            let steps = self.resolve_declared(declared)?;
            let hash = hasher.digest(&steps);
            self.hq_original_pipeline = Some(DeclaredPipeline { steps, hash });
        }
        Ok(())
    }

    /// Resolve a declared step set through the registries, commands first.
    fn resolve_declared(&self, declared: &[DeclaredStep]) -> Result<Vec<Step>, ConfigError> {
        let mut steps = Vec::with_capacity(declared.len());
        for entry in declared {
            let (spec, is_command) = if let Some(spec) = self.commands.get(&entry.name) {
                (spec, true)
            } else if let Some(spec) = self.steps.get(&entry.name) {
                (spec, false)
            } else {
                return Err(ConfigError::UnknownDeclaredStep(entry.name.clone()));
            };
            let mut step = Step {
                command: is_command,
                name: spec.name.clone(),
                params: BTreeMap::new(),
            };
            for (key, value) in &entry.params {
                let canonical = spec.params.get(key).ok_or_else(|| {
                    ConfigError::UnknownDeclaredParameter {
                        step: entry.name.clone(),
                        param: key.clone(),
                    }
                })?;
                step.params.insert(canonical.clone(), value.clone());
            }
            steps.push(step);
        }
        Ok(steps)
    }
}

/// Recursive last-write-wins merge of two JSON trees.
///
/// Objects merge key by key; every other value kind (scalars, arrays, or a
/// kind mismatch) is replaced by the overlay.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) if base_value.is_object() && overlay_value.is_object() => {
                        deep_merge(base_value, overlay_value);
                    }
                    _ => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}
