//! Step mini-language parsing
//!
//! A step segment encodes the ordered transformation pipeline in a compact
//! form, e.g. `crop=w_100,h_50;resize=w_200`:
//! - steps are separated by the step delimiter (`;`)
//! - a step's short name and parameter blob are separated by the
//!   step/value delimiter (`=`)
//! - parameters are separated by the parameter delimiter (`,`)
//! - a parameter's short name and value are separated by the
//!   parameter/value delimiter (`_`)
//!
//! Short names are resolved against the command registry first, then the
//! transformation step registry. All delimiters come from the effective
//! [`Options`] so deployments can re-skin the grammar.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::error::RouteError;

/// A single step parameter value.
///
/// Values carry no numeric or boolean coercion at this layer: a parameter
/// with an explicit value stays a string, a bare parameter key becomes the
/// literal boolean `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Text(String),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            ParamValue::Flag(_) => None,
        }
    }

    /// Truthiness used by the normalizer when a step toggles behavior.
    /// Mirrors query-parameter conventions: everything except `"false"`
    /// and `"0"` counts as enabled.
    pub fn is_enabled(&self) -> bool {
        match self {
            ParamValue::Flag(b) => *b,
            ParamValue::Text(s) => s != "false" && s != "0",
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

/// One unit of the transformation pipeline.
///
/// Either a command (`command == true`, opaque to the image pipeline) or a
/// transformation with a canonical name and canonical parameter keys.
/// Parameters are kept sorted so serialization and hashing stay
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub command: bool,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamValue>,
}

impl Step {
    pub fn transformation(name: impl Into<String>) -> Self {
        Step {
            command: false,
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn command(name: impl Into<String>) -> Self {
        Step {
            command: true,
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(ParamValue::as_str)
    }

    /// Whether the step is switched on. A step without an `enabled`
    /// parameter counts as enabled; `enabled_false` and `enabled_0` switch
    /// it off.
    pub fn enabled(&self) -> bool {
        self.params
            .get("enabled")
            .map(ParamValue::is_enabled)
            .unwrap_or(true)
    }

    /// Re-encode the step in the segment grammar using canonical names.
    ///
    /// Canonical names are themselves registered, so the output parses back
    /// to an equivalent step.
    pub fn encode(&self, options: &Options) -> String {
        if self.params.is_empty() {
            return self.name.clone();
        }
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(key, value)| match value {
                ParamValue::Text(text) => {
                    format!("{}{}{}", key, options.param_value_delimiter, text)
                }
                ParamValue::Flag(_) => key.clone(),
            })
            .collect();
        format!(
            "{}{}{}",
            self.name,
            options.step_value_delimiter,
            params.join(options.param_delimiter.as_str())
        )
    }
}

/// Re-encode a full sequence in the segment grammar.
pub fn encode_segment(steps: &[Step], options: &Options) -> String {
    let encoded: Vec<String> = steps.iter().map(|s| s.encode(options)).collect();
    encoded.join(options.step_delimiter.as_str())
}

/// Parse a step segment into an ordered step sequence.
///
/// Token order is pipeline execution order. A token resolving to a command
/// terminates consumption: anything after it in the segment is never
/// inspected.
///
/// # Errors
///
/// [`RouteError::UnsupportedStep`] when a short name is in neither
/// registry, [`RouteError::UnsupportedParameter`] when a parameter short
/// name is missing from the matched registry entry's map. Both reference
/// the offending token.
pub fn parse_segment(segment: &str, options: &Options) -> Result<Vec<Step>, RouteError> {
    let mut steps = Vec::new();

    for token in segment.split(options.step_delimiter.as_str()) {
        if token.is_empty() {
            continue;
        }

        let (short, blob) = match token.split_once(options.step_value_delimiter.as_str()) {
            Some((short, blob)) => (short, Some(blob)),
            None => (token, None),
        };

        // Commands shadow transformation steps on short-name collisions.
        let (spec, is_command) = if let Some(spec) = options.commands.get(short) {
            (spec, true)
        } else if let Some(spec) = options.steps.get(short) {
            (spec, false)
        } else {
            return Err(RouteError::unsupported_step(token));
        };

        let mut step = Step {
            command: is_command,
            name: spec.name.clone(),
            params: BTreeMap::new(),
        };

        if let Some(blob) = blob {
            for param in blob.split(options.param_delimiter.as_str()) {
                if param.is_empty() {
                    continue;
                }
                let (key, value) = match param.split_once(options.param_value_delimiter.as_str())
                {
                    Some((key, value)) => (key, Some(value)),
                    None => (param, None),
                };
                let canonical = spec
                    .params
                    .get(key)
                    .ok_or_else(|| RouteError::unsupported_param(token, key))?;
                let value = match value {
                    Some(value) => ParamValue::Text(value.to_string()),
                    None => ParamValue::Flag(true),
                };
                step.params.insert(canonical.clone(), value);
            }
        }

        let terminal = step.command;
        steps.push(step);
        if terminal {
            break;
        }
    }

    Ok(steps)
}
