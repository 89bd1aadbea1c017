//! Route resolution error types
//!
//! Provides structured error handling with HTTP status mapping,
//! consistent with the configuration module pattern.

use std::fmt;

/// Errors that can occur while resolving a request URL into a route
///
/// The grammar errors (`UnsupportedStep`, `UnsupportedParameter`) are
/// user-input failures: the URL named a step or parameter that no registry
/// knows about. `Hook` and `Options` wrap failures raised by collaborators
/// and are passed through for the caller to classify.
#[derive(Debug)]
pub enum RouteError {
    /// The step segment contained a short name missing from both registries
    UnsupportedStep { step: String },
    /// A step's parameter blob contained an unknown short parameter name
    UnsupportedParameter { step: String, param: String },
    /// The pre-processing hook failed; resolution is aborted
    Hook {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The merged per-request options could not be materialized
    Options { source: crate::config::ConfigError },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::UnsupportedStep { step } => {
                write!(f, "Unsupported step: {}", step)
            }
            RouteError::UnsupportedParameter { step, param } => {
                write!(f, "Unsupported parameter '{}' in step: {}", param, step)
            }
            RouteError::Hook { source } => {
                write!(f, "Pre-process hook failed: {}", source)
            }
            RouteError::Options { source } => {
                write!(f, "Invalid router options: {}", source)
            }
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::Hook { source } => Some(source.as_ref()),
            RouteError::Options { source } => Some(source),
            _ => None,
        }
    }
}

impl RouteError {
    /// Maps route errors to HTTP status codes
    ///
    /// Status mapping:
    /// - UnsupportedStep, UnsupportedParameter → 400 (Bad Request)
    /// - Hook, Options → 500 (Internal Server Error)
    pub fn to_http_status(&self) -> u16 {
        match self {
            RouteError::UnsupportedStep { .. } | RouteError::UnsupportedParameter { .. } => 400,
            RouteError::Hook { .. } | RouteError::Options { .. } => 500,
        }
    }

    /// Helper constructors for common error patterns
    pub fn unsupported_step(step: impl Into<String>) -> Self {
        RouteError::UnsupportedStep { step: step.into() }
    }

    pub fn unsupported_param(step: impl Into<String>, param: impl Into<String>) -> Self {
        RouteError::UnsupportedParameter {
            step: step.into(),
            param: param.into(),
        }
    }

    pub fn hook(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        RouteError::Hook {
            source: source.into(),
        }
    }
}

impl From<crate::config::ConfigError> for RouteError {
    fn from(source: crate::config::ConfigError) -> Self {
        RouteError::Options { source }
    }
}
