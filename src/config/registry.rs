//! Command and transformation step registries.
//!
//! A registry maps the short names used by the URL grammar to a canonical
//! step name plus a short-to-canonical parameter map. Lookups are plain
//! reads over immutable tables built at configuration-merge time; per-app
//! overrides can add or replace entries through the deep merge.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Registry entry: canonical step name and its parameter name map.
///
/// The parameter map contains both the short aliases and the canonical
/// names as keys, so `crop=w_100` and `crop=width_100` resolve identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Short name → entry. Commands and transformation steps each get one.
pub type Registry = HashMap<String, StepSpec>;

fn register(registry: &mut Registry, aliases: &[&str], name: &str, params: &[(&str, &str)]) {
    let mut map = HashMap::new();
    for (short, canonical) in params {
        map.insert((*short).to_string(), (*canonical).to_string());
        map.insert((*canonical).to_string(), (*canonical).to_string());
    }
    let spec = StepSpec {
        name: name.to_string(),
        params: map,
    };
    for alias in aliases {
        registry.insert((*alias).to_string(), spec.clone());
    }
}

/// Built-in command registry.
pub fn default_commands() -> Registry {
    let mut registry = Registry::new();
    register(&mut registry, &["info"], "info", &[]);
    registry
}

/// Built-in transformation step registry.
pub fn default_steps() -> Registry {
    let mut registry = Registry::new();
    register(
        &mut registry,
        &["rs", "resize"],
        "resize",
        &[
            ("w", "width"),
            ("h", "height"),
            ("m", "fit"),
            ("i", "interpolator"),
            ("bg", "background"),
        ],
    );
    register(
        &mut registry,
        &["cr", "crop"],
        "crop",
        &[
            ("w", "width"),
            ("h", "height"),
            ("l", "left"),
            ("t", "top"),
            ("a", "anchor"),
        ],
    );
    register(&mut registry, &["rt", "rotate"], "rotate", &[("d", "degrees")]);
    register(&mut registry, &["fm", "format"], "format", &[("f", "format")]);
    register(&mut registry, &["qt", "quality"], "quality", &[("q", "quality")]);
    register(&mut registry, &["md", "metadata"], "metadata", &[("e", "enabled")]);
    register(
        &mut registry,
        &["ip", "interpolation"],
        "interpolation",
        &[("i", "interpolator")],
    );
    register(
        &mut registry,
        &["pg", "progressive"],
        "progressive",
        &[("e", "enabled")],
    );
    register(
        &mut registry,
        &["ll", "lossless"],
        "lossless",
        &[("e", "enabled")],
    );
    register(&mut registry, &["bl", "blur"], "blur", &[("s", "sigma")]);
    register(&mut registry, &["fl", "flip"], "flip", &[("a", "axis")]);
    register(&mut registry, &["original"], "original", &[]);
    registry
}
