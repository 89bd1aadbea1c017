//! Route resolution pipeline.
//!
//! Turns a request URL into a [`RouteInfo`]: the ordered transformation
//! pipeline for the requested asset plus its cache identity. Stages run in
//! a fixed order, each able to short-circuit the rest:
//!
//! 1. options resolution (defaults < app overrides < instance overrides)
//! 2. URL decomposition and signature split
//! 3. pre-processing hook, if configured
//! 4. step grammar parsing
//! 5. content-type short-circuit for step-less non-image assets
//! 6. pipeline normalization (default format, metadata, rotate injection)
//! 7. cache key binding
//!
//! Resolution is a pure, synchronous computation: concurrent requests can
//! resolve in parallel against the same resolver with no coordination.

mod url;

pub use url::{app_name, parse_query, UrlParts};

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{
    AppStore, ConfigError, DeclaredPipeline, Options, PreProcessHook, RouterConfig,
    StaticAppStore,
};
use crate::constants::ORIGINAL_MARKER_STEP;
use crate::error::RouteError;
use crate::hash::{Sha256StepHasher, StepHasher};
use crate::media;
use crate::negotiate::{self, Negotiation};
use crate::steps::{self, Step};

/// The resolved route descriptor.
///
/// Constructed fresh per request, fully derived, and never mutated after
/// being returned. Exactly one of the following shapes comes out of
/// resolution:
/// - a passthrough route (`content_type` set, no steps)
/// - a command route (`command` set, no steps)
/// - a pipeline route (`steps` populated, `steps_hash` bound)
#[derive(Debug, Clone)]
pub struct RouteInfo {
    /// Request URL as received.
    pub url: String,
    /// Decoded pathname with the signature suffix removed.
    pub path: String,
    /// Query mapping, last occurrence per key.
    pub query: HashMap<String, String>,
    /// First path segment; drives option resolution.
    pub app: Option<String>,
    /// Asset identifier: the pathname before the path delimiter, leading
    /// separator stripped.
    pub original_path: String,
    /// Ordered transformation sequence, pipeline execution order.
    pub steps: Vec<Step>,
    /// Name-indexed flattened view; the latest step per name wins.
    pub steps_by_name: HashMap<String, usize>,
    /// Inferred content type when the route is a passthrough.
    pub content_type: Option<String>,
    /// The resolved command when the path names one instead of steps.
    pub command: Option<Step>,
    pub is_cachable: bool,
    pub optimized: bool,
    pub use_original: bool,
    /// Raw signed payload (still encoded) for external verification.
    pub to_sign: String,
    /// Signature text split from the path, if present.
    pub signature: Option<String>,
    /// Stable identity of the final step sequence.
    pub steps_hash: Option<String>,
    /// Pre-hashed declared original rendition, when configured.
    pub original_pipeline: Option<DeclaredPipeline>,
    /// Pre-hashed declared high-quality rendition, when configured.
    pub hq_original_pipeline: Option<DeclaredPipeline>,
}

impl RouteInfo {
    /// The latest step with the given canonical name, via the flattened
    /// view.
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps_by_name
            .get(name)
            .and_then(|&index| self.steps.get(index))
    }

    pub fn has_step(&self, name: &str) -> bool {
        self.steps_by_name.contains_key(name)
    }

    fn rebuild_index(&mut self) {
        self.steps_by_name = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| (step.name.clone(), index))
            .collect();
    }
}

/// Builder for [`Resolver`].
pub struct ResolverBuilder {
    instance_overrides: Option<Value>,
    apps: Option<Arc<dyn AppStore>>,
    hasher: Option<Arc<dyn StepHasher>>,
    pre_process: Option<PreProcessHook>,
    production: bool,
    webp_available: bool,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        ResolverBuilder {
            instance_overrides: None,
            apps: None,
            hasher: None,
            pre_process: None,
            production: false,
            webp_available: true,
        }
    }
}

impl ResolverBuilder {
    /// Take instance overrides and the application store from a loaded
    /// configuration file.
    pub fn config(mut self, config: RouterConfig) -> Self {
        if self.apps.is_none() {
            self.apps = Some(Arc::new(StaticAppStore::from_config(&config)));
        }
        self.instance_overrides = config.router;
        self
    }

    /// Instance-wide router overrides applied on top of every application.
    pub fn instance_overrides(mut self, overrides: Value) -> Self {
        self.instance_overrides = Some(overrides);
        self
    }

    pub fn app_store(mut self, store: impl AppStore + 'static) -> Self {
        self.apps = Some(Arc::new(store));
        self
    }

    pub fn hasher(mut self, hasher: impl StepHasher + 'static) -> Self {
        self.hasher = Some(Arc::new(hasher));
        self
    }

    pub fn pre_process(mut self, hook: PreProcessHook) -> Self {
        self.pre_process = Some(hook);
        self
    }

    /// Production-like runtime mode. Cache disabling via `?cache=false`
    /// defaults to forbidden in production.
    pub fn production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Deployment capability flag: platforms without a WebP encoder force
    /// WebP support off regardless of configuration.
    pub fn webp_available(mut self, available: bool) -> Self {
        self.webp_available = available;
        self
    }

    pub fn build(self) -> Resolver {
        Resolver {
            instance_overrides: self.instance_overrides,
            apps: self
                .apps
                .unwrap_or_else(|| Arc::new(StaticAppStore::default())),
            hasher: self
                .hasher
                .unwrap_or_else(|| Arc::new(Sha256StepHasher)),
            pre_process: self.pre_process,
            production: self.production,
            webp_available: self.webp_available,
        }
    }
}

/// The route resolution engine.
///
/// Read-only after construction; shared freely across request tasks.
pub struct Resolver {
    instance_overrides: Option<Value>,
    apps: Arc<dyn AppStore>,
    hasher: Arc<dyn StepHasher>,
    pre_process: Option<PreProcessHook>,
    production: bool,
    webp_available: bool,
}

impl Resolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    pub fn from_config(config: RouterConfig) -> Resolver {
        Resolver::builder().config(config).build()
    }

    /// Merge the configuration layers for one application.
    pub fn effective_options(&self, app: Option<&str>) -> Result<Options, ConfigError> {
        let app_overrides = app.and_then(|name| self.apps.router_overrides(name));
        let mut options =
            Options::resolve(app_overrides.as_ref(), self.instance_overrides.as_ref())?;

        if !self.webp_available {
            options.support_webp = false;
        }
        if options.can_disable_cache.is_none() {
            options.can_disable_cache = Some(!self.production);
        }
        options.pre_process = self.pre_process.clone();
        options.bind_declared_pipelines(self.hasher.as_ref())?;
        Ok(options)
    }

    /// Resolve a request URL into a route descriptor.
    ///
    /// `accept` is the client's capability header used for format
    /// negotiation.
    ///
    /// # Errors
    ///
    /// [`RouteError::UnsupportedStep`] / [`RouteError::UnsupportedParameter`]
    /// for unknown grammar tokens; [`RouteError::Hook`] when the
    /// pre-processing hook fails; [`RouteError::Options`] when the merged
    /// configuration cannot be materialized. No partial descriptor is ever
    /// returned.
    pub fn resolve(&self, request_url: &str, accept: Option<&str>) -> Result<RouteInfo, RouteError> {
        let app = url::app_name(request_url);
        let options = self.effective_options(app.as_deref())?;
        let parts = url::decompose(request_url, &options);

        let is_cachable = !(options.cache_can_be_disabled()
            && parts.query.get("cache").map(String::as_str) == Some("false"));
        let optimized = parts.query.get("optimized").map(String::as_str) == Some("true");

        let mut route = RouteInfo {
            url: request_url.to_string(),
            path: parts.path,
            query: parts.query,
            app,
            original_path: String::new(),
            steps: Vec::new(),
            steps_by_name: HashMap::new(),
            content_type: None,
            command: None,
            is_cachable,
            optimized,
            use_original: false,
            to_sign: parts.to_sign,
            signature: parts.signature,
            steps_hash: None,
            original_pipeline: options.original_pipeline.clone(),
            hq_original_pipeline: options.hq_original_pipeline.clone(),
        };

        if let Some(hook) = options.pre_process.clone() {
            hook.call(&mut route, &options).map_err(RouteError::hook)?;
        }

        let (asset, segment) = match route.path.split_once(options.path_delimiter.as_str()) {
            Some((asset, segment)) => (asset.to_string(), Some(segment.to_string())),
            None => (route.path.clone(), None),
        };
        route.original_path = asset.strip_prefix('/').unwrap_or(&asset).to_string();

        let parsed = match &segment {
            Some(segment) => steps::parse_segment(segment, &options)?,
            None => Vec::new(),
        };
        debug!(
            app = route.app.as_deref().unwrap_or(""),
            steps = parsed.len(),
            "parsed step segment"
        );

        if let Some(first) = parsed.first() {
            if first.command {
                route.command = Some(first.clone());
                debug!(command = %first.name, "resolved command route");
                return Ok(route);
            }
        }
        // A command after transformations already terminated parsing; it
        // does not join the pipeline.
        let mut pipeline: Vec<Step> = parsed.into_iter().filter(|step| !step.command).collect();

        if pipeline.is_empty() {
            if let Some(content_type) = media::content_type(&route.original_path) {
                if media::is_passthrough(&content_type) {
                    warn!(
                        path = %route.original_path,
                        content_type = %content_type,
                        "passthrough asset, skipping pipeline resolution"
                    );
                    route.content_type = Some(content_type);
                    return Ok(route);
                }
            }
        }

        let explicit_original =
            route.query.get("useOriginal").map(String::as_str) == Some("true");
        if pipeline.is_empty() && (options.use_original || explicit_original) {
            route.use_original = true;
            if explicit_original {
                // identity marker: keeps explicit original requests from
                // colliding with an equivalent empty-steps request
                pipeline.push(Step::transformation(ORIGINAL_MARKER_STEP));
            }
            route.steps = pipeline;
            route.rebuild_index();
            route.steps_hash = Some(self.hasher.digest(&route.steps));
            return Ok(route);
        }

        normalize(&mut pipeline, &route.query, accept, &options);
        route.steps = pipeline;
        route.rebuild_index();
        route.steps_hash = Some(self.hasher.digest(&route.steps));
        debug!(
            hash = route.steps_hash.as_deref().unwrap_or(""),
            steps = route.steps.len(),
            "bound cache identity"
        );
        Ok(route)
    }
}

/// The latest step with a given name, matching the flattened view's
/// last-write-wins semantics.
fn last_step<'a>(steps: &'a [Step], name: &str) -> Option<&'a Step> {
    steps.iter().rev().find(|step| step.name == name)
}

/// Inject platform defaults and apply the deprecated-alias merge.
fn normalize(
    pipeline: &mut Vec<Step>,
    query: &HashMap<String, String>,
    accept: Option<&str>,
    options: &Options,
) {
    if last_step(pipeline, "format").is_none() {
        let negotiation = Negotiation {
            accept,
            download: query.contains_key("download"),
            progressive: last_step(pipeline, "progressive")
                .map(Step::enabled)
                .unwrap_or(false),
            lossless: last_step(pipeline, "lossless")
                .map(Step::enabled)
                .unwrap_or(false),
            support_webp: options.support_webp,
            support_avif: options.support_avif,
        };
        let format = negotiate::select_format(&negotiation);
        debug!(format, "injected default format step");
        pipeline.push(Step::transformation("format").with_param("format", format));
    }

    if last_step(pipeline, "metadata").is_none() {
        pipeline.push(Step::transformation("metadata").with_param("enabled", "true"));
    }

    // Orientation correction must run before any geometric operation, so
    // the default rotate step goes to the front, never the back.
    if last_step(pipeline, "rotate").is_none() {
        pipeline.insert(0, Step::transformation("rotate").with_param("degrees", "auto"));
    }

    // Back-compat: the interpolator moved from its own step onto resize.
    // The interpolation step stays in the sequence unchanged.
    let interpolator = last_step(pipeline, "interpolation")
        .and_then(|step| step.param("interpolator"))
        .cloned();
    if let Some(value) = interpolator {
        if let Some(resize) = pipeline.iter_mut().rev().find(|step| step.name == "resize") {
            resize.params.insert("interpolator".to_string(), value);
        }
    }
}
