// Configuration merge and declared-pipeline tests

use serde_json::json;
use tsubame::config::{deep_merge, Options, RouterConfig, StaticAppStore, AppStore};
use tsubame::hash::Sha256StepHasher;
use tsubame::route::Resolver;

#[test]
fn test_three_layer_precedence() {
    let app = json!({"support_avif": true, "use_original": true});
    let instance = json!({"use_original": false});
    let options = Options::resolve(Some(&app), Some(&instance)).unwrap();
    // app layer applies where the instance layer is silent
    assert!(options.support_avif);
    // instance layer wins where both speak
    assert!(!options.use_original);
}

#[test]
fn test_deep_merge_is_per_leaf() {
    let mut base = json!({
        "a": {"x": 1, "y": {"deep": true}},
        "b": "scalar"
    });
    deep_merge(&mut base, &json!({"a": {"y": {"deep": false}}, "b": "other"}));
    assert_eq!(base["a"]["x"], 1);
    assert_eq!(base["a"]["y"]["deep"], false);
    assert_eq!(base["b"], "other");
}

#[test]
fn test_unknown_app_contributes_nothing() {
    let store = StaticAppStore::default();
    assert!(store.router_overrides("ghost").is_none());

    // resolution still succeeds with pure defaults
    let resolver = Resolver::builder().build();
    let route = resolver.resolve("/ghost/p.jpg:rs=w_1", None).unwrap();
    assert!(route.has_step("resize"));
}

#[test]
fn test_declared_sets_hash_independently_of_requests() {
    let config = RouterConfig::from_yaml(
        r#"
router:
  original_steps:
    - name: resize
      params:
        w: "2048"
  hq_original_steps:
    - name: resize
      params:
        w: "4096"
    - name: quality
      params:
        q: "95"
"#,
    )
    .unwrap();
    let resolver = Resolver::from_config(config);

    let a = resolver.resolve("/x/p.jpg:rs=w_10", None).unwrap();
    let b = resolver.resolve("/x/p.jpg:rs=w_999", None).unwrap();

    // request steps differ, declared identities do not
    assert_ne!(a.steps_hash, b.steps_hash);
    assert_eq!(a.original_pipeline, b.original_pipeline);
    assert_eq!(a.hq_original_pipeline, b.hq_original_pipeline);

    let original = a.original_pipeline.unwrap();
    let hq = a.hq_original_pipeline.unwrap();
    assert_ne!(original.hash, hq.hash);
    assert_eq!(original.steps[0].param_str("width"), Some("2048"));
    assert_eq!(hq.steps[1].name, "quality");
}

#[test]
fn test_declared_set_uses_registry_not_url_grammar() {
    let app = json!({
        "original_steps": [{"name": "rs", "params": {"w": "100"}}]
    });
    let mut options = Options::resolve(Some(&app), None).unwrap();
    options.bind_declared_pipelines(&Sha256StepHasher).unwrap();
    let pipeline = options.original_pipeline.unwrap();
    assert_eq!(pipeline.steps[0].name, "resize");
    assert_eq!(pipeline.steps[0].param_str("width"), Some("100"));
}

#[test]
fn test_env_substitution_round_trip() {
    std::env::set_var("TSUBAME_IT_SIG", "!");
    let config = RouterConfig::from_yaml_with_env(
        "router:\n  signature_delimiter: \"${TSUBAME_IT_SIG}\"\n",
    )
    .unwrap();
    let resolver = Resolver::from_config(config);
    let route = resolver.resolve("/a/p.jpg:rs=w_1!sig", None).unwrap();
    assert_eq!(route.signature.as_deref(), Some("sig"));
}
