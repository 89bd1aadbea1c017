// End-to-end route resolution tests against the public API

use serde_json::json;
use tsubame::config::{PreProcessHook, RouterConfig};
use tsubame::route::Resolver;

fn resolver() -> Resolver {
    Resolver::builder().build()
}

#[test]
fn test_spec_example_path_resolves_expected_pipeline() {
    let route = resolver()
        .resolve("/app/photo.jpg:crop=w_100,h_50;resize=w_200", None)
        .unwrap();

    assert_eq!(route.app.as_deref(), Some("app"));
    assert_eq!(route.original_path, "app/photo.jpg");

    let names: Vec<&str> = route.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["rotate", "crop", "resize", "format", "metadata"]);

    assert_eq!(route.step("crop").unwrap().param_str("width"), Some("100"));
    assert_eq!(route.step("crop").unwrap().param_str("height"), Some("50"));
    assert_eq!(route.step("resize").unwrap().param_str("width"), Some("200"));
    assert!(route.is_cachable);
    assert!(route.steps_hash.is_some());
}

#[test]
fn test_injected_defaults_do_not_reorder_user_steps() {
    let route = resolver()
        .resolve("/app/photo.jpg:blur=s_2;crop=w_10", None)
        .unwrap();
    let names: Vec<&str> = route.steps.iter().map(|s| s.name.as_str()).collect();
    // rotate prepended, format/metadata appended, user order intact
    assert_eq!(names, ["rotate", "blur", "crop", "format", "metadata"]);
}

#[test]
fn test_same_url_hashes_identically_across_resolvers() {
    let a = resolver()
        .resolve("/app/photo.jpg:resize=w_100", Some("image/webp"))
        .unwrap();
    let b = resolver()
        .resolve("/app/photo.jpg:resize=w_100", Some("image/webp"))
        .unwrap();
    assert_eq!(a.steps_hash, b.steps_hash);
}

#[test]
fn test_parameter_change_changes_hash() {
    let a = resolver().resolve("/app/p.jpg:resize=w_100", None).unwrap();
    let b = resolver().resolve("/app/p.jpg:resize=w_101", None).unwrap();
    assert_ne!(a.steps_hash, b.steps_hash);
}

#[test]
fn test_negotiated_format_participates_in_hash() {
    let webp = resolver()
        .resolve("/app/p.jpg:resize=w_100", Some("image/webp"))
        .unwrap();
    let jpeg = resolver().resolve("/app/p.jpg:resize=w_100", None).unwrap();
    assert_ne!(webp.steps_hash, jpeg.steps_hash);
}

#[test]
fn test_passthrough_asset_reports_content_type_only() {
    let route = resolver().resolve("/docs/manual.pdf", None).unwrap();
    assert_eq!(route.content_type.as_deref(), Some("application/pdf"));
    assert!(route.steps.is_empty());
    assert!(route.command.is_none());
    assert!(route.steps_hash.is_none());
}

#[test]
fn test_cachability_matrix() {
    // permitted + requested → not cachable
    let dev = Resolver::builder().production(false).build();
    assert!(!dev.resolve("/a/p.jpg:rs=w_1?cache=false", None).unwrap().is_cachable);
    // permitted + not requested → cachable
    assert!(dev.resolve("/a/p.jpg:rs=w_1", None).unwrap().is_cachable);
    // not permitted + requested → cachable
    let prod = Resolver::builder().production(true).build();
    assert!(prod.resolve("/a/p.jpg:rs=w_1?cache=false", None).unwrap().is_cachable);
}

#[test]
fn test_platform_constraint_never_selects_webp() {
    let resolver = Resolver::builder()
        .webp_available(false)
        .instance_overrides(json!({"support_webp": true, "support_avif": true}))
        .build();

    // webp advertised but platform-disabled; avif still wins when advertised
    let avif = resolver
        .resolve("/a/p.jpg:rs=w_1", Some("image/avif,image/webp"))
        .unwrap();
    assert_eq!(avif.step("format").unwrap().param_str("format"), Some("avif"));

    let webp_only = resolver
        .resolve("/a/p.jpg:rs=w_1", Some("image/webp"))
        .unwrap();
    assert_eq!(
        webp_only.step("format").unwrap().param_str("format"),
        Some("jpeg")
    );
}

#[test]
fn test_unsupported_step_yields_client_error() {
    let err = resolver().resolve("/a/p.jpg:sepia", None).unwrap_err();
    assert_eq!(err.to_http_status(), 400);
    assert!(err.to_string().contains("sepia"));
}

#[test]
fn test_signature_is_not_part_of_decoded_path() {
    let route = resolver().resolve("/a/p.jpg:rs=w_1~deadbeef", None).unwrap();
    assert_eq!(route.path, "/a/p.jpg:rs=w_1");
    assert_eq!(route.signature.as_deref(), Some("deadbeef"));
    assert_eq!(route.to_sign, "/a/p.jpg:rs=w_1");
}

#[test]
fn test_extra_signature_delimiters_discarded() {
    let route = resolver()
        .resolve("/a/p.jpg:rs=w_1~sig~extra~junk", None)
        .unwrap();
    assert_eq!(route.signature.as_deref(), Some("sig"));
}

#[test]
fn test_hook_runs_before_step_parsing() {
    let hook = PreProcessHook::new(|route, options| {
        // rewrite a vanity prefix into the canonical app, adding a step
        if let Some(rest) = route.path.strip_prefix("/thumbs/") {
            route.path = format!("/app/{}{}rs=w_150", rest, options.path_delimiter);
        }
        Ok(())
    });
    let resolver = Resolver::builder().pre_process(hook).build();
    let route = resolver.resolve("/thumbs/cat.jpg", None).unwrap();
    assert_eq!(route.original_path, "app/cat.jpg");
    assert_eq!(route.step("resize").unwrap().param_str("width"), Some("150"));
}

#[test]
fn test_per_app_config_from_yaml() {
    let config = RouterConfig::from_yaml(
        r#"
router:
  support_avif: false
apps:
  gallery:
    router:
      support_avif: true
      steps:
        sp:
          name: sepia
          params:
            a: amount
"#,
    )
    .unwrap();
    let resolver = Resolver::from_config(config);

    // per-app registry extension
    let route = resolver.resolve("/gallery/p.jpg:sp=a_50", None).unwrap();
    assert_eq!(route.step("sepia").unwrap().param_str("amount"), Some("50"));

    // instance overrides outrank app overrides
    let negotiated = resolver
        .resolve("/gallery/p.jpg:rs=w_1", Some("image/avif"))
        .unwrap();
    assert_eq!(
        negotiated.step("format").unwrap().param_str("format"),
        Some("jpeg")
    );

    // unknown app: no overrides, unknown step fails
    assert!(resolver.resolve("/other/p.jpg:sp=a_50", None).is_err());
}
