// Step grammar unit tests
// Parameterized cases for the segment mini-language and its round-trip

use rstest::rstest;
use tsubame::config::Options;
use tsubame::steps::{encode_segment, parse_segment};

fn options() -> Options {
    Options::default()
}

#[rstest]
#[case("crop=w_100,h_50", "crop", &[("width", "100"), ("height", "50")])]
#[case("cr=w_100,h_50", "crop", &[("width", "100"), ("height", "50")])]
#[case("resize=w_200", "resize", &[("width", "200")])]
#[case("rs=width_200", "resize", &[("width", "200")])]
#[case("rotate=d_270", "rotate", &[("degrees", "270")])]
#[case("blur=s_2.5", "blur", &[("sigma", "2.5")])]
#[case("format=f_webp", "format", &[("format", "webp")])]
fn test_single_step_parses(
    #[case] segment: &str,
    #[case] name: &str,
    #[case] params: &[(&str, &str)],
) {
    let steps = parse_segment(segment, &options()).unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].name, name);
    for (key, value) in params {
        assert_eq!(steps[0].param_str(key), Some(*value), "param {key}");
    }
}

#[rstest]
#[case("zoom=w_10")]
#[case("resize=w_10;zoom")]
#[case("x")]
fn test_unknown_step_rejected(#[case] segment: &str) {
    assert!(parse_segment(segment, &options()).is_err());
}

#[rstest]
#[case("crop=w_100,h_50;resize=w_200")]
#[case("rotate=d_90;blur=s_3;format=f_png")]
#[case("lossless;progressive;resize=w_10")]
#[case("metadata=e_false")]
fn test_parse_encode_round_trip(#[case] segment: &str) {
    let opts = options();
    let parsed = parse_segment(segment, &opts).unwrap();
    let encoded = encode_segment(&parsed, &opts);
    let reparsed = parse_segment(&encoded, &opts).unwrap();
    assert_eq!(parsed, reparsed);
}

#[test]
fn test_custom_delimiters_reskin_the_grammar() {
    let mut opts = options();
    opts.step_delimiter = "+".to_string();
    opts.step_value_delimiter = ":".to_string();
    opts.param_delimiter = "|".to_string();
    opts.param_value_delimiter = "-".to_string();

    let steps = parse_segment("crop:w-100|h-50+resize:w-200", &opts).unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].name, "crop");
    assert_eq!(steps[0].param_str("width"), Some("100"));
    assert_eq!(steps[1].param_str("width"), Some("200"));

    let encoded = encode_segment(&steps, &opts);
    assert_eq!(parse_segment(&encoded, &opts).unwrap(), steps);
}

#[test]
fn test_step_order_is_preserved() {
    let steps = parse_segment("blur=s_1;crop=w_10;resize=w_20", &options()).unwrap();
    let names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["blur", "crop", "resize"]);
}
