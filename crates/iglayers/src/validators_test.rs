// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

#[rstest]
fn test_int_range_accepts_and_rejects() {
    let v = parse_validator("int:10-20").expect("Should parse int range");
    assert!(v.validate(Some("15")).is_empty());

    let errors = v.validate(Some("5"));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("minimum"), "got: {errors:?}");

    let errors = v.validate(Some("21"));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("maximum"));

    assert!(v.validate(Some("10")).is_empty());
    assert!(v.validate(Some("20")).is_empty());
    assert!(!v.validate(Some("abc")).is_empty());
    assert!(!v.validate(None).is_empty());
}

#[rstest]
fn test_one_element_enum_with_trailing_comma() {
    let v = parse_validator("frontend,backend,").expect("Should parse enum");
    assert!(v.validate(Some("frontend")).is_empty());
    assert_eq!(v.validate(Some("middleware")).len(), 1);

    let single = parse_validator("syft,").expect("Should parse single enum");
    assert!(single.validate(Some("syft")).is_empty());
    assert!(!single.validate(Some("other")).is_empty());
}

#[rstest]
#[case("syft")]
#[case("strng")]
#[case("boolean")]
fn test_bare_token_is_rejected(#[case] rule: &str) {
    let err = parse_validator(rule).expect_err("bare token must not parse");
    assert!(err.to_string().contains("trailing comma"));
}

#[rstest]
#[case("true", true)]
#[case("NO", true)]
#[case("y", true)]
#[case("0", true)]
#[case("maybe", false)]
#[case("", false)]
fn test_bool(#[case] value: &str, #[case] ok: bool) {
    let v = parse_validator("bool").unwrap();
    assert_eq!(v.validate(Some(value)).is_empty(), ok);
}

#[rstest]
fn test_string_variants() {
    let strict = parse_validator("string").unwrap();
    assert!(strict.validate(Some("x")).is_empty());
    assert!(!strict.validate(Some("")).is_empty());
    assert!(!strict.validate(None).is_empty());

    let or_empty = parse_validator("string-or-empty").unwrap();
    assert!(or_empty.validate(Some("")).is_empty());
    assert!(!or_empty.validate(None).is_empty());

    let or_unset = parse_validator("string-or-unset").unwrap();
    assert!(or_unset.validate(None).is_empty());
    assert!(!or_unset.validate(Some("")).is_empty());
    assert!(or_unset.allows_unset());
    assert!(!strict.allows_unset());
}

#[rstest]
fn test_regex_is_full_match() {
    let v = parse_validator("regex:[a-z]+").unwrap();
    assert!(v.validate(Some("abc")).is_empty());
    assert!(!v.validate(Some("abc1")).is_empty());
    assert!(!v.validate(Some("1abc")).is_empty());
}

#[rstest]
fn test_invalid_regex_is_parse_error() {
    let result = parse_validator("regex:([a-z");
    assert!(matches!(result, Err(Error::InvalidValidationRule { .. })));
}

#[rstest]
#[case("12345", true)]
#[case("20k", true)]
#[case("128M", true)]
#[case("4g", true)]
#[case("512s", true)]
#[case("50%", true)]
#[case("0%", false)]
#[case("12t", false)]
#[case("1.5G", false)]
fn test_size(#[case] value: &str, #[case] ok: bool) {
    let v = parse_validator("size").unwrap();
    assert_eq!(v.validate(Some(value)).is_empty(), ok, "value {value}");
}

#[rstest]
fn test_keywords() {
    let v = parse_validator("keywords:cpu-intensive,io_bound").unwrap();
    assert!(v.validate(Some("io_bound")).is_empty());
    assert!(!v.validate(Some("gpu")).is_empty());

    assert!(parse_validator("keywords:bad word").is_err());
}

#[rstest]
#[case("int:1")]
#[case("int:a-b")]
#[case("int:-5-5")]
#[case("")]
#[case(",")]
fn test_malformed_rules(#[case] rule: &str) {
    assert!(parse_validator(rule).is_err(), "rule {rule:?} should fail");
}

#[rstest]
fn test_describe() {
    assert_eq!(
        parse_validator("int:1-9").unwrap().describe(),
        "Integer value in range 1 to 9"
    );
    assert_eq!(
        parse_validator("a,b,").unwrap().describe(),
        "Must be one of: a, b"
    );
    assert_eq!(parse_validator("string").unwrap().describe(), "Non-empty string value");
}

#[rstest]
fn test_help_and_documentation() {
    let help = validation_help();
    assert!(help.contains("BASIC TYPES:"));
    assert!(help.contains("int:MIN-MAX"));
    assert!(help.contains("false/no/0/n -> skip"));

    let docs = validator_documentation();
    assert_eq!(docs.basic_types.len(), 1);
    assert_eq!(docs.basic_types[0].name, "boolean");
    assert_eq!(docs.set_policies.len(), 4);
    assert_eq!(docs.placeholders[0].name, "${FILENAME}");
}
