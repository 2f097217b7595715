// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

fn plain(key: &str, result: &ValidationResult) -> String {
    colored::control::set_override(false);
    validation_line(key, result)
}

#[rstest]
fn test_missing_required_line() {
    let result = ValidationResult::new(ValidationStatus::MissingRequiredVar).with_subject("HOME");
    assert_eq!(plain("required_var_HOME", &result), "[FAIL] HOME - REQUIRED but not set");
}

#[rstest]
#[case(true, "[OK] IGconf_x_port=8080 (rule: int:1024-65535)")]
#[case(false, "[FAIL] IGconf_x_port=8080 (rule: int:1024-65535)")]
fn test_validated_line(#[case] valid: bool, #[case] expected: &str) {
    let result = ValidationResult::new(ValidationStatus::Validated)
        .with_value("8080")
        .with_valid(valid)
        .with_rule("int:1024-65535");
    assert_eq!(plain("IGconf_x_port", &result), expected);
}

#[rstest]
fn test_invalid_optional_is_a_warning() {
    let result = ValidationResult::new(ValidationStatus::OptionalValidated)
        .with_subject("LOG_LEVEL")
        .with_value("loud")
        .with_valid(false)
        .with_rule("debug,info");
    assert_eq!(
        plain("optional_var_LOG_LEVEL", &result),
        "[WARN] LOG_LEVEL=loud (optional, rule: debug,info)"
    );
}

#[rstest]
fn test_unsupported_field_uses_message() {
    let result = ValidationResult::new(ValidationStatus::UnsupportedField)
        .with_message("Unsupported field: X-Env-Bogus");
    assert_eq!(
        plain("X-Env-Bogus", &result),
        "[ERROR] Unsupported field: X-Env-Bogus"
    );
}

#[rstest]
#[case(&[], "none")]
#[case(&["a", "b"], "a, b")]
fn test_list_or_none(#[case] items: &[&str], #[case] expected: &str) {
    let items: Vec<String> = items.iter().map(|s| s.to_string()).collect();
    assert_eq!(list_or_none(&items), expected);
}
