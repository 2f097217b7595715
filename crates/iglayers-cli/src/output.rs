// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Report lines shared by several commands.

use colored::Colorize;
use iglayers::{Metadata, ValidationReport, ValidationResult, ValidationStatus};

#[cfg(test)]
#[path = "./output_test.rs"]
mod output_test;

pub fn tag(label: &str) -> String {
    let text = format!("[{label}]");
    match label {
        "OK" | "SET" | "FORCE" | "LAZY" => text.green().to_string(),
        "FAIL" | "ERROR" => text.red().bold().to_string(),
        "WARN" => text.yellow().to_string(),
        _ => text.dimmed().to_string(),
    }
}

/// One report line for a validation result.
pub fn validation_line(key: &str, result: &ValidationResult) -> String {
    let name = result.subject.as_deref().unwrap_or(key);
    let value = result.value.as_deref().unwrap_or_default();
    let rule = result.rule.as_deref().unwrap_or_default();
    let ok_or = |bad: &'static str| if result.valid == Some(false) { bad } else { "OK" };

    match result.status {
        ValidationStatus::UnsupportedField
        | ValidationStatus::MissingVarPrefix
        | ValidationStatus::InvalidVarPrefix
        | ValidationStatus::InvalidDefault
        | ValidationStatus::OrphanedAttributes => {
            format!("{} {}", tag("ERROR"), result.describe(key))
        }
        ValidationStatus::MissingRequired | ValidationStatus::MissingRequiredVar => {
            format!("{} {name} - REQUIRED but not set", tag("FAIL"))
        }
        ValidationStatus::Validated => {
            let mut line = format!("{} {name}={value} (rule: {rule})", tag(ok_or("FAIL")));
            if !result.errors.is_empty() {
                line.push_str(&format!(" - {}", result.errors.join("; ")));
            }
            line
        }
        ValidationStatus::RequiredValidated => format!(
            "{} {name}={value} (required, rule: {rule})",
            tag(ok_or("FAIL"))
        ),
        ValidationStatus::OptionalValidated => format!(
            "{} {name}={value} (optional, rule: {rule})",
            tag(ok_or("WARN"))
        ),
        ValidationStatus::LazyOverridden => format!(
            "{} {name}={value} (lazy default overridden)",
            tag("INFO")
        ),
        ValidationStatus::NoValidation => {
            format!("{} {name}={value} (no validation rule)", tag("SKIP"))
        }
        ValidationStatus::RequiredNoValidation => format!(
            "{} {name}={value} (required, no validation rule)",
            tag("SKIP")
        ),
        ValidationStatus::OptionalNoValidation => format!(
            "{} {name}={value} (optional, no validation rule)",
            tag("SKIP")
        ),
        ValidationStatus::OptionalUnset | ValidationStatus::OptionalVarUnset => {
            format!("{} {name} - optional, not set", tag("INFO"))
        }
    }
}

/// Print a validation report, returning true when it has failures.
///
/// The supported field list follows when unsupported fields were found.
pub fn print_validation(report: &ValidationReport, suffix: Option<&str>) -> bool {
    let mut failed = false;
    for (key, result) in report {
        failed |= result.is_failure();
        let line = validation_line(key, result);
        match suffix {
            Some(suffix) => println!("{line} ({suffix})"),
            None => println!("{line}"),
        }
    }
    if report
        .values()
        .any(|r| r.status == ValidationStatus::UnsupportedField)
    {
        print_supported_fields();
    }
    failed
}

pub fn print_supported_fields() {
    println!();
    println!("Supported fields:");
    for field in iglayers::supported_fields() {
        println!("  {field}");
    }
}

/// Print the declared variables of a metadata file.
pub fn print_variables(meta: &Metadata, indent: usize) {
    let container = meta.container();
    if container.variables.is_empty() {
        return;
    }
    let pad = " ".repeat(indent);
    println!("{pad}{}", "Environment Variables:".bold());
    if !container.var_prefix.is_empty() {
        println!("{pad}  Variable Prefix: {}", container.var_prefix);
    }
    println!();

    for (name, var) in &container.variables {
        println!("{pad}  Variable: {}", name.bold());
        println!("{pad}    Default Value: {}", var.value);
        if !var.description.is_empty() {
            println!("{pad}    Description: {}", var.description);
        }
        if var.validator.is_some() {
            println!(
                "{pad}    Validation: type:{} [{}]",
                var.validation_rule,
                var.validation_description()
            );
        }
        println!("{pad}    Set Policy: {}", var.set_policy);
        println!();
    }
}

/// Comma-joined list, or `none`.
pub fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
