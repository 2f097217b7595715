// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Value validators and the validation rule language used by
//! `X-Env-Var-*-Valid` fields.
//!
//! Rules are matched in order, first match wins:
//!
//! ```text
//! bool | int | int:MIN-MAX | string | string-or-empty | string-or-unset
//! regex:PATTERN | keywords:a,b,c | size | a,b,c | a,
//! ```
//!
//! A single bare token without a trailing comma is rejected so that a typo'd
//! type name is never silently read as a one-element enumeration.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./validators_test.rs"]
mod validators_test;

static SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]+[kKmMgGsS]?|[1-9][0-9]*%)$").expect("size pattern is valid")
});

static KEYWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("keyword pattern is valid"));

const BOOL_VALUES: &[&str] = &["true", "false", "1", "0", "yes", "no", "y", "n"];

/// A parsed validation rule.
#[derive(Debug, Clone)]
pub enum Validator {
    Bool,
    Int {
        min: Option<i64>,
        max: Option<i64>,
    },
    String {
        allow_empty: bool,
        allow_unset: bool,
    },
    Enum {
        options: Vec<String>,
    },
    Regex {
        pattern: String,
        compiled: Regex,
    },
    Size,
}

impl Validator {
    /// Check a value, returning every problem found. An empty list means valid.
    ///
    /// `None` stands for an unset variable and is only accepted by
    /// `string-or-unset`.
    pub fn validate(&self, value: Option<&str>) -> Vec<String> {
        match self {
            Self::String {
                allow_empty,
                allow_unset,
            } => match value {
                None if *allow_unset => Vec::new(),
                None => vec!["String value cannot be None/unset".to_string()],
                Some("") if !*allow_empty => vec!["String value cannot be empty".to_string()],
                Some(_) => Vec::new(),
            },
            _ => {
                let Some(value) = value else {
                    return vec!["Value cannot be None".to_string()];
                };
                self.validate_set(value)
            }
        }
    }

    fn validate_set(&self, value: &str) -> Vec<String> {
        match self {
            Self::Bool => {
                if BOOL_VALUES.contains(&value.to_lowercase().as_str()) {
                    Vec::new()
                } else {
                    vec![format!("Value '{value}' is not a valid boolean.")]
                }
            }
            Self::Int { min, max } => match value.trim().parse::<i64>() {
                Err(_) => vec![format!("Value '{value}' is not a valid integer.")],
                Ok(v) => match (min, max) {
                    (Some(min), _) if v < *min => {
                        vec![format!("Value '{v}' is below minimum {min}.")]
                    }
                    (_, Some(max)) if v > *max => {
                        vec![format!("Value '{v}' is above maximum {max}.")]
                    }
                    _ => Vec::new(),
                },
            },
            Self::Enum { options } => {
                if options.iter().any(|o| o == value) {
                    Vec::new()
                } else {
                    vec![format!(
                        "Value '{value}' is not one of: {}",
                        options.join(", ")
                    )]
                }
            }
            Self::Regex { pattern, compiled } => {
                if compiled.is_match(value) {
                    Vec::new()
                } else {
                    vec![format!("Value '{value}' does not match pattern: {pattern}")]
                }
            }
            Self::Size => {
                if SIZE_RE.is_match(value) {
                    Vec::new()
                } else {
                    vec![format!("Value '{value}' is not a valid size format")]
                }
            }
            // handled before dispatch
            Self::String { .. } => Vec::new(),
        }
    }

    /// Human readable description used in listings and documentation.
    pub fn describe(&self) -> String {
        match self {
            Self::Bool => {
                "Boolean value - accepts: true/false, 1/0, yes/no, y/n (case insensitive)"
                    .to_string()
            }
            Self::Int {
                min: None,
                max: None,
            } => "Integer value".to_string(),
            Self::Int { min, max } => format!(
                "Integer value in range {} to {}",
                min.map(|m| m.to_string()).unwrap_or_else(|| "-∞".to_string()),
                max.map(|m| m.to_string()).unwrap_or_else(|| "∞".to_string()),
            ),
            Self::String {
                allow_empty,
                allow_unset,
            } => match (allow_empty, allow_unset) {
                (true, true) => "String value (may be empty or unset)",
                (false, true) => "String value (may be unset but not empty)",
                (true, false) => "String value (may be empty)",
                (false, false) => "Non-empty string value",
            }
            .to_string(),
            Self::Enum { options } => format!("Must be one of: {}", options.join(", ")),
            Self::Regex { pattern, .. } => format!("Must match regex pattern: {pattern}"),
            Self::Size => {
                "Size value with optional unit (bytes, k/m/g/s) or percentage".to_string()
            }
        }
    }

    /// True for `string-or-unset`, where a blank default means "leave unset".
    pub fn allows_unset(&self) -> bool {
        matches!(
            self,
            Self::String {
                allow_unset: true,
                ..
            }
        )
    }
}

/// Parse a rule string into a [`Validator`].
pub fn parse_validator(rule: &str) -> Result<Validator> {
    let rule = rule.trim();
    let invalid = |message: String| Error::InvalidValidationRule {
        rule: rule.to_string(),
        message,
    };

    if rule.is_empty() {
        return Err(invalid("Empty rule string".to_string()));
    }

    let validator = match rule {
        "bool" => Validator::Bool,
        "int" => Validator::Int {
            min: None,
            max: None,
        },
        "string" => Validator::String {
            allow_empty: false,
            allow_unset: false,
        },
        "string-or-empty" => Validator::String {
            allow_empty: true,
            allow_unset: false,
        },
        "string-or-unset" => Validator::String {
            allow_empty: false,
            allow_unset: true,
        },
        "size" => Validator::Size,
        _ => {
            if let Some(range) = rule.strip_prefix("int:") {
                let bounds: Vec<&str> = range.split('-').collect();
                let [min, max] = bounds[..] else {
                    return Err(invalid(format!(
                        "Invalid int range format '{range}': expected MIN-MAX"
                    )));
                };
                let parse = |s: &str| {
                    s.trim()
                        .parse::<i64>()
                        .map_err(|e| invalid(format!("Invalid int range bound '{s}': {e}")))
                };
                Validator::Int {
                    min: Some(parse(min)?),
                    max: Some(parse(max)?),
                }
            } else if let Some(pattern) = rule.strip_prefix("regex:") {
                let compiled = Regex::new(&format!("^(?:{pattern})$"))
                    .map_err(|e| invalid(format!("Invalid regex pattern '{pattern}': {e}")))?;
                Validator::Regex {
                    pattern: pattern.to_string(),
                    compiled,
                }
            } else if let Some(words) = rule.strip_prefix("keywords:") {
                let options: Vec<String> = words
                    .split(',')
                    .map(str::trim)
                    .filter(|w| !w.is_empty())
                    .map(String::from)
                    .collect();
                if let Some(bad) = options.iter().find(|w| !KEYWORD_RE.is_match(w)) {
                    return Err(invalid(format!(
                        "Keyword '{bad}' may only contain letters, digits, '_' and '-'"
                    )));
                }
                if options.is_empty() {
                    return Err(invalid("keywords: needs at least one keyword".to_string()));
                }
                Validator::Enum { options }
            } else if rule.contains(',') {
                let options: Vec<String> = rule
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect();
                if options.is_empty() {
                    return Err(invalid("Enumeration has no values".to_string()));
                }
                Validator::Enum { options }
            } else {
                return Err(invalid(format!(
                    "Single value '{rule}' must use trailing comma ('{rule},') or keywords: prefix ('keywords:{rule}')"
                )));
            }
        }
    };
    Ok(validator)
}

/// One entry of the validator catalogue.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatorHelp {
    pub name: &'static str,
    pub title: &'static str,
    pub details: Vec<&'static str>,
}

/// A named, documented item (set policy or placeholder).
#[derive(Debug, Clone, Serialize)]
pub struct NamedDescription {
    pub name: &'static str,
    pub description: &'static str,
}

/// Structured catalogue consumed by documentation generators.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatorDocumentation {
    pub basic_types: Vec<ValidatorHelp>,
    pub advanced_types: Vec<ValidatorHelp>,
    pub set_policies: Vec<NamedDescription>,
    pub placeholders: Vec<NamedDescription>,
}

const BOOL_HELP: &str =
    "bool                   - Must be: true/false, 1/0, yes/no, y/n (case insensitive)";

const ENUM_HELP: &str = "value1,value2,value3  - Must be one of the listed values
  (Tip: For a single allowed value, either add a trailing comma
        e.g. \"syft,\" or use the keywords: prefix as shown below.)
  Examples:
    development,staging,production    - Environment names
    small,medium,large               - Size options
    debug,info,warn,error            - Log levels

KEYWORDS:
  keywords:word1,word2,word3  - Must be one of the listed alphanumeric keywords
  Keywords can contain: letters (a-z, A-Z), numbers (0-9), underscore (_), hyphen (-)
  Examples:
    keywords:frontend,backend,database     - Application components
    keywords:cpu-intensive,io-bound        - Workload types
    keywords:dev,test,staging,prod         - Environment shortcuts";

const INT_HELP: &str = "int                    - Must be a valid integer
  int:MIN-MAX           - Integer within range (inclusive)
  Examples:
    int:1-100           - Integer from 1 to 100
    int:1024-65535      - Port numbers
    int:0-255           - Byte values";

const REGEX_HELP: &str = "regex:PATTERN         - Must match regular expression
  Examples:
    regex:^[a-zA-Z0-9.-]+$     - Hostname format
    regex:^[0-9]{3}-[0-9]{2}$  - Format like 123-45
    regex:^(http|https)://.*   - URLs starting with http/https";

const SIZE_HELP: &str =
    "size                   - Size with optional unit (bytes, k/m/g/s) or percentage

SIZES:
  size can be specified in one of the following formats
    12345        (bytes)
    20k / 20K    (kilobytes, multiples of 1024)
    128M / 128m  (megabytes)
    1G / 4g      (gigabytes)
    512s         (sectors, multiples of 512)
    50%          (percentage; any positive integer)";

const STRING_HELP: &str = "string                 - Must be a non-empty string (required)
  string-or-unset        - Must be non-empty string or unset (null)
  string-or-empty        - Must be any string (may be empty) but not unset";

/// Help text of each validator family, in name order.
const VALIDATOR_HELP: &[(&str, &str)] = &[
    ("boolean", BOOL_HELP),
    ("enum", ENUM_HELP),
    ("integer", INT_HELP),
    ("regex", REGEX_HELP),
    ("size", SIZE_HELP),
    ("string", STRING_HELP),
];

const SET_POLICIES: &[(&str, &str)] = &[
    (
        "force",
        "Always overwrite existing environment value, regardless of what was set before.",
    ),
    (
        "immediate",
        "Set the variable if it is currently unset (first-wins strategy). This is the default behavior.",
    ),
    (
        "lazy",
        "Applied after all layers are processed (last-wins strategy). Useful for defaults that can be overridden.",
    ),
    (
        "skip",
        "Never set the variable. Useful for optional variables or when you want to disable a variable.",
    ),
];

const PLACEHOLDERS: &[(&str, &str)] = &[
    ("${FILENAME}", "layer metadata file name"),
    ("${DIRECTORY}", "directory containing the file"),
    ("${FILEPATH}", "absolute path to the file"),
];

/// Catalogue of validators, set policies and placeholders.
pub fn validator_documentation() -> ValidatorDocumentation {
    let mut basic_types = Vec::new();
    let mut advanced_types = Vec::new();
    for &(name, text) in VALIDATOR_HELP {
        let mut lines = text.lines();
        let title = lines.next().unwrap_or_default();
        let details: Vec<&'static str> = lines.collect();
        let entry = ValidatorHelp {
            name,
            title,
            details,
        };
        if entry.details.is_empty() {
            basic_types.push(entry);
        } else {
            advanced_types.push(entry);
        }
    }
    let named = |items: &[(&'static str, &'static str)]| {
        items
            .iter()
            .map(|&(name, description)| NamedDescription { name, description })
            .collect()
    };
    ValidatorDocumentation {
        basic_types,
        advanced_types,
        set_policies: named(SET_POLICIES),
        placeholders: named(PLACEHOLDERS),
    }
}

/// Operator help for validation rules, set policies and placeholders.
pub fn validation_help() -> String {
    let mut out = vec!["Validation Schemes for X-Env-Var-*-Valid Fields:\n".to_string()];

    out.push("BASIC TYPES:".to_string());
    for (_, text) in VALIDATOR_HELP.iter().filter(|(_, t)| !t.contains('\n')) {
        out.push(format!("  {text}"));
    }

    out.push("\nADVANCED TYPES:".to_string());
    for (_, text) in VALIDATOR_HELP.iter().filter(|(_, t)| t.contains('\n')) {
        for line in text.lines() {
            out.push(format!("  {line}"));
        }
        out.push(String::new());
    }

    out.extend(
        [
            "TIP: Use `iglayers metadata --lint <file>` to quickly check syntax and field names without validating environment variables.\n",
            "PLACEHOLDERS (auto-substituted in values):",
            "  ${FILENAME}   - layer metadata file name",
            "  ${DIRECTORY}  - directory containing the file",
            "  ${FILEPATH}   - absolute path to the file",
            "  Escape with \\${NAME} to keep the literal text.\n",
            "SET POLICY (X-Env-Var-*-Set):",
            "  force       - always overwrite existing environment value",
            "  immediate   - set if the variable is unset (default)",
            "  lazy        - applied after all layers are processed (last-wins)",
            "  false/no/0  - skip; never set the variable\n",
            "  Aliases:",
            "    true/yes/1/y -> immediate",
            "    false/no/0/n -> skip\n",
            "EXAMPLES:",
            "  X-Env-Var-port-Valid: int:1024-65535",
            "  X-Env-Var-env-Valid: development,staging,production",
            "  X-Env-Var-hostname-Valid: regex:^[a-zA-Z0-9.-]+$",
            "  X-Env-Var-debug-Valid: bool",
            "  X-Env-Var-count-Valid: int:1-1000",
            "  X-Env-Var-component-Valid: keywords:frontend,backend,database\n",
            "VARIABLE REQUIREMENTS:",
            "  X-Env-VarRequires: var1,var2,var3         - Comma-separated environment variables (required)",
            "  X-Env-VarRequires-Valid: rule1,rule2,rule3 - Validation rules (same order)\n",
            "  X-Env-VarOptional: var1,var2,var3         - Comma-separated environment variables (optional)",
            "  X-Env-VarOptional-Valid: rule1,rule2,rule3 - Validation rules (same order)\n",
            "  Variables are checked as-is (no IGconf_ prefix or VarPrefix applied).",
        ]
        .map(String::from),
    );

    out.join("\n")
}
