// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Per-variable validation records.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

#[cfg(test)]
#[path = "./validation_test.rs"]
mod validation_test;

/// Validation results keyed by variable or check name, in check order.
pub type ValidationReport = IndexMap<String, ValidationResult>;

/// Terminal status of a single validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    MissingRequired,
    MissingRequiredVar,
    Validated,
    RequiredValidated,
    RequiredNoValidation,
    LazyOverridden,
    InvalidDefault,
    UnsupportedField,
    MissingVarPrefix,
    InvalidVarPrefix,
    OrphanedAttributes,
    OptionalUnset,
    OptionalVarUnset,
    OptionalValidated,
    OptionalNoValidation,
    NoValidation,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequired => "missing_required",
            Self::MissingRequiredVar => "missing_required_var",
            Self::Validated => "validated",
            Self::RequiredValidated => "required_validated",
            Self::RequiredNoValidation => "required_no_validation",
            Self::LazyOverridden => "lazy_overridden",
            Self::InvalidDefault => "invalid_default",
            Self::UnsupportedField => "unsupported_field",
            Self::MissingVarPrefix => "missing_var_prefix",
            Self::InvalidVarPrefix => "invalid_var_prefix",
            Self::OrphanedAttributes => "orphaned_attributes",
            Self::OptionalUnset => "optional_unset",
            Self::OptionalVarUnset => "optional_var_unset",
            Self::OptionalValidated => "optional_validated",
            Self::OptionalNoValidation => "optional_no_validation",
            Self::NoValidation => "no_validation",
        }
    }

    /// Statuses detectable without looking at the environment.
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedField
                | Self::MissingVarPrefix
                | Self::InvalidVarPrefix
                | Self::OrphanedAttributes
                | Self::InvalidDefault
        )
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one validation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    /// Value that was checked, if any.
    pub value: Option<String>,
    /// `None` when no rule applied.
    pub valid: Option<bool>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Variable named by `X-Env-VarRequires` or `X-Env-VarOptional`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl ValidationResult {
    pub fn new(status: ValidationStatus) -> Self {
        Self {
            status,
            value: None,
            valid: None,
            required: false,
            rule: None,
            errors: Vec::new(),
            message: None,
            subject: None,
        }
    }

    pub fn with_value<S: Into<String>>(mut self, value: S) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = Some(valid);
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_rule<S: Into<String>>(mut self, rule: S) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// True when this result blocks a validate or apply.
    pub fn is_failure(&self) -> bool {
        match self.status {
            ValidationStatus::MissingRequired
            | ValidationStatus::MissingRequiredVar
            | ValidationStatus::UnsupportedField
            | ValidationStatus::MissingVarPrefix
            | ValidationStatus::InvalidVarPrefix
            | ValidationStatus::InvalidDefault
            | ValidationStatus::OrphanedAttributes => true,
            ValidationStatus::Validated | ValidationStatus::RequiredValidated => {
                self.valid == Some(false)
            }
            _ => false,
        }
    }

    /// An optional variable that is set but invalid.
    pub fn is_warning(&self) -> bool {
        self.status == ValidationStatus::OptionalValidated && self.valid == Some(false)
    }

    pub fn is_missing_required(&self) -> bool {
        matches!(
            self.status,
            ValidationStatus::MissingRequired | ValidationStatus::MissingRequiredVar
        )
    }

    /// One line describing this result for the check named `key`.
    pub fn describe(&self, key: &str) -> String {
        let name = self.subject.as_deref().unwrap_or(key);
        let value = self.value.as_deref().unwrap_or_default();
        let details = if !self.errors.is_empty() {
            format!(" - {}", self.errors.join("; "))
        } else if let Some(rule) = &self.rule {
            format!(" (rule: {rule})")
        } else {
            String::new()
        };
        match self.status {
            ValidationStatus::MissingRequired | ValidationStatus::MissingRequiredVar => {
                format!("{name} - REQUIRED but not set")
            }
            ValidationStatus::Validated | ValidationStatus::RequiredValidated
                if self.valid == Some(false) =>
            {
                format!("{name}={value} (invalid){details}")
            }
            _ => match &self.message {
                Some(message) => message.clone(),
                None => format!("{name}: {}{details}", self.status),
            },
        }
    }
}

/// Describe every failure in a report.
pub fn failures(report: &ValidationReport) -> Vec<String> {
    report
        .iter()
        .filter(|(_, r)| r.is_failure())
        .map(|(k, r)| r.describe(k))
        .collect()
}
