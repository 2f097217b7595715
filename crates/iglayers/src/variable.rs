// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Declared environment variables and their set policies.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::VAR_NAME_PREFIX;
use crate::validators::Validator;

static VAR_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("prefix pattern is valid"));

#[cfg(test)]
#[path = "./variable_test.rs"]
mod variable_test;

/// How a variable's value is chosen when several layers define it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetPolicy {
    /// Always overwrite; the last force definition wins.
    Force,
    /// Set when unset; the first definition wins.
    #[default]
    Immediate,
    /// Set when unset after all layers; the last definition wins.
    Lazy,
    /// Never set.
    Skip,
    /// Resolved entry for a variable that was present before resolution.
    AlreadySet,
}

impl SetPolicy {
    /// Parse the value of an `X-Env-Var-*-Set` field.
    ///
    /// Case and surrounding whitespace are ignored. Anything not recognised
    /// is treated as `immediate`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "false" | "0" | "no" | "n" => Self::Skip,
            "lazy" => Self::Lazy,
            "force" => Self::Force,
            _ => Self::Immediate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Force => "force",
            Self::Immediate => "immediate",
            Self::Lazy => "lazy",
            Self::Skip => "skip",
            Self::AlreadySet => "already_set",
        }
    }

    pub fn is_settable(&self) -> bool {
        !matches!(self, Self::Skip)
    }
}

impl fmt::Display for SetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse the value of an `X-Env-Var-*-Required` field.
pub fn parse_required(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    )
}

/// True when `prefix` can be part of an environment variable name.
pub fn is_valid_var_prefix(prefix: &str) -> bool {
    VAR_PREFIX_RE.is_match(prefix)
}

/// Build the environment variable name for a declared variable.
///
/// Without a prefix the declared name is used unchanged.
pub fn full_variable_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!(
            "{VAR_NAME_PREFIX}_{}_{}",
            prefix.to_lowercase(),
            name.to_lowercase()
        )
    }
}

/// A single declaration of an environment variable.
#[derive(Debug, Clone)]
pub struct EnvVariable {
    /// Fully-qualified name, e.g. `IGconf_net_port`.
    pub name: String,
    /// Name as written in the `X-Env-Var-<NAME>` field.
    pub declared_name: String,
    /// Default value.
    pub value: String,
    pub description: String,
    pub required: bool,
    /// Parsed rule; `None` when there is no rule or the rule did not parse.
    pub validator: Option<Validator>,
    /// Raw rule string as declared.
    pub validation_rule: String,
    pub set_policy: SetPolicy,
    /// Name of the layer contributing this definition.
    pub source_layer: String,
    /// Index of the source layer in the build order being resolved.
    pub position: usize,
}

impl EnvVariable {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        let name = name.into();
        Self {
            declared_name: name.clone(),
            name,
            value: value.into(),
            description: String::new(),
            required: false,
            validator: None,
            validation_rule: String::new(),
            set_policy: SetPolicy::default(),
            source_layer: String::new(),
            position: 0,
        }
    }

    pub fn with_policy(mut self, policy: SetPolicy) -> Self {
        self.set_policy = policy;
        self
    }

    /// A copy tagged with the layer and build-order position it came from.
    pub fn at_position<S: Into<String>>(&self, layer: S, position: usize) -> Self {
        Self {
            source_layer: layer.into(),
            position,
            ..self.clone()
        }
    }

    /// True when a rule was declared but could not be parsed.
    pub fn has_invalid_rule(&self) -> bool {
        !self.validation_rule.trim().is_empty() && self.validator.is_none()
    }

    /// Validate a value, or the default when `value` is `None`.
    pub fn validate(&self, value: Option<&str>) -> Vec<String> {
        match &self.validator {
            Some(validator) => validator.validate(Some(value.unwrap_or(&self.value))),
            None => Vec::new(),
        }
    }

    pub fn validation_description(&self) -> String {
        match &self.validator {
            Some(validator) => validator.describe(),
            None => "No validation rule".to_string(),
        }
    }

    pub fn should_set(&self) -> bool {
        self.set_policy.is_settable()
    }

    /// A blank default under `string-or-unset` means the variable stays unset.
    pub fn leaves_unset(&self) -> bool {
        self.validator.as_ref().is_some_and(Validator::allows_unset)
            && self.value.trim().is_empty()
    }
}
