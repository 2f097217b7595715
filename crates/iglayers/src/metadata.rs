// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Loading, validating and applying the metadata of a single layer file.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;

use crate::container::{MetadataContainer, split_list};
use crate::environment::{Environment, MemoryEnvironment, env_file_line};
use crate::fields::{
    FieldKind, VAR_FIELD_PREFIX, VAR_OPTIONAL_VALID_FIELD, VAR_REQUIRES_VALID_FIELD,
};
use crate::layer::EnvLayer;
use crate::validation::{ValidationReport, ValidationResult, ValidationStatus};
use crate::validators::parse_validator;
use crate::variable::{SetPolicy, is_valid_var_prefix};
use crate::{Error, Result, record};

#[cfg(test)]
#[path = "./metadata_test.rs"]
mod metadata_test;

/// Result of setting one variable from its own layer's defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetStatus {
    Set,
    ForceSet,
    AlreadySet,
    NoSetPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetOutcome {
    pub status: SetStatus,
    pub value: Option<String>,
    pub reason: &'static str,
}

impl SetOutcome {
    fn new(status: SetStatus, value: Option<String>, reason: &'static str) -> Self {
        Self {
            status,
            value,
            reason,
        }
    }
}

/// Summary of a single declared variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDescription {
    pub name: String,
    pub description: String,
    pub validation: String,
    pub set_policy: SetPolicy,
    pub value: String,
}

/// Parsed metadata of one layer file.
#[derive(Debug, Clone)]
pub struct Metadata {
    container: MetadataContainer,
}

impl Metadata {
    /// Read and parse a metadata file.
    ///
    /// `${VAR}` references in layer dependency fields are resolved from
    /// `env`; in `doc_mode` unresolved references are kept as written.
    pub fn load<P: AsRef<Path>>(path: P, doc_mode: bool, env: &dyn Environment) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        Self::parse(&content, path, doc_mode, env)
    }

    /// Parse metadata from file content, treating it as loaded from `path`.
    pub fn parse(content: &str, path: &Path, doc_mode: bool, env: &dyn Environment) -> Result<Self> {
        let fields = record::parse_fields(content).map_err(|message| Error::MalformedMetadata {
            path: path.to_path_buf(),
            message,
        })?;
        let container = MetadataContainer::from_fields(fields, path, doc_mode, env)?;
        Ok(Self { container })
    }

    pub fn path(&self) -> &Path {
        &self.container.path
    }

    pub fn container(&self) -> &MetadataContainer {
        &self.container
    }

    /// Field values after placeholder substitution.
    pub fn fields(&self) -> &IndexMap<String, String> {
        &self.container.fields
    }

    pub fn layer_info(&self) -> Option<&EnvLayer> {
        self.container.layer.as_ref()
    }

    pub fn has_layer_info(&self) -> bool {
        self.container.has_layer()
    }

    /// Reserved-prefix fields that are not recognised.
    pub fn unsupported_fields(&self) -> Vec<&str> {
        self.container
            .fields
            .keys()
            .filter(|k| FieldKind::is_reserved(k) && FieldKind::classify(k).is_none())
            .map(String::as_str)
            .collect()
    }

    fn missing_var_prefix(&self) -> bool {
        !self.container.variables.is_empty() && self.container.var_prefix.is_empty()
    }

    /// The declared prefix, when it cannot form a variable name.
    fn invalid_var_prefix(&self) -> Option<&str> {
        let prefix = self.container.var_prefix.as_str();
        (!prefix.is_empty() && !is_valid_var_prefix(prefix)).then_some(prefix)
    }

    fn ensure_settable(&self) -> Result<()> {
        let unsupported = self.unsupported_fields();
        if !unsupported.is_empty() {
            return Err(Error::UnsupportedFields {
                fields: unsupported.into_iter().map(String::from).collect(),
            });
        }
        if self.missing_var_prefix() {
            return Err(Error::MissingVarPrefix);
        }
        if let Some(prefix) = self.invalid_var_prefix() {
            return Err(Error::InvalidVarPrefix {
                prefix: prefix.to_string(),
            });
        }
        Ok(())
    }

    /// Defaults of every declared variable, keyed by full name.
    pub fn get_all_env_vars(&self) -> Result<IndexMap<String, String>> {
        self.ensure_settable()?;
        Ok(self
            .container
            .variables
            .iter()
            .map(|(name, var)| (name.clone(), var.value.clone()))
            .collect())
    }

    /// Defaults of declared variables not currently set in `env`.
    pub fn get_unset_env_vars(&self, env: &dyn Environment) -> Result<IndexMap<String, String>> {
        let mut vars = self.get_all_env_vars()?;
        vars.retain(|name, _| !env.contains(name));
        Ok(vars)
    }

    /// Validate every declared field and variable against `env`.
    ///
    /// Schema problems short-circuit: unsupported fields are reported
    /// alone, then a missing prefix or orphaned attributes.
    pub fn validate_env_vars(&self, env: &dyn Environment) -> ValidationReport {
        let schema = self.schema_errors();
        if !schema.is_empty() {
            return schema;
        }
        let structure = self.prefix_and_orphan_errors();
        if !structure.is_empty() {
            return structure;
        }

        let mut report = self.validate_declared(env);
        report.extend(self.validate_listed(env, true));
        report.extend(self.validate_listed(env, false));
        report
    }

    /// Validation failures that do not depend on the environment.
    pub fn lint_metadata_syntax(&self) -> ValidationReport {
        let mut report = self.validate_env_vars(&MemoryEnvironment::new());
        report.retain(|_, r| r.status.is_syntax());
        report
    }

    fn schema_errors(&self) -> ValidationReport {
        self.unsupported_fields()
            .into_iter()
            .map(|field| {
                let mut result = ValidationResult::new(ValidationStatus::UnsupportedField)
                    .with_valid(false)
                    .with_message(format!("'{field}' is not supported"));
                result.value = self.container.fields.get(field).cloned();
                (format!("UNSUPPORTED_FIELD_{field}"), result)
            })
            .collect()
    }

    fn prefix_and_orphan_errors(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        if self.missing_var_prefix() {
            report.insert(
                "MISSING_VAR_PREFIX".to_string(),
                ValidationResult::new(ValidationStatus::MissingVarPrefix)
                    .with_valid(false)
                    .with_required(true)
                    .with_message(
                        "X-Env-Var-* fields are defined but X-Env-VarPrefix is missing. \
                         Environment variables require a valid prefix.",
                    ),
            );
            return report;
        }
        if let Some(prefix) = self.invalid_var_prefix() {
            report.insert(
                "INVALID_VAR_PREFIX".to_string(),
                ValidationResult::new(ValidationStatus::InvalidVarPrefix)
                    .with_value(prefix)
                    .with_valid(false)
                    .with_required(true)
                    .with_message(format!(
                        "X-Env-VarPrefix '{prefix}' is invalid: only letters, numbers and underscores are allowed"
                    )),
            );
            return report;
        }

        let mut bases = HashSet::new();
        let mut attributed = Vec::new();
        for field in self.container.fields.keys() {
            match FieldKind::classify(field) {
                Some(FieldKind::VarBase { name }) => {
                    bases.insert(name.to_lowercase());
                }
                Some(FieldKind::VarAttr { name, .. }) => {
                    let name = name.to_lowercase();
                    if !attributed.contains(&name) {
                        attributed.push(name);
                    }
                }
                _ => {}
            }
        }
        let path = self.path().display();
        for name in attributed.into_iter().filter(|n| !bases.contains(n)) {
            let upper = name.to_uppercase();
            report.insert(
                format!("ORPHANED_ATTRS_{upper}"),
                ValidationResult::new(ValidationStatus::OrphanedAttributes)
                    .with_valid(false)
                    .with_message(format!(
                        "{path}: Found attribute fields for variable '{name}' but no base \
                         {VAR_FIELD_PREFIX}{upper} definition"
                    )),
            );
        }
        report
    }

    fn unsupported_rule(&self, subject: &str, rule: &str) -> ValidationResult {
        ValidationResult::new(ValidationStatus::UnsupportedField)
            .with_valid(false)
            .with_message(format!(
                "{}: Unsupported validation rule '{rule}' for variable {subject}",
                self.path().display()
            ))
    }

    fn validate_declared(&self, env: &dyn Environment) -> ValidationReport {
        let mut report = ValidationReport::new();
        for (name, var) in &self.container.variables {
            let current = env.get(name);

            if var.has_invalid_rule() {
                let mut result = self
                    .unsupported_rule(name, &var.validation_rule)
                    .with_value(var.value.clone())
                    .with_required(var.required);
                result.rule = Some(var.validation_rule.clone());
                report.insert(format!("DEFAULT_{name}"), result);
                continue;
            }

            if var.set_policy == SetPolicy::Lazy {
                if let Some(current) = current.as_ref().filter(|c| **c != var.value) {
                    report.insert(
                        name.clone(),
                        ValidationResult::new(ValidationStatus::LazyOverridden)
                            .with_value(current.clone())
                            .with_valid(true)
                            .with_required(var.required),
                    );
                    continue;
                }
            }

            // a blank string-or-unset default stands for "unset"
            if var.validator.is_some() && var.should_set() && !var.leaves_unset() {
                let errors = var.validate(None);
                if !errors.is_empty() {
                    let description = var.validation_description();
                    report.insert(
                        format!("DEFAULT_{name}"),
                        ValidationResult::new(ValidationStatus::InvalidDefault)
                            .with_value(var.value.clone())
                            .with_valid(false)
                            .with_required(var.required)
                            .with_rule(description.clone())
                            .with_errors(errors)
                            .with_message(format!(
                                "Default value '{}' for {name} doesn't match validation rule '{description}'",
                                var.value
                            )),
                    );
                }
            }

            let result = match current {
                None if var.required => {
                    ValidationResult::new(ValidationStatus::MissingRequired)
                        .with_valid(false)
                        .with_required(true)
                }
                Some(value) if var.validator.is_some() => {
                    let errors = var.validate(Some(&value));
                    ValidationResult::new(ValidationStatus::Validated)
                        .with_valid(errors.is_empty())
                        .with_value(value)
                        .with_required(var.required)
                        .with_rule(var.validation_description())
                        .with_errors(errors)
                }
                Some(value) => ValidationResult::new(ValidationStatus::NoValidation)
                    .with_value(value)
                    .with_required(var.required),
                None => ValidationResult::new(ValidationStatus::OptionalUnset),
            };
            report.insert(name.clone(), result);
        }
        report
    }

    /// Check the `X-Env-VarRequires` or `X-Env-VarOptional` list.
    fn validate_listed(&self, env: &dyn Environment, required: bool) -> ValidationReport {
        let (names, rules_field, key_prefix) = if required {
            (&self.container.required_vars, VAR_REQUIRES_VALID_FIELD, "REQUIRED")
        } else {
            (&self.container.optional_vars, VAR_OPTIONAL_VALID_FIELD, "OPTIONAL")
        };
        let rules = split_list(self.container.fields.get(rules_field));

        let mut report = ValidationReport::new();
        for (i, name) in names.iter().enumerate() {
            let key = format!("{key_prefix}_{name}");
            let rule = rules.get(i);
            let Some(value) = env.get(name) else {
                let result = if required {
                    ValidationResult::new(ValidationStatus::MissingRequiredVar)
                        .with_valid(false)
                        .with_required(true)
                } else {
                    ValidationResult::new(ValidationStatus::OptionalVarUnset)
                };
                report.insert(key, result.with_subject(name.clone()));
                continue;
            };

            let result = match rule.map(|r| (r, parse_validator(r))) {
                Some((rule, Err(_))) => self
                    .unsupported_rule(name, rule)
                    .with_value(value)
                    .with_required(required)
                    .with_rule(rule.clone()),
                Some((rule, Ok(validator))) => {
                    let errors = validator.validate(Some(&value));
                    let status = if required {
                        ValidationStatus::RequiredValidated
                    } else {
                        ValidationStatus::OptionalValidated
                    };
                    ValidationResult::new(status)
                        .with_valid(errors.is_empty())
                        .with_value(value)
                        .with_required(required)
                        .with_rule(rule.clone())
                        .with_errors(errors)
                }
                None => {
                    let status = if required {
                        ValidationStatus::RequiredNoValidation
                    } else {
                        ValidationStatus::OptionalNoValidation
                    };
                    ValidationResult::new(status)
                        .with_value(value)
                        .with_required(required)
                }
            };
            report.insert(key, result.with_subject(name.clone()));
        }
        report
    }

    /// Apply this file's own defaults to `env`.
    ///
    /// With no later layer to defer to, `lazy` behaves like `immediate`.
    pub fn set_env_vars(&self, env: &mut dyn Environment) -> Result<IndexMap<String, SetOutcome>> {
        self.ensure_settable()?;

        let mut outcomes = IndexMap::new();
        for (name, var) in &self.container.variables {
            let current = env.get(name);
            let outcome = match (var.set_policy, current) {
                (SetPolicy::Skip, _) => {
                    SetOutcome::new(SetStatus::NoSetPolicy, None, "marked as Set: false/skip")
                }
                (SetPolicy::Force, _) | (SetPolicy::Lazy, None) if var.leaves_unset() => SetOutcome::new(
                    SetStatus::NoSetPolicy,
                    None,
                    "empty value with string-or-unset validation",
                ),
                (SetPolicy::Force, _) => {
                    env.set(name, &var.value);
                    SetOutcome::new(
                        SetStatus::ForceSet,
                        Some(var.value.clone()),
                        "Set: force override",
                    )
                }
                (_, Some(current)) => {
                    SetOutcome::new(SetStatus::AlreadySet, Some(current), "already in environment")
                }
                (policy, None) => {
                    env.set(name, &var.value);
                    let reason = if policy == SetPolicy::Lazy {
                        "auto-set from metadata (lazy, single layer)"
                    } else {
                        "auto-set from metadata (immediate)"
                    };
                    SetOutcome::new(SetStatus::Set, Some(var.value.clone()), reason)
                }
            };
            outcomes.insert(name.clone(), outcome);
        }
        Ok(outcomes)
    }

    /// Look up a variable by full name, or by the name after its prefix.
    pub fn variable_description(&self, name: &str) -> Result<VariableDescription> {
        let suffix = format!("_{}", name.to_lowercase());
        let var = self.container.variables.get(name).or_else(|| {
            self.container
                .variables
                .values()
                .find(|v| v.name.to_lowercase().ends_with(&suffix))
        });
        let var = var.ok_or_else(|| Error::VariableNotFound(name.to_string()))?;
        Ok(VariableDescription {
            name: var.name.clone(),
            description: var.description.clone(),
            validation: var.validation_description(),
            set_policy: var.set_policy,
            value: var.value.clone(),
        })
    }

    /// `NAME="value"` lines for every settable variable, preferring the
    /// value currently in `env` over the default.
    pub fn env_file_lines(&self, env: &dyn Environment) -> Result<Vec<String>> {
        self.ensure_settable()?;
        Ok(self
            .container
            .settable_variables()
            .map(|var| {
                let value = env.get(&var.name).unwrap_or_else(|| var.value.clone());
                env_file_line(&var.name, &value)
            })
            .collect())
    }

    pub fn write_env_file<P: AsRef<Path>>(&self, path: P, env: &dyn Environment) -> Result<()> {
        let mut content = self.env_file_lines(env)?.join("\n");
        content.push('\n');
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}
