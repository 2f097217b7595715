// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Per-file aggregate of parsed fields, layer identity and variables.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::environment::Environment;
use crate::fields::{
    FieldKind, VAR_FIELD_PREFIX, VAR_OPTIONAL_FIELD, VAR_PREFIX_FIELD, VAR_REQUIRES_FIELD,
    VarAttribute,
};
use crate::layer::EnvLayer;
use crate::validators::parse_validator;
use crate::variable::{EnvVariable, SetPolicy, full_variable_name, parse_required};
use crate::Result;

#[cfg(test)]
#[path = "./container_test.rs"]
mod container_test;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z][A-Z0-9_]*)\}").expect("placeholder pattern is valid"));

const ESCAPED_OPEN: &str = "\\${";
const ESCAPE_SENTINEL: &str = "\u{0}LITERAL_DOLLAR_BRACE\u{0}";

/// File-local values substituted for `${FILENAME}`, `${DIRECTORY}` and
/// `${FILEPATH}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    pub filename: String,
    pub directory: String,
    pub filepath: String,
}

impl Placeholders {
    pub fn for_path(path: &Path) -> Self {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let lossy = |p: Option<&Path>| {
            p.map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        Self {
            filename: absolute
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            directory: lossy(absolute.parent()),
            filepath: absolute.to_string_lossy().into_owned(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "FILENAME" => Some(&self.filename),
            "DIRECTORY" => Some(&self.directory),
            "FILEPATH" => Some(&self.filepath),
            _ => None,
        }
    }

    /// Replace known placeholders in `text`.
    ///
    /// `\${NAME}` yields a literal `${NAME}` and unknown names are left as is.
    pub fn substitute(&self, text: &str) -> String {
        if !text.contains("${") {
            return text.to_string();
        }
        let escaped = text.replace(ESCAPED_OPEN, ESCAPE_SENTINEL);
        let replaced = PLACEHOLDER_RE.replace_all(&escaped, |caps: &Captures| {
            self.get(&caps[1])
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        });
        replaced.replace(ESCAPE_SENTINEL, "${")
    }
}

/// Everything parsed from one metadata file.
#[derive(Debug, Clone)]
pub struct MetadataContainer {
    pub path: PathBuf,
    /// Field values after placeholder substitution.
    pub fields: IndexMap<String, String>,
    /// Field values exactly as written.
    pub original_fields: IndexMap<String, String>,
    pub layer: Option<EnvLayer>,
    /// Lower-cased value of `X-Env-VarPrefix`.
    pub var_prefix: String,
    /// Declared variables keyed by full name.
    pub variables: IndexMap<String, EnvVariable>,
    /// `X-Env-VarRequires`, checked by exact name.
    pub required_vars: Vec<String>,
    /// `X-Env-VarOptional`, checked by exact name.
    pub optional_vars: Vec<String>,
}

impl MetadataContainer {
    pub fn from_fields(
        original_fields: IndexMap<String, String>,
        path: &Path,
        doc_mode: bool,
        env: &dyn Environment,
    ) -> Result<Self> {
        let placeholders = Placeholders::for_path(path);
        let fields: IndexMap<String, String> = original_fields
            .iter()
            .map(|(k, v)| (k.clone(), placeholders.substitute(v)))
            .collect();

        let var_prefix = fields
            .get(VAR_PREFIX_FIELD)
            .map(|p| p.trim().to_lowercase())
            .unwrap_or_default();
        let layer = EnvLayer::from_fields(&fields, path, doc_mode, env)?;

        let mut container = Self {
            path: path.to_path_buf(),
            required_vars: split_list(fields.get(VAR_REQUIRES_FIELD)),
            optional_vars: split_list(fields.get(VAR_OPTIONAL_FIELD)),
            fields,
            original_fields,
            layer,
            var_prefix,
            variables: IndexMap::new(),
        };

        let declared: Vec<String> = container
            .fields
            .keys()
            .filter_map(|k| match FieldKind::classify(k) {
                Some(FieldKind::VarBase { name }) => Some(name),
                _ => None,
            })
            .collect();
        for name in declared {
            let var = container.build_variable(&name);
            container.variables.insert(var.name.clone(), var);
        }
        Ok(container)
    }

    /// Value of an attribute field for a declared variable name.
    ///
    /// Variable names match case-insensitively between base and attribute.
    pub fn var_attribute(&self, name: &str, attr: VarAttribute) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| {
                matches!(
                    FieldKind::classify(k),
                    Some(FieldKind::VarAttr { name: ref n, attr: a })
                        if a == attr && n.eq_ignore_ascii_case(name)
                )
            })
            .map(|(_, v)| v.as_str())
    }

    fn build_variable(&self, name: &str) -> EnvVariable {
        let value = self
            .fields
            .get(&format!("{VAR_FIELD_PREFIX}{name}"))
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        let rule = self
            .var_attribute(name, VarAttribute::Valid)
            .map(|r| r.trim().to_string())
            .unwrap_or_default();
        let validator = if rule.is_empty() {
            None
        } else {
            parse_validator(&rule).ok()
        };

        let mut var = EnvVariable::new(full_variable_name(&self.var_prefix, name), value);
        var.declared_name = name.to_string();
        var.description = self
            .var_attribute(name, VarAttribute::Desc)
            .unwrap_or_default()
            .to_string();
        var.required = self
            .var_attribute(name, VarAttribute::Required)
            .is_some_and(parse_required);
        var.set_policy = self
            .var_attribute(name, VarAttribute::Set)
            .map(SetPolicy::parse)
            .unwrap_or_default();
        var.validator = validator;
        var.validation_rule = rule;
        var
    }

    pub fn has_layer(&self) -> bool {
        self.layer.is_some()
    }

    /// Variables whose policy allows them to be set.
    pub fn settable_variables(&self) -> impl Iterator<Item = &EnvVariable> {
        self.variables.values().filter(|v| v.should_set())
    }

    /// Unexpanded default of a declared variable.
    pub fn original_value(&self, var: &EnvVariable) -> Option<&str> {
        self.original_fields
            .get(&format!("{VAR_FIELD_PREFIX}{}", var.declared_name))
            .map(|v| v.trim())
    }
}

/// Split a comma-separated list field, dropping empty items.
pub fn split_list(raw: Option<&String>) -> Vec<String> {
    raw.map(|r| {
        r.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}
