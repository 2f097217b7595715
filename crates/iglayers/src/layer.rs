// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Layer identity and relationships.

use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::environment::Environment;
use crate::fields::LayerField;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./layer_test.rs"]
mod layer_test;

static ENV_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env reference pattern is valid")
});

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("token pattern is valid"));

static DOC_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_${}-]+$").expect("doc token pattern is valid"));

pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_CATEGORY: &str = "general";

/// Identity and relationships of a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvLayer {
    pub name: String,
    pub description: String,
    pub version: String,
    pub category: String,
    /// Required layer names, in declared order.
    #[serde(rename = "depends")]
    pub deps: Vec<String>,
    /// Layers used when loaded, never required. No field declares these;
    /// they exist for graph consumers.
    #[serde(rename = "optional_depends")]
    pub optional_deps: Vec<String>,
    /// Capability tokens this layer offers.
    pub provides: Vec<String>,
    /// Capability tokens some other layer in the build order must offer.
    #[serde(rename = "provider_requires")]
    pub requires_provider: Vec<String>,
    /// Informational only.
    pub conflicts: Vec<String>,
    /// Basename of the source file.
    pub config_file: String,
}

impl EnvLayer {
    pub fn new<S: Into<String>>(name: S) -> Self {
        let name = name.into();
        Self {
            config_file: format!("{name}.yaml"),
            name,
            description: String::new(),
            version: DEFAULT_VERSION.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            deps: Vec::new(),
            optional_deps: Vec::new(),
            provides: Vec::new(),
            requires_provider: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Build a layer from parsed fields, or `None` when no layer name is set.
    ///
    /// `${VAR}` references in dependency tokens are resolved against `env`.
    /// In `doc_mode` unresolved references are kept literally.
    pub fn from_fields(
        fields: &IndexMap<String, String>,
        path: &Path,
        doc_mode: bool,
        env: &dyn Environment,
    ) -> Result<Option<Self>> {
        let get = |field: LayerField| {
            fields
                .get(field.field_name())
                .map(|v| v.trim())
                .unwrap_or_default()
        };
        let name = get(LayerField::Name);
        if name.is_empty() {
            return Ok(None);
        }
        let list = |field: LayerField| parse_dependency_list(get(field), doc_mode, env);

        let mut layer = Self::new(name);
        layer.description = get(LayerField::Desc).to_string();
        let version = get(LayerField::Version);
        if !version.is_empty() {
            layer.version = version.to_string();
        }
        let category = get(LayerField::Category);
        if !category.is_empty() {
            layer.category = category.to_string();
        }
        layer.deps = list(LayerField::Requires)?;
        layer.provides = list(LayerField::Provides)?;
        layer.requires_provider = list(LayerField::RequiresProvider)?;
        layer.conflicts = list(LayerField::Conflicts)?;
        if let Some(file_name) = path.file_name() {
            layer.config_file = file_name.to_string_lossy().into_owned();
        }
        Ok(Some(layer))
    }
}

/// Split a comma-separated dependency field into validated tokens.
pub fn parse_dependency_list(
    raw: &str,
    doc_mode: bool,
    env: &dyn Environment,
) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let token = if token.contains("${") {
            expand_env_refs(token, doc_mode, env)?
        } else {
            token.to_string()
        };

        if token.chars().any(char::is_whitespace) {
            return Err(Error::InvalidDependencyToken {
                token,
                message: "dependencies must be comma-separated without spaces or newlines inside a token"
                    .to_string(),
            });
        }
        let (pattern, allowed) = if doc_mode {
            (
                &*DOC_TOKEN_RE,
                "only alphanumerics, '-', '_' and ${VAR} placeholders are allowed",
            )
        } else {
            (&*TOKEN_RE, "only alphanumerics, '-' and '_' are allowed")
        };
        if !pattern.is_match(&token) {
            return Err(Error::InvalidDependencyToken {
                token,
                message: allowed.to_string(),
            });
        }
        tokens.push(token);
    }
    Ok(tokens)
}

fn expand_env_refs(token: &str, doc_mode: bool, env: &dyn Environment) -> Result<String> {
    let mut missing = None;
    let expanded = ENV_REF_RE.replace_all(token, |caps: &Captures| {
        let name = &caps[1];
        match env.get(name) {
            Some(value) => value,
            None => {
                if !doc_mode && missing.is_none() {
                    missing = Some(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });
    match missing {
        Some(variable) => Err(Error::UnresolvedDependencyVariable { variable }),
        None => Ok(expanded.into_owned()),
    }
}

/// True when a dependency still carries an unexpanded `${VAR}` reference.
pub fn is_dynamic_dependency(dep: &str) -> bool {
    dep.contains("${") && dep.contains('}')
}
