// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Structured documentation records for loaded layers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Serialize;

use crate::fields::VAR_PREFIX_FIELD;
use crate::layer::{EnvLayer, is_dynamic_dependency};
use crate::manager::{BuildConfig, LayerManager};
use crate::variable::SetPolicy;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./docs_test.rs"]
mod docs_test;

/// Format of the companion documentation file read next to a layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocFormat {
    #[default]
    Asciidoc,
    Markdown,
    Rst,
}

impl DocFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Asciidoc => "adoc",
            Self::Markdown => "md",
            Self::Rst => "rst",
        }
    }
}

impl FromStr for DocFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asciidoc" | "adoc" => Ok(Self::Asciidoc),
            "markdown" | "md" => Ok(Self::Markdown),
            "rst" => Ok(Self::Rst),
            other => Err(format!(
                "unknown documentation format '{other}', expected asciidoc, markdown or rst"
            )),
        }
    }
}

impl fmt::Display for DocFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Asciidoc => "asciidoc",
            Self::Markdown => "markdown",
            Self::Rst => "rst",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDoc {
    pub name: String,
    /// Default after placeholder substitution.
    pub value: String,
    /// Default exactly as written in the file.
    pub original_value: String,
    pub description: String,
    pub validation_rule: String,
    pub required: bool,
    pub set_policy: SetPolicy,
    pub validation_description: String,
}

/// Required dependencies split by whether they still hold `${VAR}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyDoc {
    #[serde(rename = "static_dep")]
    pub static_deps: Vec<String>,
    #[serde(rename = "dyn_dep")]
    pub dynamic_deps: Vec<String>,
}

impl DependencyDoc {
    pub fn categorise(deps: &[String]) -> Self {
        let (dynamic_deps, static_deps): (Vec<String>, Vec<String>) = deps
            .iter()
            .cloned()
            .partition(|dep| is_dynamic_dependency(dep));
        Self {
            static_deps,
            dynamic_deps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerDocumentation {
    pub layer_info: EnvLayer,
    pub variables: IndexMap<String, VariableDoc>,
    pub required_variables: Vec<String>,
    pub variable_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mmdebstrap: Option<BuildConfig>,
    /// Layer file relative to the search path that holds it.
    pub file_path: PathBuf,
    pub companion_doc: String,
    pub dependencies: DependencyDoc,
    pub reverse_dependencies: Vec<String>,
}

impl LayerManager {
    /// Collect the documentation record of a loaded layer.
    pub fn documentation(&self, name: &str, format: DocFormat) -> Result<LayerDocumentation> {
        let meta = self.layer(name)?;
        let layer_info = meta
            .layer_info()
            .cloned()
            .ok_or_else(|| Error::LayerNotFound(name.to_string()))?;
        let container = meta.container();

        let variables = container
            .variables
            .iter()
            .map(|(key, var)| {
                let doc = VariableDoc {
                    name: var.name.clone(),
                    value: var.value.clone(),
                    original_value: container
                        .original_value(var)
                        .unwrap_or(&var.value)
                        .to_string(),
                    description: var.description.clone(),
                    validation_rule: var.validation_rule.clone(),
                    required: var.required,
                    set_policy: var.set_policy,
                    validation_description: var.validation_description(),
                };
                (key.clone(), doc)
            })
            .collect();

        let mmdebstrap = match self.build_config(name) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Cannot read build configuration of '{name}': {err}");
                None
            }
        };

        Ok(LayerDocumentation {
            dependencies: DependencyDoc::categorise(&layer_info.deps),
            layer_info,
            variables,
            required_variables: container.required_vars.clone(),
            variable_prefix: meta
                .fields()
                .get(VAR_PREFIX_FIELD)
                .map(|p| p.trim().to_string())
                .unwrap_or_default(),
            mmdebstrap,
            file_path: self.relative_path(name).unwrap_or_default(),
            companion_doc: self.companion_doc(name, format),
            reverse_dependencies: self.reverse_dependencies(name),
        })
    }

    /// Text of the documentation file next to a layer, empty if absent.
    pub fn companion_doc(&self, name: &str, format: DocFormat) -> String {
        let Some(path) = self.layer_file(name) else {
            return String::new();
        };
        let companion = path.with_extension(format.extension());
        if !companion.exists() {
            return String::new();
        }
        match std::fs::read_to_string(&companion) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(
                    "Could not read companion documentation file {}: {err}",
                    companion.display()
                );
                String::new()
            }
        }
    }
}
