// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Emit machine-readable documentation for layers or validators.

use clap::Args;
use iglayers::DocFormat;
use miette::{IntoDiagnostic, Result};

/// Emit structured layer documentation as YAML
#[derive(Debug, Args)]
pub struct CmdDoc {
    /// Layers to document, all discovered layers when omitted
    names: Vec<String>,

    /// Format of the companion documentation files to embed
    #[clap(long, default_value_t = DocFormat::Asciidoc)]
    format: DocFormat,

    /// Document the validation rule syntax instead of layers
    #[clap(long, conflicts_with = "names")]
    validators: bool,

    /// Layer discovery flags
    #[clap(flatten)]
    layers: crate::LayerFlags,
}

impl CmdDoc {
    pub fn run(&mut self) -> Result<i32> {
        if self.validators {
            let yaml = serde_yaml::to_string(&iglayers::validator_documentation()).into_diagnostic()?;
            print!("{yaml}");
            return Ok(0);
        }

        // Unresolved ${VAR} dependencies are kept as written.
        let manager = self.layers.load(true)?;
        let names = if self.names.is_empty() {
            manager.layer_names().map(String::from).collect()
        } else {
            manager.resolve_targets(&self.names)?
        };

        let docs = names
            .iter()
            .map(|name| manager.documentation(name, self.format))
            .collect::<iglayers::Result<Vec<_>>>()?;
        let yaml = serde_yaml::to_string(&docs).into_diagnostic()?;
        print!("{yaml}");
        Ok(0)
    }
}
