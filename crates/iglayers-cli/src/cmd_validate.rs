// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Validate layer metadata and variables against the current environment.

use clap::Args;
use colored::Colorize;
use iglayers::ProcessEnvironment;
use miette::Result;

use crate::output::print_validation;

/// Validate the metadata and variables of layers
#[derive(Debug, Args)]
pub struct CmdValidate {
    /// Layers to validate, all discovered layers when omitted
    layers_to_check: Vec<String>,

    /// Layer discovery flags
    #[clap(flatten)]
    layers: crate::LayerFlags,
}

impl CmdValidate {
    pub fn run(&mut self) -> Result<i32> {
        let manager = self.layers.load(false)?;
        let names = if self.layers_to_check.is_empty() {
            manager.layer_names().map(String::from).collect()
        } else {
            manager.resolve_targets(&self.layers_to_check)?
        };

        let mut failed = Vec::new();
        for name in &names {
            println!("{} {}", "Validating layer:".bold(), name.cyan());
            let report = manager.validate_layer(name, &ProcessEnvironment)?;
            if print_validation(&report, None) {
                println!("{}", format!("Layer '{name}' validation failed").red());
                failed.push(name.as_str());
            } else {
                println!("{}", format!("Layer '{name}' validation passed").green());
            }
            println!();
        }

        if failed.is_empty() {
            return Ok(0);
        }
        eprintln!("Validation failed for layers: {}", failed.join(", "));
        Ok(1)
    }
}
