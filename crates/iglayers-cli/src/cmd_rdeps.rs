// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Show layers that depend on a layer
#[derive(Debug, Args)]
pub struct CmdRdeps {
    /// Layer name or path to a layer file
    layer: String,

    /// Layer discovery flags
    #[clap(flatten)]
    layers: crate::LayerFlags,
}

impl CmdRdeps {
    pub fn run(&mut self) -> Result<i32> {
        let manager = self.layers.load(false)?;
        let Some(name) = manager.resolve_layer_name(&self.layer) else {
            eprintln!("{} Layer '{}' not found", "Error:".red(), self.layer);
            return Ok(1);
        };

        let rdeps = manager.reverse_dependencies(&name);
        if rdeps.is_empty() {
            println!("No layers depend on '{name}'");
            return Ok(0);
        }

        println!("{}", format!("Reverse dependencies for '{name}':").bold());
        println!();
        for dep in &rdeps {
            let Some(info) = manager.layer_info(dep) else {
                continue;
            };
            println!("  Layer: {}", info.name.cyan());
            println!("    Category: {}", info.category);
            println!("    Description: {}", info.description);
            println!();
        }
        println!("{} layer(s) depend on '{name}'", rdeps.len());
        Ok(0)
    }
}
