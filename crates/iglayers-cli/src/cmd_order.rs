// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Print or save the dependency-respecting build order of target layers.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Show the build order for layers
#[derive(Debug, Args)]
pub struct CmdOrder {
    /// Target layers, by name or file path
    #[clap(required = true)]
    targets: Vec<String>,

    /// Include the path of each layer file
    #[clap(long)]
    full_paths: bool,

    /// Write the order to FILE instead of printing it
    #[clap(long, short)]
    output: Option<PathBuf>,

    /// Layer discovery flags
    #[clap(flatten)]
    pub(crate) layers: crate::LayerFlags,
}

impl CmdOrder {
    pub fn run(&mut self) -> Result<i32> {
        let manager = self.layers.load(false)?;
        let targets = manager.resolve_targets(&self.targets)?;
        let order = manager.get_build_order(&targets)?;

        if let Some(output) = &self.output {
            manager.write_build_order(&order, self.full_paths, output)?;
            println!("Build order written to: {}", output.display());
            return Ok(0);
        }

        if order.is_empty() {
            println!("No layers to build");
            return Ok(0);
        }

        let index_width = order.len().to_string().len();
        let name_width = order.iter().map(String::len).max().unwrap_or(0);
        println!("{}", "Build order:".bold());
        for (i, name) in order.iter().enumerate() {
            let position = format!("{:>index_width$}.", i + 1);
            match manager.layer_file(name) {
                Some(path) if self.full_paths => println!(
                    "  {position} {}  {}",
                    format!("{name:<name_width$}").cyan(),
                    path.display().to_string().dimmed()
                ),
                _ => println!("  {position} {}", name.cyan()),
            }
        }
        Ok(0)
    }
}
