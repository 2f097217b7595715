// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! List discovered layers grouped by category.

use clap::Args;
use colored::Colorize;
use iglayers::manager::{MAX_LISTED_DESCRIPTION, short_description};
use miette::Result;

use crate::output::list_or_none;

/// List available layers by category
#[derive(Debug, Args)]
pub struct CmdList {
    /// Only show the search paths and whether they exist
    #[clap(long)]
    paths: bool,

    /// Layer discovery flags
    #[clap(flatten)]
    layers: crate::LayerFlags,
}

impl CmdList {
    pub fn run(&mut self) -> Result<i32> {
        let options = self.layers.options(false);

        println!("{}", "Layer search paths:".bold());
        for (i, path) in options.search_paths.iter().enumerate() {
            let mark = if path.is_dir() {
                "✓".green()
            } else {
                "✗".red()
            };
            println!("  {}. {mark} {}", i + 1, path.display());
        }
        if self.paths {
            return Ok(0);
        }
        println!();

        let manager = self.layers.load(false)?;
        let by_category = manager.layers_by_category();
        if by_category.is_empty() {
            println!("No layers found");
            return Ok(0);
        }

        let width = manager.layer_names().map(str::len).max().unwrap_or(0);

        println!("{}", "Available layers:".bold());
        for (category, layers) in by_category {
            println!();
            println!("{}", format!("Category: {category}").bold());
            for layer in layers {
                let desc = short_description(&layer.description, MAX_LISTED_DESCRIPTION);
                println!(
                    "  {}  {}",
                    format!("{:<width$}", layer.name).bold(),
                    desc.dimmed()
                );
                println!("    deps: {}", list_or_none(&layer.deps));
                if !layer.provides.is_empty() {
                    println!("    provides: {}", layer.provides.join(", "));
                }
                if !layer.requires_provider.is_empty() {
                    println!(
                        "    requires-provider: {}",
                        layer.requires_provider.join(", ")
                    );
                }
            }
        }
        Ok(0)
    }
}
