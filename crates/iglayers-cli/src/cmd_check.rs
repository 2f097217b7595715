// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Check that layers have everything they depend on.

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Check the dependencies of layers
#[derive(Debug, Args)]
pub struct CmdCheck {
    /// Layers to check
    #[clap(required_unless_present = "all")]
    targets: Vec<String>,

    /// Check every discovered layer and report provider conflicts
    #[clap(long, conflicts_with = "targets")]
    all: bool,

    /// Layer discovery flags
    #[clap(flatten)]
    layers: crate::LayerFlags,
}

impl CmdCheck {
    pub fn run(&mut self) -> Result<i32> {
        let manager = self.layers.load(false)?;

        let names: Vec<String> = if self.all {
            manager.layer_names().map(String::from).collect()
        } else {
            manager.resolve_targets(&self.targets)?
        };

        let mut failures = 0;
        for name in &names {
            let report = manager.check_dependencies(name);
            for warning in &report.warnings {
                println!("{} {warning}", "Warning:".yellow());
            }
            if report.ok() {
                println!("{} Layer '{name}' dependencies satisfied", "✓".green());
                continue;
            }
            failures += 1;
            println!("{} Layer '{name}' has dependency errors:", "✗".red());
            for error in &report.errors {
                println!("    {error}");
            }
        }

        if self.all {
            for (provider, layers) in manager.provider_conflicts() {
                let layers: Vec<&str> = layers.iter().map(String::as_str).collect();
                println!(
                    "{} '{provider}' is provided by multiple layers: {}",
                    "Warning:".yellow(),
                    layers.join(", ")
                );
            }
        } else if failures == 0 {
            // Individually sound targets may still clash as a set.
            if let Err(err) = manager.get_build_order(&names) {
                eprintln!("{} {err}", "Dependency resolution failed:".red());
                return Ok(1);
            }
        }

        Ok(if failures == 0 { 0 } else { 1 })
    }
}
