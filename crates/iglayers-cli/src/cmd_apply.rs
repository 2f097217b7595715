// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Resolve and apply the variables of target layers in build order.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use iglayers::{ApplyAction, Environment, MemoryEnvironment, ProcessEnvironment};
use miette::Result;

use crate::output::tag;

/// Apply the variables of layers in build order
#[derive(Debug, Args)]
pub struct CmdApply {
    /// Target layers, by name or file path
    #[clap(required = true)]
    targets: Vec<String>,

    /// Write the applied variables to FILE as NAME="value" lines
    #[clap(long, value_name = "FILE")]
    write_out: Option<PathBuf>,

    /// Resolve against a copy of the environment without changing it
    #[clap(long)]
    dry_run: bool,

    /// Layer discovery flags
    #[clap(flatten)]
    layers: crate::LayerFlags,
}

impl CmdApply {
    pub fn run(&mut self) -> Result<i32> {
        let mut manager = self.layers.load(false)?;
        let targets = manager.resolve_targets(&self.targets)?;
        let order = manager.get_build_order(&targets)?;

        let mut snapshot = MemoryEnvironment::from_process();
        let mut process = ProcessEnvironment;
        let env: &mut dyn Environment = if self.dry_run {
            &mut snapshot
        } else {
            &mut process
        };

        println!("{} {}", "Applying layers:".bold(), order.join(", "));
        let report = manager.apply(&order, env)?;
        for applied in &report.actions {
            match applied.action {
                ApplyAction::AlreadySet => println!(
                    "  {}  {} (already set)",
                    tag(ApplyAction::Skipped.as_str()),
                    applied.name
                ),
                ApplyAction::Skipped => {}
                action => println!(
                    "  {}  {}={} (layer: {})",
                    tag(action.as_str()),
                    applied.name,
                    applied.value,
                    applied.layer
                ),
            }
        }
        println!("{}", "Environment variables applied successfully".green());

        // Every target must be fully satisfied once all layers have run.
        let mut failed = Vec::new();
        for name in &targets {
            let failures = manager.layer_failures(name, &*env, false)?;
            if failures.is_empty() {
                continue;
            }
            for failure in &failures {
                eprintln!("  {} {failure}", tag("FAIL"));
            }
            failed.push(name.as_str());
        }
        if !failed.is_empty() {
            eprintln!(
                "{} {}; skipping write-out",
                "Validation failed for layers:".red(),
                failed.join(", ")
            );
            return Ok(1);
        }

        if let Some(path) = &self.write_out {
            manager.write_out(path)?;
            println!("Environment variables written to: {}", path.display());
        }
        Ok(0)
    }
}
