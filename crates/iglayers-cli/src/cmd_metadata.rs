// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Work with the metadata of a single layer file.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use iglayers::{Environment, Metadata, ProcessEnvironment, SetStatus, validation};
use miette::Result;

use crate::output::{list_or_none, print_supported_fields, print_validation, print_variables, tag};

/// Inspect a single metadata file
///
/// By default the file's variables are applied to the environment and
/// printed as NAME=value lines.
#[derive(Debug, Args)]
pub struct CmdMetadata {
    /// Path to a file holding a metadata block
    #[clap(required_unless_present_any = ["generate", "help_validation"])]
    path: Option<PathBuf>,

    /// Validate the metadata and its variables against the environment
    #[clap(long, group = "mode")]
    validate: bool,

    /// Describe the layer and its variables
    #[clap(long, group = "mode")]
    describe: bool,

    /// With --describe, show a single variable
    #[clap(long, value_name = "NAME", requires = "describe")]
    var: Option<String>,

    /// Check syntax and field names only
    #[clap(long, group = "mode")]
    lint: bool,

    /// Print a boilerplate metadata block
    #[clap(long = "gen", group = "mode")]
    generate: bool,

    /// Explain the validation rule syntax
    #[clap(long, group = "mode")]
    help_validation: bool,

    /// Write NAME="value" lines to FILE instead of printing them
    #[clap(long, value_name = "FILE", conflicts_with = "mode")]
    write_out: Option<PathBuf>,
}

impl CmdMetadata {
    pub fn run(&mut self) -> Result<i32> {
        if self.generate {
            println!("{METADATA_TEMPLATE}");
            return Ok(0);
        }
        if self.help_validation {
            println!("{}", iglayers::validation_help());
            return Ok(0);
        }

        let Some(path) = &self.path else {
            return Err(miette::miette!("No metadata file given"));
        };
        let meta = Metadata::load(path, false, &ProcessEnvironment)
            .map_err(|e| miette::miette!("Error loading metadata: {e}"))?;

        if self.validate {
            return Ok(self.print_validation(&meta));
        }
        if self.lint {
            return Ok(self.print_lint(&meta));
        }
        if self.describe {
            return self.print_description(&meta);
        }
        self.apply_defaults(&meta)
    }

    fn apply_defaults(&self, meta: &Metadata) -> Result<i32> {
        let outcomes = meta.set_env_vars(&mut ProcessEnvironment)?;
        for (name, outcome) in &outcomes {
            let value = outcome.value.as_deref().unwrap_or_default();
            match outcome.status {
                SetStatus::Set => println!("{} {name}={value}", tag("SET")),
                SetStatus::ForceSet => println!("{} {name}={value}", tag("FORCE_SET")),
                SetStatus::AlreadySet => println!("{} {name} (already set)", tag("SKIP")),
                SetStatus::NoSetPolicy => println!("{} {name} ({})", tag("SKIP"), outcome.reason),
            }
        }

        let report = meta.validate_env_vars(&ProcessEnvironment);
        let failures = validation::failures(&report);
        if !failures.is_empty() {
            for failure in &failures {
                tracing::error!("{failure}");
            }
            return Ok(1);
        }

        if let Some(out) = &self.write_out {
            meta.write_env_file(out, &ProcessEnvironment)?;
            println!("Environment variables written to: {}", out.display());
            return Ok(0);
        }

        println!();
        for (name, default) in meta.get_all_env_vars()? {
            let value = ProcessEnvironment.get(&name).unwrap_or(default);
            println!("{name}={value}");
        }
        Ok(0)
    }

    fn print_validation(&self, meta: &Metadata) -> i32 {
        let report = meta.validate_env_vars(&ProcessEnvironment);
        if print_validation(&report, None) { 1 } else { 0 }
    }

    fn print_lint(&self, meta: &Metadata) -> i32 {
        let report = meta.lint_metadata_syntax();
        let errors = validation::failures(&report);
        if errors.is_empty() {
            println!("{}", "OK".green());
            return 0;
        }
        for error in &errors {
            println!("{} {error}", tag("ERROR"));
        }
        if !meta.unsupported_fields().is_empty() {
            print_supported_fields();
        }
        1
    }

    fn print_description(&self, meta: &Metadata) -> Result<i32> {
        if let Some(var) = &self.var {
            let desc = meta.variable_description(var)?;
            println!("Variable: {}", desc.name.bold());
            println!("  Value: {}", desc.value);
            println!("  Description: {}", desc.description);
            println!("  Valid Rule: {}", desc.validation);
            println!("  Set Policy: {}", desc.set_policy);
            return Ok(0);
        }

        let container = meta.container();
        let Some(info) = meta.layer_info() else {
            if container.variables.is_empty() {
                println!("No layer information or environment variables defined in metadata");
            } else {
                print_variables(meta, 0);
            }
            return Ok(0);
        };

        println!("{}", "Layer Information:".bold());
        println!("  Name: {}", info.name.cyan());
        println!("  Version: {}", info.version);
        println!("  Category: {}", info.category);
        println!("  Description: {}", info.description);
        println!("  Required Dependencies: {}", list_or_none(&info.deps));
        println!("  Optional Dependencies: {}", list_or_none(&info.optional_deps));
        println!("  Conflicts: {}", list_or_none(&info.conflicts));
        println!("  Filename: {}", info.config_file);
        println!("  Required Variables: {}", list_or_none(&container.required_vars));
        println!("  Optional Variables: {}", list_or_none(&container.optional_vars));
        println!();
        print_variables(meta, 0);
        Ok(0)
    }
}

const METADATA_TEMPLATE: &str = "\
# METABEGIN
# Layer Management Fields
# X-Env-Layer-Name: my-layer
# X-Env-Layer-Desc: Layer description
# X-Env-Layer-Version: 1.0.0
# X-Env-Layer-Category: general
#
# Dependencies (comma-separated layer names)
# X-Env-Layer-Requires:
# X-Env-Layer-Conflicts:
#
# Environment Variables
# X-Env-VarPrefix: my
#
# Variable requirements (any environment variables)
# X-Env-VarRequires: HOME,IGconf_device_user1,DOCKER_HOST
# X-Env-VarRequires-Valid: regex:^/.*,string,regex:^(unix|tcp)://.*
#
# Optional variables (validated if present, not required)
# X-Env-VarOptional: IGconf_device_user1pass,LOG_LEVEL
# X-Env-VarOptional-Valid: string,debug,info,warn,error
#
# Example variables with different validation schemes:
# X-Env-Var-hostname: localhost
# X-Env-Var-hostname-Desc: Server hostname
# X-Env-Var-hostname-Required: false
# X-Env-Var-hostname-Valid: regex:^[a-zA-Z0-9.-]+$
# X-Env-Var-hostname-Set: true
#
# X-Env-Var-port: 8080
# X-Env-Var-port-Desc: Port number (integer range)
# X-Env-Var-port-Required: false
# X-Env-Var-port-Valid: int:1024-65535
# X-Env-Var-port-Set: true
#
# X-Env-Var-environment: development
# X-Env-Var-environment-Desc: Deployment environment (enum)
# X-Env-Var-environment-Required: false
# X-Env-Var-environment-Valid: development,staging,production
# X-Env-Var-environment-Set: true
#
# X-Env-Var-debug: false
# X-Env-Var-debug-Desc: Enable debug mode (boolean)
# X-Env-Var-debug-Required: false
# X-Env-Var-debug-Valid: bool
# X-Env-Var-debug-Set: true
#
# X-Env-Var-name: myapp
# X-Env-Var-name-Desc: Application name (required non-empty string)
# X-Env-Var-name-Required: false
# X-Env-Var-name-Valid: string
# X-Env-Var-name-Set: true
#
# X-Env-Var-component: frontend
# X-Env-Var-component-Desc: Application component (alphanumeric keywords)
# X-Env-Var-component-Required: false
# X-Env-Var-component-Valid: keywords:frontend,backend,database,cache,worker
# X-Env-Var-component-Set: true
#
# Validation schemes: run 'iglayers metadata --help-validation' for details
# METAEND";
