// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! iglayers - image layer discovery and environment resolution CLI

use clap::{Args, Parser, Subcommand};
use iglayers::{LayerManager, ManagerOptions, ProcessEnvironment};
use miette::Result;

mod cmd_apply;
mod cmd_check;
mod cmd_describe;
mod cmd_doc;
mod cmd_gen;
mod cmd_list;
mod cmd_metadata;
mod cmd_order;
mod cmd_rdeps;
mod cmd_validate;
mod output;


use cmd_apply::CmdApply;
use cmd_check::CmdCheck;
use cmd_describe::CmdDescribe;
use cmd_doc::CmdDoc;
use cmd_gen::CmdGen;
use cmd_list::CmdList;
use cmd_metadata::CmdMetadata;
use cmd_order::CmdOrder;
use cmd_rdeps::CmdRdeps;
use cmd_validate::CmdValidate;

#[derive(Parser)]
#[clap(
    name = "iglayers",
    about = "Image layer utilities",
    version,
    long_about = "Discover image layers, order their dependencies and resolve their environment variables"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

/// Where and how layers are discovered.
#[derive(Args, Clone, Debug)]
pub struct LayerFlags {
    /// Colon-separated search paths for layers
    #[clap(
        long = "path",
        short = 'p',
        env = "IGLAYERS_PATH",
        default_value = "./layer:./device:./image"
    )]
    pub path: String,

    /// File patterns to search
    #[clap(
        long,
        env = "IGLAYERS_PATTERNS",
        value_delimiter = ',',
        default_values_t = ["*.yaml".to_string(), "*.yml".to_string()]
    )]
    pub patterns: Vec<String>,
}

impl LayerFlags {
    pub fn options(&self, doc_mode: bool) -> ManagerOptions {
        ManagerOptions {
            search_paths: ManagerOptions::parse_search_paths(&self.path),
            file_patterns: self.patterns.clone(),
            doc_mode,
        }
    }

    /// Discover layers, resolving dependency variables from the process.
    pub fn load(&self, doc_mode: bool) -> Result<LayerManager> {
        Ok(LayerManager::new(self.options(doc_mode), &ProcessEnvironment)?)
    }
}

#[derive(Subcommand)]
enum Command {
    /// List available layers by category
    List(CmdList),

    /// Show detailed information for a layer
    Describe(CmdDescribe),

    /// Validate the metadata and variables of layers
    Validate(CmdValidate),

    /// Check the dependencies of layers
    Check(CmdCheck),

    /// Show layers that depend on a layer
    Rdeps(CmdRdeps),

    /// Show the build order for layers
    Order(CmdOrder),

    /// Apply the variables of layers in build order
    Apply(CmdApply),

    /// Inspect a single metadata file
    Metadata(CmdMetadata),

    /// Print a boilerplate layer template
    Gen(CmdGen),

    /// Emit structured layer documentation as YAML
    Doc(CmdDoc),
}

impl Opt {
    fn run(self) -> Result<i32> {
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        match self.cmd {
            Command::List(mut cmd) => cmd.run(),
            Command::Describe(mut cmd) => cmd.run(),
            Command::Validate(mut cmd) => cmd.run(),
            Command::Check(mut cmd) => cmd.run(),
            Command::Rdeps(mut cmd) => cmd.run(),
            Command::Order(mut cmd) => cmd.run(),
            Command::Apply(mut cmd) => cmd.run(),
            Command::Metadata(mut cmd) => cmd.run(),
            Command::Gen(mut cmd) => cmd.run(),
            Command::Doc(mut cmd) => cmd.run(),
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run()?;
    std::process::exit(code);
}
