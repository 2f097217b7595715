// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Print a starting point for a new layer file.

use clap::Args;
use miette::Result;

/// Print a boilerplate layer template
#[derive(Debug, Args)]
pub struct CmdGen {
    /// Print the reference for X-Env-Layer-* fields instead
    #[clap(long)]
    help_fields: bool,
}

impl CmdGen {
    pub fn run(&mut self) -> Result<i32> {
        if self.help_fields {
            println!("{LAYER_FIELDS_HELP}");
        } else {
            println!("{LAYER_TEMPLATE}");
        }
        Ok(0)
    }
}

const LAYER_TEMPLATE: &str = "\
# METABEGIN
# X-Env-Layer-Name: my-example-layer
# X-Env-Layer-Desc: Example layer with options
# X-Env-Layer-Version: 1.0.0
# X-Env-Layer-Provides: debian-base
# X-Env-Layer-RequiresProvider:
# X-Env-Layer-Requires: base-layer,common-tools

# X-Env-VarRequires: SITE
# X-Env-VarRequires-Valid: regex:^/.*

# X-Env-VarPrefix: example

# X-Env-Var-service_port: 8080
# X-Env-Var-service_port-Desc: Port number for the service
# X-Env-Var-service_port-Required: false
# X-Env-Var-service_port-Valid: int:1024-65535
# X-Env-Var-service_port-Set: true
# METAEND
---
mmdebstrap:
  mirrors:
    - deb http://archive.example.com/debian suite main
  packages:
    - ca-certificates
  setup-hooks:
    - echo hello
  essential-hooks:
    - echo world
  customize-hooks:
    - echo ${SITE}:${IGconf_example_service_port} > ${1}/port.spec
  cleanup-hooks:
    - rm ${1}/port.spec

# Using:
# 1. Copy this template to a directory on the layer search path.
# 2. Customise the X-Env-* fields for your layer
# 3. Customise the YAML for your use case
# 4. For validation rules, run: iglayers metadata --help-validation
#
# Notes:
# Depending on script needs, YAML scalar/block constructs may be required.";

const LAYER_FIELDS_HELP: &str = "
Layer Field Reference (X-Env-Layer-*)
+------------------------------------
Required basics:
  X-Env-Layer-Name        Unique layer identifier (token)
  X-Env-Layer-Version     Version string (free-form)
  X-Env-Layer-Desc        Human-readable description

Optional classification:
  X-Env-Layer-Category           Category/group name (e.g. base, service, device)

Dependencies:
  X-Env-Layer-Requires           Comma-separated concrete layer names this layer needs
                                 (${VAR} references are expanded from the environment)
  X-Env-Layer-Conflicts          Layers that cannot co-exist with this one

Virtual capabilities:
  X-Env-Layer-Provides           Comma-separated capability tokens this layer offers
  X-Env-Layer-RequiresProvider   Comma-separated capability tokens this layer requires;
                                 each must be provided by exactly one layer in the build

Environment-variable support:
  X-Env-VarPrefix                Prefix applied to IGconf_ variable names in this layer
  (plus all X-Env-Var-* variable definition fields, see `iglayers metadata --help-validation`)

Notes:
  * Provides/RequiresProvider enable abstract dependencies; use them instead of hard-coding
    a specific base layer name when multiple alternatives could satisfy the need.
  * Field values are trimmed of whitespace; tokens must be comma-separated without spaces.
";
