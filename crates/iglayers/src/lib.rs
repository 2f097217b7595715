// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! iglayers - layer discovery and environment resolution for image builds
//!
//! A layer is a YAML file carrying an embedded block of `X-Env-*` fields that
//! name the layer, declare its dependencies and describe the environment
//! variables it contributes to a build.
//!
//! # Overview
//!
//! The [`LayerManager`] discovers layer files on a set of search paths,
//! computes a dependency-respecting build order for a set of target layers,
//! and resolves the final value of every declared variable across that order
//! using each definition's [`SetPolicy`].
//!
//! # Example
//!
//! ```yaml
//! # METABEGIN
//! # X-Env-Layer-Name: base-tools
//! # X-Env-Layer-Desc: Common tooling
//! # X-Env-Layer-Requires: rootfs
//! # X-Env-Layer-Provides: tools
//! #
//! # X-Env-VarPrefix: tools
//! # X-Env-Var-editor: vim
//! # X-Env-Var-editor-Valid: vim,nano,
//! # X-Env-Var-editor-Set: lazy
//! # METAEND
//! ---
//! mmdebstrap:
//!   packages:
//!     - vim
//! ```

pub mod container;
pub mod docs;
pub mod environment;
pub mod error;
pub mod fields;
pub mod graph;
pub mod layer;
pub mod manager;
pub mod metadata;
pub mod record;
pub mod resolver;
pub mod validation;
pub mod validators;
pub mod variable;

pub use container::{MetadataContainer, Placeholders};
pub use docs::{DocFormat, LayerDocumentation};
pub use environment::{Environment, MemoryEnvironment, ProcessEnvironment};
pub use error::{Error, Result};
pub use fields::{FieldKind, LayerField, VarAttribute, supported_fields};
pub use graph::LayerGraph;
pub use layer::EnvLayer;
pub use manager::{
    BuildConfig, DependencyReport, LayerManager, LoadOutcome, ManagerOptions, SkipReason,
};
pub use metadata::{Metadata, SetOutcome, SetStatus, VariableDescription};
pub use resolver::{ApplyAction, ApplyReport, AppliedVariable, VariableResolver};
pub use validation::{ValidationReport, ValidationResult, ValidationStatus};
pub use validators::{Validator, parse_validator, validation_help, validator_documentation};
pub use variable::{EnvVariable, SetPolicy};

/// Reserved prefix of every recognised metadata field.
pub const FIELD_PREFIX: &str = "X-Env-";

/// Leading component of every generated variable name.
pub const VAR_NAME_PREFIX: &str = "IGconf";

/// Marker line opening an embedded field block.
pub const META_BEGIN: &str = "# METABEGIN";

/// Marker line closing an embedded field block.
pub const META_END: &str = "# METAEND";
