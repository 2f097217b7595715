// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for layer operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with iglayers Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during layer operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(iglayers::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The embedded field block could not be parsed
    #[error("Failed to parse metadata in {path:?}: {message}")]
    #[diagnostic(
        code(iglayers::malformed_metadata),
        help("Continuation lines must be indented and every field must start with 'X-Env-'")
    )]
    MalformedMetadata { path: PathBuf, message: String },

    /// A validation rule string did not parse
    #[error("Invalid validation rule '{rule}': {message}")]
    #[diagnostic(
        code(iglayers::invalid_validation_rule),
        help("Run 'iglayers metadata --help-validation' for the supported rules")
    )]
    InvalidValidationRule { rule: String, message: String },

    /// A dependency token contains characters that are not allowed
    #[error("Invalid dependency token '{token}': {message}")]
    #[diagnostic(
        code(iglayers::invalid_dependency_token),
        help("Dependencies must be comma-separated names made of letters, digits, '-' and '_'")
    )]
    InvalidDependencyToken { token: String, message: String },

    /// A `${VAR}` reference inside a dependency token is not set
    #[error("Environment variable '{variable}' not found for dependency evaluation")]
    #[diagnostic(code(iglayers::unresolved_dependency_variable))]
    UnresolvedDependencyVariable { variable: String },

    /// Two files declare the same layer name
    #[error("Duplicate layer name '{name}' found in:\n  {first:?}\n  {second:?}")]
    #[diagnostic(
        code(iglayers::duplicate_layer),
        help("Layer names must be unique across all search paths")
    )]
    DuplicateLayer {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A required dependency is not loaded
    #[error("Missing required dependency: {0}")]
    #[diagnostic(code(iglayers::missing_dependency))]
    MissingDependency(String),

    /// Required dependencies form a cycle
    #[error("Circular dependency detected: {}", chain.join(" -> "))]
    #[diagnostic(
        code(iglayers::circular_dependency),
        help("Remove one of the X-Env-Layer-Requires entries along the chain")
    )]
    CircularDependency { chain: Vec<String> },

    /// Two layers in one build order provide the same capability
    #[error("Provider conflict: '{provider}' is provided by multiple layers: {first}, {second}")]
    #[diagnostic(code(iglayers::provider_conflict))]
    ProviderConflict {
        provider: String,
        first: String,
        second: String,
    },

    /// A required capability has no provider in the build order
    #[error(
        "Layer '{layer}' requires provider '{provider}' but no layer in the dependency chain provides it"
    )]
    #[diagnostic(
        code(iglayers::unsatisfied_provider),
        help("Add a layer that declares 'X-Env-Layer-Provides: {}' to the targets", provider)
    )]
    UnsatisfiedProvider { layer: String, provider: String },

    /// Fields with the reserved prefix that are not recognised
    #[error("Cannot process variables with unsupported fields: {}", fields.join(", "))]
    #[diagnostic(
        code(iglayers::unsupported_fields),
        help("Run the 'validate' command for details")
    )]
    UnsupportedFields { fields: Vec<String> },

    /// Variables are declared without a prefix
    #[error(
        "Cannot process variables: X-Env-Var-* fields are defined but X-Env-VarPrefix is missing"
    )]
    #[diagnostic(code(iglayers::missing_var_prefix))]
    MissingVarPrefix,

    /// The variable prefix cannot form an environment variable name
    #[error("Invalid X-Env-VarPrefix '{prefix}': only letters, numbers and underscores are allowed")]
    #[diagnostic(code(iglayers::invalid_var_prefix))]
    InvalidVarPrefix { prefix: String },

    /// A discovery file pattern is not a valid glob
    #[error("Invalid file pattern '{pattern}': {message}")]
    #[diagnostic(code(iglayers::invalid_file_pattern))]
    InvalidFilePattern { pattern: String, message: String },

    /// Unknown layer reference
    #[error("Layer '{0}' not found")]
    #[diagnostic(code(iglayers::layer_not_found))]
    LayerNotFound(String),

    /// Variable lookup by name failed
    #[error("Variable '{0}' not found in metadata")]
    #[diagnostic(code(iglayers::variable_not_found))]
    VariableNotFound(String),

    /// Validation failed
    #[error("Validation failed for layer '{layer}': {}", failures.join("; "))]
    #[diagnostic(code(iglayers::validation_failed))]
    ValidationFailed { layer: String, failures: Vec<String> },

    /// Invalid YAML in a layer body
    #[error("Invalid YAML in {path:?}: {error}")]
    #[diagnostic(code(iglayers::invalid_yaml))]
    InvalidYaml {
        path: PathBuf,
        #[source]
        error: serde_yaml::Error,
    },

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(iglayers::io_error))]
    Io(#[from] std::io::Error),
}
