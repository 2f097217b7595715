// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Variable resolution across a build order.
//!
//! Resolution runs in three phases. Every definition of every variable is
//! first collected with the position of its layer in the build order. Each
//! variable then resolves to at most one definition by policy precedence
//! (`force` over `immediate` over `lazy`). Finally the resolved values are
//! written to the environment. All variables are resolved before any is
//! written, so an "already set" decision only ever sees values that were
//! present before the pass began.

use indexmap::IndexMap;
use serde::Serialize;

use crate::container::MetadataContainer;
use crate::environment::Environment;
use crate::variable::{EnvVariable, SetPolicy};

#[cfg(test)]
#[path = "./resolver_test.rs"]
mod resolver_test;

/// Every definition of each variable, keyed by full variable name.
pub type VariableDefinitions = IndexMap<String, Vec<EnvVariable>>;

/// Gather the variables of each layer, tagged with the layer name and
/// its position in the build order.
pub fn collect_definitions<'a, I>(layers: I) -> VariableDefinitions
where
    I: IntoIterator<Item = (&'a str, &'a MetadataContainer)>,
{
    let mut defs = VariableDefinitions::new();
    for (position, (layer, container)) in layers.into_iter().enumerate() {
        for (name, var) in &container.variables {
            defs.entry(name.clone())
                .or_default()
                .push(var.at_position(layer, position));
        }
    }
    defs
}

#[derive(Debug, Default)]
pub struct VariableResolver;

impl VariableResolver {
    /// Pick the winning definition of each variable.
    ///
    /// The result is ordered by the earliest position at which each
    /// variable was defined.
    pub fn resolve(defs: &VariableDefinitions, env: &dyn Environment) -> Vec<EnvVariable> {
        let mut resolved: Vec<(usize, EnvVariable)> = Vec::new();
        for (name, candidates) in defs {
            let Some(first) = candidates.first() else {
                continue;
            };
            let earliest = candidates.iter().map(|v| v.position).min().unwrap_or(0);
            let current = env.get(name);

            let with_policy =
                |policy: SetPolicy| candidates.iter().filter(move |v| v.set_policy == policy);

            let winner = if let Some(var) = with_policy(SetPolicy::Force).max_by_key(|v| v.position) {
                Some(var.clone())
            } else if let (None, Some(var)) = (
                &current,
                with_policy(SetPolicy::Immediate).min_by_key(|v| v.position),
            ) {
                Some(var.clone())
            } else if let (None, Some(var)) = (
                &current,
                with_policy(SetPolicy::Lazy).max_by_key(|v| v.position),
            ) {
                Some(var.clone())
            } else if let Some(value) = current {
                Some(EnvVariable {
                    value,
                    set_policy: SetPolicy::AlreadySet,
                    ..first.clone()
                })
            } else {
                None
            };

            match winner {
                Some(var) => {
                    tracing::debug!(
                        name = %var.name,
                        policy = %var.set_policy,
                        layer = %var.source_layer,
                        "resolved variable"
                    );
                    resolved.push((earliest, var));
                }
                None => tracing::debug!(%name, "variable left unresolved"),
            }
        }
        resolved.sort_by_key(|(earliest, _)| *earliest);
        resolved.into_iter().map(|(_, var)| var).collect()
    }
}

/// What happened to one resolved variable during apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyAction {
    Force,
    Set,
    Lazy,
    AlreadySet,
    Skipped,
}

impl ApplyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Force => "FORCE",
            Self::Set => "SET",
            Self::Lazy => "LAZY",
            Self::AlreadySet => "SKIP",
            Self::Skipped => "SKIP",
        }
    }

    /// True when the environment was written.
    pub fn wrote(&self) -> bool {
        matches!(self, Self::Force | Self::Set | Self::Lazy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedVariable {
    pub name: String,
    pub value: String,
    pub action: ApplyAction,
    pub layer: String,
}

/// Result of applying a resolved set of variables.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub actions: Vec<AppliedVariable>,
    /// Every value written to the environment, in write order.
    pub write_log: IndexMap<String, String>,
}

impl ApplyReport {
    pub fn written(&self) -> impl Iterator<Item = &AppliedVariable> {
        self.actions.iter().filter(|a| a.action.wrote())
    }
}

/// Write resolved variables to the environment.
pub fn apply(resolved: &[EnvVariable], env: &mut dyn Environment) -> ApplyReport {
    let mut report = ApplyReport::default();
    for var in resolved {
        let action = match var.set_policy {
            SetPolicy::AlreadySet => ApplyAction::AlreadySet,
            SetPolicy::Skip => ApplyAction::Skipped,
            SetPolicy::Force => ApplyAction::Force,
            _ if env.contains(&var.name) => ApplyAction::AlreadySet,
            SetPolicy::Lazy => ApplyAction::Lazy,
            SetPolicy::Immediate => ApplyAction::Set,
        };

        if action.wrote() {
            env.set(&var.name, &var.value);
            report.write_log.insert(var.name.clone(), var.value.clone());
            tracing::info!(
                "[{}] {}={} (layer: {})",
                action.as_str(),
                var.name,
                var.value,
                var.source_layer
            );
        } else if action == ApplyAction::AlreadySet {
            tracing::info!("[SKIP] {} (already set)", var.name);
        } else {
            tracing::debug!(name = %var.name, "not written");
        }

        let value = match action {
            ApplyAction::AlreadySet => env.get(&var.name).unwrap_or_default(),
            _ => var.value.clone(),
        };
        report.actions.push(AppliedVariable {
            name: var.name.clone(),
            value,
            action,
            layer: var.source_layer.clone(),
        });
    }
    report
}
