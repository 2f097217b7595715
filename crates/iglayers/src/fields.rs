// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Registry of the recognised `X-Env-*` field names.

use crate::FIELD_PREFIX;

#[cfg(test)]
#[path = "./fields_test.rs"]
mod fields_test;

pub const VAR_FIELD_PREFIX: &str = "X-Env-Var-";
pub const LAYER_FIELD_PREFIX: &str = "X-Env-Layer-";

pub const VAR_PREFIX_FIELD: &str = "X-Env-VarPrefix";
pub const VAR_REQUIRES_FIELD: &str = "X-Env-VarRequires";
pub const VAR_REQUIRES_VALID_FIELD: &str = "X-Env-VarRequires-Valid";
pub const VAR_OPTIONAL_FIELD: &str = "X-Env-VarOptional";
pub const VAR_OPTIONAL_VALID_FIELD: &str = "X-Env-VarOptional-Valid";

/// Fields describing a layer's identity and relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerField {
    Name,
    Desc,
    Version,
    Category,
    Requires,
    Provides,
    RequiresProvider,
    Conflicts,
}

impl LayerField {
    pub const ALL: [LayerField; 8] = [
        Self::Name,
        Self::Desc,
        Self::Version,
        Self::Category,
        Self::Requires,
        Self::Provides,
        Self::RequiresProvider,
        Self::Conflicts,
    ];

    /// The full field name, e.g. `X-Env-Layer-Name`.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Name => "X-Env-Layer-Name",
            Self::Desc => "X-Env-Layer-Desc",
            Self::Version => "X-Env-Layer-Version",
            Self::Category => "X-Env-Layer-Category",
            Self::Requires => "X-Env-Layer-Requires",
            Self::Provides => "X-Env-Layer-Provides",
            Self::RequiresProvider => "X-Env-Layer-RequiresProvider",
            Self::Conflicts => "X-Env-Layer-Conflicts",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.field_name()[LAYER_FIELD_PREFIX.len()..] == *suffix)
    }
}

/// Attribute suffixes attached to a variable definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarAttribute {
    Desc,
    Required,
    Valid,
    Set,
}

impl VarAttribute {
    pub const ALL: [VarAttribute; 4] = [Self::Desc, Self::Required, Self::Valid, Self::Set];

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Desc => "Desc",
            Self::Required => "Required",
            Self::Valid => "Valid",
            Self::Set => "Set",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.suffix() == suffix)
    }
}

/// The classified meaning of a field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    VarPrefix,
    VarRequires,
    VarRequiresValid,
    VarOptional,
    VarOptionalValid,
    Layer(LayerField),
    /// `X-Env-Var-<NAME>`
    VarBase { name: String },
    /// `X-Env-Var-<NAME>-<Desc|Required|Valid|Set>`
    VarAttr { name: String, attr: VarAttribute },
}

impl FieldKind {
    /// Classify a field name, or `None` when it is not a supported field.
    ///
    /// Variable names may not contain `-`, which is what separates the
    /// name from its attribute suffix.
    pub fn classify(field: &str) -> Option<Self> {
        match field {
            VAR_PREFIX_FIELD => return Some(Self::VarPrefix),
            VAR_REQUIRES_FIELD => return Some(Self::VarRequires),
            VAR_REQUIRES_VALID_FIELD => return Some(Self::VarRequiresValid),
            VAR_OPTIONAL_FIELD => return Some(Self::VarOptional),
            VAR_OPTIONAL_VALID_FIELD => return Some(Self::VarOptionalValid),
            _ => {}
        }

        if let Some(rest) = field.strip_prefix(LAYER_FIELD_PREFIX) {
            return LayerField::from_suffix(rest).map(Self::Layer);
        }

        let rest = field.strip_prefix(VAR_FIELD_PREFIX)?;
        match rest.split_once('-') {
            None if !rest.is_empty() => Some(Self::VarBase {
                name: rest.to_string(),
            }),
            Some((name, suffix)) if !name.is_empty() => {
                VarAttribute::from_suffix(suffix).map(|attr| Self::VarAttr {
                    name: name.to_string(),
                    attr,
                })
            }
            _ => None,
        }
    }

    /// True for any field carrying the reserved prefix.
    pub fn is_reserved(field: &str) -> bool {
        field.starts_with(FIELD_PREFIX)
    }

    pub fn is_var_field(field: &str) -> bool {
        field.starts_with(VAR_FIELD_PREFIX)
    }

    pub fn is_layer_field(field: &str) -> bool {
        field.starts_with(LAYER_FIELD_PREFIX)
    }
}

/// Canonical field names and patterns, sorted, for operator help.
pub fn supported_fields() -> Vec<String> {
    let mut fields: Vec<String> = [
        VAR_PREFIX_FIELD,
        VAR_REQUIRES_FIELD,
        VAR_REQUIRES_VALID_FIELD,
        VAR_OPTIONAL_FIELD,
        VAR_OPTIONAL_VALID_FIELD,
        VAR_FIELD_PREFIX,
    ]
    .into_iter()
    .chain(LayerField::ALL.into_iter().map(LayerField::field_name))
    .map(String::from)
    .chain(
        VarAttribute::ALL
            .into_iter()
            .map(|a| format!("{VAR_FIELD_PREFIX}*-{}", a.suffix())),
    )
    .collect();
    fields.sort();
    fields
}
