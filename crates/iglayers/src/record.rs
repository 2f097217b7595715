// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Extraction and parsing of the `X-Env-*` field block embedded in a
//! layer file.
//!
//! Fields use a mail-header style record: `Name: value` lines, where a
//! line starting with a space or tab continues the previous field.

use indexmap::IndexMap;

use crate::{FIELD_PREFIX, META_BEGIN, META_END};

#[cfg(test)]
#[path = "./record_test.rs"]
mod record_test;

/// Lines of the field block, comment markers removed and blanks dropped.
///
/// With a [`META_BEGIN`] marker line the block runs up to [`META_END`].
/// Without one, bare `X-Env-*:` lines anywhere in the file are used.
pub fn extract_field_block(content: &str) -> Vec<String> {
    if content.lines().any(|l| l.trim() == META_BEGIN) {
        let mut lines = Vec::new();
        let mut in_block = false;
        for line in content.lines() {
            let stripped = line.trim();
            if stripped == META_BEGIN {
                in_block = true;
                continue;
            }
            if stripped == META_END {
                break;
            }
            if !in_block {
                continue;
            }
            let body = line
                .strip_prefix("# ")
                .or_else(|| line.strip_prefix('#'))
                .map(str::trim_end);
            if let Some(body) = body.filter(|b| !b.trim().is_empty()) {
                lines.push(body.to_string());
            }
        }
        return lines;
    }

    content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            line.split_once(':')
                .is_some_and(|(name, _)| name.trim().starts_with(FIELD_PREFIX))
        })
        .map(String::from)
        .collect()
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Reject record syntax the permissive parser would silently misread.
pub fn check_record_syntax(lines: &[String]) -> Result<(), String> {
    for (i, line) in lines.iter().enumerate() {
        if i > 0 && !line.contains(':') && !is_continuation(line) && !line.trim().is_empty() {
            return Err(format!(
                "line '{line}' appears to be a continuation but is not indented. \
                 Continuation lines must start with a space or tab."
            ));
        }
    }
    for line in lines.iter().filter(|l| !is_continuation(l)) {
        if let Some((name, _)) = line.split_once(':') {
            let name = name.trim();
            if !is_valid_field_name(name) {
                return Err(format!(
                    "Invalid field name '{name}': field names must contain only letters, numbers, hyphens, and underscores"
                ));
            }
        }
    }
    Ok(())
}

/// Parse record lines into an ordered field map.
///
/// A repeated field keeps its first position and its last value. Lines
/// that neither start a field nor continue one are ignored.
pub fn parse_record(lines: &[String]) -> IndexMap<String, String> {
    let mut fields: IndexMap<String, String> = IndexMap::new();
    let mut current: Option<String> = None;
    for line in lines {
        if is_continuation(line) {
            if let Some(value) = current.as_ref().and_then(|k| fields.get_mut(k)) {
                value.push('\n');
                value.push_str(line.trim_end());
            }
            continue;
        }
        match line.split_once(':') {
            Some((name, value)) => {
                let name = name.trim().to_string();
                fields.insert(name.clone(), value.trim().to_string());
                current = Some(name);
            }
            None => current = None,
        }
    }
    fields
}

/// Extract, check and parse the field block of a layer file.
///
/// A file with no block at all parses to an empty map. A block without
/// any fields, or with a field outside the reserved prefix, is an error.
pub fn parse_fields(content: &str) -> Result<IndexMap<String, String>, String> {
    let lines = extract_field_block(content);
    check_record_syntax(&lines)?;
    let fields = parse_record(&lines);

    if fields.is_empty() {
        if lines.iter().any(|l| !l.trim().is_empty()) {
            return Err(format!("No valid {FIELD_PREFIX}* fields found in metadata"));
        }
        return Ok(fields);
    }

    let invalid: Vec<&str> = fields
        .keys()
        .filter(|k| !k.starts_with(FIELD_PREFIX))
        .map(String::as_str)
        .collect();
    if !invalid.is_empty() {
        return Err(format!(
            "Invalid field names (must start with '{FIELD_PREFIX}'): {}",
            invalid.join(", ")
        ));
    }
    Ok(fields)
}
