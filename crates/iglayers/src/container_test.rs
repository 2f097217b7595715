// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use rstest::{fixture, rstest};

use super::*;
use crate::MemoryEnvironment;

fn fields(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[fixture]
fn placeholders() -> Placeholders {
    Placeholders {
        filename: "x.yaml".into(),
        directory: "/layers".into(),
        filepath: "/layers/x.yaml".into(),
    }
}

#[rstest]
fn test_placeholder_substitution(placeholders: Placeholders) {
    assert_eq!(
        placeholders.substitute("${DIRECTORY}/files/${FILENAME}"),
        "/layers/files/x.yaml"
    );
    assert_eq!(placeholders.substitute("${UNKNOWN}"), "${UNKNOWN}");
    assert_eq!(placeholders.substitute("${lower}"), "${lower}");
    assert_eq!(placeholders.substitute("no refs"), "no refs");
}

#[rstest]
fn test_placeholder_escape(placeholders: Placeholders) {
    assert_eq!(placeholders.substitute("\\${FILENAME}"), "${FILENAME}");
    assert_eq!(
        placeholders.substitute("\\${FILENAME} and ${FILENAME}"),
        "${FILENAME} and x.yaml"
    );
}

#[rstest]
fn test_placeholders_for_path() {
    let p = Placeholders::for_path(Path::new("/srv/layers/net.yaml"));
    assert_eq!(p.filename, "net.yaml");
    assert_eq!(p.directory, "/srv/layers");
    assert_eq!(p.filepath, "/srv/layers/net.yaml");
}

#[rstest]
fn test_container_variables() {
    let env = MemoryEnvironment::new();
    let container = MetadataContainer::from_fields(
        fields(&[
            ("X-Env-Layer-Name", "net"),
            ("X-Env-VarPrefix", "Net"),
            ("X-Env-Var-PORT", "8080"),
            ("X-Env-Var-port-Desc", "Service port"),
            ("X-Env-Var-PORT-Valid", "int:1024-65535"),
            ("X-Env-Var-PORT-Required", "yes"),
            ("X-Env-Var-PORT-Set", "force"),
            ("X-Env-Var-conf", "${DIRECTORY}/net.conf"),
            ("X-Env-VarRequires", "HOME, USER,"),
            ("X-Env-VarOptional", "LOG_LEVEL"),
        ]),
        Path::new("/srv/layers/net.yaml"),
        false,
        &env,
    )
    .unwrap();

    assert_eq!(container.var_prefix, "net");
    assert!(container.has_layer());
    assert_eq!(container.required_vars, vec!["HOME", "USER"]);
    assert_eq!(container.optional_vars, vec!["LOG_LEVEL"]);

    let port = &container.variables["IGconf_net_port"];
    assert_eq!(port.value, "8080");
    assert_eq!(port.description, "Service port");
    assert!(port.required);
    assert_eq!(port.set_policy, SetPolicy::Force);
    assert!(port.validator.is_some());

    let conf = &container.variables["IGconf_net_conf"];
    assert_eq!(conf.value, "/srv/layers/net.conf");
    assert_eq!(container.original_value(conf), Some("${DIRECTORY}/net.conf"));
}

#[rstest]
fn test_invalid_rule_does_not_fail_construction() {
    let env = MemoryEnvironment::new();
    let container = MetadataContainer::from_fields(
        fields(&[
            ("X-Env-VarPrefix", "app"),
            ("X-Env-Var-mode", "fast"),
            ("X-Env-Var-mode-Valid", "fast"),
        ]),
        Path::new("app.yaml"),
        false,
        &env,
    )
    .unwrap();
    let mode = &container.variables["IGconf_app_mode"];
    assert!(mode.has_invalid_rule());
    assert!(!container.has_layer());
}

#[rstest]
fn test_settable_variables() {
    let env = MemoryEnvironment::new();
    let container = MetadataContainer::from_fields(
        fields(&[
            ("X-Env-VarPrefix", "app"),
            ("X-Env-Var-a", "1"),
            ("X-Env-Var-b", "2"),
            ("X-Env-Var-b-Set", "no"),
        ]),
        Path::new("app.yaml"),
        false,
        &env,
    )
    .unwrap();
    let names: Vec<_> = container.settable_variables().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["IGconf_app_a"]);
}
