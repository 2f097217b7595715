// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use rstest::rstest;

use super::*;
use crate::MemoryEnvironment;

fn fields(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[rstest]
fn test_layer_defaults() {
    let env = MemoryEnvironment::new();
    let layer = EnvLayer::from_fields(
        &fields(&[("X-Env-Layer-Name", "base")]),
        Path::new("/layers/base.yaml"),
        false,
        &env,
    )
    .unwrap()
    .expect("layer should be declared");

    assert_eq!(layer.name, "base");
    assert_eq!(layer.version, "1.0.0");
    assert_eq!(layer.category, "general");
    assert_eq!(layer.config_file, "base.yaml");
    assert!(layer.deps.is_empty());
}

#[rstest]
fn test_no_layer_name_is_not_a_layer() {
    let env = MemoryEnvironment::new();
    let result = EnvLayer::from_fields(
        &fields(&[("X-Env-VarPrefix", "x")]),
        Path::new("x.yaml"),
        false,
        &env,
    )
    .unwrap();
    assert!(result.is_none());
}

#[rstest]
fn test_dependency_lists() {
    let env = MemoryEnvironment::new();
    let layer = EnvLayer::from_fields(
        &fields(&[
            ("X-Env-Layer-Name", "app"),
            ("X-Env-Layer-Requires", "base, tools,\n net"),
            ("X-Env-Layer-Provides", "app-runtime"),
            ("X-Env-Layer-RequiresProvider", "init"),
        ]),
        Path::new("app.yaml"),
        false,
        &env,
    )
    .unwrap()
    .unwrap();

    assert_eq!(layer.deps, vec!["base", "tools", "net"]);
    assert_eq!(layer.provides, vec!["app-runtime"]);
    assert_eq!(layer.requires_provider, vec!["init"]);
}

#[rstest]
fn test_env_reference_in_dependency() {
    let env: MemoryEnvironment = [("IGconf_device_class", "pi5")].into_iter().collect();
    let deps = parse_dependency_list("${IGconf_device_class}-firmware", false, &env).unwrap();
    assert_eq!(deps, vec!["pi5-firmware"]);
}

#[rstest]
fn test_unresolved_env_reference() {
    let env = MemoryEnvironment::new();
    let err = parse_dependency_list("${MISSING}-firmware", false, &env).unwrap_err();
    assert!(matches!(
        err,
        Error::UnresolvedDependencyVariable { ref variable } if variable == "MISSING"
    ));

    let deps = parse_dependency_list("${MISSING}-firmware", true, &env).unwrap();
    assert_eq!(deps, vec!["${MISSING}-firmware"]);
    assert!(is_dynamic_dependency(&deps[0]));
}

#[rstest]
#[case("base tools")]
#[case("base;tools")]
#[case("bäse")]
fn test_invalid_tokens(#[case] raw: &str) {
    let env = MemoryEnvironment::new();
    assert!(matches!(
        parse_dependency_list(raw, false, &env),
        Err(Error::InvalidDependencyToken { .. })
    ));
}

#[rstest]
fn test_serialized_keys() {
    let layer = EnvLayer::new("base");
    let yaml = serde_yaml::to_string(&layer).unwrap();
    assert!(yaml.contains("depends:"));
    assert!(yaml.contains("provider_requires:"));
    assert!(yaml.contains("config_file: base.yaml"));
}
