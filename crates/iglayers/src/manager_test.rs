// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::environment::MemoryEnvironment;
use crate::resolver::ApplyAction;

fn layer(name: &str, fields: &[(&str, &str)]) -> String {
    let mut out = format!("# METABEGIN\n# X-Env-Layer-Name: {name}\n");
    for (field, value) in fields {
        out.push_str(&format!("# X-Env-{field}: {value}\n"));
    }
    out.push_str("# METAEND\n");
    out
}

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

fn manager_for(root: &Path) -> Result<LayerManager> {
    manager_with_env(root, &MemoryEnvironment::new())
}

fn manager_with_env(root: &Path, env: &dyn Environment) -> Result<LayerManager> {
    let options = ManagerOptions {
        search_paths: vec![root.to_path_buf()],
        ..Default::default()
    };
    LayerManager::new(options, env)
}

/// base <- net <- app, plus two init providers and a consumer of "init".
#[fixture]
fn tree() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(
        root,
        "base/base.yaml",
        &layer(
            "base",
            &[
                ("Layer-Category", "core"),
                ("Layer-Desc", "Minimal   base\n#  system"),
                ("VarPrefix", "img"),
                ("Var-hostname", "base-host"),
                ("Var-hostname-Set", "force"),
                ("Var-user", "pi"),
            ],
        ),
    );
    write(
        root,
        "net/net.yml",
        &layer(
            "net",
            &[
                ("Layer-Requires", "base"),
                ("Layer-Category", "network"),
                ("VarPrefix", "net"),
                ("Var-port", "8080"),
                ("Var-port-Valid", "int:1024-65535"),
                ("Var-port-Required", "y"),
            ],
        ),
    );
    write(
        root,
        "app.yaml",
        &layer(
            "app",
            &[
                ("Layer-Requires", "net"),
                ("VarPrefix", "img"),
                ("Var-hostname", "app-host"),
                ("Var-hostname-Set", "force"),
                ("Var-user", "admin"),
            ],
        ),
    );
    write(root, "init/systemd.yaml", &layer("systemd", &[("Layer-Provides", "init")]));
    write(root, "init/sysv.yaml", &layer("sysv", &[("Layer-Provides", "init")]));
    write(
        root,
        "sshd.yaml",
        &layer("sshd", &[("Layer-RequiresProvider", "init")]),
    );
    tmp
}

#[rstest]
fn test_discovery_skips_non_layers() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "good.yaml", &layer("good", &[]));
    write(root, "plain.yaml", "packages:\n  - vim\n");
    write(root, "vars.yaml", "X-Env-VarPrefix: x\nX-Env-Var-a: 1\n");
    write(
        root,
        "broken.yaml",
        "# METABEGIN\n# X-Env-Layer-Name: broken\n# oops\n# METAEND\n",
    );
    write(root, "lint.yaml", &layer("lint", &[("Layer-Owner", "me")]));
    write(root, "notes.txt", &layer("notes", &[]));

    let manager = manager_for(root).unwrap();
    let names: Vec<_> = manager.layer_names().collect();
    assert_eq!(names, vec!["good"]);
}

#[rstest]
fn test_discovery_ignores_hidden_paths() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "sub/good.yaml", &layer("good", &[]));
    write(root, ".hidden.yaml", &layer("dotfile", &[]));
    write(root, ".git/layer.yaml", &layer("in-git", &[]));
    write(root, "sub/.cache/layer.yml", &layer("cached", &[]));

    let manager = manager_for(root).unwrap();
    let names: Vec<_> = manager.layer_names().collect();
    assert_eq!(names, vec!["good"]);
}

#[rstest]
fn test_discovery_skips_invalid_prefix() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(
        root,
        "bad.yaml",
        &layer("bad", &[("VarPrefix", "a=b"), ("Var-x", "1")]),
    );
    let manager = manager_for(root).unwrap();
    assert!(manager.layer("bad").is_err());
}

#[rstest]
fn test_load_outcomes() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let env = MemoryEnvironment::new();

    let good = write(root, "good.yaml", &layer("good", &[]));
    assert!(matches!(
        load_layer_file(&good, false, &env),
        LoadOutcome::Loaded(meta) if meta.layer_info().unwrap().name == "good"
    ));

    let vars = write(root, "vars.yaml", "X-Env-VarPrefix: x\nX-Env-Var-a: 1\n");
    assert!(matches!(
        load_layer_file(&vars, false, &env),
        LoadOutcome::Skipped(SkipReason::NotALayer)
    ));

    let lint = write(
        root,
        "lint.yaml",
        &layer("lint", &[("Var-a", "1"), ("Var-a-Desc", "no prefix")]),
    );
    match load_layer_file(&lint, false, &env) {
        LoadOutcome::Skipped(SkipReason::LintErrors(messages)) => assert_eq!(messages.len(), 1),
        other => panic!("expected lint errors, got {other:?}"),
    }

    let missing = root.join("missing.yaml");
    assert!(matches!(
        load_layer_file(&missing, false, &env),
        LoadOutcome::Malformed(Error::ReadFailed { .. })
    ));
}

#[rstest]
fn test_missing_search_path_is_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let options = ManagerOptions {
        search_paths: vec![tmp.path().join("absent"), tmp.path().to_path_buf()],
        ..Default::default()
    };
    write(tmp.path(), "one.yaml", &layer("one", &[]));
    let manager = LayerManager::new(options, &MemoryEnvironment::new()).unwrap();
    assert_eq!(manager.search_paths().len(), 2);
    assert!(manager.layer("one").is_ok());
}

#[rstest]
fn test_duplicate_layer_names() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a/dup.yaml", &layer("dup", &[]));
    write(tmp.path(), "b/dup.yaml", &layer("dup", &[]));
    match manager_for(tmp.path()) {
        Err(Error::DuplicateLayer {
            name,
            first,
            second,
        }) => {
            assert_eq!(name, "dup");
            assert!(first.ends_with("a/dup.yaml"));
            assert!(second.ends_with("b/dup.yaml"));
        }
        other => panic!("expected a duplicate layer error, got {other:?}"),
    }
}

#[rstest]
fn test_same_file_matched_twice_loads_once() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "one.yaml", &layer("one", &[]));
    let options = ManagerOptions {
        search_paths: vec![tmp.path().to_path_buf()],
        file_patterns: vec!["*.yaml".into(), "one.*".into()],
        doc_mode: false,
    };
    let manager = LayerManager::new(options, &MemoryEnvironment::new()).unwrap();
    assert_eq!(manager.layers().len(), 1);
}

#[rstest]
fn test_invalid_file_pattern() {
    let tmp = TempDir::new().unwrap();
    let options = ManagerOptions {
        search_paths: vec![tmp.path().to_path_buf()],
        file_patterns: vec!["[".into()],
        doc_mode: false,
    };
    assert!(matches!(
        LayerManager::new(options, &MemoryEnvironment::new()),
        Err(Error::InvalidFilePattern { .. })
    ));
}

#[rstest]
fn test_provider_index_first_wins(tree: TempDir) {
    let manager = manager_for(tree.path()).unwrap();
    assert_eq!(manager.provider_index()["init"], "systemd");
    let conflict: Vec<_> = manager.provider_conflicts()["init"].iter().cloned().collect();
    assert_eq!(conflict, vec!["systemd", "sysv"]);
}

#[rstest]
fn test_build_order_and_provider_scope(tree: TempDir) {
    let manager = manager_for(tree.path()).unwrap();
    assert_eq!(
        manager.get_build_order(&["app"]).unwrap(),
        vec!["base", "net", "app"]
    );
    assert_eq!(
        manager.get_build_order(&["sysv", "sshd"]).unwrap(),
        vec!["sysv", "sshd"]
    );
    assert!(matches!(
        manager.get_build_order(&["systemd", "sysv"]),
        Err(Error::ProviderConflict { .. })
    ));
    assert!(matches!(
        manager.get_build_order(&["sshd"]),
        Err(Error::UnsatisfiedProvider { .. })
    ));
}

#[rstest]
fn test_dependency_queries(tree: TempDir) {
    let manager = manager_for(tree.path()).unwrap();
    assert_eq!(manager.dependencies("app"), ["net".to_string()]);
    assert_eq!(manager.all_dependencies("app", true), vec!["net", "base"]);
    assert_eq!(manager.reverse_dependencies("base"), vec!["net"]);
    assert!(manager.reverse_dependencies("nothing").is_empty());
}

#[rstest]
fn test_check_dependencies() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "a.yaml", &layer("a", &[("Layer-Requires", "b")]));
    write(root, "b.yaml", &layer("b", &[("Layer-Requires", "a")]));
    write(root, "lost.yaml", &layer("lost", &[("Layer-Requires", "ghost")]));
    write(root, "fine.yaml", &layer("fine", &[]));
    let manager = manager_for(root).unwrap();

    let cycle = manager.check_dependencies("a");
    assert!(!cycle.ok());
    assert_eq!(
        cycle.errors,
        vec!["Circular dependency detected: a -> b -> a".to_string()]
    );

    let lost = manager.check_dependencies("lost");
    assert_eq!(
        lost.errors,
        vec!["Missing required dependency: ghost".to_string()]
    );

    assert!(manager.check_dependencies("fine").ok());
    assert!(!manager.check_dependencies("unknown").ok());
}

#[rstest]
fn test_resolve_layer_by_path(tree: TempDir) {
    let manager = manager_for(tree.path()).unwrap();
    let path = tree.path().join("net/net.yml");
    assert_eq!(
        manager.resolve_layer_name(&path.to_string_lossy()).as_deref(),
        Some("net")
    );
    assert_eq!(manager.resolve_layer_name("net").as_deref(), Some("net"));
    assert!(matches!(
        manager.resolve_targets(&["net", "missing"]),
        Err(Error::LayerNotFound(name)) if name == "missing"
    ));
}

#[rstest]
fn test_apply_build_order(tree: TempDir) {
    let mut manager = manager_for(tree.path()).unwrap();
    let order = manager.get_build_order(&["app"]).unwrap();
    let mut env = MemoryEnvironment::new();
    let report = manager.apply(&order, &mut env).unwrap();

    assert_eq!(env.get("IGconf_img_hostname").as_deref(), Some("app-host"));
    assert_eq!(env.get("IGconf_img_user").as_deref(), Some("pi"));
    assert_eq!(env.get("IGconf_net_port").as_deref(), Some("8080"));
    assert_eq!(report.actions[0].action, ApplyAction::Force);
    assert_eq!(report.actions[0].layer, "app");

    let out = tree.path().join("applied.env");
    manager.write_out(&out).unwrap();
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "IGconf_img_hostname=\"app-host\"\nIGconf_img_user=\"pi\"\nIGconf_net_port=\"8080\"\n"
    );
}

#[rstest]
fn test_apply_aborts_on_invalid_value(tree: TempDir) {
    let mut manager = manager_for(tree.path()).unwrap();
    let order = manager.get_build_order(&["app"]).unwrap();
    let mut env: MemoryEnvironment = [("IGconf_net_port", "80")].into_iter().collect();

    match manager.apply(&order, &mut env) {
        Err(Error::ValidationFailed { layer, failures }) => {
            assert_eq!(layer, "net");
            assert_eq!(failures.len(), 1);
        }
        other => panic!("expected a validation failure, got {other:?}"),
    }
    assert!(!env.contains("IGconf_img_hostname"));
    assert!(manager.write_log().is_empty());
}

#[rstest]
fn test_missing_required_is_reported_after_apply(tree: TempDir) {
    let manager = manager_for(tree.path()).unwrap();
    let env = MemoryEnvironment::new();
    let failures = manager.layer_failures("net", &env, false).unwrap();
    assert_eq!(failures, vec!["IGconf_net_port - REQUIRED but not set".to_string()]);
    assert!(manager.layer_failures("net", &env, true).unwrap().is_empty());
}

#[rstest]
fn test_build_order_lines(tree: TempDir) {
    let manager = manager_for(tree.path()).unwrap();
    let order = manager.get_build_order(&["net"]).unwrap();
    assert_eq!(manager.build_order_lines(&order, false), vec!["base", "net"]);

    let full = manager.build_order_lines(&order, true);
    assert!(full[0].starts_with("base=\""));
    assert!(full[0].ends_with("base.yaml\""));

    let out = tree.path().join("order.txt");
    manager.write_build_order(&order, false, &out).unwrap();
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "base\nnet\n");
}

#[rstest]
fn test_layers_by_category(tree: TempDir) {
    let manager = manager_for(tree.path()).unwrap();
    let categories = manager.layers_by_category();
    let keys: Vec<_> = categories.keys().copied().collect();
    assert_eq!(keys, vec!["core", "general", "network"]);
    let general: Vec<_> = categories["general"].iter().map(|l| l.name.as_str()).collect();
    assert_eq!(general, vec!["app", "sshd", "systemd", "sysv"]);
}

#[rstest]
#[case("short", "short")]
#[case("  spaced \n  out  ", "spaced out")]
#[case(
    "a description that is far too long to fit in the listing column at all",
    "a description that is far too long to fit in the listing ..."
)]
fn test_short_description(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(short_description(input, MAX_LISTED_DESCRIPTION), expected);
}

#[rstest]
fn test_relative_path(tree: TempDir) {
    let manager = manager_for(tree.path()).unwrap();
    assert_eq!(
        manager.relative_path("net"),
        Some(PathBuf::from("net/net.yml"))
    );
}

#[rstest]
fn test_build_config() {
    let tmp = TempDir::new().unwrap();
    let mut content = layer("pkgs", &[]);
    content.push_str("---\nmmdebstrap:\n  architectures:\n    - arm64\n  packages:\n    - vim\n  mode: auto\n");
    write(tmp.path(), "pkgs.yaml", &content);
    write(tmp.path(), "bare.yaml", &layer("bare", &[]));
    let manager = manager_for(tmp.path()).unwrap();

    let config = manager.build_config("pkgs").unwrap().unwrap();
    assert_eq!(config.architectures, vec!["arm64"]);
    assert_eq!(config.packages, vec!["vim"]);
    assert_eq!(config.other["mode"], serde_yaml::Value::from("auto"));

    assert_eq!(manager.build_config("bare").unwrap(), None);
    assert!(matches!(
        manager.build_config("nope"),
        Err(Error::LayerNotFound(_))
    ));
}

#[rstest]
fn test_dynamic_dependencies() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "image.yaml",
        &layer("image", &[("Layer-Requires", "base,${DEVICE}")]),
    );

    let env: MemoryEnvironment = [("DEVICE", "pi5")].into_iter().collect();
    let manager = manager_with_env(tmp.path(), &env).unwrap();
    assert_eq!(manager.dependencies("image"), ["base", "pi5"]);

    // unresolvable references make the file unloadable outside doc mode
    let manager = manager_for(tmp.path()).unwrap();
    assert!(manager.layers().is_empty());

    let options = ManagerOptions {
        search_paths: vec![tmp.path().to_path_buf()],
        doc_mode: true,
        ..Default::default()
    };
    let manager = LayerManager::new(options, &MemoryEnvironment::new()).unwrap();
    assert_eq!(manager.dependencies("image"), ["base", "${DEVICE}"]);
}

#[rstest]
fn test_parse_search_paths() {
    assert_eq!(
        ManagerOptions::parse_search_paths("./layer::./device: ./image"),
        vec![
            PathBuf::from("./layer"),
            PathBuf::from("./device"),
            PathBuf::from("./image")
        ]
    );
}
