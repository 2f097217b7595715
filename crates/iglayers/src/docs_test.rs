// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::environment::MemoryEnvironment;
use crate::manager::ManagerOptions;

const IMAGE_LAYER: &str = "\
# METABEGIN
# X-Env-Layer-Name: image
# X-Env-Layer-Desc: Example image
# X-Env-Layer-Requires: base,${DEVICE}
# X-Env-VarPrefix: Image
# X-Env-VarRequires: HOME
# X-Env-Var-name: ${FILENAME}-img
# X-Env-Var-name-Desc: Output image name
# X-Env-Var-name-Valid: string
# X-Env-Var-literal: \\${FILENAME}
# METAEND
---
mmdebstrap:
  packages:
    - vim
";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn doc_manager(root: &Path) -> LayerManager {
    let options = ManagerOptions {
        search_paths: vec![root.to_path_buf()],
        doc_mode: true,
        ..Default::default()
    };
    LayerManager::new(options, &MemoryEnvironment::new()).unwrap()
}

#[rstest]
fn test_documentation_record() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "img/image.yaml", IMAGE_LAYER);
    write(tmp.path(), "img/image.adoc", "= Image\n");
    write(
        tmp.path(),
        "base.yaml",
        "# METABEGIN\n# X-Env-Layer-Name: base\n# METAEND\n",
    );
    write(
        tmp.path(),
        "top.yaml",
        "# METABEGIN\n# X-Env-Layer-Name: top\n# X-Env-Layer-Requires: image\n# METAEND\n",
    );
    let manager = doc_manager(tmp.path());

    let doc = manager.documentation("image", DocFormat::default()).unwrap();
    assert_eq!(doc.layer_info.name, "image");
    assert_eq!(doc.variable_prefix, "Image");
    assert_eq!(doc.required_variables, vec!["HOME"]);
    assert_eq!(doc.file_path, Path::new("img/image.yaml"));
    assert_eq!(doc.companion_doc, "= Image\n");
    assert_eq!(doc.dependencies.static_deps, vec!["base"]);
    assert_eq!(doc.dependencies.dynamic_deps, vec!["${DEVICE}"]);
    assert_eq!(doc.reverse_dependencies, vec!["top"]);
    assert_eq!(doc.mmdebstrap.unwrap().packages, vec!["vim"]);

    let name = &doc.variables["IGconf_image_name"];
    assert_eq!(name.value, "image.yaml-img");
    assert_eq!(name.original_value, "${FILENAME}-img");
    assert_eq!(name.description, "Output image name");
    assert_eq!(name.validation_rule, "string");

    let literal = &doc.variables["IGconf_image_literal"];
    assert_eq!(literal.value, "${FILENAME}");
    assert_eq!(literal.validation_description, "No validation rule");
}

#[rstest]
fn test_companion_doc_formats() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "image.yaml", IMAGE_LAYER);
    write(tmp.path(), "image.md", "# Image\n");
    let manager = doc_manager(tmp.path());

    assert_eq!(manager.companion_doc("image", DocFormat::Markdown), "# Image\n");
    assert_eq!(manager.companion_doc("image", DocFormat::Rst), "");
    assert_eq!(manager.companion_doc("missing", DocFormat::Markdown), "");
}

#[rstest]
fn test_unknown_layer() {
    let tmp = TempDir::new().unwrap();
    let manager = doc_manager(tmp.path());
    assert!(matches!(
        manager.documentation("nope", DocFormat::Asciidoc),
        Err(Error::LayerNotFound(_))
    ));
}

#[rstest]
#[case("adoc", DocFormat::Asciidoc)]
#[case("Markdown", DocFormat::Markdown)]
#[case("md", DocFormat::Markdown)]
#[case("rst", DocFormat::Rst)]
fn test_doc_format_parse(#[case] input: &str, #[case] expected: DocFormat) {
    assert_eq!(input.parse::<DocFormat>().unwrap(), expected);
}

#[rstest]
fn test_dependency_keys_serialize() {
    let deps = DependencyDoc::categorise(&["a".into(), "${X}-b".into()]);
    let yaml = serde_yaml::to_string(&deps).unwrap();
    assert!(yaml.starts_with("static_dep:\n- a\ndyn_dep:\n"));
}
