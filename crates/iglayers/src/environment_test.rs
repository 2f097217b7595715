// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use serial_test::serial;

use super::*;

#[rstest]
fn test_memory_environment_basic() {
    let mut env: MemoryEnvironment = [("A", "1")].into_iter().collect();
    assert_eq!(env.get("A").as_deref(), Some("1"));
    assert!(env.contains("A"));
    assert!(!env.contains("B"));

    env.set("B", "");
    assert!(env.contains("B"), "an empty value is still set");
    env.set("A", "2");
    assert_eq!(env.get("A").as_deref(), Some("2"));

    let names: Vec<_> = env.iter().map(|(k, _)| k).collect();
    assert_eq!(names, vec!["A", "B"]);

    assert_eq!(env.remove("A").as_deref(), Some("2"));
    assert_eq!(env.len(), 1);
}

#[rstest]
#[serial]
fn test_process_environment_roundtrip() {
    let name = "IGLAYERS_TEST_PROCESS_ENV";
    let mut env = ProcessEnvironment;
    assert!(!env.contains(name));

    env.set(name, "value");
    assert_eq!(env.get(name).as_deref(), Some("value"));
    assert!(MemoryEnvironment::from_process().contains(name));

    // SAFETY: serialised test, no other thread touches the environment.
    unsafe { std::env::remove_var(name) };
    assert!(!env.contains(name));
}

#[rstest]
#[serial]
#[case("IGconf_a=b_x", "1")]
#[case("IGLAYERS_TEST_NUL", "a\0b")]
#[case("", "1")]
fn test_process_environment_rejects_unstorable(#[case] name: &str, #[case] value: &str) {
    let mut env = ProcessEnvironment;
    env.set(name, value);
    assert!(name.is_empty() || !env.contains(name));
}

#[rstest]
#[case("plain", r#"A="plain""#)]
#[case(r#"say "hi""#, r#"A="say \"hi\"""#)]
#[case("$HOME/`id`", r#"A="\$HOME/\`id\`""#)]
#[case(r"C:\temp", r#"A="C:\\temp""#)]
#[case("two\nlines", "A=\"two\nlines\"")]
fn test_env_file_line_quoting(#[case] value: &str, #[case] expected: &str) {
    assert_eq!(env_file_line("A", value), expected);
}
