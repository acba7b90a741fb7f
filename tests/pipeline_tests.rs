//! End-to-end pipeline tests over real on-disk klib fixtures.

mod common;

use common::{class, class_type, container_host, fragment, function, write_klib, write_login_klib};
use orbit_swiftgen::model::Flags;
use orbit_swiftgen::Pipeline;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn read_output_files(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        files.insert(
            path.file_name().unwrap().to_string_lossy().into_owned(),
            fs::read(&path).unwrap(),
        );
    }
    files
}

#[test]
fn test_login_view_model_end_to_end() {
    let dir = TempDir::new().unwrap();
    let lib = dir.path().join("shared.klib");
    write_login_klib(&lib);
    let out = dir.path().join("generated");

    let pipeline = Pipeline::new("SharedKit", &out).unwrap();
    let summary = pipeline.run(&[lib]).unwrap();

    assert_eq!(summary.libraries_scanned, 1);
    assert_eq!(summary.libraries_decoded, 1);
    assert!(summary.libraries_skipped.is_empty());
    assert_eq!(
        summary.files_written,
        vec!["LoginViewModelStateObject.swift", "Publisher.swift"]
    );

    let text = fs::read_to_string(out.join("LoginViewModelStateObject.swift")).unwrap();
    assert!(text.contains("import SharedKit"));
    // hasState=true with the state type name verbatim.
    assert!(text.contains("@Published public private(set) var state: LoginState"));
    // hasSideEffect=false: the Nothing sentinel disables the stream entirely.
    assert!(!text.contains("sideEffect"));
    assert!(text.contains("public func login(username: String)"));
    assert!(text.contains("viewModel.login(username: username)"));
    // The teardown hook is never part of the generated function list, even
    // though the fixture declares it public.
    assert!(!text.contains("public func onCleared"));

    let publisher = fs::read_to_string(out.join("Publisher.swift")).unwrap();
    assert!(publisher.contains("import SharedKit"));
    assert!(publisher.contains("func createPublisher"));
}

#[test]
fn test_state_and_side_effect_both_present() {
    let dir = TempDir::new().unwrap();
    let lib = dir.path().join("shared.klib");
    let view_model = class(
        "com/example/CheckoutViewModel",
        Flags::PUBLIC,
        &[container_host(
            "com/example/CheckoutState",
            "com/example/CheckoutSideEffect",
        )],
        &[function("submit", Flags::PUBLIC, &[])],
    );
    write_klib(
        &lib,
        "shared",
        &[("com.example", fragment(Some("com.example"), &[view_model], &[]))],
    );
    let out = dir.path().join("generated");

    Pipeline::new("SharedKit", &out)
        .unwrap()
        .run(&[lib])
        .unwrap();

    let text = fs::read_to_string(out.join("CheckoutViewModelStateObject.swift")).unwrap();
    assert!(text.contains("var state: CheckoutState"));
    assert!(text.contains("AnyPublisher<CheckoutSideEffect, Never>"));
    assert!(text.contains("public func submit()"));
}

#[test]
fn test_classes_without_marker_produce_no_files() {
    let dir = TempDir::new().unwrap();
    let lib = dir.path().join("shared.klib");
    let plain = class("com/example/Plain", Flags::PUBLIC, &[class_type("kotlin/Any")], &[]);
    let helper = function("provideViewModel", Flags::PUBLIC, &[]);
    write_klib(
        &lib,
        "shared",
        &[("com.example", fragment(Some("com.example"), &[plain], &[helper]))],
    );
    let out = dir.path().join("generated");

    let summary = Pipeline::new("SharedKit", &out)
        .unwrap()
        .run(&[lib])
        .unwrap();

    assert_eq!(summary.libraries_decoded, 1);
    assert_eq!(summary.files_written, vec!["Publisher.swift"]);
}

#[test]
fn test_repeated_runs_are_byte_identical() {
    let dir = TempDir::new().unwrap();
    let lib = dir.path().join("shared.klib");
    write_login_klib(&lib);
    let out = dir.path().join("generated");

    let pipeline = Pipeline::new("SharedKit", &out).unwrap();
    pipeline.run(std::slice::from_ref(&lib)).unwrap();
    let first = read_output_files(&out);
    pipeline.run(std::slice::from_ref(&lib)).unwrap();
    let second = read_output_files(&out);

    assert_eq!(first, second);
}

#[test]
fn test_stray_output_files_do_not_survive_a_run() {
    let dir = TempDir::new().unwrap();
    let lib = dir.path().join("shared.klib");
    write_login_klib(&lib);
    let out = dir.path().join("generated");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("Stray.swift"), "// stale").unwrap();

    Pipeline::new("SharedKit", &out)
        .unwrap()
        .run(&[lib])
        .unwrap();

    assert!(!out.join("Stray.swift").exists());
    assert!(out.join("LoginViewModelStateObject.swift").exists());
}

#[test]
fn test_missing_input_mixed_with_valid_input() {
    let dir = TempDir::new().unwrap();
    let lib = dir.path().join("shared.klib");
    write_login_klib(&lib);
    let out = dir.path().join("generated");

    let summary = Pipeline::new("SharedKit", &out)
        .unwrap()
        .run(&[dir.path().join("missing.klib"), lib])
        .unwrap();

    assert_eq!(summary.libraries_scanned, 2);
    assert_eq!(summary.libraries_decoded, 1);
    assert_eq!(summary.libraries_skipped.len(), 1);
    assert_eq!(
        summary.files_written,
        vec!["LoginViewModelStateObject.swift", "Publisher.swift"]
    );
}

#[test]
fn test_corrupt_library_is_skipped_and_run_continues() {
    let dir = TempDir::new().unwrap();

    let corrupt = dir.path().join("corrupt.klib");
    let view_model = class(
        "com/example/BadViewModel",
        Flags::PUBLIC,
        &[container_host("com/example/BadState", "kotlin/Nothing")],
        &[],
    );
    let mut bytes = fragment(Some("com.example"), &[view_model], &[]);
    bytes.truncate(bytes.len() - 4);
    write_klib(&corrupt, "broken", &[("com.example", bytes)]);

    let valid = dir.path().join("shared.klib");
    write_login_klib(&valid);

    let out = dir.path().join("generated");
    let summary = Pipeline::new("SharedKit", &out)
        .unwrap()
        .run(&[corrupt, valid])
        .unwrap();

    assert_eq!(summary.libraries_decoded, 1);
    assert_eq!(summary.libraries_skipped.len(), 1);
    assert!(summary.libraries_skipped[0].reason.contains("can't parse"));
    assert!(!out.join("BadViewModelStateObject.swift").exists());
    assert!(out.join("LoginViewModelStateObject.swift").exists());
}

#[test]
fn test_simple_name_collision_last_write_wins() {
    let dir = TempDir::new().unwrap();

    // Two packages declare a HomeViewModel; the later input must win.
    let lib_a = dir.path().join("feature_a.klib");
    let first = class(
        "com/feature_a/HomeViewModel",
        Flags::PUBLIC,
        &[container_host("com/feature_a/FirstState", "kotlin/Nothing")],
        &[],
    );
    write_klib(
        &lib_a,
        "feature_a",
        &[("com.feature_a", fragment(Some("com.feature_a"), &[first], &[]))],
    );

    let lib_b = dir.path().join("feature_b.klib");
    let second = class(
        "com/feature_b/HomeViewModel",
        Flags::PUBLIC,
        &[container_host("com/feature_b/SecondState", "kotlin/Nothing")],
        &[],
    );
    write_klib(
        &lib_b,
        "feature_b",
        &[("com.feature_b", fragment(Some("com.feature_b"), &[second], &[]))],
    );

    let out = dir.path().join("generated");
    let summary = Pipeline::new("SharedKit", &out)
        .unwrap()
        .run(&[lib_a, lib_b])
        .unwrap();

    assert_eq!(summary.libraries_decoded, 2);
    let text = fs::read_to_string(out.join("HomeViewModelStateObject.swift")).unwrap();
    assert!(text.contains("SecondState"));
    assert!(!text.contains("FirstState"));
}
