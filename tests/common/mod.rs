//! Fixture-authoring helpers for integration tests.
//!
//! Builds directory-form klib artifacts byte by byte with the crate's wire
//! writer, so tests exercise the real decoder against real metadata layouts.
//! Field numbers here mirror the serialized format: header (1 version,
//! 2 module name, 3 package fragment), fragment (1 fq name, 2 class,
//! 3 function), class (1 name, 2 flags, 3 supertype, 4 function), function
//! (1 name, 2 flags, 3 value parameter), value parameter (1 name, 2 type),
//! type (1 class name, 2 type parameter, 3 argument), argument (1 type).

#![allow(dead_code)]

use orbit_swiftgen::model::Flags;
use orbit_swiftgen::wire::Writer;
use std::fs;
use std::path::Path;

pub const ABI_VERSION: u64 = 1;

/// Fully-qualified marker supertype for container classes.
pub const CONTAINER_HOST: &str = "org/orbitmvi/orbit/ContainerHost";

/// Encodes a non-generic class reference type.
pub fn class_type(fq_name: &str) -> Vec<u8> {
    generic_class_type(fq_name, &[])
}

/// Encodes a class reference type with generic arguments; `None` slots are
/// star projections.
pub fn generic_class_type(fq_name: &str, arguments: &[Option<Vec<u8>>]) -> Vec<u8> {
    let mut w = Writer::new();
    w.string(1, fq_name);
    for argument in arguments {
        let mut arg = Writer::new();
        if let Some(ty) = argument {
            arg.bytes(1, ty);
        }
        w.bytes(3, &arg.into_bytes());
    }
    w.into_bytes()
}

/// Encodes a type-variable reference (unusable by the generator on purpose).
pub fn type_parameter(name: &str) -> Vec<u8> {
    let mut w = Writer::new();
    w.string(2, name);
    w.into_bytes()
}

/// Encodes the container host supertype with its two argument slots.
pub fn container_host(state_fq: &str, side_effect_fq: &str) -> Vec<u8> {
    generic_class_type(
        CONTAINER_HOST,
        &[
            Some(class_type(state_fq)),
            Some(class_type(side_effect_fq)),
        ],
    )
}

pub fn function(name: &str, flags: Flags, parameters: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut w = Writer::new();
    w.string(1, name);
    w.varint(2, u64::from(flags.0));
    for (param_name, ty) in parameters {
        let mut p = Writer::new();
        p.string(1, param_name);
        p.bytes(2, ty);
        w.bytes(3, &p.into_bytes());
    }
    w.into_bytes()
}

pub fn class(fq_name: &str, flags: Flags, supertypes: &[Vec<u8>], functions: &[Vec<u8>]) -> Vec<u8> {
    let mut w = Writer::new();
    w.string(1, fq_name);
    w.varint(2, u64::from(flags.0));
    for supertype in supertypes {
        w.bytes(3, supertype);
    }
    for function in functions {
        w.bytes(4, function);
    }
    w.into_bytes()
}

pub fn fragment(fq_name: Option<&str>, classes: &[Vec<u8>], functions: &[Vec<u8>]) -> Vec<u8> {
    let mut w = Writer::new();
    if let Some(fq) = fq_name {
        w.string(1, fq);
    }
    for class in classes {
        w.bytes(2, class);
    }
    for function in functions {
        w.bytes(3, function);
    }
    w.into_bytes()
}

/// Lays a klib artifact out on disk: `linkdata/module` plus one `.knm` part
/// per `(package fq name, fragment bytes)` pair, grouped by package.
pub fn write_klib(root: &Path, module_name: &str, fragments: &[(&str, Vec<u8>)]) {
    let linkdata = root.join("linkdata");

    let mut header = Writer::new();
    header.varint(1, ABI_VERSION);
    header.string(2, module_name);
    let mut seen: Vec<&str> = Vec::new();
    for (fq, _) in fragments {
        if !seen.contains(fq) {
            seen.push(fq);
            header.string(3, fq);
        }
    }
    fs::create_dir_all(&linkdata).unwrap();
    fs::write(linkdata.join("module"), header.into_bytes()).unwrap();

    for (index, (fq, bytes)) in fragments.iter().enumerate() {
        let package_dir = linkdata.join(format!("package_{}", fq));
        fs::create_dir_all(&package_dir).unwrap();
        let simple = fq.rsplit('.').next().unwrap_or(fq);
        fs::write(package_dir.join(format!("{}_{}.knm", index, simple)), bytes).unwrap();
    }
}

/// One ready-made library: `com.example.LoginViewModel` implementing
/// `ContainerHost<LoginState, Nothing>` with `login(username: String)` and a
/// public `onCleared` override.
pub fn write_login_klib(root: &Path) {
    let login = function(
        "login",
        Flags::PUBLIC,
        &[("username", class_type("kotlin/String"))],
    );
    let on_cleared = function("onCleared", Flags::PUBLIC, &[]);
    let view_model = class(
        "com/example/LoginViewModel",
        Flags::PUBLIC,
        &[container_host("com/example/LoginState", "kotlin/Nothing")],
        &[login, on_cleared],
    );
    write_klib(
        root,
        "shared",
        &[("com.example", fragment(Some("com.example"), &[view_model], &[]))],
    );
}
