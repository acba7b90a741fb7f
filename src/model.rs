//! Declaration model for one decoded klib.
//!
//! The tree mirrors the metadata layout: a [`Module`] owns package fragments,
//! fragments own classes and top-level functions, and types bottom out in a
//! classifier plus generic arguments. Everything here is immutable once the
//! reader has produced it; processors only ever see shared references.

use std::ops::BitOr;

/// Declaration flags packed into a varint on the wire.
///
/// Only the bits the generator inspects are named; unknown bits are carried
/// through untouched so a newer toolchain can add flags without breaking us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(pub u32);

impl Flags {
    pub const PUBLIC: Flags = Flags(1 << 0);
    pub const INTERNAL: Flags = Flags(1 << 1);
    pub const PRIVATE: Flags = Flags(1 << 2);
    pub const PROTECTED: Flags = Flags(1 << 3);
    pub const OPEN: Flags = Flags(1 << 4);
    pub const ABSTRACT: Flags = Flags(1 << 5);
    pub const FINAL: Flags = Flags(1 << 6);

    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_public(self) -> bool {
        self.contains(Flags::PUBLIC)
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// Root of one decoded library.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub fragments: Vec<PackageFragment>,
}

/// One metadata chunk scoped to a package path. Several fragments may share a
/// logical package name; they are traversed independently, in decode order.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageFragment {
    pub package: Option<Package>,
    pub classes: Vec<Class>,
}

/// Package-level declarations of a fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    /// Dot-delimited fully-qualified name; empty for the root package.
    pub fq_name: String,
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    /// Slash-delimited fully-qualified name, e.g. `com/example/LoginViewModel`.
    pub name: String,
    pub flags: Flags,
    pub supertypes: Vec<Type>,
    pub functions: Vec<Function>,
}

impl Class {
    /// Last segment of the fully-qualified name; reused verbatim as the
    /// generated file's base name.
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }
}

/// A member or top-level function. Parameter order is the call-site order
/// reproduced in generated bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub flags: Flags,
    pub value_parameters: Vec<ValueParameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueParameter {
    pub name: String,
    /// Absent when the metadata carried no usable type for this parameter.
    pub ty: Option<Type>,
}

/// What a type resolves to. A closed set: adding a classifier kind is a
/// compile-time-checked change for every consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Classifier {
    /// Reference to a class by slash-delimited fully-qualified name.
    Class(String),
    /// Reference to a type parameter by its declared name.
    TypeParameter(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub classifier: Classifier,
    pub arguments: Vec<TypeArgument>,
}

impl Type {
    /// Fully-qualified class name, or `None` for type-parameter classifiers.
    pub fn class_name(&self) -> Option<&str> {
        match &self.classifier {
            Classifier::Class(name) => Some(name),
            Classifier::TypeParameter(_) => None,
        }
    }

    /// Simple class name, or `None` when this type is not a class reference.
    pub fn simple_class_name(&self) -> Option<&str> {
        self.class_name().map(simple_name)
    }
}

/// One generic argument slot; `None` is a star projection.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeArgument {
    pub ty: Option<Type>,
}

/// Strips the package path off a slash-delimited fully-qualified name.
pub fn simple_name(fq_name: &str) -> &str {
    fq_name.rsplit('/').next().unwrap_or(fq_name)
}
