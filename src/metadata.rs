//! Binary metadata decoding.
//!
//! Turns the raw header and package-part bytes exposed by a
//! [`MetadataLibrary`] into the declaration model. This is the only place
//! that understands the serialized layout; everything downstream works on
//! [`Module`] values.
//!
//! Decoding is resilient in one direction only: *unknown* fields are skipped
//! (a newer toolchain may add them), while structurally broken input -
//! truncation, bad wire types, a version we do not support - fails the whole
//! library with a [`ReadError::Decode`].

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::klib::{MetadataLibrary, SingleFileKlib};
use crate::model::{
    Class, Classifier, Flags, Function, Module, Package, PackageFragment, Type, TypeArgument,
    ValueParameter,
};
use crate::wire::{Reader, WIRE_LEN, WIRE_VARINT};

/// Metadata ABI version this decoder understands.
pub const SUPPORTED_ABI_VERSION: u64 = 1;

/// Nesting cap for generic arguments, so corrupt input cannot recurse
/// unboundedly.
const MAX_TYPE_DEPTH: usize = 64;

// Header fields.
const HEADER_ABI_VERSION: u32 = 1;
const HEADER_MODULE_NAME: u32 = 2;
const HEADER_PACKAGE_FRAGMENT: u32 = 3;

// Fragment fields.
const FRAGMENT_FQ_NAME: u32 = 1;
const FRAGMENT_CLASS: u32 = 2;
const FRAGMENT_FUNCTION: u32 = 3;

// Class fields.
const CLASS_NAME: u32 = 1;
const CLASS_FLAGS: u32 = 2;
const CLASS_SUPERTYPE: u32 = 3;
const CLASS_FUNCTION: u32 = 4;

// Function fields.
const FUNCTION_NAME: u32 = 1;
const FUNCTION_FLAGS: u32 = 2;
const FUNCTION_VALUE_PARAMETER: u32 = 3;

// Value parameter fields.
const VALUE_PARAMETER_NAME: u32 = 1;
const VALUE_PARAMETER_TYPE: u32 = 2;

// Type fields.
const TYPE_CLASS_NAME: u32 = 1;
const TYPE_PARAMETER_NAME: u32 = 2;
const TYPE_ARGUMENT: u32 = 3;

// Type argument fields.
const TYPE_ARGUMENT_TYPE: u32 = 1;

/// Why one input library was skipped.
#[derive(Debug)]
pub enum ReadError {
    /// The input path does not reference an existing artifact.
    NotFound(PathBuf),
    /// The artifact exists but its metadata failed structural validation.
    Decode { path: PathBuf, source: anyhow::Error },
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::NotFound(path) => {
                write!(f, "library does not exist: {}", path.display())
            }
            ReadError::Decode { path, source } => {
                write!(f, "can't parse metadata of {}: {:#}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::NotFound(_) => None,
            ReadError::Decode { source, .. } => Some(source.as_ref()),
        }
    }
}

/// Reads one compiled library's metadata into a [`Module`].
///
/// Both error kinds mean "skip this input": a single malformed dependency
/// must not block generation for the others.
pub fn read_library(path: &Path) -> Result<Module, ReadError> {
    if !path.exists() {
        return Err(ReadError::NotFound(path.to_path_buf()));
    }

    let decode = |source: anyhow::Error| ReadError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let library = SingleFileKlib::resolve(path).map_err(decode)?;
    decode_module(&library).map_err(decode)
}

/// Decodes a full module from any [`MetadataLibrary`].
pub fn decode_module(library: &dyn MetadataLibrary) -> Result<Module> {
    let header_bytes = library.module_header_data()?;
    let header = decode_header(&header_bytes).context("decode module header")?;

    let mut fragments = Vec::new();
    for fq_name in &header.package_fragments {
        for part_name in library.package_metadata_parts(fq_name)? {
            let bytes = library.package_metadata(fq_name, &part_name)?;
            let fragment = decode_fragment(&bytes)
                .with_context(|| format!("decode part {} of package '{}'", part_name, fq_name))?;
            fragments.push(fragment);
        }
    }

    Ok(Module {
        name: header.module_name,
        fragments,
    })
}

struct Header {
    module_name: String,
    package_fragments: Vec<String>,
}

fn decode_header(bytes: &[u8]) -> Result<Header> {
    let mut reader = Reader::new(bytes);
    let mut abi_version = 0u64;
    let mut module_name = String::new();
    let mut package_fragments = Vec::new();

    while !reader.is_empty() {
        match reader.read_tag()? {
            (HEADER_ABI_VERSION, WIRE_VARINT) => abi_version = reader.read_varint()?,
            (HEADER_MODULE_NAME, WIRE_LEN) => module_name = reader.read_string()?,
            (HEADER_PACKAGE_FRAGMENT, WIRE_LEN) => package_fragments.push(reader.read_string()?),
            (_, wire_type) => reader.skip(wire_type)?,
        }
    }

    if abi_version != SUPPORTED_ABI_VERSION {
        bail!(
            "unsupported metadata ABI version {} (supported: {})",
            abi_version,
            SUPPORTED_ABI_VERSION
        );
    }

    Ok(Header {
        module_name,
        package_fragments,
    })
}

fn decode_fragment(bytes: &[u8]) -> Result<PackageFragment> {
    let mut reader = Reader::new(bytes);
    let mut fq_name = None;
    let mut classes = Vec::new();
    let mut functions = Vec::new();

    while !reader.is_empty() {
        match reader.read_tag()? {
            (FRAGMENT_FQ_NAME, WIRE_LEN) => fq_name = Some(reader.read_string()?),
            (FRAGMENT_CLASS, WIRE_LEN) => {
                classes.push(decode_class(reader.read_len_delimited()?)?)
            }
            (FRAGMENT_FUNCTION, WIRE_LEN) => {
                functions.push(decode_function(reader.read_len_delimited()?)?)
            }
            (_, wire_type) => reader.skip(wire_type)?,
        }
    }

    // A fragment without package declarations carries no package at all, only
    // classes.
    let package = if fq_name.is_some() || !functions.is_empty() {
        Some(Package {
            fq_name: fq_name.unwrap_or_default(),
            functions,
        })
    } else {
        None
    };

    Ok(PackageFragment { package, classes })
}

fn decode_class(bytes: &[u8]) -> Result<Class> {
    let mut reader = Reader::new(bytes);
    let mut name = String::new();
    let mut flags = Flags::default();
    let mut supertypes = Vec::new();
    let mut functions = Vec::new();

    while !reader.is_empty() {
        match reader.read_tag()? {
            (CLASS_NAME, WIRE_LEN) => name = reader.read_string()?,
            (CLASS_FLAGS, WIRE_VARINT) => flags = Flags(reader.read_varint()? as u32),
            (CLASS_SUPERTYPE, WIRE_LEN) => {
                supertypes.push(decode_type(reader.read_len_delimited()?, 0)?)
            }
            (CLASS_FUNCTION, WIRE_LEN) => {
                functions.push(decode_function(reader.read_len_delimited()?)?)
            }
            (_, wire_type) => reader.skip(wire_type)?,
        }
    }

    // The simple name becomes a file name downstream; an empty one means the
    // metadata is broken, not merely uninteresting.
    if crate::model::simple_name(&name).is_empty() {
        bail!("class with empty name");
    }

    Ok(Class {
        name,
        flags,
        supertypes,
        functions,
    })
}

fn decode_function(bytes: &[u8]) -> Result<Function> {
    let mut reader = Reader::new(bytes);
    let mut name = String::new();
    let mut flags = Flags::default();
    let mut value_parameters = Vec::new();

    while !reader.is_empty() {
        match reader.read_tag()? {
            (FUNCTION_NAME, WIRE_LEN) => name = reader.read_string()?,
            (FUNCTION_FLAGS, WIRE_VARINT) => flags = Flags(reader.read_varint()? as u32),
            (FUNCTION_VALUE_PARAMETER, WIRE_LEN) => {
                value_parameters.push(decode_value_parameter(reader.read_len_delimited()?)?)
            }
            (_, wire_type) => reader.skip(wire_type)?,
        }
    }

    if name.is_empty() {
        bail!("function with empty name");
    }

    Ok(Function {
        name,
        flags,
        value_parameters,
    })
}

fn decode_value_parameter(bytes: &[u8]) -> Result<ValueParameter> {
    let mut reader = Reader::new(bytes);
    let mut name = String::new();
    let mut ty = None;

    while !reader.is_empty() {
        match reader.read_tag()? {
            (VALUE_PARAMETER_NAME, WIRE_LEN) => name = reader.read_string()?,
            (VALUE_PARAMETER_TYPE, WIRE_LEN) => {
                ty = Some(decode_type(reader.read_len_delimited()?, 0)?)
            }
            (_, wire_type) => reader.skip(wire_type)?,
        }
    }

    if name.is_empty() {
        bail!("value parameter with empty name");
    }

    Ok(ValueParameter { name, ty })
}

fn decode_type(bytes: &[u8], depth: usize) -> Result<Type> {
    if depth > MAX_TYPE_DEPTH {
        bail!("type nesting exceeds {} levels", MAX_TYPE_DEPTH);
    }

    let mut reader = Reader::new(bytes);
    let mut class_name = None;
    let mut parameter_name = None;
    let mut arguments = Vec::new();

    while !reader.is_empty() {
        match reader.read_tag()? {
            (TYPE_CLASS_NAME, WIRE_LEN) => class_name = Some(reader.read_string()?),
            (TYPE_PARAMETER_NAME, WIRE_LEN) => parameter_name = Some(reader.read_string()?),
            (TYPE_ARGUMENT, WIRE_LEN) => {
                arguments.push(decode_type_argument(reader.read_len_delimited()?, depth + 1)?)
            }
            (_, wire_type) => reader.skip(wire_type)?,
        }
    }

    let classifier = match (class_name, parameter_name) {
        (Some(name), None) => Classifier::Class(name),
        (None, Some(name)) => Classifier::TypeParameter(name),
        (Some(_), Some(_)) => bail!("type with ambiguous classifier"),
        (None, None) => bail!("type without classifier"),
    };

    Ok(Type {
        classifier,
        arguments,
    })
}

fn decode_type_argument(bytes: &[u8], depth: usize) -> Result<TypeArgument> {
    let mut reader = Reader::new(bytes);
    let mut ty = None;

    while !reader.is_empty() {
        match reader.read_tag()? {
            (TYPE_ARGUMENT_TYPE, WIRE_LEN) => {
                ty = Some(decode_type(reader.read_len_delimited()?, depth)?)
            }
            (_, wire_type) => reader.skip(wire_type)?,
        }
    }

    // No inner type means a star projection.
    Ok(TypeArgument { ty })
}
