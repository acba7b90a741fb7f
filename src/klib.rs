//! Single-file klib resolution.
//!
//! A klib artifact, once unpacked, is a directory whose `linkdata/` component
//! carries the serialized metadata: a `module` header blob plus one
//! `package_<fq.name>/` directory of `.knm` parts per package. The decoder
//! only needs raw byte access to those pieces, so it depends on the
//! [`MetadataLibrary`] trait rather than on any filesystem layout knowledge.

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const LINKDATA_DIR: &str = "linkdata";
const MODULE_HEADER_FILE: &str = "module";
const PART_EXTENSION: &str = "knm";

/// Raw byte access to one library's metadata.
///
/// Part names are returned as an ordered set so traversal is repeatable
/// across runs regardless of directory enumeration order.
pub trait MetadataLibrary {
    fn module_header_data(&self) -> Result<Vec<u8>>;
    fn package_metadata_parts(&self, fq_name: &str) -> Result<BTreeSet<String>>;
    fn package_metadata(&self, fq_name: &str, part_name: &str) -> Result<Vec<u8>>;
}

/// Directory-form klib artifact.
#[derive(Debug)]
pub struct SingleFileKlib {
    linkdata: PathBuf,
}

impl SingleFileKlib {
    /// Resolves `path` as an unpacked klib. The caller has already checked
    /// the path exists; a present-but-malformed artifact is a decode failure.
    pub fn resolve(path: &Path) -> Result<Self> {
        let linkdata = path.join(LINKDATA_DIR);
        if !linkdata.is_dir() {
            return Err(anyhow!(
                "not a klib artifact: {} has no {} directory",
                path.display(),
                LINKDATA_DIR
            ));
        }
        Ok(SingleFileKlib { linkdata })
    }

    fn package_dir(&self, fq_name: &str) -> PathBuf {
        // The root package (empty fq name) lives in `package_root`.
        let dir_name = if fq_name.is_empty() {
            "package_root".to_string()
        } else {
            format!("package_{}", fq_name)
        };
        self.linkdata.join(dir_name)
    }
}

impl MetadataLibrary for SingleFileKlib {
    fn module_header_data(&self) -> Result<Vec<u8>> {
        let path = self.linkdata.join(MODULE_HEADER_FILE);
        fs::read(&path).with_context(|| format!("read module header {}", path.display()))
    }

    fn package_metadata_parts(&self, fq_name: &str) -> Result<BTreeSet<String>> {
        let dir = self.package_dir(fq_name);
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("read package metadata dir {}", dir.display()))?;

        let mut parts = BTreeSet::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("list {}", dir.display()))?
                .path();
            if path.extension().and_then(|s| s.to_str()) != Some(PART_EXTENSION) {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| anyhow!("bad part filename {}", path.display()))?;
            parts.insert(stem.to_string());
        }
        Ok(parts)
    }

    fn package_metadata(&self, fq_name: &str, part_name: &str) -> Result<Vec<u8>> {
        let path = self
            .package_dir(fq_name)
            .join(format!("{}.{}", part_name, PART_EXTENSION));
        fs::read(&path).with_context(|| format!("read metadata part {}", path.display()))
    }
}
