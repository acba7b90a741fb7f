//! Pipeline driver.
//!
//! Owns the run lifecycle: recreate the output directory, fire the
//! framework-level hook once, then decode and dispatch each input library in
//! order. Per-input failures are advisory - logged, recorded in the summary,
//! and the run moves on - while output-directory or template failures abort
//! before any library is touched.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::metadata;
use crate::model::Module;
use crate::processor::{Processor, ProcessorContext, PublisherProcessor, StateObjectProcessor};

/// What one run did, input by input. Serialized by the CLI as its result.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub libraries_scanned: usize,
    pub libraries_decoded: usize,
    pub libraries_skipped: Vec<SkippedLibrary>,
    /// Generated file names, sorted.
    pub files_written: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SkippedLibrary {
    pub path: String,
    pub reason: String,
}

/// One generation run over a set of compiled libraries.
pub struct Pipeline {
    context: ProcessorContext,
    processors: Vec<Box<dyn Processor>>,
}

impl Pipeline {
    /// Builds the pipeline with its fixed processor registration order.
    ///
    /// Every bundled template compiles here, so a malformed template fails
    /// construction before any filesystem work happens.
    pub fn new(framework_name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let processors: Vec<Box<dyn Processor>> = vec![
            Box::new(StateObjectProcessor::new()?),
            Box::new(PublisherProcessor::new()?),
        ];
        Ok(Pipeline {
            context: ProcessorContext {
                framework_name: framework_name.into(),
                output_dir: output_dir.into(),
            },
            processors,
        })
    }

    /// Runs generation over `libraries`, in order.
    ///
    /// The run succeeds once every input has been attempted; skipped inputs
    /// are reported in the summary, not as errors. Later inputs overwrite
    /// earlier ones on a simple-name collision (last write wins).
    pub fn run(&self, libraries: &[PathBuf]) -> Result<RunSummary> {
        reset_output_dir(&self.context.output_dir)?;

        for processor in &self.processors {
            processor.on_framework(&self.context)?;
        }

        let mut decoded = 0usize;
        let mut skipped = Vec::new();
        for path in libraries {
            match metadata::read_library(path) {
                Ok(module) => {
                    debug!(library = %path.display(), module = %module.name, "decoded library");
                    self.dispatch(&module)?;
                    decoded += 1;
                }
                Err(err) => {
                    warn!(library = %path.display(), error = %err, "library skipped");
                    skipped.push(SkippedLibrary {
                        path: path.display().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(RunSummary {
            libraries_scanned: libraries.len(),
            libraries_decoded: decoded,
            libraries_skipped: skipped,
            files_written: list_output_files(&self.context.output_dir)?,
        })
    }

    /// Dispatches one decoded module through every processor, in registration
    /// order. Processors must not retain the module past this call; it is
    /// dropped when the enclosing loop iteration ends.
    fn dispatch(&self, module: &Module) -> Result<()> {
        for processor in &self.processors {
            processor.on_library(&self.context, module)?;
            for fragment in &module.fragments {
                if let Some(package) = &fragment.package {
                    processor.on_package(&self.context, package)?;
                    for function in &package.functions {
                        processor.on_package_function(&self.context, function)?;
                    }
                }
                for class in &fragment.classes {
                    processor.on_class(&self.context, class)?;
                }
            }
        }
        Ok(())
    }
}

/// Removes the directory (and any stale outputs) then creates it fresh, so no
/// mix of old and new outputs survives a run.
fn reset_output_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("remove output dir {}", dir.display()))
        }
    }
    fs::create_dir_all(dir).with_context(|| format!("create output dir {}", dir.display()))
}

fn list_output_files(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("list output dir {}", dir.display()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("list output dir {}", dir.display()))?;

    let mut files: Vec<String> = entries
        .into_iter()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_input_list_still_emits_publisher() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("generated");

        let pipeline = Pipeline::new("SharedKit", &out).unwrap();
        let summary = pipeline.run(&[]).unwrap();

        assert_eq!(summary.libraries_scanned, 0);
        assert_eq!(summary.libraries_decoded, 0);
        assert!(summary.libraries_skipped.is_empty());
        assert_eq!(summary.files_written, vec!["Publisher.swift"]);
        assert!(out.join("Publisher.swift").exists());
    }

    #[test]
    fn test_missing_library_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("generated");

        let pipeline = Pipeline::new("SharedKit", &out).unwrap();
        let summary = pipeline
            .run(&[dir.path().join("no_such.klib")])
            .unwrap();

        assert_eq!(summary.libraries_scanned, 1);
        assert_eq!(summary.libraries_decoded, 0);
        assert_eq!(summary.libraries_skipped.len(), 1);
        assert!(summary.libraries_skipped[0].reason.contains("does not exist"));
        assert_eq!(summary.files_written, vec!["Publisher.swift"]);
    }

    #[test]
    fn test_output_dir_is_reset_before_generation() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("generated");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("stray.txt"), "left over").unwrap();

        let pipeline = Pipeline::new("SharedKit", &out).unwrap();
        let summary = pipeline.run(&[]).unwrap();

        assert!(!out.join("stray.txt").exists());
        assert_eq!(summary.files_written, vec!["Publisher.swift"]);
    }
}
