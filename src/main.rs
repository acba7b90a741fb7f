//! orbit-swiftgen: Swift binding generation from klib metadata.
//!
//! Scans compiled Kotlin/Native libraries for Orbit container classes and
//! emits Swift wrappers for them, plus the Combine bridging utility the
//! wrappers depend on.
//!
//! ## Example Usage
//!
//! ```bash
//! # Generate bindings for two dependency libraries
//! orbit-swiftgen --framework SharedKit --out-dir build/orbit-swift \
//!     build/classes/shared.klib build/classes/feature-login.klib
//!
//! # No libraries: still emits the Publisher bridge
//! orbit-swiftgen --framework SharedKit --out-dir build/orbit-swift
//! ```
//!
//! Unreadable or malformed libraries are skipped and reported in the JSON
//! summary on stdout; only start-up failures (template compilation, output
//! directory preparation) exit non-zero.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use orbit_swiftgen::Pipeline;

#[derive(Debug, Parser)]
#[command(
    name = "orbit-swiftgen",
    author,
    version,
    about = "Generate Swift bindings for Orbit container classes from klib metadata"
)]
struct Args {
    /// Base name of the Apple framework the generated sources import.
    #[arg(long, value_name = "NAME")]
    framework: String,

    /// Output directory; recreated from scratch on every run.
    #[arg(long, value_name = "DIR")]
    out_dir: PathBuf,

    /// Compiled library artifacts (unpacked klib directories) to scan.
    #[arg(value_name = "LIBRARY")]
    libraries: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let pipeline = Pipeline::new(args.framework.as_str(), &args.out_dir)?;
    let summary = pipeline.run(&args.libraries)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
