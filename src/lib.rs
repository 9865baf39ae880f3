#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]

//! Lookup of known pharmacogenomic, clinical and trait variants in a single-sample VCF.
//!
//! A run streams the VCF once, matches every record against a curated variant table by rsID
//! (or by locus when the ID column is empty), classifies the sample genotype and writes an
//! HTML report together with a JSON manifest. Manifests of consecutive runs are diffed to find
//! variants that are new since the last run, so that an externally curated report can be
//! extended without touching what it already holds.

pub mod analysis;
/// Timestamped backups of files about to be overwritten
pub mod backup;
/// Command line options of both binaries
pub mod cli;
pub mod database;
pub mod detect;
/// Crate error type
pub mod error;
/// Genotype parsing and zygosity classification
pub mod genotype;
pub mod manifest;
pub mod report;
/// Line oriented VCF reading
pub mod vcf;

/// Directory searched for a VCF when none is given
pub const DEFAULT_DATA_DIR: &str = "data";
/// Directory receiving the report and the manifest
pub const DEFAULT_OUTPUT_DIR: &str = "analyses";
/// Base name of the report and the manifest
pub const DEFAULT_OUTPUT_NAME: &str = "GENOME_ANALYSIS";

/// Result with the crate error
pub type Result<T> = std::result::Result<T, crate::error::Error>;
