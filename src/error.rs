use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors of which majority are related to I/O issues or incorrect file format errors
pub enum Error {
    #[error("Could not read or write file")]
    /// Generic I/O failure
    Io(#[from] std::io::Error),
    #[error("Could not open VCF file")]
    /// Compression sniffing or decoding error
    CouldNotReadVcf(#[from] niffler::Error),
    #[error("Input file {0} does not exist")]
    /// Input file is missing
    FileNotFound(PathBuf),
    #[error("No VCF file supplied and none found in {0}")]
    /// Auto-detection found nothing
    NoInputFound(PathBuf),
    #[error("Malformed VCF record on line {line}: {reason}")]
    /// Data line that cannot be split into the mandatory columns
    MalformedRecord {
        /// 1-based line number
        line: usize,
        /// What is wrong with the line
        reason: String,
    },
    #[error("Could not parse variant table")]
    /// The variant table is not valid JSON for the definition schema
    VariantTable(#[source] serde_json::Error),
    #[error("Invalid variant table entry `{0}`: {1}")]
    /// Entry violates a table invariant
    InvalidDefinition(String, String),
    #[error("rsID `{0}` is defined more than once in the variant table")]
    /// Two entries share a key
    DuplicateDefinition(String),
    #[error("Could not read or write manifest JSON")]
    /// Manifest (de)serialization error
    Manifest(#[from] serde_json::Error),
    #[error("No analysis manifest found in {0}")]
    /// Neither the HTML nor the JSON manifest exist
    NoManifest(PathBuf),
    #[error("Report has no `{0}` section to insert into")]
    /// Append target lacks the section markers
    MissingSection(String),
}
