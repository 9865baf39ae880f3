use crate::{
    analysis::AnalysisOptions, database::VariantDatabase, detect::AnalysisFiles, error::Error,
    report::RenderOptions, Result, DEFAULT_DATA_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_NAME,
};
use log::{info, warn, LevelFilter};
use std::{
    fs,
    path::{Path, PathBuf},
};
use structopt::StructOpt;

const INPUT_EXTENSIONS: [&str; 2] = [".vcf.gz", ".vcf"];

#[derive(Debug, StructOpt)]
#[structopt(
    name = "genoreport",
    about = "Reports known pharmacogenomic, clinical and trait variants found in a VCF"
)]
/// Options of the report generator
pub struct Genoreport {
    #[structopt(
        help = "Single-sample VCF, gzipped or plain [default: first VCF in --data-dir]",
        parse(from_os_str)
    )]
    /// Input VCF
    pub vcf: Option<PathBuf>,
    #[structopt(
        long,
        help = "Directory searched for a VCF when none is given [default: data]",
        parse(from_os_str)
    )]
    /// Searched when `vcf` is not given
    pub data_dir: Option<PathBuf>,
    #[structopt(
        short,
        long,
        help = "Directory for the report and the manifest [default: analyses]",
        parse(from_os_str)
    )]
    /// Receives the report and the manifest
    pub output_dir: Option<PathBuf>,
    #[structopt(
        short = "n",
        long,
        help = "Base name of the report and the manifest [default: GENOME_ANALYSIS]"
    )]
    /// Base name of the output files
    pub output_name: Option<String>,
    #[structopt(
        long,
        help = "JSON variant table replacing the built-in one",
        parse(from_os_str)
    )]
    /// Replacement variant table
    pub database: Option<PathBuf>,
    #[structopt(long, help = "Leave homozygous reference calls out of the report")]
    /// Drop homozygous reference calls
    pub variants_only: bool,
    #[structopt(long, help = "Do not embed the manifest in the HTML report")]
    /// Leave the manifest out of the HTML
    pub no_embedded_manifest: bool,
    #[structopt(
        short,
        long,
        help = "More detailed logging, repeat for trace output",
        parse(from_occurrences)
    )]
    /// Number of `-v` flags
    pub verbose: u8,
    #[structopt(short, long, help = "Only log errors")]
    /// Errors only
    pub quiet: bool,
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "detect-new-variants",
    about = "Lists variants added or removed since the previous analysis run"
)]
/// Options of the change detector
pub struct DetectNewVariants {
    #[structopt(
        help = "Directory holding the analysis and its backups [default: analyses]",
        parse(from_os_str)
    )]
    /// Output directory of the analysis
    pub dir: Option<PathBuf>,
    #[structopt(
        short = "n",
        long,
        help = "Base name of the report and the manifest [default: GENOME_ANALYSIS]"
    )]
    /// Base name of the output files
    pub output_name: Option<String>,
    #[structopt(
        long,
        help = "Curated report that receives entries for the new variants",
        parse(from_os_str)
    )]
    /// Curated report to extend
    pub append_to: Option<PathBuf>,
    #[structopt(
        long,
        help = "JSON variant table replacing the built-in one",
        parse(from_os_str)
    )]
    /// Replacement variant table
    pub database: Option<PathBuf>,
    #[structopt(
        short,
        long,
        help = "More detailed logging, repeat for trace output",
        parse(from_occurrences)
    )]
    /// Number of `-v` flags
    pub verbose: u8,
    #[structopt(short, long, help = "Only log errors")]
    /// Errors only
    pub quiet: bool,
}

fn level(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    // a logger may already be installed when called from tests
    let _ = builder.try_init();
}

fn output_name(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or(DEFAULT_OUTPUT_NAME)
}

fn load_database(path: Option<&PathBuf>) -> Result<VariantDatabase> {
    match path {
        Some(path) => {
            info!("Loading variant table from {}", path.display());
            VariantDatabase::from_path(path)
        }
        None => VariantDatabase::builtin(),
    }
}

/// First `*.vcf.gz` in `dir`, otherwise the first `*.vcf`, by file name
pub fn find_input(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(Error::NoInputFound(dir.to_path_buf()));
    }
    let mut names = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();

    for ext in INPUT_EXTENSIONS.iter() {
        let candidates = names
            .iter()
            .filter(|name| name.ends_with(ext))
            .collect::<Vec<_>>();
        if let Some(first) = candidates.first() {
            if candidates.len() > 1 {
                warn!(
                    "Found {} {} files in {}, using {}",
                    candidates.len(),
                    ext,
                    dir.display(),
                    first
                );
            }
            return Ok(dir.join(first));
        }
    }
    Err(Error::NoInputFound(dir.to_path_buf()))
}

impl Genoreport {
    /// Initialises `env_logger` from the verbosity flags
    pub fn set_logging(&self) {
        init_logging(level(self.verbose, self.quiet));
    }

    /// The VCF given on the command line or the one found in the data directory
    pub fn resolve_input(&self) -> Result<PathBuf> {
        match &self.vcf {
            Some(vcf) => Ok(vcf.clone()),
            None => {
                let dir = self
                    .data_dir
                    .as_deref()
                    .unwrap_or_else(|| Path::new(DEFAULT_DATA_DIR));
                let vcf = find_input(dir)?;
                info!("Using {}", vcf.display());
                Ok(vcf)
            }
        }
    }

    /// The built-in table or the one given with `--database`
    pub fn database(&self) -> Result<VariantDatabase> {
        load_database(self.database.as_ref())
    }

    /// Scan settings from the flags
    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            include_reference: !self.variants_only,
            ..AnalysisOptions::default()
        }
    }

    /// Rendering settings from the flags
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            embed_manifest: !self.no_embedded_manifest,
        }
    }

    /// `--output-dir` or `analyses`
    pub fn output_dir(&self) -> &Path {
        self.output_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_DIR))
    }

    /// Report and manifest paths
    pub fn output_files(&self) -> AnalysisFiles {
        AnalysisFiles::new(self.output_dir(), output_name(&self.output_name))
    }
}

impl DetectNewVariants {
    /// Initialises `env_logger` from the verbosity flags
    pub fn set_logging(&self) {
        init_logging(level(self.verbose, self.quiet));
    }

    /// The built-in table or the one given with `--database`
    pub fn database(&self) -> Result<VariantDatabase> {
        load_database(self.database.as_ref())
    }

    /// Analysis directory, `analyses` unless given
    pub fn dir(&self) -> &Path {
        self.dir
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_DIR))
    }

    /// Base name of the analysis files
    pub fn output_name(&self) -> &str {
        output_name(&self.output_name)
    }
}
