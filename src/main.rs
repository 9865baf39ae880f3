#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]

//! Generates the HTML report and the JSON manifest of known variants found in a VCF.

use chrono::Local;
use genoreport::{
    analysis::{analyze, ScanSummary},
    backup::write_with_backup,
    cli::Genoreport,
    database::Category,
    manifest::Manifest,
    report, vcf, Result,
};
use log::info;
use std::fs;
use structopt::StructOpt;

fn print_summary(summary: &ScanSummary, manifest: &Manifest) {
    println!(
        "Checked {records} records; found {found} known variants.",
        records = summary.records,
        found = manifest.total_variants,
    );
    for category in Category::ALL.iter() {
        println!("  {:>16}: {}", category.title(), manifest.count(*category));
    }
    if summary.reference_skipped > 0 {
        println!(
            "Skipped {} homozygous reference calls due to --variants-only.",
            summary.reference_skipped
        );
    }
    if summary.missing_genotypes > 0 {
        println!(
            "Encountered {} known variants with missing genotypes.",
            summary.missing_genotypes
        );
    }
    if summary.unclassified > 0 {
        println!(
            "Skipped {} known variants whose calls carry neither table allele.",
            summary.unclassified
        );
    }
    if summary.duplicates > 0 {
        println!(
            "Ignored {} repeated observations of an already reported rsID.",
            summary.duplicates
        );
    }
}

fn main() -> Result<()> {
    let opt = Genoreport::from_args();
    opt.set_logging();

    let input = opt.resolve_input()?;
    let db = opt.database()?;
    let records = vcf::from_path(&input)?;
    let analysis = analyze(records, &db, &opt.analysis_options())?;

    let manifest = Manifest::from_matches(&analysis.matches, Local::now());
    let html = report::render(&analysis.matches, &manifest, &opt.render_options())?;

    let files = opt.output_files();
    fs::create_dir_all(opt.output_dir())?;
    write_with_backup(&files.html, &html)?;
    manifest.write(&files.manifest)?;
    info!("Report written to {}", files.html.display());
    info!("Manifest written to {}", files.manifest.display());

    print_summary(&analysis.summary, &manifest);
    Ok(())
}
