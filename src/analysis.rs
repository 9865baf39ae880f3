//! Single pass over the VCF records, matching them against the variant table.

use crate::{
    database::{Category, VariantDatabase, VariantDefinition},
    genotype::{classify, Genotype, Zygosity},
    manifest::ManifestEntry,
    vcf::Record,
    Result,
};
use log::{debug, info, warn};
use std::collections::HashSet;

/// Records between two progress messages
pub const DEFAULT_PROGRESS_INTERVAL: usize = 500_000;

#[derive(Debug, Clone)]
/// Settings of a single analysis pass
pub struct AnalysisOptions {
    /// Keep homozygous reference calls in the results
    pub include_reference: bool,
    /// Log progress every this many records, 0 disables
    pub progress_interval: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_reference: true,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A known variant observed in the sample
pub struct VariantMatch<'db> {
    /// Matched table entry
    pub definition: &'db VariantDefinition,
    /// Chromosome as written in the input
    pub chrom: String,
    /// Position as written in the input
    pub pos: u64,
    /// Raw `GT` value
    pub genotype: String,
    /// Classified genotype
    pub zygosity: Zygosity,
}

impl<'db> VariantMatch<'db> {
    /// rsID of the matched entry
    pub fn rsid(&self) -> &'db str {
        &self.definition.rsid
    }

    /// Report section of the matched entry
    pub fn category(&self) -> Category {
        self.definition.category
    }

    /// Interpretation text selected by the zygosity
    pub fn interpretation(&self) -> &'db str {
        self.definition.interpretation(self.zygosity)
    }

    /// Rebuilds a match from a manifest entry. Entries of older manifests lack the zygosity, it
    /// is then derived from the allele indices of the genotype. `None` when the rsID is not in
    /// `db` or the genotype cannot be classified.
    pub fn from_manifest(db: &'db VariantDatabase, rsid: &str, entry: &ManifestEntry) -> Option<Self> {
        let definition = db.get(rsid)?;
        let zygosity = match entry.zygosity {
            Some(zygosity) => zygosity,
            None => Zygosity::from_indices(&Genotype::parse(&entry.genotype)?)?,
        };
        Some(Self {
            definition,
            chrom: entry.chromosome.clone(),
            pos: entry.position,
            genotype: entry.genotype.clone(),
            zygosity,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Counters collected while scanning
pub struct ScanSummary {
    /// Data lines read
    pub records: usize,
    /// Entries kept in the results
    pub matched: usize,
    /// Known variants with a missing call
    pub missing_genotypes: usize,
    /// Known variants whose calls carry neither table allele
    pub unclassified: usize,
    /// Repeated observations of an rsID already matched
    pub duplicates: usize,
    /// Homozygous reference calls dropped with `include_reference` unset
    pub reference_skipped: usize,
}

#[derive(Debug)]
/// Result of an analysis pass, matches are in input order
pub struct Analysis<'db> {
    /// One match per reported rsID
    pub matches: Vec<VariantMatch<'db>>,
    /// Scan counters
    pub summary: ScanSummary,
}

impl<'db> Analysis<'db> {
    /// Matches of one category in input order
    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &VariantMatch<'db>> {
        self.matches
            .iter()
            .filter(move |m| m.category() == category)
    }

    /// Number of matches of one category
    pub fn count(&self, category: Category) -> usize {
        self.by_category(category).count()
    }

    /// No known variant was found
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Scans `records` once and matches every record against `db`. Read errors abort the scan.
pub fn analyze<'db, I>(records: I, db: &'db VariantDatabase, options: &AnalysisOptions) -> Result<Analysis<'db>>
where
    I: IntoIterator<Item = Result<Record>>,
{
    info!("Searching for {} known variants...", db.len());
    let mut matches = Vec::new();
    let mut summary = ScanSummary::default();
    let mut seen = HashSet::new();

    for record in records {
        let record = record?;
        summary.records += 1;
        if options.progress_interval > 0 && summary.records % options.progress_interval == 0 {
            info!("Checked {} records...", summary.records);
        }

        let definition = match db.lookup(record.ids(), || record.locus()) {
            Some(definition) => definition,
            None => continue,
        };

        if seen.contains(definition.rsid.as_str()) {
            warn!(
                "{} observed again at line {}, keeping the first observation",
                definition.rsid, record.line
            );
            summary.duplicates += 1;
            continue;
        }

        let zygosity = match Genotype::parse(&record.genotype) {
            Some(gt) if !gt.is_missing() => match classify(definition, &record, &gt) {
                Some(zygosity) => zygosity,
                None => {
                    warn!(
                        "Genotype {} at line {} carries neither {} nor {} for {}, skipping",
                        record.genotype,
                        record.line,
                        definition.ref_allele,
                        definition.alt_allele,
                        definition.rsid
                    );
                    summary.unclassified += 1;
                    continue;
                }
            },
            _ => {
                debug!("No call for {} at line {}", definition.rsid, record.line);
                summary.missing_genotypes += 1;
                continue;
            }
        };

        if !zygosity.is_carrier() && !options.include_reference {
            summary.reference_skipped += 1;
            continue;
        }

        seen.insert(definition.rsid.as_str());
        debug!("{} ({}) is {}", definition.rsid, definition.gene, zygosity);
        matches.push(VariantMatch {
            definition,
            chrom: record.chrom,
            pos: record.pos,
            genotype: record.genotype,
            zygosity,
        });
    }

    summary.matched = matches.len();
    info!(
        "Found {} known variants in {} records",
        summary.matched, summary.records
    );

    Ok(Analysis { matches, summary })
}
