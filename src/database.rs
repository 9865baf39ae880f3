//! Curated table of known variants, keyed by rsID.
//!
//! The default table is compiled into the binary from `resources/variants.json`. Each entry
//! carries the gene, the expected reference/alternate alleles and the interpretation texts for
//! carriers. Entries may optionally pin a GRCh38 locus so that VCFs without IDs can still be
//! matched by position.

use crate::{error::Error, genotype::Zygosity, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, path::Path};

/// Variant table shipped with the binary
pub const DEFAULT_TABLE: &str = include_str!("../resources/variants.json");

/// Interpretation used for homozygous reference calls
pub const REFERENCE_INTERPRETATION: &str =
    "No copies of the variant allele - typical (reference) function expected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Report section a variant belongs to
pub enum Category {
    #[serde(alias = "pharmacogenomics", alias = "pgx")]
    /// Drug response
    Pharmacogenomic,
    /// Disease risk and carrier status
    Clinical,
    #[serde(alias = "traits")]
    /// Appearance, taste, metabolism and other traits
    Trait,
}

impl Category {
    /// Categories in report order
    pub const ALL: [Category; 3] = [Category::Pharmacogenomic, Category::Clinical, Category::Trait];

    /// Name used in manifests and section markers
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pharmacogenomic => "pharmacogenomic",
            Category::Clinical => "clinical",
            Category::Trait => "trait",
        }
    }

    /// Human readable heading
    pub fn title(&self) -> &'static str {
        match self {
            Category::Pharmacogenomic => "Pharmacogenomics",
            Category::Clinical => "Clinical Variants",
            Category::Trait => "Traits",
        }
    }

    /// Label of the `subject` field in this category
    pub fn subject_label(&self) -> &'static str {
        match self {
            Category::Pharmacogenomic => "Affects",
            Category::Clinical => "Condition",
            Category::Trait => "Trait",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Importance tier, ordered from least to most important
pub enum Importance {
    /// Default tier
    Medium,
    /// Shown with a highlighted card
    High,
    /// Listed first, e.g. severe drug reactions
    Critical,
}

impl Default for Importance {
    fn default() -> Self {
        Importance::Medium
    }
}

impl Importance {
    /// Lower case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Medium => "medium",
            Importance::High => "high",
            Importance::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Chromosome and 1-based position with a normalized chromosome name
pub struct Locus {
    /// Chromosome without `chr` prefix
    pub chrom: String,
    /// 1-based position
    pub pos: u64,
}

impl Locus {
    /// Creates a locus, normalizing the chromosome name
    pub fn new(chrom: &str, pos: u64) -> Self {
        Self {
            chrom: normalize_chrom(chrom),
            pos,
        }
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chrom, self.pos)
    }
}

/// Strips `chr` prefixes and maps the mitochondrial `M` to `MT`
pub fn normalize_chrom(chrom: &str) -> String {
    let stripped = ["chr", "Chr", "CHR"]
        .iter()
        .find_map(|prefix| chrom.strip_prefix(prefix))
        .unwrap_or(chrom);
    match stripped {
        "M" => "MT".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A hand curated entry of the variant table
pub struct VariantDefinition {
    /// dbSNP reference identifier, e.g. `rs4244285`
    pub rsid: String,
    /// Gene symbol
    pub gene: String,
    /// Report section
    pub category: Category,
    /// Optional GRCh38 chromosome, used for position matching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chromosome: Option<String>,
    /// Optional GRCh38 position, used for position matching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    /// Expected reference allele
    pub ref_allele: String,
    /// Allele the interpretations refer to
    pub alt_allele: String,
    /// Drugs affected, condition or trait depending on the category
    pub subject: String,
    /// Trait group (Appearance, Taste, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Star allele or HLA allele name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star: Option<String>,
    /// Protein or cDNA level variant name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Interpretation for one alternate copy
    pub if_het: String,
    /// Interpretation for two alternate copies
    pub if_hom_alt: String,
    #[serde(default)]
    /// Ordering within the pharmacogenomic section
    pub importance: Importance,
    /// Suggested follow-up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Free text caveat
    pub note: Option<String>,
    /// Supporting literature
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
}

impl VariantDefinition {
    /// Locus when both chromosome and position are recorded
    pub fn locus(&self) -> Option<Locus> {
        match (&self.chromosome, self.position) {
            (Some(chrom), Some(pos)) => Some(Locus::new(chrom, pos)),
            _ => None,
        }
    }

    /// Interpretation text for the observed zygosity
    pub fn interpretation(&self, zygosity: Zygosity) -> &str {
        match zygosity {
            Zygosity::HomozygousReference => REFERENCE_INTERPRETATION,
            Zygosity::Heterozygous => &self.if_het,
            Zygosity::HomozygousAlternate => &self.if_hom_alt,
        }
    }

    /// Whether either interpretation describes a protective effect
    pub fn is_protective(&self) -> bool {
        self.if_het.to_lowercase().contains("protective")
            || self.if_hom_alt.to_lowercase().contains("protective")
    }

    /// True when both alleles are plain nucleotide sequences that can be compared against VCF
    /// alleles. Labelled alleles (`TA6`, `I`/`D`, `WT`) are matched by allele index instead.
    pub fn has_nucleotide_alleles(&self) -> bool {
        is_nucleotides(&self.ref_allele) && is_nucleotides(&self.alt_allele)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(Error::InvalidDefinition(self.rsid.clone(), reason.to_string()));

        let digits = self.rsid.strip_prefix("rs").unwrap_or("");
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return invalid("rsID must be `rs` followed by digits");
        }
        if self.gene.trim().is_empty() {
            return invalid("gene is empty");
        }
        if self.subject.trim().is_empty() {
            return invalid("subject is empty");
        }
        if self.ref_allele.is_empty() || self.alt_allele.is_empty() {
            return invalid("reference and alternate alleles are required");
        }
        if self.ref_allele.eq_ignore_ascii_case(&self.alt_allele) {
            return invalid("reference and alternate alleles are identical");
        }
        if self.chromosome.is_some() != self.position.is_some() {
            return invalid("chromosome and position must be given together");
        }
        Ok(())
    }
}

fn is_nucleotides(allele: &str) -> bool {
    allele
        .bytes()
        .all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'a' | b'c' | b'g' | b't'))
}

#[derive(Debug, Clone)]
/// Validated, indexed variant table
pub struct VariantDatabase {
    definitions: Vec<VariantDefinition>,
    by_rsid: HashMap<String, usize>,
    by_locus: HashMap<Locus, usize>,
}

impl VariantDatabase {
    /// Builds the index, rejecting invalid or duplicated entries
    pub fn new(definitions: Vec<VariantDefinition>) -> Result<Self> {
        let mut by_rsid = HashMap::with_capacity(definitions.len());
        let mut by_locus = HashMap::new();

        for (i, definition) in definitions.iter().enumerate() {
            definition.validate()?;
            if by_rsid.insert(definition.rsid.clone(), i).is_some() {
                return Err(Error::DuplicateDefinition(definition.rsid.clone()));
            }
            if let Some(locus) = definition.locus() {
                by_locus.insert(locus, i);
            }
        }
        debug!(
            "Indexed {} variant definitions ({} with a locus)",
            definitions.len(),
            by_locus.len()
        );

        Ok(Self {
            definitions,
            by_rsid,
            by_locus,
        })
    }

    /// The table compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(DEFAULT_TABLE)
    }

    /// Parses a JSON array of definitions
    pub fn from_json(json: &str) -> Result<Self> {
        let definitions: Vec<VariantDefinition> =
            serde_json::from_str(json).map_err(Error::VariantTable)?;
        Self::new(definitions)
    }

    /// Reads a user supplied table
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Definition of an rsID
    pub fn get(&self, rsid: &str) -> Option<&VariantDefinition> {
        self.by_rsid.get(rsid).map(|&i| &self.definitions[i])
    }

    /// Definition pinned to a locus
    pub fn get_by_locus(&self, locus: &Locus) -> Option<&VariantDefinition> {
        self.by_locus.get(locus).map(|&i| &self.definitions[i])
    }

    /// Matches the IDs of a record first, then its position. `locus` is only built when no ID
    /// matches and the table has positioned entries.
    pub fn lookup<'a, I, F>(&self, ids: I, locus: F) -> Option<&VariantDefinition>
    where
        I: IntoIterator<Item = &'a str>,
        F: FnOnce() -> Locus,
    {
        ids.into_iter().find_map(|id| self.get(id)).or_else(|| {
            if self.by_locus.is_empty() {
                None
            } else {
                self.get_by_locus(&locus())
            }
        })
    }

    /// Definitions in table order
    pub fn iter(&self) -> impl Iterator<Item = &VariantDefinition> {
        self.definitions.iter()
    }

    /// Number of definitions in a category
    pub fn count(&self, category: Category) -> usize {
        self.definitions
            .iter()
            .filter(|d| d.category == category)
            .count()
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Table has no definitions
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
