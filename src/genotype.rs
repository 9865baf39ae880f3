use crate::{database::VariantDefinition, vcf::Record};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Number of alternate copies observed relative to a variant definition
pub enum Zygosity {
    /// No alternate copy
    HomozygousReference,
    /// One alternate copy
    Heterozygous,
    /// Only alternate copies
    HomozygousAlternate,
}

impl Zygosity {
    /// Short form used as a CSS class and in change summaries
    pub fn short(&self) -> &'static str {
        match self {
            Zygosity::HomozygousReference => "ref",
            Zygosity::Heterozygous => "het",
            Zygosity::HomozygousAlternate => "hom",
        }
    }

    /// At least one alternate copy
    pub fn is_carrier(&self) -> bool {
        !matches!(self, Zygosity::HomozygousReference)
    }

    /// Three-way rule over resolved calls: all reference, all alternate, or mixed. Mixed calls
    /// are heterozygous only when one of them is the alternate allele. `None` when no call is
    /// alternate and at least one lands on an allele that is neither.
    pub fn from_alleles(alleles: &[CallAllele]) -> Option<Self> {
        let first = alleles.first()?;
        if alleles.iter().all(|allele| allele == first) {
            return match first {
                CallAllele::Reference => Some(Zygosity::HomozygousReference),
                CallAllele::Alternate => Some(Zygosity::HomozygousAlternate),
                CallAllele::Other => None,
            };
        }
        if alleles.contains(&CallAllele::Alternate) {
            Some(Zygosity::Heterozygous)
        } else {
            None
        }
    }

    /// Classification from allele indices alone, 0 being the VCF reference
    pub fn from_indices(genotype: &Genotype) -> Option<Self> {
        let alleles = genotype
            .indices()?
            .map(|idx| {
                if idx == 0 {
                    CallAllele::Reference
                } else {
                    CallAllele::Alternate
                }
            })
            .collect::<Vec<_>>();
        Self::from_alleles(&alleles)
    }
}

impl fmt::Display for Zygosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Zygosity::HomozygousReference => "homozygous reference",
            Zygosity::Heterozygous => "heterozygous",
            Zygosity::HomozygousAlternate => "homozygous alternate",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Allele a single genotype call resolves to
pub enum CallAllele {
    /// The definition's reference allele
    Reference,
    /// The definition's alternate allele
    Alternate,
    /// Any other allele of a multi-allelic site
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Parsed `GT` value, e.g. `0/1`, `1|1` or haploid `1`
pub struct Genotype {
    /// Allele indices, `None` for a missing call
    pub calls: Vec<Option<usize>>,
    /// Calls separated by `|`
    pub phased: bool,
}

impl Genotype {
    /// Returns `None` for empty or non-numeric values
    pub fn parse(gt: &str) -> Option<Self> {
        let gt = gt.trim();
        if gt.is_empty() {
            return None;
        }
        let phased = gt.contains('|');
        let calls = gt
            .split(|c: char| c == '/' || c == '|')
            .map(|call| match call {
                "." => Some(None),
                idx => idx.parse::<usize>().ok().map(Some),
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { calls, phased })
    }

    /// Any call is `.`
    pub fn is_missing(&self) -> bool {
        self.calls.iter().any(Option::is_none)
    }

    /// Allele indices when no call is missing
    pub fn indices(&self) -> Option<impl Iterator<Item = usize> + '_> {
        if self.is_missing() {
            None
        } else {
            Some(self.calls.iter().flatten().copied())
        }
    }
}

/// Resolves one allele index of `record` against the alleles of `definition`.
pub fn resolve_call(definition: &VariantDefinition, record: &Record, idx: usize) -> CallAllele {
    if !definition.has_nucleotide_alleles() {
        return if idx == 0 {
            CallAllele::Reference
        } else {
            CallAllele::Alternate
        };
    }

    let observed = if idx == 0 {
        Some(record.reference.as_str())
    } else {
        record.alternates.get(idx - 1).map(String::as_str)
    };

    match observed {
        Some(allele) if allele.eq_ignore_ascii_case(&definition.ref_allele) => CallAllele::Reference,
        Some(allele) if allele.eq_ignore_ascii_case(&definition.alt_allele) => CallAllele::Alternate,
        _ => CallAllele::Other,
    }
}

/// Classifies the genotype of `record` against `definition`. `None` for missing calls and for
/// calls that carry neither of the definition's alleles.
pub fn classify(definition: &VariantDefinition, record: &Record, genotype: &Genotype) -> Option<Zygosity> {
    let alleles = genotype
        .indices()?
        .map(|idx| resolve_call(definition, record, idx))
        .collect::<Vec<_>>();
    Zygosity::from_alleles(&alleles)
}
